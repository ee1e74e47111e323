#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared models for odata-core integration tests

use odata_core::edm::schema::{
    EntityContainerDef, EntitySetDef, EnumTypeDef, NavigationPropertyDef, OperationDef,
    OperationImportDef, PropertyDef, SingletonDef, StructuredTypeDef,
};
use odata_core::{Edm, Facets};

pub const TRIPPIN: &str = "Trippin";
pub const TEST_NS: &str = "odata.test1";

/// `ESAllPrim` and `ESAllKey` with one property per primitive kind.
pub fn all_prim_edm() -> Edm {
    let mut all_prim = StructuredTypeDef::new("ETAllPrim").with_key(&["PropertyInt16"]);
    for (name, ty) in PRIMITIVES {
        let property = PropertyDef::new(*name, *ty);
        all_prim = all_prim.with_property(if *name == "PropertyInt16" {
            property.not_null()
        } else {
            property
        });
    }

    let key_names: Vec<&str> = PRIMITIVES
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !matches!(*name, "PropertySingle" | "PropertyDouble" | "PropertyBinary"))
        .collect();
    let mut all_key = StructuredTypeDef::new("ETAllKey").with_key(&key_names);
    for (name, ty) in PRIMITIVES {
        if key_names.contains(name) {
            all_key = all_key.with_property(PropertyDef::new(*name, *ty).not_null());
        }
    }

    let schema = odata_core::edm::EdmSchema::new(TEST_NS)
        .with_entity_type(all_prim)
        .with_entity_type(all_key)
        .with_container(
            EntityContainerDef::new("Container")
                .with_entity_set(EntitySetDef::new("ESAllPrim", format!("{TEST_NS}.ETAllPrim")))
                .with_entity_set(EntitySetDef::new("ESAllKey", format!("{TEST_NS}.ETAllKey"))),
        );
    Edm::new(&[schema]).unwrap()
}

pub const PRIMITIVES: &[(&str, &str)] = &[
    ("PropertyString", "Edm.String"),
    ("PropertyBoolean", "Edm.Boolean"),
    ("PropertyByte", "Edm.Byte"),
    ("PropertySByte", "Edm.SByte"),
    ("PropertyInt16", "Edm.Int16"),
    ("PropertyInt32", "Edm.Int32"),
    ("PropertyInt64", "Edm.Int64"),
    ("PropertySingle", "Edm.Single"),
    ("PropertyDouble", "Edm.Double"),
    ("PropertyDecimal", "Edm.Decimal"),
    ("PropertyBinary", "Edm.Binary"),
    ("PropertyDate", "Edm.Date"),
    ("PropertyDateTimeOffset", "Edm.DateTimeOffset"),
    ("PropertyDuration", "Edm.Duration"),
    ("PropertyGuid", "Edm.Guid"),
    ("PropertyTimeOfDay", "Edm.TimeOfDay"),
];

fn trippin(name: &str) -> String {
    format!("{TRIPPIN}.{name}")
}

/// TripPin sample service: people with contained trips and plan items.
pub fn trippin_edm() -> Edm {
    let person = StructuredTypeDef::new("Person")
        .with_key(&["UserName"])
        .with_property(PropertyDef::new("UserName", "Edm.String").not_null())
        .with_property(PropertyDef::new("FirstName", "Edm.String").not_null())
        .with_property(PropertyDef::new("LastName", "Edm.String"))
        .with_property(PropertyDef::new("Emails", "Edm.String").collection())
        .with_property(PropertyDef::new("AddressInfo", trippin("Location")).collection())
        .with_property(PropertyDef::new("Gender", trippin("PersonGender")))
        .with_property(PropertyDef::new("Concurrency", "Edm.Int64"))
        .with_navigation(
            NavigationPropertyDef::new("Friends", trippin("Person")).collection(),
        )
        .with_navigation(
            NavigationPropertyDef::new("Trips", trippin("Trip"))
                .collection()
                .contains_target(),
        )
        .with_navigation(NavigationPropertyDef::new("Photo", trippin("Photo")));

    let trip = StructuredTypeDef::new("Trip")
        .with_key(&["TripId"])
        .with_property(PropertyDef::new("TripId", "Edm.Int32").not_null())
        .with_property(PropertyDef::new("ShareId", "Edm.Guid"))
        .with_property(PropertyDef::new("Name", "Edm.String"))
        .with_property(PropertyDef::new("Budget", "Edm.Single"))
        .with_property(PropertyDef::new("StartsAt", "Edm.DateTimeOffset"))
        .with_property(PropertyDef::new("Tags", "Edm.String").collection())
        .with_navigation(
            NavigationPropertyDef::new("PlanItems", trippin("PlanItem"))
                .collection()
                .contains_target(),
        )
        .with_navigation(NavigationPropertyDef::new("Photos", trippin("Photo")).collection());

    let plan_item = StructuredTypeDef::new("PlanItem")
        .with_key(&["PlanItemId"])
        .with_property(PropertyDef::new("PlanItemId", "Edm.Int32").not_null())
        .with_property(PropertyDef::new("ConfirmationCode", "Edm.String"))
        .with_property(PropertyDef::new("Duration", "Edm.Duration"));

    let event = StructuredTypeDef::new("Event")
        .with_base_type(trippin("PlanItem"))
        .with_property(PropertyDef::new("Description", "Edm.String"))
        .with_property(PropertyDef::new("OccursAt", trippin("EventLocation")));

    let photo = StructuredTypeDef::new("Photo")
        .with_key(&["Id"])
        .with_property(PropertyDef::new("Id", "Edm.Int64").not_null())
        .with_property(PropertyDef::new("Name", "Edm.String"))
        .media_entity();

    let airline = StructuredTypeDef::new("Airline")
        .with_key(&["AirlineCode"])
        .with_property(PropertyDef::new("AirlineCode", "Edm.String").not_null())
        .with_property(PropertyDef::new("Name", "Edm.String"));

    let airport = StructuredTypeDef::new("Airport")
        .with_key(&["IcaoCode"])
        .with_property(PropertyDef::new("IcaoCode", "Edm.String").not_null())
        .with_property(PropertyDef::new("Name", "Edm.String"))
        .with_property(PropertyDef::new(
            "Position",
            "Edm.GeographyPoint",
        ));

    let city = StructuredTypeDef::new("City")
        .with_property(PropertyDef::new("Name", "Edm.String"))
        .with_property(PropertyDef::new("CountryRegion", "Edm.String"))
        .with_property(PropertyDef::new("Region", "Edm.String"));

    let location = StructuredTypeDef::new("Location")
        .with_property(PropertyDef::new("Address", "Edm.String"))
        .with_property(PropertyDef::new("City", trippin("City")));

    let event_location = StructuredTypeDef::new("EventLocation")
        .with_base_type(trippin("Location"))
        .with_property(PropertyDef::new("BuildingInfo", "Edm.String"));

    let gender = EnumTypeDef::new("PersonGender")
        .with_member("Male", Some(0))
        .with_member("Female", Some(1))
        .with_member("Unknown", Some(2));

    let schema = odata_core::edm::EdmSchema::new(TRIPPIN)
        .with_entity_type(person)
        .with_entity_type(trip)
        .with_entity_type(plan_item)
        .with_entity_type(event)
        .with_entity_type(photo)
        .with_entity_type(airline)
        .with_entity_type(airport)
        .with_complex_type(city)
        .with_complex_type(location)
        .with_complex_type(event_location)
        .with_enum_type(gender)
        .with_operation(
            OperationDef::function("GetFavoriteAirline")
                .bound()
                .with_parameter("person", trippin("Person"))
                .returns(trippin("Airline"), false),
        )
        .with_operation(
            OperationDef::function("GetFriends")
                .bound()
                .with_parameter("person", trippin("Person"))
                .returns(trippin("Person"), true)
                .with_entity_set_path("person/Friends"),
        )
        .with_operation(
            OperationDef::function("GetFriendsTrips")
                .bound()
                .with_parameter("person", trippin("Person"))
                .with_parameter("userName", "Edm.String")
                .returns(trippin("Trip"), true),
        )
        .with_operation(
            OperationDef::function("GetInvolvedPeople")
                .bound()
                .with_parameter("trip", trippin("Trip"))
                .returns(trippin("Person"), true),
        )
        .with_operation(
            OperationDef::function("GetPeopleCount")
                .bound()
                .with_collection_parameter("people", trippin("Person"))
                .returns("Edm.Int32", false),
        )
        .with_operation(
            OperationDef::action("ShareTrip")
                .bound()
                .with_parameter("person", trippin("Person"))
                .with_parameter("userName", "Edm.String")
                .with_parameter("tripId", "Edm.Int32"),
        )
        .with_operation(
            OperationDef::function("GetNearestAirport")
                .with_parameter("lat", "Edm.Double")
                .with_parameter("lon", "Edm.Double")
                .returns(trippin("Airport"), false),
        )
        .with_operation(
            OperationDef::function("GetTopPeople")
                .composable()
                .returns(trippin("Person"), true),
        )
        .with_operation(OperationDef::action("ResetDataSource"))
        .with_container(
            EntityContainerDef::new("Container")
                .with_entity_set(
                    EntitySetDef::new("People", trippin("Person"))
                        .with_binding("Friends", "People")
                        .with_binding("Photo", "Photos")
                        .with_binding("Trips/Photos", "Photos"),
                )
                .with_entity_set(EntitySetDef::new("Photos", trippin("Photo")))
                .with_entity_set(EntitySetDef::new("Airlines", trippin("Airline")))
                .with_entity_set(EntitySetDef::new("Airports", trippin("Airport")))
                .with_entity_set(EntitySetDef::new("Internal", trippin("Airline")).hidden())
                .with_singleton(
                    SingletonDef::new("Me", trippin("Person"))
                        .with_binding("Friends", "People")
                        .with_binding("Photo", "Photos"),
                )
                .with_operation_import(
                    OperationImportDef::function("GetNearestAirport", trippin("GetNearestAirport"))
                        .with_entity_set("Airports"),
                )
                .with_operation_import(
                    OperationImportDef::function("GetTopPeople", trippin("GetTopPeople"))
                        .with_entity_set("People"),
                )
                .with_operation_import(OperationImportDef::action(
                    "ResetDataSource",
                    trippin("ResetDataSource"),
                )),
        );
    Edm::new(&[schema]).unwrap()
}

pub fn not_null() -> Facets {
    Facets {
        nullable: Some(false),
        ..Facets::NONE
    }
}
