#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! TripPin model and an in-memory data provider

use odata_core::edm::schema::{
    EntityContainerDef, EntitySetDef, EnumTypeDef, NavigationPropertyDef, OperationDef,
    OperationImportDef, PropertyDef, SingletonDef, StructuredTypeDef,
};
use odata_core::edm::EdmSchema;
use odata_core::uri::KeyPredicate;
use odata_core::{
    Edm, Entity, EntityCollection, Error, LinkTarget, ResourceKind, UriResource, Value,
};
use odata_service::{DataProvider, DataRequest, ODataService, ODataServiceConfig};
use std::sync::Arc;
use std::sync::Mutex;

pub const TRIPPIN: &str = "Trippin";

fn trippin(name: &str) -> String {
    format!("{TRIPPIN}.{name}")
}

pub fn trippin_schema() -> EdmSchema {
    let person = StructuredTypeDef::new("Person")
        .with_key(&["UserName"])
        .with_property(PropertyDef::new("UserName", "Edm.String").not_null())
        .with_property(PropertyDef::new("FirstName", "Edm.String").not_null())
        .with_property(PropertyDef::new("LastName", "Edm.String"))
        .with_property(PropertyDef::new("Emails", "Edm.String").collection())
        .with_property(PropertyDef::new("Gender", trippin("PersonGender")))
        .with_property(PropertyDef::new("Concurrency", "Edm.Int64"))
        .with_navigation(NavigationPropertyDef::new("Friends", trippin("Person")).collection())
        .with_navigation(
            NavigationPropertyDef::new("Trips", trippin("Trip"))
                .collection()
                .contains_target(),
        )
        .with_navigation(NavigationPropertyDef::new("Photo", trippin("Photo")));

    let trip = StructuredTypeDef::new("Trip")
        .with_key(&["TripId"])
        .with_property(PropertyDef::new("TripId", "Edm.Int32").not_null())
        .with_property(PropertyDef::new("Name", "Edm.String"))
        .with_property(PropertyDef::new("Budget", "Edm.Single"));

    let photo = StructuredTypeDef::new("Photo")
        .with_key(&["Id"])
        .with_property(PropertyDef::new("Id", "Edm.Int64").not_null())
        .with_property(PropertyDef::new("Name", "Edm.String"))
        .media_entity();

    let airline = StructuredTypeDef::new("Airline")
        .with_key(&["AirlineCode"])
        .with_property(PropertyDef::new("AirlineCode", "Edm.String").not_null())
        .with_property(PropertyDef::new("Name", "Edm.String"));

    EdmSchema::new(TRIPPIN)
        .with_entity_type(person)
        .with_entity_type(trip)
        .with_entity_type(photo)
        .with_entity_type(airline)
        .with_enum_type(
            EnumTypeDef::new("PersonGender")
                .with_member("Male", Some(0))
                .with_member("Female", Some(1)),
        )
        .with_operation(
            OperationDef::function("GetFavoriteAirline")
                .bound()
                .with_parameter("person", trippin("Person"))
                .returns(trippin("Airline"), false),
        )
        .with_operation(
            OperationDef::action("ShareTrip")
                .bound()
                .with_parameter("person", trippin("Person"))
                .with_parameter("userName", "Edm.String")
                .with_parameter("tripId", "Edm.Int32"),
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
                        .with_binding("Photo", "Photos"),
                )
                .with_entity_set(EntitySetDef::new("Photos", trippin("Photo")))
                .with_entity_set(EntitySetDef::new("Airlines", trippin("Airline")))
                .with_singleton(
                    SingletonDef::new("Me", trippin("Person")).with_binding("Friends", "People"),
                )
                .with_operation_import(
                    OperationImportDef::function("GetTopPeople", trippin("GetTopPeople"))
                        .with_entity_set("People"),
                )
                .with_operation_import(OperationImportDef::action(
                    "ResetDataSource",
                    trippin("ResetDataSource"),
                )),
        )
}

pub fn trippin_edm() -> Edm {
    Edm::new(&[trippin_schema()]).unwrap()
}

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G'];

fn person(user: &str, first: &str, last: Option<&str>) -> Entity {
    Entity::new()
        .with_property("UserName", user)
        .with_property("FirstName", first)
        .with_property("LastName", last.map_or(Value::Null, Value::from))
}

/// Three people, two airlines and one photo.
pub struct TripPinStore {
    people: Vec<Entity>,
    photos: Vec<Entity>,
    airlines: Vec<Entity>,
    pub invoked: Mutex<Vec<String>>,
}

impl TripPinStore {
    pub fn new() -> Self {
        let photo = Entity::new()
            .with_property("Id", 1_i64)
            .with_property("Name", "My Photo")
            .with_media("image/png", PNG.to_vec());
        let russell = person("russellwhyte", "Russell", Some("Whyte"));
        let scott = person("scottketchum", "Scott", Some("Ketchum"));
        let ronald = person("ronaldmundy", "Ronald", None);

        let russell_full = russell
            .clone()
            .with_property(
                "Emails",
                Value::Collection(vec![
                    Value::from("russell@example.com"),
                    Value::from("russell@contoso.com"),
                ]),
            )
            .with_property("Gender", Value::Enum(0))
            .with_property("Concurrency", 635_000_000_000_000_000_i64)
            .with_links("Friends", vec![scott.clone(), ronald.clone()])
            .with_links(
                "Trips",
                vec![
                    Entity::new()
                        .with_property("TripId", 1003)
                        .with_property("Name", "Trip in US")
                        .with_property("Budget", 3000.0_f32),
                ],
            )
            .with_link("Photo", Some(photo.clone()));
        let scott_full = scott
            .with_links("Friends", vec![russell.clone()])
            .with_links("Trips", Vec::new())
            .with_link("Photo", None);

        Self {
            people: vec![russell_full, scott_full, ronald],
            photos: vec![photo],
            airlines: vec![
                Entity::new()
                    .with_property("AirlineCode", "AA")
                    .with_property("Name", "American Airlines"),
                Entity::new()
                    .with_property("AirlineCode", "FM")
                    .with_property("Name", "Shanghai Airline"),
            ],
            invoked: Mutex::new(Vec::new()),
        }
    }

    fn entity_set(&self, name: &str) -> Result<Vec<Entity>, Error> {
        match name {
            "People" => Ok(self.people.clone()),
            "Photos" => Ok(self.photos.clone()),
            "Airlines" => Ok(self.airlines.clone()),
            other => Err(Error::Provider(format!("no data for `{other}`"))),
        }
    }

    fn resolve(&self, request: &DataRequest<'_>) -> Result<Resolved, Error> {
        let mut current = Resolved::Nothing;
        for segment in request.path.segments() {
            current = match (segment, current) {
                (
                    UriResource::Count | UriResource::Value | UriResource::Ref | UriResource::TypeCast(_),
                    current,
                ) => current,
                (_, Resolved::One(None)) => {
                    return Err(Error::ResourceNotFound {
                        kind: ResourceKind::Entity,
                        name: request.path.to_path_string(),
                        index: None,
                    });
                }
                (UriResource::EntitySet { name, .. }, _) => Resolved::Many(self.entity_set(name)?),
                (UriResource::Singleton { .. }, _) => Resolved::One(self.people.first().cloned()),
                (UriResource::Key(keys), Resolved::Many(entities)) => {
                    Resolved::One(entities.into_iter().find(|e| has_keys(e, keys)))
                }
                (UriResource::Navigation { name, collection, .. }, Resolved::One(Some(entity))) => {
                    match entity.link(name).map(|link| &link.target) {
                        Some(LinkTarget::Collection(items)) => Resolved::Many(items.clone()),
                        Some(LinkTarget::Single(item)) => Resolved::One(item.as_deref().cloned()),
                        None if *collection => Resolved::Many(Vec::new()),
                        None => Resolved::One(None),
                    }
                }
                (UriResource::Property { name, .. }, Resolved::One(Some(entity))) => {
                    Resolved::Value(entity.property(name).map(|p| p.value.clone()))
                }
                (UriResource::Property { name, .. }, Resolved::Value(Some(Value::Complex(c)))) => {
                    Resolved::Value(c.property(name).map(|p| p.value.clone()))
                }
                (UriResource::OperationImport { name, .. }, _) if name == "GetTopPeople" => {
                    Resolved::Many(self.people.iter().take(2).cloned().collect())
                }
                (UriResource::Operation { name, .. }, Resolved::One(Some(_)))
                    if name.name() == "GetFavoriteAirline" =>
                {
                    Resolved::One(self.airlines.first().cloned())
                }
                (UriResource::Operation { .. } | UriResource::OperationImport { .. }, _) => {
                    Resolved::Nothing
                }
                (segment, _) => {
                    return Err(Error::Provider(format!("cannot resolve {segment:?}")));
                }
            };
        }
        Ok(current)
    }
}

enum Resolved {
    Nothing,
    Many(Vec<Entity>),
    One(Option<Entity>),
    Value(Option<Value>),
}

fn has_keys(entity: &Entity, keys: &[KeyPredicate]) -> bool {
    keys.iter().all(|key| {
        entity
            .property(&key.name)
            .is_some_and(|p| p.value == Value::Primitive(key.value.clone()))
    })
}

impl DataProvider for TripPinStore {
    fn read_entity_collection(&self, request: &DataRequest<'_>) -> Result<EntityCollection, Error> {
        let Resolved::Many(entities) = self.resolve(request)? else {
            return Err(Error::Provider("not a collection".to_owned()));
        };
        let total = entities.len();
        let skip = usize::try_from(request.query.skip.unwrap_or(0)).unwrap();
        let top = request
            .query
            .top
            .map_or(total, |top| usize::try_from(top).unwrap());
        let page: Vec<Entity> = entities.into_iter().skip(skip).take(top).collect();

        let mut collection = EntityCollection::new(page);
        collection.count = Some(u64::try_from(total).unwrap());
        if skip + top < total {
            collection.next_link = Some(format!("{}?$skip={}", request.path, skip + top));
        }
        Ok(collection)
    }

    fn read_entity(&self, request: &DataRequest<'_>) -> Result<Option<Entity>, Error> {
        match self.resolve(request)? {
            Resolved::One(entity) => Ok(entity),
            _ => Err(Error::Provider("not a single entity".to_owned())),
        }
    }

    fn read_property(&self, request: &DataRequest<'_>) -> Result<Option<Value>, Error> {
        match self.resolve(request)? {
            Resolved::Value(value) => Ok(value.filter(|v| !v.is_null())),
            _ => Err(Error::Provider("not a property".to_owned())),
        }
    }

    fn invoke_action(&self, request: &DataRequest<'_>) -> Result<(), Error> {
        self.invoked
            .lock()
            .unwrap()
            .push(request.path.to_path_string());
        Ok(())
    }
}

pub fn service_with(config: ODataServiceConfig) -> (ODataService, Arc<TripPinStore>) {
    let store = Arc::new(TripPinStore::new());
    let service = ODataService::new(config, trippin_edm(), store.clone());
    (service, store)
}

pub fn service() -> (ODataService, Arc<TripPinStore>) {
    service_with(ODataServiceConfig::default())
}
