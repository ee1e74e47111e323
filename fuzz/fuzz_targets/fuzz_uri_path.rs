#![no_main]

use libfuzzer_sys::fuzz_target;
use odata_core::edm::schema::{
    EntityContainerDef, EntitySetDef, NavigationPropertyDef, OperationDef, OperationImportDef,
    PropertyDef, SingletonDef, StructuredTypeDef,
};
use odata_core::edm::EdmSchema;
use odata_core::uri::parse_uri;
use odata_core::{Edm, ODataLimits};
use std::sync::LazyLock;

static EDM: LazyLock<Option<Edm>> = LazyLock::new(|| {
    let person = StructuredTypeDef::new("Person")
        .with_key(&["UserName"])
        .with_property(PropertyDef::new("UserName", "Edm.String").not_null())
        .with_property(PropertyDef::new("Age", "Edm.Int32"))
        .with_property(PropertyDef::new("Emails", "Edm.String").collection())
        .with_navigation(NavigationPropertyDef::new("Friends", "Fz.Person").collection())
        .with_navigation(
            NavigationPropertyDef::new("Trips", "Fz.Trip")
                .collection()
                .contains_target(),
        );
    let trip = StructuredTypeDef::new("Trip")
        .with_key(&["TripId", "Day"])
        .with_property(PropertyDef::new("TripId", "Edm.Int64").not_null())
        .with_property(PropertyDef::new("Day", "Edm.Date").not_null())
        .with_property(PropertyDef::new("Budget", "Edm.Decimal"));
    let schema = EdmSchema::new("Fz")
        .with_entity_type(person)
        .with_entity_type(trip)
        .with_operation(
            OperationDef::function("Nearest")
                .with_parameter("lat", "Edm.Double")
                .returns("Fz.Person", true),
        )
        .with_container(
            EntityContainerDef::new("Container")
                .with_entity_set(
                    EntitySetDef::new("People", "Fz.Person").with_binding("Friends", "People"),
                )
                .with_singleton(SingletonDef::new("Me", "Fz.Person"))
                .with_operation_import(
                    OperationImportDef::function("Nearest", "Fz.Nearest").with_entity_set("People"),
                ),
        );
    Edm::new(&[schema]).ok()
});

fuzz_target!(|data: &[u8]| {
    if data.len() > 2048 {
        return;
    }
    let Some(edm) = EDM.as_ref() else {
        return;
    };
    if let Ok(s) = std::str::from_utf8(data) {
        let (path, query) = s.split_once('?').unwrap_or((s, ""));
        if let Ok(info) = parse_uri(edm, path, query, &ODataLimits::default())
            && let Some(resource) = info.resource_path()
        {
            // Canonical form is a fixed point.
            let canonical = resource.to_path_string();
            let reparsed = parse_uri(edm, &canonical, "", &ODataLimits::default())
                .expect("canonical path parses");
            assert_eq!(
                reparsed.resource_path().map(|p| p.to_path_string()).as_deref(),
                Some(canonical.as_str())
            );
        }
    }
});
