#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end request handling over the TripPin sample data

mod common;

use common::{PNG, service, service_with, trippin_schema};
use http::StatusCode;
use odata_core::Error;
use odata_core::edm::schema::{EntityContainerDef, EntitySetDef, PropertyDef, StructuredTypeDef};
use odata_core::edm::{EdmSchema, MetadataProvider, StaticMetadataProvider};
use odata_core::{ODataFormat, ODataLimits};
use odata_service::{ODataRequest, ODataResponse, ODataService, ODataServiceConfig};
use serde_json::{Value as Json, json};
use tracing_test::traced_test;

fn get(service: &ODataService, target: &str) -> ODataResponse {
    service.handle(&ODataRequest::from_target(target))
}

fn body(response: &ODataResponse) -> Json {
    serde_json::from_slice(&response.body).unwrap()
}

fn text(response: &ODataResponse) -> &str {
    std::str::from_utf8(&response.body).unwrap()
}

fn keys(json: &Json) -> Vec<&str> {
    json.as_object().unwrap().keys().map(String::as_str).collect()
}

// =============================================================================
// Service document
// =============================================================================

#[test]
fn test_service_document() {
    let (service, _) = service();
    let response = get(&service, "");
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/json;odata.metadata=minimal")
    );
    let json = body(&response);
    assert_eq!(json["@odata.context"], "$metadata");
    let names: Vec<&str> = json["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["People", "Photos", "Airlines", "Me", "GetTopPeople"]);
}

#[test]
fn test_service_document_with_root() {
    let (service, _) = service_with(ODataServiceConfig {
        service_root: Some("http://host/service/".to_owned()),
        ..ODataServiceConfig::default()
    });
    let json = body(&get(&service, ""));
    assert_eq!(json["@odata.context"], "http://host/service/$metadata");
}

#[test]
fn test_metadata_document_not_implemented() {
    let (service, _) = service();
    let response = get(&service, "$metadata");
    assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body(&response)["error"]["code"], "not_implemented");
}

// =============================================================================
// Entity collections and entities
// =============================================================================

#[test]
fn test_collection_with_paging_and_count() {
    let (service, _) = service();
    let response = get(&service, "People?$top=2&$count=true");
    assert_eq!(response.status, StatusCode::OK);
    let json = body(&response);
    assert_eq!(
        keys(&json),
        ["@odata.context", "@odata.count", "value", "@odata.nextLink"]
    );
    assert_eq!(json["@odata.context"], "$metadata#People");
    assert_eq!(json["@odata.count"], 3);
    assert_eq!(json["@odata.nextLink"], "People?$skip=2");
    let users: Vec<&str> = json["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["UserName"].as_str().unwrap())
        .collect();
    assert_eq!(users, ["russellwhyte", "scottketchum"]);
}

#[test]
fn test_entity_advertises_bound_action() {
    let (service, _) = service();
    let json = body(&get(&service, "People('russellwhyte')"));
    assert_eq!(json["@odata.context"], "$metadata#People/$entity");
    assert_eq!(json["UserName"], "russellwhyte");
    assert_eq!(json["Gender"], "Male");
    assert_eq!(json["Concurrency"], 635_000_000_000_000_000_i64);
    assert_eq!(
        json["#Trippin.ShareTrip"],
        json!({
            "title": "ShareTrip",
            "target": "People('russellwhyte')/Trippin.ShareTrip"
        })
    );
    assert!(json.get("#Trippin.GetFavoriteAirline").is_none());
    assert!(json.get("Friends").is_none());
}

#[test]
fn test_bound_actions_can_be_disabled() {
    let (service, _) = service_with(ODataServiceConfig {
        advertise_actions: false,
        ..ODataServiceConfig::default()
    });
    let json = body(&get(&service, "People('russellwhyte')"));
    assert!(json.get("#Trippin.ShareTrip").is_none());
}

#[test]
fn test_select_and_expand() {
    let (service, _) = service();
    let json = body(&get(
        &service,
        "People('russellwhyte')?$select=FirstName&$expand=Friends($select=UserName)",
    ));
    assert_eq!(
        json["@odata.context"],
        "$metadata#People(FirstName,Friends(UserName))/$entity"
    );
    assert_eq!(json["FirstName"], "Russell");
    assert!(json.get("LastName").is_none());
    assert_eq!(
        json["Friends"],
        json!([{ "UserName": "scottketchum" }, { "UserName": "ronaldmundy" }])
    );
}

#[test]
fn test_singleton() {
    let (service, _) = service();
    let json = body(&get(&service, "Me"));
    assert_eq!(json["@odata.context"], "$metadata#Me");
    assert_eq!(json["UserName"], "russellwhyte");
    assert!(json.get("#Trippin.ShareTrip").is_none());
}

#[test]
fn test_contained_entity() {
    let (service, _) = service();
    let json = body(&get(&service, "People('russellwhyte')/Trips(1003)"));
    assert_eq!(
        json["@odata.context"],
        "$metadata#People('russellwhyte')/Trips/$entity"
    );
    assert_eq!(json["Name"], "Trip in US");
}

#[test]
fn test_entity_by_id() {
    let (service, _) = service();
    let json = body(&get(&service, "$entity?$id=People('scottketchum')"));
    assert_eq!(json["@odata.context"], "$metadata#People/$entity");
    assert_eq!(json["FirstName"], "Scott");
}

// =============================================================================
// Properties, raw values and counts
// =============================================================================

#[test]
fn test_property() {
    let (service, _) = service();
    let json = body(&get(&service, "People('russellwhyte')/FirstName"));
    assert_eq!(
        json,
        json!({
            "@odata.context": "$metadata#People('russellwhyte')/FirstName",
            "value": "Russell"
        })
    );

    let json = body(&get(&service, "People('russellwhyte')/Emails"));
    assert_eq!(
        json["value"],
        json!(["russell@example.com", "russell@contoso.com"])
    );
}

#[test]
fn test_null_property_has_no_content() {
    let (service, _) = service();
    let response = get(&service, "People('ronaldmundy')/LastName");
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.body.is_empty());
    let response = get(&service, "People('ronaldmundy')/LastName/$value");
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[test]
fn test_raw_values() {
    let (service, _) = service();
    let response = get(&service, "People('russellwhyte')/FirstName/$value");
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("text/plain"));
    assert_eq!(text(&response), "Russell");
    assert_eq!(
        text(&get(&service, "People('russellwhyte')/Gender/$value")),
        "Male"
    );
}

#[test]
fn test_counts() {
    let (service, _) = service();
    assert_eq!(text(&get(&service, "People/$count")), "3");
    assert_eq!(
        text(&get(&service, "People('russellwhyte')/Friends/$count")),
        "2"
    );
    assert_eq!(
        text(&get(&service, "People('russellwhyte')/Emails/$count")),
        "2"
    );
}

#[test]
fn test_media_value() {
    let (service, _) = service();
    let response = get(&service, "Photos(1)/$value");
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("image/png"));
    assert_eq!(response.body, PNG);
}

#[test]
fn test_references() {
    let (service, _) = service();
    let json = body(&get(&service, "People('russellwhyte')/Friends/$ref"));
    assert_eq!(json["@odata.context"], "$metadata#Collection($ref)");
    assert_eq!(
        json["value"],
        json!([
            { "@odata.id": "People('scottketchum')" },
            { "@odata.id": "People('ronaldmundy')" }
        ])
    );
}

// =============================================================================
// Operations
// =============================================================================

#[test]
fn test_action_import_invokes_provider() {
    let (service, store) = service();
    let response = get(&service, "ResetDataSource");
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(*store.invoked.lock().unwrap(), ["ResetDataSource"]);
}

#[test]
fn test_function_import() {
    let (service, _) = service();
    let json = body(&get(&service, "GetTopPeople()"));
    assert_eq!(json["@odata.context"], "$metadata#People");
    assert_eq!(json["value"].as_array().unwrap().len(), 2);
}

#[test]
fn test_bound_function() {
    let (service, _) = service();
    let json = body(&get(
        &service,
        "People('russellwhyte')/Trippin.GetFavoriteAirline()",
    ));
    assert_eq!(json["@odata.context"], "$metadata#Trippin.Airline");
    assert_eq!(json["AirlineCode"], "AA");
}

// =============================================================================
// Content negotiation
// =============================================================================

#[test]
fn test_accept_without_metadata() {
    let (service, _) = service();
    let request = ODataRequest::from_target("People('scottketchum')")
        .with_accept("application/json;odata.metadata=none");
    let response = service.handle(&request);
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/json;odata.metadata=none")
    );
    let json = body(&response);
    assert!(json.get("@odata.context").is_none());
    assert_eq!(json["FirstName"], "Scott");
}

#[test]
fn test_ieee754_compatible_from_accept() {
    let (service, _) = service();
    let request = ODataRequest::from_target("People('russellwhyte')")
        .with_accept("application/json;IEEE754Compatible=true");
    let response = service.handle(&request);
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/json;odata.metadata=minimal;IEEE754Compatible=true")
    );
    assert_eq!(body(&response)["Concurrency"], "635000000000000000");
}

#[test]
fn test_xml_format_falls_back_to_json_error() {
    let (service, _) = service();
    let response = get(&service, "People?$format=xml");
    assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/json;odata.metadata=minimal")
    );
    assert_eq!(body(&response)["error"]["code"], "not_implemented");
}

#[test]
fn test_unknown_format_rejected() {
    let (service, _) = service();
    let response = get(&service, "People?$format=csv");
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["error"]["code"], "invalid_query_option");
}

#[test]
fn test_default_format_from_config() {
    let (service, _) = service_with(ODataServiceConfig {
        default_format: ODataFormat::JsonNoMetadata,
        ..ODataServiceConfig::default()
    });
    let response = get(&service, "Me");
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/json;odata.metadata=none")
    );
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_missing_entity_is_not_found() {
    let (service, _) = service();
    let response = get(&service, "People('nobody')");
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = get(&service, "People('nobody')/FirstName");
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_unknown_segment_is_not_found() {
    let (service, _) = service();
    let response = get(&service, "Planets");
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(body(&response)["error"]["target"], "Planets");
}

#[test]
fn test_malformed_paths_are_bad_requests() {
    let (service, _) = service();
    for target in ["People('russellwhyte'", "People(1)", "People?$top=-1"] {
        let response = get(&service, target);
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{target}");
        assert!(body(&response)["error"]["message"].is_string(), "{target}");
    }
}

#[test]
fn test_crossjoin_not_implemented() {
    let (service, _) = service();
    let response = get(&service, "$crossjoin(People,Airlines)");
    assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);
}

#[test]
fn test_limits_from_config() {
    let (service, _) = service_with(ODataServiceConfig {
        limits: ODataLimits::default().with_max_select_items(1),
        ..ODataServiceConfig::default()
    });
    assert_eq!(get(&service, "People?$select=FirstName").status, StatusCode::OK);
    let response = get(&service, "People?$select=FirstName,LastName");
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["error"]["code"], "invalid_query_option");
}

// =============================================================================
// Model reload
// =============================================================================

struct Unavailable;

impl MetadataProvider for Unavailable {
    fn list_schemas(&self) -> Result<Vec<EdmSchema>, Error> {
        Err(Error::Provider("schema store unavailable".to_owned()))
    }
}

#[test]
#[traced_test]
fn test_reload_swaps_model() {
    let (service, _) = service();
    assert_eq!(get(&service, "Planets").status, StatusCode::NOT_FOUND);

    let planet = StructuredTypeDef::new("Planet")
        .with_key(&["Name"])
        .with_property(PropertyDef::new("Name", "Edm.String").not_null());
    let schema = EdmSchema::new("Space")
        .with_entity_type(planet)
        .with_container(
            EntityContainerDef::new("Container")
                .with_entity_set(EntitySetDef::new("Planets", "Space.Planet")),
        );
    let before = service.model();
    service
        .reload_metadata(&StaticMetadataProvider::new(vec![schema]))
        .unwrap();

    assert_eq!(before.namespaces(), ["Trippin"]);
    assert_eq!(service.model().namespaces(), ["Space"]);
    assert_eq!(get(&service, "People").status, StatusCode::NOT_FOUND);
    assert!(logs_contain("OData metadata reloaded"));
}

#[test]
#[traced_test]
fn test_failed_reload_keeps_model() {
    let (service, _) = service();
    let err = service.reload_metadata(&Unavailable).unwrap_err();
    assert!(err.to_string().contains("schema store unavailable"));
    assert_eq!(service.model().namespaces(), ["Trippin"]);
    assert_eq!(get(&service, "Me").status, StatusCode::OK);
    assert!(logs_contain("EDM reload rejected"));
}

#[test]
fn test_from_provider() {
    let provider = StaticMetadataProvider::new(vec![trippin_schema()]);
    let store = std::sync::Arc::new(common::TripPinStore::new());
    let service =
        ODataService::from_provider(ODataServiceConfig::default(), &provider, store).unwrap();
    assert_eq!(get(&service, "People/$count").status, StatusCode::OK);
    assert!(ODataService::from_provider(
        ODataServiceConfig::default(),
        &Unavailable,
        std::sync::Arc::new(common::TripPinStore::new()),
    )
    .is_err());
}
