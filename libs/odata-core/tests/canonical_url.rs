#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Canonical entity URLs built from entity data and parsed back

mod common;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use common::{all_prim_edm, trippin_edm};
use odata_core::uri::{build_canonical_url, parse_canonical_url};
use odata_core::{Entity, Error, PrimitiveValue, UriParseReason};
use uuid::Uuid;

fn all_key_entity() -> Entity {
    Entity::new()
        .with_property("PropertyString", "First")
        .with_property("PropertyBoolean", true)
        .with_property("PropertyByte", 255_u8)
        .with_property("PropertySByte", 127_i8)
        .with_property("PropertyInt16", 32767_i16)
        .with_property("PropertyInt32", 2_147_483_647_i32)
        .with_property("PropertyInt64", 9_223_372_036_854_775_807_i64)
        .with_property("PropertyDecimal", BigDecimal::from(34))
        .with_property("PropertyDate", NaiveDate::from_ymd_opt(2012, 12, 3).unwrap())
        .with_property(
            "PropertyDateTimeOffset",
            Utc.with_ymd_and_hms(2012, 12, 3, 7, 16, 23).unwrap(),
        )
        .with_property("PropertyDuration", TimeDelta::seconds(6))
        .with_property(
            "PropertyGuid",
            Uuid::parse_str("01234567-89ab-cdef-0123-456789abcdef").unwrap(),
        )
        .with_property("PropertyTimeOfDay", NaiveTime::from_hms_opt(2, 48, 21).unwrap())
}

// =============================================================================
// Building
// =============================================================================

#[test]
fn test_single_key_has_no_name() {
    let edm = all_prim_edm();
    let set = edm.entity_set("ESAllPrim").unwrap();
    let entity = Entity::new()
        .with_property("PropertyInt16", 32767_i16)
        .with_property("PropertyString", "First Resource - positive values");
    assert_eq!(
        build_canonical_url(&edm, set, &entity).unwrap(),
        "ESAllPrim(32767)"
    );
}

#[test]
fn test_composite_key_in_declared_order() {
    let edm = all_prim_edm();
    let set = edm.entity_set("ESAllKey").unwrap();
    assert_eq!(
        build_canonical_url(&edm, set, &all_key_entity()).unwrap(),
        "ESAllKey(PropertyString='First',PropertyBoolean=true,PropertyByte=255,\
         PropertySByte=127,PropertyInt16=32767,PropertyInt32=2147483647,\
         PropertyInt64=9223372036854775807,PropertyDecimal=34,PropertyDate=2012-12-03,\
         PropertyDateTimeOffset=2012-12-03T07%3A16%3A23Z,PropertyDuration=duration'PT6S',\
         PropertyGuid=01234567-89ab-cdef-0123-456789abcdef,PropertyTimeOfDay=02%3A48%3A21)"
    );
}

#[test]
fn test_string_key_is_escaped() {
    let edm = trippin_edm();
    let set = edm.entity_set("People").unwrap();
    let entity = Entity::new().with_property("UserName", "o'neil smith");
    assert_eq!(
        build_canonical_url(&edm, set, &entity).unwrap(),
        "People('o''neil%20smith')"
    );
}

#[test]
fn test_wrong_key_kind_is_rejected() {
    let edm = all_prim_edm();
    let set = edm.entity_set("ESAllPrim").unwrap();
    let entity = Entity::new().with_property("PropertyInt16", "wrong");
    let err = build_canonical_url(&edm, set, &entity).unwrap_err();
    assert!(
        matches!(&err, Error::InvalidKeyValue { property, .. } if property == "PropertyInt16"),
        "{err}"
    );
}

#[test]
fn test_missing_and_null_keys_are_rejected() {
    let edm = all_prim_edm();
    let set = edm.entity_set("ESAllPrim").unwrap();
    let missing = Entity::new().with_property("PropertyString", "x");
    assert!(matches!(
        build_canonical_url(&edm, set, &missing),
        Err(Error::InvalidKeyValue { .. })
    ));

    let mut null = Entity::new();
    null.set_property("PropertyInt16", odata_core::Value::Null);
    assert!(matches!(
        build_canonical_url(&edm, set, &null),
        Err(Error::InvalidKeyValue { .. })
    ));
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_parse_absolute_and_relative() {
    let edm = all_prim_edm();
    for url in [
        "http://host/service/ESAllPrim(32767)",
        "ESAllPrim(32767)",
        "/ESAllPrim(32767)",
        "../ESAllPrim(32767)",
    ] {
        let reference = parse_canonical_url(&edm, "http://host/service/", url).unwrap();
        assert_eq!(reference.entity_set, "ESAllPrim");
        assert_eq!(reference.keys.len(), 1);
        assert_eq!(reference.keys[0].value, PrimitiveValue::Int16(32767));
    }
}

#[test]
fn test_built_url_parses_back_to_same_keys() {
    let edm = all_prim_edm();
    let set = edm.entity_set("ESAllKey").unwrap();
    let entity = all_key_entity();
    let url = build_canonical_url(&edm, set, &entity).unwrap();

    let reference = parse_canonical_url(&edm, "", &url).unwrap();
    assert_eq!(reference.entity_set, "ESAllKey");
    for key in &reference.keys {
        let expected = entity.property(&key.name).unwrap().value.as_primitive().unwrap();
        assert_eq!(&key.value, expected, "key {}", key.name);
    }
    assert_eq!(reference.to_path_string(), url);
}

#[test]
fn test_parse_rejects_non_entity_urls() {
    let edm = trippin_edm();
    for url in ["People", "People('a')/Friends", "Me"] {
        let err = parse_canonical_url(&edm, "", url).unwrap_err();
        assert!(
            matches!(
                err,
                Error::UriParse {
                    reason: UriParseReason::NotAnEntityId,
                    ..
                }
            ),
            "{url}: {err}"
        );
    }
}
