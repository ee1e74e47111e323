//! Canonical entity URLs: `Set(key)` for single keys, `Set(k1=v1,k2=v2)` for
//! composite keys, keys in declared order.

use super::encoding::encode_path_segment;
use super::parser::parse_resource_path;
use super::resource::{KeyPredicate, UriResource, key_text};
use super::UriParseReason;
use crate::data::{Entity, Value};
use crate::edm::{Edm, EdmEntitySet, EdmStructuredType};
use crate::limits::ODataLimits;
use crate::types::literal::to_uri_literal;
use crate::Error;

/// Entity addressed by a canonical URL.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityReference {
    pub entity_set: String,
    pub keys: Vec<KeyPredicate>,
}

impl EntityReference {
    /// `Set(key)` relative to the service root.
    #[must_use]
    pub fn to_path_string(&self) -> String {
        format!("{}{}", encode_path_segment(&self.entity_set), key_text(&self.keys))
    }
}

/// Build `Set(key)` for `entity`, relative to the service root.
///
/// # Errors
/// `InvalidKeyValue` when a key property is missing, null or holds a value
/// of another primitive kind than declared.
pub fn build_canonical_url(
    edm: &Edm,
    entity_set: &EdmEntitySet,
    entity: &Entity,
) -> Result<String, Error> {
    let entity_type = edm.resolve_entity_type(&entity_set.entity_type)?;
    Ok(format!(
        "{}{}",
        encode_path_segment(&entity_set.name),
        key_predicate_text(entity_type, entity)?
    ))
}

/// The `(...)` part of a canonical URL.
///
/// # Errors
/// See [`build_canonical_url`].
pub fn key_predicate_text(entity_type: &EdmStructuredType, entity: &Entity) -> Result<String, Error> {
    let mut parts = Vec::with_capacity(entity_type.key().len());
    for property in entity_type.key_properties() {
        let invalid = |reason: String| Error::InvalidKeyValue {
            property: property.name.clone(),
            reason,
        };
        let value = match entity.property(&property.name).map(|p| &p.value) {
            None => return Err(invalid("missing".to_owned())),
            Some(Value::Null) => return Err(invalid("null".to_owned())),
            Some(Value::Primitive(value)) => value,
            Some(_) => return Err(invalid("not a primitive value".to_owned())),
        };
        let Some(kind) = property.primitive_kind() else {
            return Err(invalid("key property is not primitive".to_owned()));
        };
        if value.kind() != kind {
            return Err(invalid(format!("expected {kind}, got {}", value.kind())));
        }
        let literal = to_uri_literal(kind, value, &property.facets)
            .map_err(|err| invalid(err.to_string()))?;
        parts.push((property.name.as_str(), encode_path_segment(&literal).into_owned()));
    }

    let body = match parts.as_slice() {
        [(_, literal)] => literal.clone(),
        _ => parts
            .iter()
            .map(|(name, literal)| format!("{name}={literal}"))
            .collect::<Vec<_>>()
            .join(","),
    };
    Ok(format!("({body})"))
}

/// Inverse of [`build_canonical_url`]; accepts an absolute URL under
/// `service_root` or a relative one (leading `/`, `./` and `../` ignored).
///
/// # Errors
/// `UriParse` with `NotAnEntityId` when the URL is not `Set(key)`; key and
/// name errors as for path parsing.
pub fn parse_canonical_url(edm: &Edm, service_root: &str, url: &str) -> Result<EntityReference, Error> {
    let root = service_root.trim_end_matches('/');
    let mut relative = match url.strip_prefix(root) {
        Some(rest) if !root.is_empty() => rest,
        _ => url,
    };
    loop {
        let stripped = relative
            .strip_prefix('/')
            .or_else(|| relative.strip_prefix("./"))
            .or_else(|| relative.strip_prefix("../"));
        match stripped {
            Some(rest) => relative = rest,
            None => break,
        }
    }

    let path = parse_resource_path(edm, relative, &ODataLimits::default())?;
    match path.segments() {
        [UriResource::EntitySet { name, .. }, UriResource::Key(keys)] => Ok(EntityReference {
            entity_set: name.clone(),
            keys: keys.clone(),
        }),
        _ => Err(Error::UriParse {
            index: 0,
            segment: relative.to_owned(),
            reason: UriParseReason::NotAnEntityId,
        }),
    }
}
