#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! OData structural core.
//!
//! Translates between an Entity Data Model and the wire syntax of an OData
//! service: primitive literal codecs, resource paths, query options, canonical
//! URLs and context URLs, plus the payload serializers built on top of them.

pub mod context_url;
pub mod data;
pub mod edm;
pub mod limits;
pub mod problem_mapping;
pub mod query;
pub mod serializer;
pub mod types;
pub mod uri;

pub use context_url::{ContextUrl, ContextUrlParts, ContextUrlSuffix};
pub use data::{
    ComplexValue, DeletedEntity, Delta, Entity, EntityCollection, EntityLink, LinkTarget,
    NavigationLink, Property, RemovedReason, Value,
};
pub use edm::{Edm, EdmRegistry, FullQualifiedName};
pub use limits::ODataLimits;
pub use problem_mapping::{ErrorDetail, ODataServerError};
pub use query::{ExpandItem, ExpandOption, Levels, QueryOptions, SelectOption};
pub use serializer::{
    BoundProcedure, ODataFormat, ODataSerializer, SerializerOptions, SerializerOptionsParts,
    create_serializer,
};
pub use types::{Facets, PrimitiveTypeKind, PrimitiveValue};
pub use uri::{UriInfo, UriInfoKind, UriParseReason, UriResource, UriResourcePath};

use std::fmt;

/// Schema element kinds used when a name cannot be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    EntitySet,
    Singleton,
    /// First path segment: entity set, singleton or operation import.
    ContainerChild,
    Navigation,
    Property,
    Type,
    Operation,
    OperationImport,
    Entity,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResourceKind::EntitySet => "entity set",
            ResourceKind::Singleton => "singleton",
            ResourceKind::ContainerChild => "entity set, singleton or operation import",
            ResourceKind::Navigation => "navigation property",
            ResourceKind::Property => "property",
            ResourceKind::Type => "type",
            ResourceKind::Operation => "operation",
            ResourceKind::OperationImport => "operation import",
            ResourceKind::Entity => "entity",
        };
        f.write_str(text)
    }
}

/// Unified error type for every stage of the OData core.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Resource path parsing
    #[error("invalid URI segment #{index} `{segment}`: {reason}")]
    UriParse {
        index: usize,
        segment: String,
        reason: UriParseReason,
    },

    #[error("invalid key predicate in segment #{index} `{segment}`: {reason}")]
    InvalidKeyPredicate {
        index: usize,
        segment: String,
        reason: String,
    },

    #[error("{kind} `{name}` not found")]
    ResourceNotFound {
        kind: ResourceKind,
        name: String,
        index: Option<usize>,
    },

    // Literal codecs
    #[error("cannot format value as {kind}: {reason}")]
    Format { kind: String, reason: String },

    #[error("cannot parse `{text}` as {kind}: {reason}")]
    Parse {
        kind: String,
        text: String,
        reason: String,
    },

    #[error("invalid value for key property `{property}`: {reason}")]
    InvalidKeyValue { property: String, reason: String },

    // Query options
    #[error("invalid {option}: {reason}")]
    InvalidQueryOption { option: String, reason: String },

    #[error("not implemented: {0}")]
    NotImplemented(String),

    // Model construction
    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("metadata provider failed: {0}")]
    Provider(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Error::ResourceNotFound {
            kind,
            name: name.into(),
            index: None,
        }
    }

    pub(crate) fn format(kind: impl fmt::Display, reason: impl Into<String>) -> Self {
        Error::Format {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(kind: impl fmt::Display, text: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            kind: kind.to_string(),
            text: text.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn query(option: &str, reason: impl Into<String>) -> Self {
        Error::InvalidQueryOption {
            option: option.to_owned(),
            reason: reason.into(),
        }
    }

    /// Attach the path segment index to a `ResourceNotFound`; other variants pass through.
    #[must_use]
    pub(crate) fn at_segment(self, at: usize) -> Self {
        match self {
            Error::ResourceNotFound { kind, name, .. } => Error::ResourceNotFound {
                kind,
                name,
                index: Some(at),
            },
            other => other,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. })
    }

    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Error::NotImplemented(_))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_segment() {
        let err = Error::UriParse {
            index: 2,
            segment: "Orders(".to_owned(),
            reason: UriParseReason::MalformedKeyPredicate,
        };
        assert_eq!(
            err.to_string(),
            "invalid URI segment #2 `Orders(`: malformed key predicate"
        );
    }

    #[test]
    fn test_at_segment_only_touches_not_found() {
        let err = Error::not_found(ResourceKind::Navigation, "Nope").at_segment(3);
        assert!(matches!(
            err,
            Error::ResourceNotFound {
                index: Some(3),
                ..
            }
        ));
        let other = Error::NotImplemented("xml".into()).at_segment(1);
        assert!(other.is_not_implemented());
    }
}
