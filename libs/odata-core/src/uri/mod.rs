//! Resource path grammar: parsing against the model, rendering, canonical
//! entity URLs and a client-side URI builder.

pub mod builder;
pub mod canonical;
pub mod encoding;
mod parser;
mod resource;

pub use builder::UriBuilder;
pub use canonical::{EntityReference, build_canonical_url, parse_canonical_url};
pub use parser::{parse_resource_path, parse_uri};
pub use resource::{KeyPredicate, OperationParameter, UriResource, UriResourcePath};

pub(crate) use resource::key_text;

use crate::edm::FullQualifiedName;
use crate::query::QueryOptions;
use std::fmt;

/// Why a path segment was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UriParseReason {
    EmptySegment,
    InvalidEncoding,
    TooManySegments,
    MalformedParentheses,
    MalformedKeyPredicate,
    KeyNotAllowed,
    /// Navigation or member access directly on a collection.
    MissingKeyPredicate,
    InvalidTypeCast,
    CountNotAllowed,
    RefNotAllowed,
    ValueNotAllowed,
    /// Path continues after `$count`, `$ref`, `$value` or a non-composable operation.
    TrailingSegment,
    /// Member access below a primitive or enum value.
    UnexpectedSegment,
    InvalidParameter,
    NotAnEntityId,
}

impl fmt::Display for UriParseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UriParseReason::EmptySegment => "empty segment",
            UriParseReason::InvalidEncoding => "invalid percent-encoding",
            UriParseReason::TooManySegments => "too many segments",
            UriParseReason::MalformedParentheses => "unbalanced parentheses or quotes",
            UriParseReason::MalformedKeyPredicate => "malformed key predicate",
            UriParseReason::KeyNotAllowed => "key predicate not allowed here",
            UriParseReason::MissingKeyPredicate => "a key predicate is required before this segment",
            UriParseReason::InvalidTypeCast => "type is not derived from the current type",
            UriParseReason::CountNotAllowed => "$count requires a collection",
            UriParseReason::RefNotAllowed => "$ref requires an entity",
            UriParseReason::ValueNotAllowed => "$value requires a primitive property or a media entity",
            UriParseReason::TrailingSegment => "no segment may follow here",
            UriParseReason::UnexpectedSegment => "segment cannot follow a primitive value",
            UriParseReason::InvalidParameter => "malformed operation parameters",
            UriParseReason::NotAnEntityId => "not a canonical entity URL",
        };
        f.write_str(text)
    }
}

/// What a request URL addresses.
#[derive(Clone, Debug, PartialEq)]
pub enum UriInfoKind {
    ServiceDocument,
    Metadata,
    Resource(UriResourcePath),
    /// `$entity?$id=...`, optionally followed by a type cast.
    EntityId { type_cast: Option<FullQualifiedName> },
    Crossjoin(Vec<String>),
    All,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UriInfo {
    pub kind: UriInfoKind,
    pub query: QueryOptions,
}

impl UriInfo {
    #[must_use]
    pub fn resource_path(&self) -> Option<&UriResourcePath> {
        match &self.kind {
            UriInfoKind::Resource(path) => Some(path),
            _ => None,
        }
    }
}
