//! Request and response values exchanged with the transport layer.

use http::StatusCode;
use odata_core::edm::EdmType;
use odata_core::uri::UriResourcePath;
use odata_core::{Error, UriInfo, UriInfoKind, UriResource};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ODataRequest {
    /// Resource path relative to the service root.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: String,
    /// `Accept` header; `$format` takes precedence.
    pub accept: Option<String>,
}

impl ODataRequest {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
            accept: None,
        }
    }

    /// Split `People('a')?$select=FirstName` at the first `?`.
    #[must_use]
    pub fn from_target(target: &str) -> Self {
        match target.split_once('?') {
            Some((path, query)) => Self::new(path, query),
            None => Self::new(target, ""),
        }
    }

    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ODataResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ODataResponse {
    #[must_use]
    pub fn ok(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some(content_type.into()),
            body,
        }
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            content_type: None,
            body: Vec::new(),
        }
    }
}

/// Shape of the payload a request produces, decided from the parsed URI
/// before any data is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ODataResponseKind {
    ServiceDocument,
    Metadata,
    EntityCollection,
    Entity,
    /// Primitive, enum or complex property or operation result.
    Property { collection: bool },
    /// `$value` of a primitive or enum property.
    PrimitiveValue,
    /// `$value` of a media entity.
    MediaValue,
    Count,
    Reference,
    ReferenceCollection,
    /// Action without a return type.
    NoContent,
}

impl ODataResponseKind {
    /// # Errors
    /// `NotImplemented` for `$crossjoin` and `$all`.
    pub fn of(info: &UriInfo) -> Result<Self, Error> {
        match &info.kind {
            UriInfoKind::ServiceDocument => Ok(ODataResponseKind::ServiceDocument),
            UriInfoKind::Metadata => Ok(ODataResponseKind::Metadata),
            UriInfoKind::EntityId { .. } => Ok(ODataResponseKind::Entity),
            UriInfoKind::Resource(path) => Ok(Self::of_path(path)),
            UriInfoKind::Crossjoin(_) => Err(Error::NotImplemented("$crossjoin".to_owned())),
            UriInfoKind::All => Err(Error::NotImplemented("$all".to_owned())),
        }
    }

    #[must_use]
    pub fn of_path(path: &UriResourcePath) -> Self {
        let collection = path.is_collection();
        match (path.last(), path.target_type()) {
            (Some(UriResource::Count), _) => ODataResponseKind::Count,
            (Some(UriResource::Ref), _) if collection => ODataResponseKind::ReferenceCollection,
            (Some(UriResource::Ref), _) => ODataResponseKind::Reference,
            (Some(UriResource::Value), Some(EdmType::Entity(_))) => ODataResponseKind::MediaValue,
            (Some(UriResource::Value), _) => ODataResponseKind::PrimitiveValue,
            (_, None) => ODataResponseKind::NoContent,
            (_, Some(EdmType::Entity(_))) if collection => ODataResponseKind::EntityCollection,
            (_, Some(EdmType::Entity(_))) => ODataResponseKind::Entity,
            (_, Some(_)) => ODataResponseKind::Property { collection },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_target_split() {
        let request = ODataRequest::from_target("People?$top=2&$skip=1");
        assert_eq!(request.path, "People");
        assert_eq!(request.query, "$top=2&$skip=1");
        assert_eq!(ODataRequest::from_target("Me").query, "");
    }
}
