//! Mapping from OData errors to the OData error response (pure data)
//!
//! This provides the conversion from [`Error`] to the value written by
//! [`ODataSerializer::error`](crate::ODataSerializer::error). The status code
//! travels with it so the transport layer does not have to inspect the error.

use crate::{Error, ResourceKind};
use http::StatusCode;

/// One entry of the `details` array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub target: Option<String>,
}

/// Error payload of an OData response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ODataServerError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    /// Offending segment, query option or property.
    pub target: Option<String>,
    pub details: Vec<ErrorDetail>,
}

impl ODataServerError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            target: None,
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.details.push(detail);
        self
    }
}

impl From<Error> for ODataServerError {
    fn from(err: Error) -> Self {
        use Error::*;

        let message = err.to_string();
        match err {
            // Unknown names → 404
            ResourceNotFound { kind, name, .. } => {
                let code = match kind {
                    ResourceKind::Entity => "entity_not_found",
                    _ => "resource_not_found",
                };
                Self::new(StatusCode::NOT_FOUND, code, message).with_target(name)
            }

            NotImplemented(_) => Self::new(StatusCode::NOT_IMPLEMENTED, "not_implemented", message),

            // Server-side failures → 500
            InvalidModel(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "invalid_model", message),
            Provider(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "provider_error", message),
            Serialization(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", message)
            }

            // Request errors → 400
            UriParse { segment, .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_uri", message).with_target(segment)
            }
            InvalidKeyPredicate { segment, .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_key_predicate", message)
                    .with_target(segment)
            }
            InvalidKeyValue { property, .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_key_value", message)
                    .with_target(property)
            }
            InvalidQueryOption { option, .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_query_option", message)
                    .with_target(option)
            }
            Format { .. } => Self::new(StatusCode::BAD_REQUEST, "format_error", message),
            Parse { .. } => Self::new(StatusCode::BAD_REQUEST, "parse_error", message),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::UriParseReason;

    #[test]
    fn test_not_found_maps_to_404() {
        let err: ODataServerError = Error::not_found(ResourceKind::Navigation, "Nope").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "resource_not_found");
        assert_eq!(err.target.as_deref(), Some("Nope"));
    }

    #[test]
    fn test_uri_parse_maps_to_400() {
        let err: ODataServerError = Error::UriParse {
            index: 1,
            segment: "$count".to_owned(),
            reason: UriParseReason::CountNotAllowed,
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("$count requires a collection"));
    }

    #[test]
    fn test_server_side_errors() {
        let not_implemented: ODataServerError = Error::NotImplemented("xml".into()).into();
        assert_eq!(not_implemented.status, StatusCode::NOT_IMPLEMENTED);
        let provider: ODataServerError = Error::Provider("down".into()).into();
        assert_eq!(provider.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
