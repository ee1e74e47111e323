use crate::config::ConfigError;

/// Failures while assembling or reloading a service.
///
/// Request-time failures never surface here; they become OData error
/// responses.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("metadata model rejected: {0}")]
    Model(#[from] odata_core::Error),
}
