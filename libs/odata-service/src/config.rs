//! Service configuration.
//!
//! Layers, lowest priority first: built-in defaults, an optional YAML file,
//! then `ODATA__`-prefixed environment variables (`__` separates nested keys,
//! e.g. `ODATA__LIMITS__MAX_EXPAND_DEPTH=3`).

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use odata_core::{ODataFormat, ODataLimits};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "ODATA__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ODataServiceConfig {
    /// Absolute root used for `@odata.context` and `@odata.id`; relative when unset.
    pub service_root: Option<String>,
    /// Format when neither `$format` nor `Accept` selects one.
    pub default_format: ODataFormat,
    /// Write Int64 and Decimal as JSON strings unless the client asks otherwise.
    pub ieee754_compatible: bool,
    /// Advertise bound actions on single-entity payloads.
    pub advertise_actions: bool,
    pub limits: ODataLimits,
}

impl Default for ODataServiceConfig {
    fn default() -> Self {
        Self {
            service_root: None,
            default_format: ODataFormat::Json,
            ieee754_compatible: false,
            advertise_actions: true,
            limits: ODataLimits::default(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid OData service configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Invalid(Box::new(err))
    }
}

impl ODataServiceConfig {
    /// Defaults, then `path` (when given), then the environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for unreadable YAML, unknown keys or
    /// values of the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract from a caller-assembled figment.
    ///
    /// # Errors
    /// See [`ODataServiceConfig::load`].
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        tracing::debug!(
            service_root = ?config.service_root,
            default_format = ?config.default_format,
            max_expand_depth = config.limits.max_expand_depth,
            "OData service configuration loaded"
        );
        Ok(config)
    }
}
