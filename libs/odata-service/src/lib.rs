#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! OData service facade.
//!
//! Ties the structural core to a running service: configuration, the
//! swappable model snapshot, a [`DataProvider`] for the data and the dispatch
//! from a parsed request URI to the matching serializer call.
//!
//! ```ignore
//! let config = ODataServiceConfig::load(Some(Path::new("odata.yaml")))?;
//! let service = ODataService::from_provider(config, &metadata, Arc::new(store))?;
//! let response = service.handle(&ODataRequest::from_target("People('russellwhyte')?$select=FirstName"));
//! ```

pub mod config;
mod error;
mod exchange;
mod provider;
mod service;

pub use config::{ConfigError, ODataServiceConfig};
pub use error::ServiceError;
pub use exchange::{ODataRequest, ODataResponse, ODataResponseKind};
pub use provider::{DataProvider, DataRequest};
pub use service::ODataService;
