//! Data access seam.

use odata_core::uri::UriResourcePath;
use odata_core::{Edm, Entity, EntityCollection, Error, QueryOptions, Value};

/// Everything a provider needs to answer one read or invocation.
#[derive(Clone, Copy, Debug)]
pub struct DataRequest<'a> {
    pub edm: &'a Edm,
    pub path: &'a UriResourcePath,
    pub query: &'a QueryOptions,
}

/// Backing store of a service.
///
/// Paths arrive fully resolved against the model, so providers only walk the
/// segments. Actions that return a result are read through the `read_*`
/// method matching their return type, with the action as last segment.
pub trait DataProvider: Send + Sync {
    /// # Errors
    /// `Provider` when the store fails; `ResourceNotFound` for unknown parents.
    fn read_entity_collection(&self, request: &DataRequest<'_>) -> Result<EntityCollection, Error>;

    /// `None` when the addressed entity does not exist.
    ///
    /// # Errors
    /// See [`DataProvider::read_entity_collection`].
    fn read_entity(&self, request: &DataRequest<'_>) -> Result<Option<Entity>, Error>;

    /// Primitive, enum or complex value (or collection of them); `None` for null.
    ///
    /// # Errors
    /// See [`DataProvider::read_entity_collection`].
    fn read_property(&self, _request: &DataRequest<'_>) -> Result<Option<Value>, Error> {
        Err(Error::NotImplemented("property access".to_owned()))
    }

    /// Number of entities addressed by a collection path.
    ///
    /// # Errors
    /// See [`DataProvider::read_entity_collection`].
    fn count(&self, request: &DataRequest<'_>) -> Result<u64, Error> {
        Ok(self.read_entity_collection(request)?.total_count())
    }

    /// Run an action that has no return type.
    ///
    /// # Errors
    /// `NotImplemented` unless the provider supports actions.
    fn invoke_action(&self, _request: &DataRequest<'_>) -> Result<(), Error> {
        Err(Error::NotImplemented("action invocation".to_owned()))
    }
}
