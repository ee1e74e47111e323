use super::{ODataFormat, ODataSerializer, SerializerOptions};
use crate::data::{Delta, Entity, EntityCollection, Value};
use crate::edm::{EdmBindingTarget, EdmProperty};
use crate::problem_mapping::ODataServerError;
use crate::Error;

/// Placeholder for the Atom/XML format; every payload is `NotImplemented`.
#[derive(Clone, Copy, Debug, Default)]
pub struct XmlSerializer;

impl XmlSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn unsupported(payload: &str) -> Error {
    Error::NotImplemented(format!("XML {payload} serialization"))
}

impl ODataSerializer for XmlSerializer {
    fn format(&self) -> ODataFormat {
        ODataFormat::Xml
    }

    fn service_document(&self, _options: &SerializerOptions) -> Result<Vec<u8>, Error> {
        Err(unsupported("service document"))
    }

    fn entity(
        &self,
        _target: EdmBindingTarget<'_>,
        _entity: &Entity,
        _options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        Err(unsupported("entity"))
    }

    fn entity_collection(
        &self,
        _target: EdmBindingTarget<'_>,
        _entities: &EntityCollection,
        _options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        Err(unsupported("entity collection"))
    }

    fn entity_property(
        &self,
        _property: &EdmProperty,
        _value: &Value,
        _options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        Err(unsupported("property"))
    }

    fn reference(
        &self,
        _target: EdmBindingTarget<'_>,
        _entity: &Entity,
        _options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        Err(unsupported("reference"))
    }

    fn reference_collection(
        &self,
        _target: EdmBindingTarget<'_>,
        _entities: &EntityCollection,
        _options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        Err(unsupported("reference collection"))
    }

    fn delta(
        &self,
        _target: EdmBindingTarget<'_>,
        _delta: &Delta,
        _options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        Err(unsupported("delta"))
    }

    fn error(&self, _error: &ODataServerError) -> Result<Vec<u8>, Error> {
        Err(unsupported("error"))
    }
}
