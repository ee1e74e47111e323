use super::schema::EdmSchema;
use crate::Error;

/// Source of schema definitions (CSDL reader, code, remote registry, ...).
pub trait MetadataProvider: Send + Sync {
    /// Every schema of the service.
    ///
    /// # Errors
    /// Returns `Error::Provider` if the source cannot be read.
    fn list_schemas(&self) -> Result<Vec<EdmSchema>, Error>;
}

/// Provider over schemas assembled in code.
#[derive(Clone, Debug, Default)]
pub struct StaticMetadataProvider {
    schemas: Vec<EdmSchema>,
}

impl StaticMetadataProvider {
    #[must_use]
    pub fn new(schemas: Vec<EdmSchema>) -> Self {
        Self { schemas }
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn list_schemas(&self) -> Result<Vec<EdmSchema>, Error> {
        Ok(self.schemas.clone())
    }
}
