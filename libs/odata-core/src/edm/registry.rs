//! Process-wide model snapshot.
//!
//! Readers take an `Arc<Edm>` and keep it for the whole request; a reload
//! builds the new model first and then swaps it in atomically.

use super::{Edm, MetadataProvider};
use crate::Error;
use arc_swap::ArcSwap;
use std::sync::Arc;

pub struct EdmRegistry {
    // Lock-free snapshot for read-mostly access
    current: ArcSwap<Edm>,
}

impl EdmRegistry {
    #[must_use]
    pub fn new(edm: Edm) -> Self {
        Self {
            current: ArcSwap::from_pointee(edm),
        }
    }

    /// Build the initial model from `provider`.
    ///
    /// # Errors
    /// Returns the provider or model validation error.
    pub fn from_provider(provider: &dyn MetadataProvider) -> Result<Self, Error> {
        Ok(Self::new(Edm::from_provider(provider)?))
    }

    /// Current model; stays valid across later reloads.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Edm> {
        self.current.load_full()
    }

    /// Install `edm` and return the model it replaced.
    pub fn replace(&self, edm: Edm) -> Arc<Edm> {
        self.current.swap(Arc::new(edm))
    }

    /// Rebuild from `provider`; the current model stays in place on failure.
    ///
    /// # Errors
    /// Returns the provider or model validation error.
    pub fn reload(&self, provider: &dyn MetadataProvider) -> Result<Arc<Edm>, Error> {
        match Edm::from_provider(provider) {
            Ok(edm) => {
                let edm = Arc::new(edm);
                self.current.store(Arc::clone(&edm));
                tracing::info!(namespaces = ?edm.namespaces(), "EDM model reloaded");
                Ok(edm)
            }
            Err(err) => {
                tracing::warn!(error = %err, "EDM reload rejected; keeping current model");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for EdmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdmRegistry")
            .field("namespaces", &self.current.load().namespaces())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::edm::schema::{EdmSchema, PropertyDef, StructuredTypeDef};
    use crate::edm::{FullQualifiedName, StaticMetadataProvider};
    use tracing_test::traced_test;

    fn schema(namespace: &str) -> EdmSchema {
        EdmSchema::new(namespace).with_entity_type(
            StructuredTypeDef::new("Item")
                .with_key(&["Id"])
                .with_property(PropertyDef::new("Id", "Edm.Int32")),
        )
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let registry = EdmRegistry::new(Edm::new(&[schema("One")]).unwrap());
        let before = registry.snapshot();

        registry
            .reload(&StaticMetadataProvider::new(vec![schema("Two")]))
            .unwrap();

        assert!(before.find_type(&FullQualifiedName::new("One", "Item")).is_some());
        let after = registry.snapshot();
        assert!(after.find_type(&FullQualifiedName::new("Two", "Item")).is_some());
        assert!(after.find_type(&FullQualifiedName::new("One", "Item")).is_none());
    }

    #[test]
    #[traced_test]
    fn test_failed_reload_keeps_model() {
        let registry = EdmRegistry::new(Edm::new(&[schema("One")]).unwrap());
        let broken = EdmSchema::new("Bad").with_entity_type(StructuredTypeDef::new("NoKey"));

        assert!(registry.reload(&StaticMetadataProvider::new(vec![broken])).is_err());
        assert_eq!(registry.snapshot().namespaces(), ["One"]);
        assert!(logs_contain("EDM reload rejected"));
    }
}
