//! Entity Data Model: schema definitions, the resolved model and its registry.

mod fqn;
mod model;
mod operation_key;
mod provider;
mod registry;
pub mod schema;

pub use fqn::FullQualifiedName;
pub use model::{
    Edm, EdmBindingTarget, EdmEntityContainer, EdmEntitySet, EdmEnumMember, EdmEnumType,
    EdmNavigationProperty, EdmOperation, EdmOperationImport, EdmParameter, EdmProperty,
    EdmReturnType, EdmSingleton, EdmStructuredType, EdmType, StructuredKind,
};
pub use operation_key::OperationKey;
pub use provider::{MetadataProvider, StaticMetadataProvider};
pub use registry::EdmRegistry;
pub use schema::{EdmSchema, NavigationBinding, OnDelete, OperationKind, ReferentialConstraint};
