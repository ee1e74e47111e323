//! Schema definitions as delivered by a metadata provider.
//!
//! These are unresolved descriptions: type references are qualified names
//! (possibly alias-qualified) that [`Edm`](super::Edm) resolves and validates.

use crate::types::Facets;

#[derive(Clone, Debug, Default)]
pub struct EdmSchema {
    pub namespace: String,
    pub alias: Option<String>,
    pub entity_types: Vec<StructuredTypeDef>,
    pub complex_types: Vec<StructuredTypeDef>,
    pub enum_types: Vec<EnumTypeDef>,
    pub operations: Vec<OperationDef>,
    pub container: Option<EntityContainerDef>,
}

impl EdmSchema {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn with_entity_type(mut self, def: StructuredTypeDef) -> Self {
        self.entity_types.push(def);
        self
    }

    #[must_use]
    pub fn with_complex_type(mut self, def: StructuredTypeDef) -> Self {
        self.complex_types.push(def);
        self
    }

    #[must_use]
    pub fn with_enum_type(mut self, def: EnumTypeDef) -> Self {
        self.enum_types.push(def);
        self
    }

    #[must_use]
    pub fn with_operation(mut self, def: OperationDef) -> Self {
        self.operations.push(def);
        self
    }

    #[must_use]
    pub fn with_container(mut self, def: EntityContainerDef) -> Self {
        self.container = Some(def);
        self
    }
}

/// Entity or complex type definition.
#[derive(Clone, Debug, Default)]
pub struct StructuredTypeDef {
    pub name: String,
    pub base_type: Option<String>,
    pub is_abstract: bool,
    pub is_open: bool,
    pub has_stream: bool,
    pub key: Vec<String>,
    pub properties: Vec<PropertyDef>,
    pub navigation_properties: Vec<NavigationPropertyDef>,
}

impl StructuredTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_type(mut self, base: impl Into<String>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    #[must_use]
    pub fn with_key<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.key = names.iter().map(|n| n.as_ref().to_owned()).collect();
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn with_navigation(mut self, navigation: NavigationPropertyDef) -> Self {
        self.navigation_properties.push(navigation);
        self
    }

    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    #[must_use]
    pub fn open_type(mut self) -> Self {
        self.is_open = true;
        self
    }

    #[must_use]
    pub fn media_entity(mut self) -> Self {
        self.has_stream = true;
        self
    }
}

#[derive(Clone, Debug)]
pub struct PropertyDef {
    pub name: String,
    /// Qualified type name, e.g. `Edm.String` or `Ns.Address`.
    pub type_name: String,
    pub collection: bool,
    pub facets: Facets,
    pub default_value: Option<String>,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            collection: false,
            facets: Facets::NONE,
            default_value: None,
        }
    }

    #[must_use]
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    #[must_use]
    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.facets.nullable = Some(false);
        self
    }

    #[must_use]
    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    None,
    SetNull,
    SetDefault,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferentialConstraint {
    pub property: String,
    pub referenced_property: String,
}

#[derive(Clone, Debug)]
pub struct NavigationPropertyDef {
    pub name: String,
    pub target: String,
    pub collection: bool,
    pub nullable: Option<bool>,
    pub partner: Option<String>,
    pub contains_target: bool,
    pub referential_constraints: Vec<ReferentialConstraint>,
    pub on_delete: Option<OnDelete>,
}

impl NavigationPropertyDef {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            collection: false,
            nullable: None,
            partner: None,
            contains_target: false,
            referential_constraints: Vec::new(),
            on_delete: None,
        }
    }

    #[must_use]
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    #[must_use]
    pub fn with_partner(mut self, partner: impl Into<String>) -> Self {
        self.partner = Some(partner.into());
        self
    }

    #[must_use]
    pub fn contains_target(mut self) -> Self {
        self.contains_target = true;
        self
    }

    #[must_use]
    pub fn with_constraint(
        mut self,
        property: impl Into<String>,
        referenced_property: impl Into<String>,
    ) -> Self {
        self.referential_constraints.push(ReferentialConstraint {
            property: property.into(),
            referenced_property: referenced_property.into(),
        });
        self
    }

    #[must_use]
    pub fn with_on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = Some(action);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct EnumTypeDef {
    pub name: String,
    /// Defaults to `Edm.Int32`.
    pub underlying_type: Option<String>,
    pub is_flags: bool,
    pub members: Vec<EnumMemberDef>,
}

#[derive(Clone, Debug)]
pub struct EnumMemberDef {
    pub name: String,
    /// Implicit values count up from 0 (non-flags only).
    pub value: Option<i64>,
}

impl EnumTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn flags(mut self) -> Self {
        self.is_flags = true;
        self
    }

    #[must_use]
    pub fn with_underlying_type(mut self, type_name: impl Into<String>) -> Self {
        self.underlying_type = Some(type_name.into());
        self
    }

    #[must_use]
    pub fn with_member(mut self, name: impl Into<String>, value: Option<i64>) -> Self {
        self.members.push(EnumMemberDef {
            name: name.into(),
            value,
        });
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Action,
    Function,
}

#[derive(Clone, Debug)]
pub struct ParameterDef {
    pub name: String,
    pub type_name: String,
    pub collection: bool,
    pub facets: Facets,
}

#[derive(Clone, Debug)]
pub struct ReturnTypeDef {
    pub type_name: String,
    pub collection: bool,
    pub nullable: bool,
}

#[derive(Clone, Debug)]
pub struct OperationDef {
    pub name: String,
    pub kind: OperationKind,
    pub is_bound: bool,
    pub is_composable: bool,
    /// For bound operations the first parameter is the binding parameter.
    pub parameters: Vec<ParameterDef>,
    pub return_type: Option<ReturnTypeDef>,
    pub entity_set_path: Option<String>,
}

impl OperationDef {
    fn new(name: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_bound: false,
            is_composable: false,
            parameters: Vec::new(),
            return_type: None,
            entity_set_path: None,
        }
    }

    pub fn action(name: impl Into<String>) -> Self {
        Self::new(name, OperationKind::Action)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::new(name, OperationKind::Function)
    }

    /// Mark as bound; the binding parameter must be added first.
    #[must_use]
    pub fn bound(mut self) -> Self {
        self.is_bound = true;
        self
    }

    #[must_use]
    pub fn composable(mut self) -> Self {
        self.is_composable = true;
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            type_name: type_name.into(),
            collection: false,
            facets: Facets::NONE,
        });
        self
    }

    #[must_use]
    pub fn with_collection_parameter(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            type_name: type_name.into(),
            collection: true,
            facets: Facets::NONE,
        });
        self
    }

    #[must_use]
    pub fn returns(mut self, type_name: impl Into<String>, collection: bool) -> Self {
        self.return_type = Some(ReturnTypeDef {
            type_name: type_name.into(),
            collection,
            nullable: true,
        });
        self
    }

    #[must_use]
    pub fn with_entity_set_path(mut self, path: impl Into<String>) -> Self {
        self.entity_set_path = Some(path.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationBinding {
    /// Navigation path relative to the bound entity set, e.g. `Trips` or `Ns.Sub/Nav`.
    pub path: String,
    /// Target entity set or singleton name.
    pub target: String,
}

#[derive(Clone, Debug)]
pub struct EntitySetDef {
    pub name: String,
    pub entity_type: String,
    pub navigation_bindings: Vec<NavigationBinding>,
    pub include_in_service_document: bool,
}

impl EntitySetDef {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            navigation_bindings: Vec::new(),
            include_in_service_document: true,
        }
    }

    #[must_use]
    pub fn with_binding(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.navigation_bindings.push(NavigationBinding {
            path: path.into(),
            target: target.into(),
        });
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.include_in_service_document = false;
        self
    }
}

#[derive(Clone, Debug)]
pub struct SingletonDef {
    pub name: String,
    pub entity_type: String,
    pub navigation_bindings: Vec<NavigationBinding>,
}

impl SingletonDef {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            navigation_bindings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_binding(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.navigation_bindings.push(NavigationBinding {
            path: path.into(),
            target: target.into(),
        });
        self
    }
}

#[derive(Clone, Debug)]
pub struct OperationImportDef {
    pub name: String,
    pub kind: OperationKind,
    /// Qualified name of the unbound operation.
    pub operation: String,
    pub entity_set: Option<String>,
    pub include_in_service_document: bool,
}

impl OperationImportDef {
    pub fn function(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Function,
            operation: operation.into(),
            entity_set: None,
            include_in_service_document: true,
        }
    }

    pub fn action(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Action,
            operation: operation.into(),
            entity_set: None,
            include_in_service_document: false,
        }
    }

    #[must_use]
    pub fn with_entity_set(mut self, entity_set: impl Into<String>) -> Self {
        self.entity_set = Some(entity_set.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct EntityContainerDef {
    pub name: String,
    pub entity_sets: Vec<EntitySetDef>,
    pub singletons: Vec<SingletonDef>,
    pub operation_imports: Vec<OperationImportDef>,
}

impl EntityContainerDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_entity_set(mut self, def: EntitySetDef) -> Self {
        self.entity_sets.push(def);
        self
    }

    #[must_use]
    pub fn with_singleton(mut self, def: SingletonDef) -> Self {
        self.singletons.push(def);
        self
    }

    #[must_use]
    pub fn with_operation_import(mut self, def: OperationImportDef) -> Self {
        self.operation_imports.push(def);
        self
    }
}
