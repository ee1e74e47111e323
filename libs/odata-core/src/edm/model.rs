//! Resolved, validated and immutable Entity Data Model.

use super::operation_key::OperationKey;
use super::provider::MetadataProvider;
use super::schema::{
    EdmSchema, EntityContainerDef, EnumTypeDef, NavigationBinding, OnDelete, OperationDef,
    OperationKind, ReferentialConstraint, StructuredTypeDef,
};
use super::FullQualifiedName;
use crate::types::{Facets, PrimitiveTypeKind, literal};
use crate::{Error, ResourceKind};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Resolved type of a property, parameter or return value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdmType {
    Primitive(PrimitiveTypeKind),
    Enum(FullQualifiedName),
    Complex(FullQualifiedName),
    Entity(FullQualifiedName),
}

impl EdmType {
    /// Name of the entity or complex type, if structured.
    #[must_use]
    pub fn structured_name(&self) -> Option<&FullQualifiedName> {
        match self {
            EdmType::Complex(fqn) | EdmType::Entity(fqn) => Some(fqn),
            EdmType::Primitive(_) | EdmType::Enum(_) => None,
        }
    }

    #[must_use]
    pub fn is_entity(&self) -> bool {
        matches!(self, EdmType::Entity(_))
    }
}

impl fmt::Display for EdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdmType::Primitive(kind) => kind.fmt(f),
            EdmType::Enum(fqn) | EdmType::Complex(fqn) | EdmType::Entity(fqn) => fqn.fmt(f),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdmProperty {
    pub name: String,
    pub ty: EdmType,
    pub collection: bool,
    pub facets: Facets,
    pub default_value: Option<String>,
}

impl EdmProperty {
    /// `Edm.String` or `Collection(Edm.String)`.
    #[must_use]
    pub fn type_name(&self) -> String {
        if self.collection {
            format!("Collection({})", self.ty)
        } else {
            self.ty.to_string()
        }
    }

    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveTypeKind> {
        match self.ty {
            EdmType::Primitive(kind) => Some(kind),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdmNavigationProperty {
    pub name: String,
    pub target: FullQualifiedName,
    pub collection: bool,
    pub nullable: bool,
    pub partner: Option<String>,
    pub contains_target: bool,
    pub referential_constraints: Vec<ReferentialConstraint>,
    pub on_delete: Option<OnDelete>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructuredKind {
    Entity,
    Complex,
}

/// Entity or complex type with its inherited members flattened in.
///
/// Properties and navigation properties list the base type's members first,
/// in declaration order.
#[derive(Clone, Debug)]
pub struct EdmStructuredType {
    fqn: FullQualifiedName,
    kind: StructuredKind,
    base_type: Option<FullQualifiedName>,
    is_abstract: bool,
    is_open: bool,
    has_stream: bool,
    key: Vec<String>,
    properties: Vec<EdmProperty>,
    navigation_properties: Vec<EdmNavigationProperty>,
}

impl EdmStructuredType {
    #[must_use]
    pub fn fqn(&self) -> &FullQualifiedName {
        &self.fqn
    }

    #[must_use]
    pub fn kind(&self) -> StructuredKind {
        self.kind
    }

    #[must_use]
    pub fn is_entity(&self) -> bool {
        self.kind == StructuredKind::Entity
    }

    #[must_use]
    pub fn base_type(&self) -> Option<&FullQualifiedName> {
        self.base_type.as_ref()
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub fn has_stream(&self) -> bool {
        self.has_stream
    }

    /// Key property names in canonical order.
    #[must_use]
    pub fn key(&self) -> &[String] {
        &self.key
    }

    #[must_use]
    pub fn properties(&self) -> &[EdmProperty] {
        &self.properties
    }

    #[must_use]
    pub fn navigation_properties(&self) -> &[EdmNavigationProperty] {
        &self.navigation_properties
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&EdmProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn navigation_property(&self, name: &str) -> Option<&EdmNavigationProperty> {
        self.navigation_properties.iter().find(|n| n.name == name)
    }

    /// Key properties in key order.
    pub fn key_properties(&self) -> impl Iterator<Item = &EdmProperty> {
        self.key.iter().filter_map(|name| self.property(name))
    }

    #[must_use]
    pub fn as_edm_type(&self) -> EdmType {
        match self.kind {
            StructuredKind::Entity => EdmType::Entity(self.fqn.clone()),
            StructuredKind::Complex => EdmType::Complex(self.fqn.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdmEnumMember {
    pub name: String,
    pub value: i64,
}

#[derive(Clone, Debug)]
pub struct EdmEnumType {
    fqn: FullQualifiedName,
    underlying: PrimitiveTypeKind,
    is_flags: bool,
    members: Vec<EdmEnumMember>,
}

impl EdmEnumType {
    #[must_use]
    pub fn fqn(&self) -> &FullQualifiedName {
        &self.fqn
    }

    #[must_use]
    pub fn underlying_type(&self) -> PrimitiveTypeKind {
        self.underlying
    }

    #[must_use]
    pub fn is_flags(&self) -> bool {
        self.is_flags
    }

    #[must_use]
    pub fn members(&self) -> &[EdmEnumMember] {
        &self.members
    }

    /// Member name(s) for `value`; flags combine as a comma-separated list.
    ///
    /// # Errors
    /// Returns `Error::Format` if the value is not a member (or, for flags, a
    /// combination of members).
    pub fn format(&self, value: i64) -> Result<String, Error> {
        if let Some(member) = self.members.iter().find(|m| m.value == value) {
            return Ok(member.name.clone());
        }
        let not_member = || Error::format(&self.fqn, format!("{value} is not a member"));
        if !self.is_flags || value <= 0 {
            return Err(not_member());
        }
        let mut remaining = value;
        let mut names = Vec::new();
        for member in &self.members {
            if member.value != 0 && value & member.value == member.value {
                names.push(member.name.as_str());
                remaining &= !member.value;
            }
        }
        if remaining != 0 {
            return Err(not_member());
        }
        Ok(names.join(","))
    }

    /// Inverse of [`EdmEnumType::format`]; numeric values are accepted too.
    ///
    /// # Errors
    /// Returns `Error::Parse` for unknown members, or several members on a
    /// non-flags type.
    pub fn parse(&self, text: &str) -> Result<i64, Error> {
        let mut value = 0;
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        if parts.len() > 1 && !self.is_flags {
            return Err(Error::parse(&self.fqn, text, "multiple members on a non-flags enum"));
        }
        for part in parts {
            let member = match self.members.iter().find(|m| m.name == part) {
                Some(m) => m.value,
                None => part
                    .parse::<i64>()
                    .ok()
                    .filter(|n| self.is_flags || self.members.iter().any(|m| m.value == *n))
                    .ok_or_else(|| Error::parse(&self.fqn, text, format!("unknown member `{part}`")))?,
            };
            value |= member;
        }
        Ok(value)
    }

    /// `Ns.Type'Member'`
    ///
    /// # Errors
    /// See [`EdmEnumType::format`].
    pub fn to_uri_literal(&self, value: i64) -> Result<String, Error> {
        Ok(format!("{}{}", self.fqn, literal::quote(&self.format(value)?)))
    }

    /// Accepts `Ns.Type'Member'` and the bare quoted form `'Member'`.
    ///
    /// # Errors
    /// Returns `Error::Parse` if the literal is not a quoted member list of this type.
    pub fn from_uri_literal(&self, text: &str) -> Result<i64, Error> {
        let prefix = self.fqn.to_string();
        let quoted = text.strip_prefix(prefix.as_str()).unwrap_or(text);
        let inner = literal::unquote(quoted)
            .ok_or_else(|| Error::parse(&self.fqn, text, "expected a quoted enum literal"))?;
        self.parse(&inner)
    }
}

#[derive(Clone, Debug)]
pub struct EdmEntitySet {
    pub name: String,
    pub entity_type: FullQualifiedName,
    pub navigation_bindings: Vec<NavigationBinding>,
    pub include_in_service_document: bool,
}

#[derive(Clone, Debug)]
pub struct EdmSingleton {
    pub name: String,
    pub entity_type: FullQualifiedName,
    pub navigation_bindings: Vec<NavigationBinding>,
}

fn binding_target<'a>(bindings: &'a [NavigationBinding], path: &str) -> Option<&'a str> {
    bindings
        .iter()
        .find(|b| b.path == path)
        .map(|b| b.target.as_str())
}

impl EdmEntitySet {
    /// Entity set or singleton bound to `path`.
    #[must_use]
    pub fn navigation_target(&self, path: &str) -> Option<&str> {
        binding_target(&self.navigation_bindings, path)
    }
}

impl EdmSingleton {
    #[must_use]
    pub fn navigation_target(&self, path: &str) -> Option<&str> {
        binding_target(&self.navigation_bindings, path)
    }
}

/// Where the entities of a payload live.
#[derive(Clone, Copy, Debug)]
pub enum EdmBindingTarget<'a> {
    EntitySet(&'a EdmEntitySet),
    Singleton(&'a EdmSingleton),
    /// Entities without a bound set (contained or operation results).
    Unbound(&'a FullQualifiedName),
}

impl<'a> EdmBindingTarget<'a> {
    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        match self {
            EdmBindingTarget::EntitySet(set) => Some(&set.name),
            EdmBindingTarget::Singleton(singleton) => Some(&singleton.name),
            EdmBindingTarget::Unbound(_) => None,
        }
    }

    #[must_use]
    pub fn entity_type(&self) -> &'a FullQualifiedName {
        match self {
            EdmBindingTarget::EntitySet(set) => &set.entity_type,
            EdmBindingTarget::Singleton(singleton) => &singleton.entity_type,
            EdmBindingTarget::Unbound(fqn) => fqn,
        }
    }

    #[must_use]
    pub fn navigation_target(&self, path: &str) -> Option<&'a str> {
        match self {
            EdmBindingTarget::EntitySet(set) => set.navigation_target(path),
            EdmBindingTarget::Singleton(singleton) => singleton.navigation_target(path),
            EdmBindingTarget::Unbound(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdmParameter {
    pub name: String,
    pub ty: EdmType,
    pub collection: bool,
    pub facets: Facets,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdmReturnType {
    pub ty: EdmType,
    pub collection: bool,
    pub nullable: bool,
}

#[derive(Clone, Debug)]
pub struct EdmOperation {
    pub fqn: FullQualifiedName,
    pub kind: OperationKind,
    pub is_bound: bool,
    pub is_composable: bool,
    pub parameters: Vec<EdmParameter>,
    pub return_type: Option<EdmReturnType>,
    pub entity_set_path: Option<String>,
}

impl EdmOperation {
    #[must_use]
    pub fn binding_parameter(&self) -> Option<&EdmParameter> {
        if self.is_bound {
            self.parameters.first()
        } else {
            None
        }
    }

    /// Parameters supplied by the caller (binding parameter excluded).
    #[must_use]
    pub fn non_binding_parameters(&self) -> &[EdmParameter] {
        if self.is_bound {
            self.parameters.get(1..).unwrap_or_default()
        } else {
            &self.parameters
        }
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&EdmParameter> {
        self.non_binding_parameters().iter().find(|p| p.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct EdmOperationImport {
    pub name: String,
    pub kind: OperationKind,
    pub operation: FullQualifiedName,
    pub entity_set: Option<String>,
    pub include_in_service_document: bool,
}

#[derive(Clone, Debug)]
pub struct EdmEntityContainer {
    fqn: FullQualifiedName,
    entity_sets: Vec<EdmEntitySet>,
    singletons: Vec<EdmSingleton>,
    operation_imports: Vec<EdmOperationImport>,
}

impl EdmEntityContainer {
    #[must_use]
    pub fn fqn(&self) -> &FullQualifiedName {
        &self.fqn
    }

    #[must_use]
    pub fn entity_sets(&self) -> &[EdmEntitySet] {
        &self.entity_sets
    }

    #[must_use]
    pub fn singletons(&self) -> &[EdmSingleton] {
        &self.singletons
    }

    #[must_use]
    pub fn operation_imports(&self) -> &[EdmOperationImport] {
        &self.operation_imports
    }

    #[must_use]
    pub fn entity_set(&self, name: &str) -> Option<&EdmEntitySet> {
        self.entity_sets.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn singleton(&self, name: &str) -> Option<&EdmSingleton> {
        self.singletons.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn operation_import(&self, name: &str) -> Option<&EdmOperationImport> {
        self.operation_imports.iter().find(|i| i.name == name)
    }

    /// Entity set or singleton by name.
    #[must_use]
    pub fn binding_target(&self, name: &str) -> Option<EdmBindingTarget<'_>> {
        self.entity_set(name)
            .map(EdmBindingTarget::EntitySet)
            .or_else(|| self.singleton(name).map(EdmBindingTarget::Singleton))
    }
}

/// The model: built once from schemas, read-only afterwards.
#[derive(Debug)]
pub struct Edm {
    namespaces: Vec<String>,
    aliases: HashMap<String, String>,
    structured: HashMap<FullQualifiedName, EdmStructuredType>,
    enums: HashMap<FullQualifiedName, EdmEnumType>,
    derived: HashMap<FullQualifiedName, Vec<FullQualifiedName>>,
    operations: Vec<EdmOperation>,
    operation_index: HashMap<OperationKey, usize>,
    container: Option<EdmEntityContainer>,
}

impl Edm {
    /// Resolve and validate `schemas` into a model.
    ///
    /// # Errors
    /// Returns `Error::InvalidModel` for unknown or cyclic base types, unknown
    /// property/navigation/parameter types, invalid keys, duplicate names and
    /// duplicate operation overloads.
    pub fn new(schemas: &[EdmSchema]) -> Result<Self, Error> {
        let edm = ModelBuilder::new(schemas)?.build()?;
        tracing::debug!(
            namespaces = ?edm.namespaces,
            types = edm.structured.len(),
            enums = edm.enums.len(),
            operations = edm.operations.len(),
            "EDM model built"
        );
        Ok(edm)
    }

    /// Fetch schemas from `provider` and build the model.
    ///
    /// # Errors
    /// Returns the provider's error or any model validation error.
    pub fn from_provider(provider: &dyn MetadataProvider) -> Result<Self, Error> {
        let schemas = provider.list_schemas()?;
        Self::new(&schemas)
    }

    #[must_use]
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Replace an alias namespace by the real one.
    #[must_use]
    pub fn canonical_name<'a>(&self, fqn: &'a FullQualifiedName) -> Cow<'a, FullQualifiedName> {
        match self.aliases.get(fqn.namespace()) {
            Some(namespace) => Cow::Owned(fqn.with_namespace(namespace)),
            None => Cow::Borrowed(fqn),
        }
    }

    #[must_use]
    pub fn find_type(&self, fqn: &FullQualifiedName) -> Option<&EdmStructuredType> {
        self.structured.get(self.canonical_name(fqn).as_ref())
    }

    /// # Errors
    /// `ResourceNotFound` if no entity or complex type has this name.
    pub fn resolve_type(&self, fqn: &FullQualifiedName) -> Result<&EdmStructuredType, Error> {
        self.find_type(fqn)
            .ok_or_else(|| Error::not_found(ResourceKind::Type, fqn.to_string()))
    }

    /// # Errors
    /// `ResourceNotFound` if the name is not an entity type.
    pub fn resolve_entity_type(&self, fqn: &FullQualifiedName) -> Result<&EdmStructuredType, Error> {
        self.find_type(fqn)
            .filter(|t| t.is_entity())
            .ok_or_else(|| Error::not_found(ResourceKind::Type, fqn.to_string()))
    }

    /// # Errors
    /// `ResourceNotFound` if no enum type has this name.
    pub fn resolve_enum_type(&self, fqn: &FullQualifiedName) -> Result<&EdmEnumType, Error> {
        self.enums
            .get(self.canonical_name(fqn).as_ref())
            .ok_or_else(|| Error::not_found(ResourceKind::Type, fqn.to_string()))
    }

    /// Resolve a qualified type name (primitive, enum, complex or entity).
    #[must_use]
    pub fn resolve_type_name(&self, name: &str) -> Option<EdmType> {
        if let Some(kind) = PrimitiveTypeKind::from_qualified_name(name) {
            return Some(EdmType::Primitive(kind));
        }
        let fqn: FullQualifiedName = name.parse().ok()?;
        let fqn = self.canonical_name(&fqn);
        if self.enums.contains_key(fqn.as_ref()) {
            return Some(EdmType::Enum(fqn.into_owned()));
        }
        self.structured.get(fqn.as_ref()).map(EdmStructuredType::as_edm_type)
    }

    #[must_use]
    pub fn entity_container(&self) -> Option<&EdmEntityContainer> {
        self.container.as_ref()
    }

    fn container_named(&self, container: &FullQualifiedName) -> Option<&EdmEntityContainer> {
        let container = self.canonical_name(container);
        self.container.as_ref().filter(|c| c.fqn == *container)
    }

    /// # Errors
    /// `ResourceNotFound` if the container or the entity set is unknown.
    pub fn resolve_entity_set(
        &self,
        container: &FullQualifiedName,
        name: &str,
    ) -> Result<&EdmEntitySet, Error> {
        self.container_named(container)
            .and_then(|c| c.entity_set(name))
            .ok_or_else(|| Error::not_found(ResourceKind::EntitySet, name))
    }

    /// # Errors
    /// `ResourceNotFound` if the container or the singleton is unknown.
    pub fn resolve_singleton(
        &self,
        container: &FullQualifiedName,
        name: &str,
    ) -> Result<&EdmSingleton, Error> {
        self.container_named(container)
            .and_then(|c| c.singleton(name))
            .ok_or_else(|| Error::not_found(ResourceKind::Singleton, name))
    }

    /// # Errors
    /// `ResourceNotFound` if the container or the import is unknown.
    pub fn resolve_operation_import(
        &self,
        container: &FullQualifiedName,
        name: &str,
    ) -> Result<&EdmOperationImport, Error> {
        self.container_named(container)
            .and_then(|c| c.operation_import(name))
            .ok_or_else(|| Error::not_found(ResourceKind::OperationImport, name))
    }

    /// Entity set in the default container.
    #[must_use]
    pub fn entity_set(&self, name: &str) -> Option<&EdmEntitySet> {
        self.container.as_ref()?.entity_set(name)
    }

    /// Singleton in the default container.
    #[must_use]
    pub fn singleton(&self, name: &str) -> Option<&EdmSingleton> {
        self.container.as_ref()?.singleton(name)
    }

    /// Overload lookup for a bound operation.
    ///
    /// When nothing is bound to `binding_type` itself, its base types are
    /// tried from nearest to farthest.
    ///
    /// # Errors
    /// `ResourceNotFound` if no overload matches.
    pub fn resolve_bound_operation<S: AsRef<str>>(
        &self,
        binding_type: &FullQualifiedName,
        name: &FullQualifiedName,
        is_collection: bool,
        parameter_names: &[S],
    ) -> Result<&EdmOperation, Error> {
        let name = self.canonical_name(name).into_owned();
        let binding = self.canonical_name(binding_type).into_owned();
        let probe = OperationKey::new(
            name.clone(),
            Some((binding.clone(), is_collection)),
            parameter_names,
        );
        let mut current = Some(binding);
        while let Some(ty) = current {
            if let Some(&index) = self.operation_index.get(&probe.rebind(&ty)) {
                return Ok(&self.operations[index]);
            }
            current = self.structured.get(&ty).and_then(|t| t.base_type.clone());
        }
        Err(Error::not_found(ResourceKind::Operation, name.to_string()))
    }

    /// # Errors
    /// `ResourceNotFound` if no unbound overload matches.
    pub fn resolve_unbound_operation<S: AsRef<str>>(
        &self,
        name: &FullQualifiedName,
        parameter_names: &[S],
    ) -> Result<&EdmOperation, Error> {
        let name = self.canonical_name(name).into_owned();
        let key = OperationKey::unbound(name, parameter_names);
        self.operation_index
            .get(&key)
            .map(|&index| &self.operations[index])
            .ok_or_else(|| Error::not_found(ResourceKind::Operation, key.name().to_string()))
    }

    pub fn operations(&self) -> impl Iterator<Item = &EdmOperation> {
        self.operations.iter()
    }

    /// All types deriving from `fqn`, transitively.
    #[must_use]
    pub fn derived_types(&self, fqn: &FullQualifiedName) -> BTreeSet<FullQualifiedName> {
        let mut out = BTreeSet::new();
        let mut pending = vec![self.canonical_name(fqn).into_owned()];
        while let Some(current) = pending.pop() {
            for child in self.derived.get(&current).into_iter().flatten() {
                if out.insert(child.clone()) {
                    pending.push(child.clone());
                }
            }
        }
        out
    }

    /// `candidate == base` or `candidate` derives from `base`.
    #[must_use]
    pub fn is_same_or_derived(&self, candidate: &FullQualifiedName, base: &FullQualifiedName) -> bool {
        let base = self.canonical_name(base);
        let mut current = Some(self.canonical_name(candidate).into_owned());
        while let Some(ty) = current {
            if ty == *base {
                return true;
            }
            current = self.structured.get(&ty).and_then(|t| t.base_type.clone());
        }
        false
    }
}

struct ModelBuilder<'s> {
    schemas: &'s [EdmSchema],
    namespaces: Vec<String>,
    aliases: HashMap<String, String>,
    raw: HashMap<FullQualifiedName, (StructuredKind, &'s StructuredTypeDef)>,
    enums: HashMap<FullQualifiedName, EdmEnumType>,
    structured: HashMap<FullQualifiedName, EdmStructuredType>,
}

impl<'s> ModelBuilder<'s> {
    fn new(schemas: &'s [EdmSchema]) -> Result<Self, Error> {
        let mut namespaces = Vec::new();
        let mut aliases = HashMap::new();
        for schema in schemas {
            if schema.namespace.is_empty() || namespaces.contains(&schema.namespace) {
                return Err(Error::InvalidModel(format!(
                    "duplicate or empty namespace `{}`",
                    schema.namespace
                )));
            }
            namespaces.push(schema.namespace.clone());
        }
        for schema in schemas {
            if let Some(alias) = &schema.alias
                && (namespaces.contains(alias)
                    || aliases
                        .insert(alias.clone(), schema.namespace.clone())
                        .is_some())
            {
                return Err(Error::InvalidModel(format!("duplicate alias `{alias}`")));
            }
        }

        let mut builder = Self {
            schemas,
            namespaces,
            aliases,
            raw: HashMap::new(),
            enums: HashMap::new(),
            structured: HashMap::new(),
        };
        for schema in schemas {
            for def in &schema.entity_types {
                builder.register(&schema.namespace, StructuredKind::Entity, def)?;
            }
            for def in &schema.complex_types {
                builder.register(&schema.namespace, StructuredKind::Complex, def)?;
            }
            for def in &schema.enum_types {
                let fqn = FullQualifiedName::new(&schema.namespace, &def.name);
                builder.ensure_unique_type(&fqn)?;
                let enum_type = builder.enum_type(fqn.clone(), def)?;
                builder.enums.insert(fqn, enum_type);
            }
        }
        Ok(builder)
    }

    fn ensure_unique_type(&self, fqn: &FullQualifiedName) -> Result<(), Error> {
        if self.raw.contains_key(fqn) || self.enums.contains_key(fqn) {
            return Err(Error::InvalidModel(format!("duplicate type `{fqn}`")));
        }
        Ok(())
    }

    fn register(
        &mut self,
        namespace: &str,
        kind: StructuredKind,
        def: &'s StructuredTypeDef,
    ) -> Result<(), Error> {
        let fqn = FullQualifiedName::new(namespace, &def.name);
        self.ensure_unique_type(&fqn)?;
        self.raw.insert(fqn, (kind, def));
        Ok(())
    }

    fn qualify(&self, name: &str) -> Result<FullQualifiedName, Error> {
        let fqn: FullQualifiedName = name.parse()?;
        Ok(match self.aliases.get(fqn.namespace()) {
            Some(namespace) => fqn.with_namespace(namespace),
            None => fqn,
        })
    }

    fn enum_type(&self, fqn: FullQualifiedName, def: &EnumTypeDef) -> Result<EdmEnumType, Error> {
        let underlying = match &def.underlying_type {
            None => PrimitiveTypeKind::Int32,
            Some(name) => PrimitiveTypeKind::from_qualified_name(name)
                .filter(|k| k.is_integral())
                .ok_or_else(|| {
                    Error::InvalidModel(format!("enum `{fqn}` has non-integral underlying type `{name}`"))
                })?,
        };
        let mut members: Vec<EdmEnumMember> = Vec::with_capacity(def.members.len());
        let mut next = 0_i64;
        for member in &def.members {
            let value = match member.value {
                Some(v) => v,
                None if def.is_flags => {
                    return Err(Error::InvalidModel(format!(
                        "flags enum `{fqn}` member `{}` needs an explicit value",
                        member.name
                    )));
                }
                None => next,
            };
            if members.iter().any(|m| m.name == member.name) {
                return Err(Error::InvalidModel(format!(
                    "duplicate member `{}` in enum `{fqn}`",
                    member.name
                )));
            }
            next = value.saturating_add(1);
            members.push(EdmEnumMember {
                name: member.name.clone(),
                value,
            });
        }
        Ok(EdmEnumType {
            fqn,
            underlying,
            is_flags: def.is_flags,
            members,
        })
    }

    fn resolve_type_ref(&self, name: &str, allow_entity: bool) -> Result<EdmType, Error> {
        if let Some(kind) = PrimitiveTypeKind::from_qualified_name(name) {
            return Ok(EdmType::Primitive(kind));
        }
        let fqn = self.qualify(name)?;
        if self.enums.contains_key(&fqn) {
            return Ok(EdmType::Enum(fqn));
        }
        match self.raw.get(&fqn) {
            Some((StructuredKind::Complex, _)) => Ok(EdmType::Complex(fqn)),
            Some((StructuredKind::Entity, _)) if allow_entity => Ok(EdmType::Entity(fqn)),
            Some((StructuredKind::Entity, _)) => Err(Error::InvalidModel(format!(
                "entity type `{fqn}` cannot be used as a property type"
            ))),
            None => Err(Error::InvalidModel(format!("unknown type `{name}`"))),
        }
    }

    fn build(mut self) -> Result<Edm, Error> {
        let mut names: Vec<FullQualifiedName> = self.raw.keys().cloned().collect();
        names.sort();
        for fqn in &names {
            let mut stack = Vec::new();
            self.resolve_structured(fqn, &mut stack)?;
        }

        let mut derived: HashMap<FullQualifiedName, Vec<FullQualifiedName>> = HashMap::new();
        for fqn in &names {
            if let Some(base) = self.structured.get(fqn).and_then(|t| t.base_type.clone()) {
                derived.entry(base).or_default().push(fqn.clone());
            }
        }

        let mut operations = Vec::new();
        let mut operation_index = HashMap::new();
        let mut containers = Vec::new();
        for schema in self.schemas {
            for def in &schema.operations {
                let (key, operation) = self.operation(&schema.namespace, def)?;
                if operation_index.insert(key.clone(), operations.len()).is_some() {
                    return Err(Error::InvalidModel(format!(
                        "duplicate overload of operation `{}`",
                        key.name()
                    )));
                }
                operations.push(operation);
            }
            if let Some(container) = &schema.container {
                containers.push((schema.namespace.as_str(), container));
            }
        }

        let container = match containers.as_slice() {
            [] => None,
            [(namespace, def)] => Some(self.container(namespace, def, &operations)?),
            _ => {
                return Err(Error::InvalidModel(
                    "more than one entity container".to_owned(),
                ));
            }
        };

        Ok(Edm {
            namespaces: self.namespaces,
            aliases: self.aliases,
            structured: self.structured,
            enums: self.enums,
            derived,
            operations,
            operation_index,
            container,
        })
    }

    fn resolve_structured(
        &mut self,
        fqn: &FullQualifiedName,
        stack: &mut Vec<FullQualifiedName>,
    ) -> Result<(), Error> {
        if self.structured.contains_key(fqn) {
            return Ok(());
        }
        if stack.contains(fqn) {
            return Err(Error::InvalidModel(format!("base type cycle through `{fqn}`")));
        }
        let Some(&(kind, def)) = self.raw.get(fqn) else {
            return Err(Error::InvalidModel(format!("unknown type `{fqn}`")));
        };

        let base = match &def.base_type {
            Some(name) => {
                let base = self.qualify(name)?;
                match self.raw.get(&base) {
                    Some((base_kind, _)) if *base_kind == kind => {}
                    Some(_) => {
                        return Err(Error::InvalidModel(format!(
                            "`{fqn}` and its base type `{base}` are of different kinds"
                        )));
                    }
                    None => {
                        return Err(Error::InvalidModel(format!(
                            "unknown base type `{name}` of `{fqn}`"
                        )));
                    }
                }
                stack.push(fqn.clone());
                self.resolve_structured(&base, stack)?;
                stack.pop();
                Some(base)
            }
            None => None,
        };

        let (mut properties, mut navigation_properties, inherited_key) =
            match base.as_ref().and_then(|b| self.structured.get(b)) {
                Some(parent) => (
                    parent.properties.clone(),
                    parent.navigation_properties.clone(),
                    parent.key.clone(),
                ),
                None => (Vec::new(), Vec::new(), Vec::new()),
            };

        let mut seen: HashSet<String> = properties
            .iter()
            .map(|p| p.name.clone())
            .chain(navigation_properties.iter().map(|n| n.name.clone()))
            .collect();
        for property in &def.properties {
            if !seen.insert(property.name.clone()) {
                return Err(Error::InvalidModel(format!(
                    "duplicate member `{}` in `{fqn}`",
                    property.name
                )));
            }
            properties.push(EdmProperty {
                name: property.name.clone(),
                ty: self.resolve_type_ref(&property.type_name, false)?,
                collection: property.collection,
                facets: property.facets,
                default_value: property.default_value.clone(),
            });
        }
        for navigation in &def.navigation_properties {
            if !seen.insert(navigation.name.clone()) {
                return Err(Error::InvalidModel(format!(
                    "duplicate member `{}` in `{fqn}`",
                    navigation.name
                )));
            }
            let target = self.qualify(&navigation.target)?;
            if !matches!(self.raw.get(&target), Some((StructuredKind::Entity, _))) {
                return Err(Error::InvalidModel(format!(
                    "navigation `{}` of `{fqn}` targets unknown entity type `{}`",
                    navigation.name, navigation.target
                )));
            }
            navigation_properties.push(EdmNavigationProperty {
                name: navigation.name.clone(),
                target,
                collection: navigation.collection,
                nullable: navigation.nullable.unwrap_or(!navigation.collection),
                partner: navigation.partner.clone(),
                contains_target: navigation.contains_target,
                referential_constraints: navigation.referential_constraints.clone(),
                on_delete: navigation.on_delete,
            });
        }

        let key = match (kind, def.key.is_empty()) {
            (StructuredKind::Complex, false) => {
                return Err(Error::InvalidModel(format!("complex type `{fqn}` declares a key")));
            }
            (StructuredKind::Entity, false) if !inherited_key.is_empty() => {
                return Err(Error::InvalidModel(format!(
                    "`{fqn}` redefines the key inherited from its base type"
                )));
            }
            (_, false) => def.key.clone(),
            (_, true) => inherited_key,
        };
        let mut key_names = HashSet::new();
        for name in &key {
            let valid = properties
                .iter()
                .find(|p| &p.name == name)
                .is_some_and(|p| matches!(p.ty, EdmType::Primitive(_)) && !p.collection);
            if !valid || !key_names.insert(name) {
                return Err(Error::InvalidModel(format!(
                    "key `{name}` of `{fqn}` is not a declared single-valued primitive property"
                )));
            }
        }
        if kind == StructuredKind::Entity && key.is_empty() && !def.is_abstract {
            return Err(Error::InvalidModel(format!("entity type `{fqn}` has no key")));
        }

        self.structured.insert(
            fqn.clone(),
            EdmStructuredType {
                fqn: fqn.clone(),
                kind,
                base_type: base,
                is_abstract: def.is_abstract,
                is_open: def.is_open,
                has_stream: def.has_stream,
                key,
                properties,
                navigation_properties,
            },
        );
        Ok(())
    }

    fn operation(
        &self,
        namespace: &str,
        def: &OperationDef,
    ) -> Result<(OperationKey, EdmOperation), Error> {
        let fqn = FullQualifiedName::new(namespace, &def.name);
        let mut parameters = Vec::with_capacity(def.parameters.len());
        let mut seen = HashSet::new();
        for parameter in &def.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(Error::InvalidModel(format!(
                    "duplicate parameter `{}` of `{fqn}`",
                    parameter.name
                )));
            }
            parameters.push(EdmParameter {
                name: parameter.name.clone(),
                ty: self.resolve_type_ref(&parameter.type_name, true)?,
                collection: parameter.collection,
                facets: parameter.facets,
            });
        }
        if def.is_composable && def.kind == OperationKind::Action {
            return Err(Error::InvalidModel(format!("action `{fqn}` cannot be composable")));
        }
        let binding = if def.is_bound {
            let binding = parameters.first().ok_or_else(|| {
                Error::InvalidModel(format!("bound operation `{fqn}` has no binding parameter"))
            })?;
            let ty = binding.ty.structured_name().ok_or_else(|| {
                Error::InvalidModel(format!("`{fqn}` must be bound to an entity or complex type"))
            })?;
            Some((ty.clone(), binding.collection))
        } else {
            None
        };
        let return_type = match &def.return_type {
            Some(ret) => Some(EdmReturnType {
                ty: self.resolve_type_ref(&ret.type_name, true)?,
                collection: ret.collection,
                nullable: ret.nullable,
            }),
            None => None,
        };

        let skip = usize::from(def.is_bound);
        let key_parameters: Vec<&str> = match def.kind {
            OperationKind::Action => Vec::new(),
            OperationKind::Function => parameters
                .iter()
                .skip(skip)
                .map(|p| p.name.as_str())
                .collect(),
        };
        let key = OperationKey::new(fqn.clone(), binding, key_parameters);
        let operation = EdmOperation {
            fqn,
            kind: def.kind,
            is_bound: def.is_bound,
            is_composable: def.is_composable,
            parameters,
            return_type,
            entity_set_path: def.entity_set_path.clone(),
        };
        Ok((key, operation))
    }

    fn container(
        &self,
        namespace: &str,
        def: &EntityContainerDef,
        operations: &[EdmOperation],
    ) -> Result<EdmEntityContainer, Error> {
        let fqn = FullQualifiedName::new(namespace, &def.name);
        let mut names = HashSet::new();
        let mut claim = |name: &str| {
            if names.insert(name.to_owned()) {
                Ok(())
            } else {
                Err(Error::InvalidModel(format!(
                    "duplicate container child `{name}` in `{fqn}`"
                )))
            }
        };

        let entity_type = |set: &str, type_name: &str| -> Result<FullQualifiedName, Error> {
            let ty = self.qualify(type_name)?;
            match self.structured.get(&ty) {
                Some(t) if t.is_entity() => Ok(ty),
                _ => Err(Error::InvalidModel(format!(
                    "`{set}` refers to unknown entity type `{type_name}`"
                ))),
            }
        };

        let mut entity_sets = Vec::with_capacity(def.entity_sets.len());
        for set in &def.entity_sets {
            claim(&set.name)?;
            entity_sets.push(EdmEntitySet {
                name: set.name.clone(),
                entity_type: entity_type(&set.name, &set.entity_type)?,
                navigation_bindings: set.navigation_bindings.clone(),
                include_in_service_document: set.include_in_service_document,
            });
        }
        let mut singletons = Vec::with_capacity(def.singletons.len());
        for singleton in &def.singletons {
            claim(&singleton.name)?;
            singletons.push(EdmSingleton {
                name: singleton.name.clone(),
                entity_type: entity_type(&singleton.name, &singleton.entity_type)?,
                navigation_bindings: singleton.navigation_bindings.clone(),
            });
        }

        let is_target = |name: &str| {
            entity_sets.iter().any(|s| s.name == name) || singletons.iter().any(|s| s.name == name)
        };
        let bindings = entity_sets
            .iter()
            .flat_map(|s| s.navigation_bindings.iter())
            .chain(singletons.iter().flat_map(|s| s.navigation_bindings.iter()));
        for binding in bindings {
            if !is_target(&binding.target) {
                return Err(Error::InvalidModel(format!(
                    "navigation binding `{}` targets unknown entity set `{}`",
                    binding.path, binding.target
                )));
            }
        }

        let mut operation_imports = Vec::with_capacity(def.operation_imports.len());
        for import in &def.operation_imports {
            claim(&import.name)?;
            let operation = self.qualify(&import.operation)?;
            let exists = operations
                .iter()
                .any(|o| o.fqn == operation && !o.is_bound && o.kind == import.kind);
            if !exists {
                return Err(Error::InvalidModel(format!(
                    "import `{}` refers to unknown unbound operation `{}`",
                    import.name, import.operation
                )));
            }
            if let Some(set) = &import.entity_set
                && !entity_sets.iter().any(|s| &s.name == set)
            {
                return Err(Error::InvalidModel(format!(
                    "import `{}` refers to unknown entity set `{set}`",
                    import.name
                )));
            }
            operation_imports.push(EdmOperationImport {
                name: import.name.clone(),
                kind: import.kind,
                operation,
                entity_set: import.entity_set.clone(),
                include_in_service_document: import.include_in_service_document,
            });
        }

        Ok(EdmEntityContainer {
            fqn,
            entity_sets,
            singletons,
            operation_imports,
        })
    }
}
