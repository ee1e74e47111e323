//! Left-to-right resolution of a resource path against the model.
//!
//! The parser carries the current type, its cardinality and the entity set
//! (if any) the addressed entities belong to. Each segment must be reachable
//! from the previous one.

use super::encoding::decode;
use super::resource::{KeyPredicate, OperationParameter, UriResource, UriResourcePath};
use super::{UriInfo, UriInfoKind, UriParseReason};
use crate::edm::{
    Edm, EdmEntityContainer, EdmNavigationProperty, EdmOperation, EdmStructuredType, EdmType,
    FullQualifiedName, OperationKind,
};
use crate::limits::ODataLimits;
use crate::query::{self, QueryOptions};
use crate::types::literal::{from_uri_literal, is_null_literal, to_uri_literal};
use crate::{Error, ResourceKind};
use std::collections::HashMap;

/// Parse a request path and query string.
///
/// `path` is relative to the service root; a leading `/` is ignored.
///
/// # Errors
/// `UriParse`, `InvalidKeyPredicate` and `ResourceNotFound` for the path,
/// `InvalidQueryOption`/`ResourceNotFound` for the query options and
/// `NotImplemented` for `$batch`.
pub fn parse_uri(edm: &Edm, path: &str, query: &str, limits: &ODataLimits) -> Result<UriInfo, Error> {
    let raw = split_path(path);
    limits.validate_path_segments(&raw)?;
    let options = query::parse_query(query, limits)?;

    let kind = match raw.first().copied() {
        None => UriInfoKind::ServiceDocument,
        Some("$metadata") => {
            no_trailing(&raw, 1)?;
            UriInfoKind::Metadata
        }
        Some("$batch") => return Err(Error::NotImplemented("$batch".to_owned())),
        Some("$all") => {
            no_trailing(&raw, 1)?;
            UriInfoKind::All
        }
        Some("$entity") => entity_id(edm, &raw, &options)?,
        Some(first) if first.starts_with("$crossjoin") => {
            no_trailing(&raw, 1)?;
            UriInfoKind::Crossjoin(crossjoin(edm, first)?)
        }
        Some(_) => UriInfoKind::Resource(PathParser::new(edm, limits)?.parse(&raw)?),
    };

    if let Some(target) = validation_target(edm, &kind) {
        options.validate(edm, target, limits)?;
    }
    tracing::debug!(path, "URI resolved");
    Ok(UriInfo {
        kind,
        query: options,
    })
}

/// Parse a resource path (no special `$` resources) against the model.
///
/// # Errors
/// See [`parse_uri`].
pub fn parse_resource_path(
    edm: &Edm,
    path: &str,
    limits: &ODataLimits,
) -> Result<UriResourcePath, Error> {
    let raw = split_path(path);
    limits.validate_path_segments(&raw)?;
    PathParser::new(edm, limits)?.parse(&raw)
}

fn split_path(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

fn uri_error(index: usize, segment: &str, reason: UriParseReason) -> Error {
    Error::UriParse {
        index,
        segment: segment.to_owned(),
        reason,
    }
}

fn no_trailing(raw: &[&str], allowed: usize) -> Result<(), Error> {
    match raw.get(allowed) {
        Some(extra) => Err(uri_error(allowed, extra, UriParseReason::TrailingSegment)),
        None => Ok(()),
    }
}

fn entity_id(edm: &Edm, raw: &[&str], options: &QueryOptions) -> Result<UriInfoKind, Error> {
    if options.id.is_none() {
        return Err(Error::query("$id", "required by $entity"));
    }
    no_trailing(raw, 2)?;
    let type_cast = match raw.get(1) {
        Some(segment) => {
            let decoded = decode(segment, 1)?;
            let cast = decoded
                .parse::<FullQualifiedName>()
                .ok()
                .and_then(|fqn| edm.find_type(&fqn))
                .filter(|t| t.is_entity())
                .ok_or_else(|| Error::not_found(ResourceKind::Type, &*decoded).at_segment(1))?;
            Some(cast.fqn().clone())
        }
        None => None,
    };
    Ok(UriInfoKind::EntityId { type_cast })
}

fn crossjoin(edm: &Edm, segment: &str) -> Result<Vec<String>, Error> {
    let decoded = decode(segment, 0)?;
    let inner = decoded
        .strip_prefix("$crossjoin(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| uri_error(0, segment, UriParseReason::MalformedParentheses))?;
    let mut sets = Vec::new();
    for name in inner.split(',').map(str::trim) {
        if edm.entity_set(name).is_none() {
            return Err(Error::not_found(ResourceKind::EntitySet, name).at_segment(0));
        }
        if !sets.iter().any(|s| s == name) {
            sets.push(name.to_owned());
        }
    }
    Ok(sets)
}

fn validation_target<'a>(edm: &'a Edm, kind: &UriInfoKind) -> Option<&'a EdmStructuredType> {
    match kind {
        UriInfoKind::Resource(path) if !path.is_count() && !path.is_value() => path
            .target_type()
            .and_then(EdmType::structured_name)
            .and_then(|fqn| edm.find_type(fqn)),
        UriInfoKind::EntityId {
            type_cast: Some(fqn),
        } => edm.find_type(fqn),
        _ => None,
    }
}

/// Split `Name(args)` into the name and the text between the parentheses.
fn split_segment(segment: &str) -> Option<(&str, Option<&str>)> {
    let Some(open) = segment.find('(') else {
        return (!segment.contains(')')).then_some((segment, None));
    };
    let mut depth = 0_usize;
    let mut quoted = false;
    for (i, c) in segment[open..].char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth == 0 {
                    let close = open + i;
                    // the closing parenthesis must end the segment
                    return (close + 1 == segment.len())
                        .then(|| (&segment[..open], Some(&segment[open + 1..close])));
                }
            }
            _ => {}
        }
    }
    None
}

/// Comma-separated `value` or `name=value` items outside quotes and
/// parentheses; `None` if the quoting is broken or an item is empty.
fn split_arguments(args: &str) -> Option<Vec<(Option<&str>, &str)>> {
    let mut items = Vec::new();
    let mut depth = 0_usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' | '[' | '{' if !quoted => depth += 1,
            ')' | ']' | '}' if !quoted => depth = depth.checked_sub(1)?,
            ',' if !quoted && depth == 0 => {
                items.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted || depth != 0 {
        return None;
    }
    items.push(&args[start..]);

    items
        .into_iter()
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                return None;
            }
            let eq = item.find('=');
            let quote = item.find('\'').unwrap_or(usize::MAX);
            Some(match eq {
                Some(eq) if eq < quote => {
                    let name = item[..eq].trim();
                    if name.is_empty() {
                        return None;
                    }
                    (Some(name), item[eq + 1..].trim())
                }
                _ => (None, item),
            })
        })
        .collect()
}

struct PathParser<'a> {
    edm: &'a Edm,
    container: &'a EdmEntityContainer,
    limits: &'a ODataLimits,
    segments: Vec<UriResource>,
    current: Option<EdmType>,
    collection: bool,
    terminal: bool,
    /// Entity set or singleton of the addressed entities.
    binding: Option<String>,
    /// Property and type-cast segments since the last binding, used to
    /// look up navigation bindings such as `Address/City` or `Ns.Type/Nav`.
    binding_path: Vec<String>,
}

impl<'a> PathParser<'a> {
    fn new(edm: &'a Edm, limits: &'a ODataLimits) -> Result<Self, Error> {
        let container = edm
            .entity_container()
            .ok_or_else(|| Error::InvalidModel("model has no entity container".to_owned()))?;
        Ok(Self {
            edm,
            container,
            limits,
            segments: Vec::new(),
            current: None,
            collection: false,
            terminal: false,
            binding: None,
            binding_path: Vec::new(),
        })
    }

    fn parse(mut self, raw: &[&str]) -> Result<UriResourcePath, Error> {
        for (index, segment) in raw.iter().enumerate() {
            if segment.is_empty() {
                return Err(uri_error(index, segment, UriParseReason::EmptySegment));
            }
            if self.terminal {
                return Err(uri_error(index, segment, UriParseReason::TrailingSegment));
            }
            let decoded = decode(segment, index)?;
            if index == 0 {
                self.first(index, &decoded)?;
            } else {
                self.next(index, &decoded)?;
            }
        }
        Ok(UriResourcePath {
            segments: self.segments,
            target: self.current,
            collection: self.collection,
            binding: self.binding,
        })
    }

    fn first(&mut self, index: usize, segment: &str) -> Result<(), Error> {
        let (name, args) = split_segment(segment)
            .ok_or_else(|| uri_error(index, segment, UriParseReason::MalformedParentheses))?;
        let edm = self.edm;
        let container = self.container;

        if let Some(set) = container.entity_set(name) {
            self.segments.push(UriResource::EntitySet {
                name: set.name.clone(),
                entity_type: set.entity_type.clone(),
            });
            self.current = Some(EdmType::Entity(set.entity_type.clone()));
            self.collection = true;
            self.binding = Some(set.name.clone());
            if let Some(args) = args {
                self.key(index, segment, args)?;
            }
            return Ok(());
        }
        if let Some(singleton) = container.singleton(name) {
            if args.is_some() {
                return Err(uri_error(index, segment, UriParseReason::KeyNotAllowed));
            }
            self.segments.push(UriResource::Singleton {
                name: singleton.name.clone(),
                entity_type: singleton.entity_type.clone(),
            });
            self.current = Some(EdmType::Entity(singleton.entity_type.clone()));
            self.collection = false;
            self.binding = Some(singleton.name.clone());
            return Ok(());
        }
        if let Some(import) = container.operation_import(name) {
            let parameters = self.parameters(index, segment, args)?;
            let names: Vec<&str> = parameters.iter().map(|p| p.name.as_str()).collect();
            let operation = match import.kind {
                OperationKind::Action if !names.is_empty() => {
                    return Err(uri_error(index, segment, UriParseReason::InvalidParameter));
                }
                OperationKind::Action => {
                    edm.resolve_unbound_operation(&import.operation, &[] as &[&str])
                }
                OperationKind::Function => edm.resolve_unbound_operation(&import.operation, &names),
            }
            .map_err(|e| e.at_segment(index))?;
            let parameters = self.typed_parameters(index, segment, operation, parameters)?;
            self.segments.push(UriResource::OperationImport {
                name: import.name.clone(),
                operation: operation.fqn.clone(),
                kind: import.kind,
                parameters,
                return_type: operation.return_type.clone(),
            });
            self.binding = import.entity_set.clone();
            self.after_operation(operation);
            return Ok(());
        }
        Err(Error::not_found(ResourceKind::ContainerChild, name).at_segment(index))
    }

    fn next(&mut self, index: usize, segment: &str) -> Result<(), Error> {
        match segment {
            "$count" => {
                if !self.collection {
                    return Err(uri_error(index, segment, UriParseReason::CountNotAllowed));
                }
                self.terminate(UriResource::Count);
                return Ok(());
            }
            "$ref" => {
                if !matches!(self.current, Some(EdmType::Entity(_))) {
                    return Err(uri_error(index, segment, UriParseReason::RefNotAllowed));
                }
                self.terminate(UriResource::Ref);
                return Ok(());
            }
            "$value" => {
                let allowed = !self.collection
                    && match &self.current {
                        Some(EdmType::Primitive(_) | EdmType::Enum(_)) => true,
                        Some(EdmType::Entity(fqn)) => {
                            self.edm.find_type(fqn).is_some_and(EdmStructuredType::has_stream)
                        }
                        _ => false,
                    };
                if !allowed {
                    return Err(uri_error(index, segment, UriParseReason::ValueNotAllowed));
                }
                self.terminate(UriResource::Value);
                return Ok(());
            }
            _ => {}
        }

        let (name, args) = split_segment(segment)
            .ok_or_else(|| uri_error(index, segment, UriParseReason::MalformedParentheses))?;
        if name.contains('.') {
            return self.qualified(index, segment, name, args);
        }

        let Some(structured) = self.current.as_ref().and_then(EdmType::structured_name) else {
            return Err(uri_error(index, segment, UriParseReason::UnexpectedSegment));
        };
        if self.collection {
            return Err(uri_error(index, segment, UriParseReason::MissingKeyPredicate));
        }
        let edm = self.edm;
        let ty = edm.resolve_type(structured)?;

        if let Some(nav) = ty.navigation_property(name) {
            self.segments.push(UriResource::Navigation {
                name: nav.name.clone(),
                target: nav.target.clone(),
                collection: nav.collection,
            });
            self.follow_binding(nav);
            self.current = Some(EdmType::Entity(nav.target.clone()));
            self.collection = nav.collection;
            if let Some(args) = args {
                self.key(index, segment, args)?;
            }
            return Ok(());
        }
        if let Some(property) = ty.property(name) {
            if args.is_some() {
                return Err(uri_error(index, segment, UriParseReason::KeyNotAllowed));
            }
            self.segments.push(UriResource::Property {
                name: property.name.clone(),
                ty: property.ty.clone(),
                collection: property.collection,
            });
            self.binding_path.push(property.name.clone());
            self.current = Some(property.ty.clone());
            self.collection = property.collection;
            return Ok(());
        }
        Err(Error::not_found(ResourceKind::Navigation, name).at_segment(index))
    }

    /// `Ns.Name`: a type cast when it names a derived type, otherwise a bound operation.
    fn qualified(
        &mut self,
        index: usize,
        segment: &str,
        name: &str,
        args: Option<&str>,
    ) -> Result<(), Error> {
        let fqn: FullQualifiedName = name
            .parse()
            .map_err(|_| uri_error(index, segment, UriParseReason::UnexpectedSegment))?;
        let edm = self.edm;
        let current = self.current.clone();
        let binding_type = current.as_ref().and_then(EdmType::structured_name);

        if let Some(cast) = edm.find_type(&fqn) {
            if !binding_type.is_some_and(|base| edm.is_same_or_derived(cast.fqn(), base)) {
                return Err(uri_error(index, segment, UriParseReason::InvalidTypeCast));
            }
            self.segments.push(UriResource::TypeCast(cast.fqn().clone()));
            self.binding_path.push(cast.fqn().to_string());
            self.current = Some(cast.as_edm_type());
            if let Some(args) = args {
                self.key(index, segment, args)?;
            }
            return Ok(());
        }

        let Some(binding_type) = binding_type else {
            return Err(Error::not_found(ResourceKind::Operation, name).at_segment(index));
        };
        let parameters = self.parameters(index, segment, args)?;
        let names: Vec<&str> = parameters.iter().map(|p| p.name.as_str()).collect();
        let operation = edm
            .resolve_bound_operation(binding_type, &fqn, self.collection, &names)
            .map_err(|e| e.at_segment(index))?;
        if operation.kind == OperationKind::Action && !parameters.is_empty() {
            return Err(uri_error(index, segment, UriParseReason::InvalidParameter));
        }
        let parameters = self.typed_parameters(index, segment, operation, parameters)?;
        self.segments.push(UriResource::Operation {
            name: operation.fqn.clone(),
            kind: operation.kind,
            parameters,
            return_type: operation.return_type.clone(),
        });
        self.binding = operation
            .entity_set_path
            .as_deref()
            .and_then(|path| self.entity_set_path_target(path));
        self.after_operation(operation);
        Ok(())
    }

    fn key(&mut self, index: usize, segment: &str, args: &str) -> Result<(), Error> {
        let edm = self.edm;
        let entity_type = match &self.current {
            Some(EdmType::Entity(fqn)) if self.collection => edm.resolve_type(fqn)?,
            _ => return Err(uri_error(index, segment, UriParseReason::KeyNotAllowed)),
        };
        let keys = self.key_predicate(index, segment, args, entity_type)?;
        self.segments.push(UriResource::Key(keys));
        self.collection = false;
        Ok(())
    }

    fn key_predicate(
        &self,
        index: usize,
        segment: &str,
        args: &str,
        entity_type: &EdmStructuredType,
    ) -> Result<Vec<KeyPredicate>, Error> {
        let invalid = |reason: String| Error::InvalidKeyPredicate {
            index,
            segment: segment.to_owned(),
            reason,
        };
        let items = split_arguments(args)
            .ok_or_else(|| uri_error(index, segment, UriParseReason::MalformedKeyPredicate))?;
        let key = entity_type.key();

        let mut supplied: HashMap<&str, &str> = HashMap::new();
        match items.as_slice() {
            [(None, value)] => {
                let [single] = key else {
                    return Err(invalid(format!(
                        "type `{}` has a composite key; name every key property",
                        entity_type.fqn()
                    )));
                };
                supplied.insert(single.as_str(), *value);
            }
            _ => {
                for (name, value) in &items {
                    let Some(name) = name else {
                        return Err(invalid("positional and named key values cannot be mixed".to_owned()));
                    };
                    if !key.iter().any(|k| k == name) {
                        return Err(invalid(format!("`{name}` is not a key property")));
                    }
                    if supplied.insert(*name, *value).is_some() {
                        return Err(invalid(format!("key property `{name}` given more than once")));
                    }
                }
            }
        }

        let mut predicates = Vec::with_capacity(key.len());
        for property in entity_type.key_properties() {
            let Some(literal) = supplied.get(property.name.as_str()) else {
                return Err(invalid(format!("missing key property `{}`", property.name)));
            };
            if is_null_literal(literal) {
                return Err(invalid(format!("key property `{}` cannot be null", property.name)));
            }
            if !self.limits.key_literal_fits(literal) {
                return Err(invalid(format!("key property `{}` value is too long", property.name)));
            }
            let kind = property
                .primitive_kind()
                .ok_or_else(|| invalid(format!("key property `{}` is not primitive", property.name)))?;
            let value = from_uri_literal(kind, literal, &property.facets)
                .map_err(|err| invalid(err.to_string()))?;
            let canonical = to_uri_literal(kind, &value, &property.facets)
                .unwrap_or_else(|_| (*literal).to_owned());
            predicates.push(KeyPredicate {
                name: property.name.clone(),
                value,
                literal: canonical,
            });
        }
        Ok(predicates)
    }

    fn parameters(
        &self,
        index: usize,
        segment: &str,
        args: Option<&str>,
    ) -> Result<Vec<OperationParameter>, Error> {
        let Some(args) = args.filter(|a| !a.trim().is_empty()) else {
            return Ok(Vec::new());
        };
        let items = split_arguments(args)
            .ok_or_else(|| uri_error(index, segment, UriParseReason::InvalidParameter))?;
        let mut parameters: Vec<OperationParameter> = Vec::with_capacity(items.len());
        for (name, literal) in items {
            let Some(name) = name else {
                return Err(uri_error(index, segment, UriParseReason::InvalidParameter));
            };
            if parameters.iter().any(|p| p.name == name) {
                return Err(uri_error(index, segment, UriParseReason::InvalidParameter));
            }
            parameters.push(OperationParameter {
                name: name.to_owned(),
                literal: literal.to_owned(),
                value: None,
            });
        }
        Ok(parameters)
    }

    /// Parse literals of primitive parameters; aliases and `null` stay untyped.
    fn typed_parameters(
        &self,
        index: usize,
        segment: &str,
        operation: &EdmOperation,
        mut parameters: Vec<OperationParameter>,
    ) -> Result<Vec<OperationParameter>, Error> {
        for parameter in &mut parameters {
            if parameter.literal.starts_with('@') || is_null_literal(&parameter.literal) {
                continue;
            }
            let Some(declared) = operation.parameter(&parameter.name) else {
                continue;
            };
            if let EdmType::Primitive(kind) = declared.ty
                && !declared.collection
            {
                let value = from_uri_literal(kind, &parameter.literal, &declared.facets)
                    .map_err(|_| uri_error(index, segment, UriParseReason::InvalidParameter))?;
                parameter.value = Some(value);
            }
        }
        Ok(parameters)
    }

    fn after_operation(&mut self, operation: &EdmOperation) {
        self.binding_path.clear();
        match &operation.return_type {
            Some(ret) => {
                self.current = Some(ret.ty.clone());
                self.collection = ret.collection;
                self.terminal =
                    !(operation.kind == OperationKind::Function && operation.is_composable);
                if !ret.ty.is_entity() {
                    self.binding = None;
                }
            }
            None => {
                self.current = None;
                self.collection = false;
                self.terminal = true;
                self.binding = None;
            }
        }
    }

    fn terminate(&mut self, segment: UriResource) {
        self.segments.push(segment);
        self.terminal = true;
    }

    /// Entity set reached by navigating `nav` from the current binding.
    fn follow_binding(&mut self, nav: &EdmNavigationProperty) {
        let binding = self.binding.take();
        let path = std::mem::take(&mut self.binding_path);
        if nav.contains_target {
            return;
        }
        let container = self.container;
        let Some(target) = binding.and_then(|b| container.binding_target(&b)) else {
            return;
        };
        let full = if path.is_empty() {
            nav.name.clone()
        } else {
            format!("{}/{}", path.join("/"), nav.name)
        };
        self.binding = target
            .navigation_target(&full)
            .or_else(|| target.navigation_target(&nav.name))
            .map(str::to_owned);
    }

    /// Resolve an operation's entity set path (`binding/Nav/...`) from the current binding.
    fn entity_set_path_target(&self, path: &str) -> Option<String> {
        let mut segments = path.split('/');
        segments.next()?;
        let mut current = self.binding.clone()?;
        for nav in segments {
            let target = self.container.binding_target(&current)?;
            current = target.navigation_target(nav)?.to_owned();
        }
        Some(current)
    }
}
