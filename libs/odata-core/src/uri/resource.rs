use super::encoding::encode_path_segment;
use crate::edm::{EdmReturnType, EdmType, FullQualifiedName, OperationKind};
use crate::types::PrimitiveValue;
use std::fmt;

/// One `name=value` pair of a key predicate, typed by the key property.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyPredicate {
    pub name: String,
    pub value: PrimitiveValue,
    /// Canonical literal text, unencoded.
    pub literal: String,
}

/// Function parameter as written in the path.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationParameter {
    pub name: String,
    /// Literal text, a parameter alias (`@p`) or a JSON value; unencoded.
    pub literal: String,
    /// Typed value for primitive parameters given as literals.
    pub value: Option<PrimitiveValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UriResource {
    EntitySet {
        name: String,
        entity_type: FullQualifiedName,
    },
    Singleton {
        name: String,
        entity_type: FullQualifiedName,
    },
    /// Key predicate in the declared order of the key properties.
    Key(Vec<KeyPredicate>),
    Navigation {
        name: String,
        target: FullQualifiedName,
        collection: bool,
    },
    Property {
        name: String,
        ty: EdmType,
        collection: bool,
    },
    TypeCast(FullQualifiedName),
    /// Bound action or function.
    Operation {
        name: FullQualifiedName,
        kind: OperationKind,
        parameters: Vec<OperationParameter>,
        return_type: Option<EdmReturnType>,
    },
    OperationImport {
        name: String,
        operation: FullQualifiedName,
        kind: OperationKind,
        parameters: Vec<OperationParameter>,
        return_type: Option<EdmReturnType>,
    },
    Count,
    Value,
    Ref,
}

impl UriResource {
    fn write_to(&self, out: &mut String) {
        match self {
            UriResource::EntitySet { name, .. }
            | UriResource::Singleton { name, .. }
            | UriResource::Navigation { name, .. }
            | UriResource::Property { name, .. } => out.push_str(&encode_path_segment(name)),
            UriResource::Key(keys) => write_key(out, keys),
            UriResource::TypeCast(fqn) => out.push_str(&fqn.to_string()),
            UriResource::Operation {
                name,
                kind,
                parameters,
                ..
            } => {
                out.push_str(&name.to_string());
                write_parameters(out, *kind, parameters);
            }
            UriResource::OperationImport {
                name,
                kind,
                parameters,
                ..
            } => {
                out.push_str(&encode_path_segment(name));
                write_parameters(out, *kind, parameters);
            }
            UriResource::Count => out.push_str("$count"),
            UriResource::Value => out.push_str("$value"),
            UriResource::Ref => out.push_str("$ref"),
        }
    }
}

/// `(literal)` or `(k1=v1,k2=v2)`, literals percent-encoded.
pub(crate) fn key_text(keys: &[KeyPredicate]) -> String {
    let mut out = String::new();
    write_key(&mut out, keys);
    out
}

fn write_key(out: &mut String, keys: &[KeyPredicate]) {
    out.push('(');
    if let [single] = keys {
        out.push_str(&encode_path_segment(&single.literal));
    } else {
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&key.name);
            out.push('=');
            out.push_str(&encode_path_segment(&key.literal));
        }
    }
    out.push(')');
}

fn write_parameters(out: &mut String, kind: OperationKind, parameters: &[OperationParameter]) {
    if kind == OperationKind::Action {
        return;
    }
    out.push('(');
    for (i, parameter) in parameters.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&parameter.name);
        out.push('=');
        out.push_str(&encode_path_segment(&parameter.literal));
    }
    out.push(')');
}

/// A parsed resource path together with what it addresses.
#[derive(Clone, Debug, PartialEq)]
pub struct UriResourcePath {
    pub(super) segments: Vec<UriResource>,
    pub(super) target: Option<EdmType>,
    pub(super) collection: bool,
    pub(super) binding: Option<String>,
}

impl UriResourcePath {
    #[must_use]
    pub fn segments(&self) -> &[UriResource] {
        &self.segments
    }

    #[must_use]
    pub fn last(&self) -> Option<&UriResource> {
        self.segments.last()
    }

    /// Type of the addressed resource; `None` for an action without a result.
    /// After `$count`, `$value` or `$ref` this is still the type they apply to.
    #[must_use]
    pub fn target_type(&self) -> Option<&EdmType> {
        self.target.as_ref()
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Entity set or singleton holding the addressed entities, if known.
    #[must_use]
    pub fn binding_target(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    #[must_use]
    pub fn is_count(&self) -> bool {
        matches!(self.last(), Some(UriResource::Count))
    }

    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self.last(), Some(UriResource::Value))
    }

    #[must_use]
    pub fn is_ref(&self) -> bool {
        matches!(self.last(), Some(UriResource::Ref))
    }

    /// Render in canonical form: keys in declared order, a single key without
    /// its name, functions always with parentheses.
    #[must_use]
    pub fn to_path_string(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && !matches!(segment, UriResource::Key(_)) {
                out.push('/');
            }
            segment.write_to(&mut out);
        }
        out
    }
}

impl fmt::Display for UriResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path_string())
    }
}
