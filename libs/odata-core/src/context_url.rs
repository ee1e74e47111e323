//! Context URLs (`@odata.context`).
//!
//! Layout: `[root/]$metadata#` then the entity set or singleton, its key, the
//! navigation/property path, the select list in parentheses and finally the
//! suffix (`/$entity` or `/$delta`). References use `$ref` / `Collection($ref)`; results
//! outside any entity set use the type name, wrapped in `Collection(...)`
//! when collection-valued.

use crate::edm::{Edm, EdmStructuredType};
use crate::query::QueryOptions;
use crate::uri::{UriResource, UriResourcePath, key_text};
use crate::Error;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextUrlSuffix {
    /// `/$entity`: the payload is exactly one entity.
    Entity,
    /// `/$delta`: the payload lists changes to an entity set.
    Delta,
    /// `$ref`
    Reference,
    /// `Collection($ref)`
    CollectionRef,
}

/// Input to [`ContextUrl::new`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextUrlParts {
    /// Prepended to `$metadata` when set.
    pub service_root: Option<String>,
    /// Entity set or singleton name.
    pub entity_set: Option<String>,
    /// Rendered key of the entity set step, e.g. `('russellwhyte')`.
    pub key_path: Option<String>,
    /// Navigation and property path below the entity set, keys included.
    pub navigation_path: Option<String>,
    /// Qualified type name for results without an entity set.
    pub type_name: Option<String>,
    /// Wrap `type_name` in `Collection(...)`.
    pub collection: bool,
    pub select_list: Option<String>,
    pub suffix: Option<ContextUrlSuffix>,
}

/// Immutable, validated context URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextUrl {
    parts: ContextUrlParts,
    text: String,
}

impl ContextUrl {
    /// # Errors
    /// `Error::Format` for contradictory parts: references combined with a
    /// path or type, no (or both) entity set and type name, a key or path
    /// without entity set, an empty select list, `/$entity` on a
    /// collection or type name, or `/$delta` without entity set.
    pub fn new(parts: ContextUrlParts) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::format("context URL", reason);
        let is_reference = matches!(
            parts.suffix,
            Some(ContextUrlSuffix::Reference | ContextUrlSuffix::CollectionRef)
        );
        let has_path = parts.entity_set.is_some()
            || parts.key_path.is_some()
            || parts.navigation_path.is_some()
            || parts.type_name.is_some()
            || parts.select_list.is_some();

        if is_reference {
            if has_path {
                return Err(invalid("a reference context has no path, type or select list"));
            }
        } else {
            match (&parts.entity_set, &parts.type_name) {
                (Some(_), Some(_)) => {
                    return Err(invalid("entity set and type name are mutually exclusive"));
                }
                (None, None) => return Err(invalid("either an entity set or a type name is required")),
                _ => {}
            }
            if parts.entity_set.is_none()
                && (parts.key_path.is_some() || parts.navigation_path.is_some())
            {
                return Err(invalid("a key or navigation path requires an entity set"));
            }
            if parts.suffix == Some(ContextUrlSuffix::Entity)
                && (parts.entity_set.is_none() || parts.collection)
            {
                return Err(invalid("/$entity requires a single entity of an entity set"));
            }
            if parts.suffix == Some(ContextUrlSuffix::Delta) && parts.entity_set.is_none() {
                return Err(invalid("/$delta requires an entity set"));
            }
        }
        if parts.select_list.as_deref().is_some_and(str::is_empty) {
            return Err(invalid("select list must be absent rather than empty"));
        }

        let text = render(&parts);
        Ok(Self { parts, text })
    }

    #[must_use]
    pub fn parts(&self) -> &ContextUrlParts {
        &self.parts
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Context URL for the payload addressed by `path` with `options`.
    ///
    /// `None` for `$count`, `$value` and actions without a result.
    ///
    /// # Errors
    /// `ResourceNotFound` if a type of the path vanished from `edm`.
    pub fn for_path(
        edm: &Edm,
        path: &UriResourcePath,
        options: &QueryOptions,
        service_root: Option<&str>,
    ) -> Result<Option<Self>, Error> {
        if path.is_count() || path.is_value() {
            return Ok(None);
        }
        let mut parts = ContextUrlParts {
            service_root: service_root.map(str::to_owned),
            ..ContextUrlParts::default()
        };
        if path.is_ref() {
            parts.suffix = Some(if path.is_collection() {
                ContextUrlSuffix::CollectionRef
            } else {
                ContextUrlSuffix::Reference
            });
            return Self::new(parts).map(Some);
        }
        let Some(target) = path.target_type() else {
            return Ok(None);
        };
        if let Some(fqn) = target.structured_name() {
            parts.select_list = build_select_list(edm, edm.resolve_type(fqn)?, options);
        }

        let segments = path.segments();
        let via_operation = segments.iter().any(|s| {
            matches!(s, UriResource::Operation { .. } | UriResource::OperationImport { .. })
        });
        let via_navigation = segments
            .iter()
            .any(|s| matches!(s, UriResource::Navigation { .. }));
        let single = !path.is_collection();

        // entities that live in a known set are described by that set
        if target.is_entity()
            && (via_operation || via_navigation)
            && let Some(set) = path.binding_target()
        {
            parts.entity_set = Some(set.to_owned());
            if single && edm.entity_set(set).is_some() {
                parts.suffix = Some(ContextUrlSuffix::Entity);
            }
            return Self::new(parts).map(Some);
        }
        if via_operation {
            parts.type_name = Some(target.to_string());
            parts.collection = path.is_collection();
            return Self::new(parts).map(Some);
        }

        path_parts(&mut parts, segments, target.is_entity() && single);
        Self::new(parts).map(Some)
    }
}

struct Step {
    text: String,
    key: Option<String>,
    navigation: bool,
}

fn path_parts(parts: &mut ContextUrlParts, segments: &[UriResource], single_entity: bool) {
    let mut steps: Vec<Step> = Vec::new();
    let mut from_singleton = false;
    for segment in segments {
        match segment {
            UriResource::EntitySet { name, .. } => parts.entity_set = Some(name.clone()),
            UriResource::Singleton { name, .. } => {
                parts.entity_set = Some(name.clone());
                from_singleton = true;
            }
            UriResource::Key(keys) => {
                let text = key_text(keys);
                match steps.last_mut() {
                    Some(step) => step.key = Some(text),
                    None => parts.key_path = Some(text),
                }
            }
            UriResource::Navigation { name, .. } | UriResource::Property { name, .. } => {
                steps.push(Step {
                    text: name.clone(),
                    key: None,
                    navigation: matches!(segment, UriResource::Navigation { .. }),
                });
            }
            UriResource::TypeCast(fqn) => steps.push(Step {
                text: fqn.to_string(),
                key: None,
                navigation: false,
            }),
            _ => {}
        }
    }

    if single_entity {
        // the key of the final entity step is replaced by `/$entity`
        match steps.iter().rposition(|s| s.navigation) {
            Some(start) => steps[start..].iter_mut().for_each(|s| s.key = None),
            None => {
                parts.key_path = None;
                steps.iter_mut().for_each(|s| s.key = None);
            }
        }
        let singleton_itself = from_singleton && !steps.iter().any(|s| s.navigation);
        if !singleton_itself {
            parts.suffix = Some(ContextUrlSuffix::Entity);
        }
    }

    if !steps.is_empty() {
        let path: Vec<String> = steps
            .into_iter()
            .map(|s| match s.key {
                Some(key) => format!("{}{key}", s.text),
                None => s.text,
            })
            .collect();
        parts.navigation_path = Some(path.join("/"));
    }
}

/// Select list in declaration order with nested `Nav(...)` lists of expanded
/// navigation properties; `None` without `$select` or when it covers every
/// structural property.
#[must_use]
pub fn build_select_list(
    edm: &Edm,
    target: &EdmStructuredType,
    options: &QueryOptions,
) -> Option<String> {
    let select = options.select.as_ref().filter(|s| !s.is_star())?;

    let structural: Vec<&str> = target
        .properties()
        .iter()
        .map(|p| p.name.as_str())
        .filter(|name| select.contains(name))
        .collect();
    let navigation: Vec<&str> = target
        .navigation_properties()
        .iter()
        .map(|n| n.name.as_str())
        .filter(|name| select.contains(name))
        .collect();
    let other: Vec<&str> = select
        .items()
        .iter()
        .map(String::as_str)
        .filter(|item| !structural.contains(item) && !navigation.contains(item))
        .collect();
    if structural.len() == target.properties().len() && navigation.is_empty() && other.is_empty() {
        return None;
    }

    let mut items: Vec<String> = structural
        .into_iter()
        .chain(navigation)
        .chain(other)
        .map(str::to_owned)
        .collect();
    for item in options.expand.iter().flat_map(|e| e.items()) {
        if item.is_star || item.is_ref {
            continue;
        }
        let nested = target
            .navigation_property(item.navigation_name())
            .and_then(|nav| edm.find_type(&nav.target))
            .and_then(|ty| build_select_list(edm, ty, &item.options));
        if let Some(nested) = nested {
            items.push(format!("{}({nested})", item.path));
        }
    }
    Some(items.join(","))
}

fn render(parts: &ContextUrlParts) -> String {
    let mut out = String::new();
    if let Some(root) = &parts.service_root {
        out.push_str(root.trim_end_matches('/'));
        out.push('/');
    }
    out.push_str("$metadata#");
    match parts.suffix {
        Some(ContextUrlSuffix::Reference) => {
            out.push_str("$ref");
            return out;
        }
        Some(ContextUrlSuffix::CollectionRef) => {
            out.push_str("Collection($ref)");
            return out;
        }
        _ => {}
    }

    if let Some(set) = &parts.entity_set {
        out.push_str(set);
        if let Some(key) = &parts.key_path {
            out.push_str(key);
        }
        if let Some(path) = &parts.navigation_path {
            out.push('/');
            out.push_str(path);
        }
    } else if let Some(type_name) = &parts.type_name {
        if parts.collection {
            out.push_str("Collection(");
            out.push_str(type_name);
            out.push(')');
        } else {
            out.push_str(type_name);
        }
    }
    if let Some(select) = &parts.select_list {
        out.push('(');
        out.push_str(select);
        out.push(')');
    }
    match parts.suffix {
        Some(ContextUrlSuffix::Entity) => out.push_str("/$entity"),
        Some(ContextUrlSuffix::Delta) => out.push_str("/$delta"),
        _ => {}
    }
    out
}

impl fmt::Display for ContextUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_render_parts() {
        let url = ContextUrl::new(ContextUrlParts {
            entity_set: Some("People".to_owned()),
            key_path: Some("('russellwhyte')".to_owned()),
            navigation_path: Some("Trips".to_owned()),
            suffix: Some(ContextUrlSuffix::Entity),
            ..ContextUrlParts::default()
        })
        .unwrap();
        assert_eq!(url.as_str(), "$metadata#People('russellwhyte')/Trips/$entity");
    }

    #[test]
    fn test_type_name_collection() {
        let url = ContextUrl::new(ContextUrlParts {
            service_root: Some("http://host/service/".to_owned()),
            type_name: Some("Edm.String".to_owned()),
            collection: true,
            ..ContextUrlParts::default()
        })
        .unwrap();
        assert_eq!(url.to_string(), "http://host/service/$metadata#Collection(Edm.String)");
    }

    #[test]
    fn test_delta_suffix_follows_select_list() {
        let url = ContextUrl::new(ContextUrlParts {
            service_root: Some("http://host/service".to_owned()),
            entity_set: Some("People".to_owned()),
            select_list: Some("UserName,FirstName".to_owned()),
            suffix: Some(ContextUrlSuffix::Delta),
            ..ContextUrlParts::default()
        })
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://host/service/$metadata#People(UserName,FirstName)/$delta"
        );
    }

    #[test]
    fn test_references() {
        let single = ContextUrl::new(ContextUrlParts {
            suffix: Some(ContextUrlSuffix::Reference),
            ..ContextUrlParts::default()
        })
        .unwrap();
        assert_eq!(single.as_str(), "$metadata#$ref");
        let many = ContextUrl::new(ContextUrlParts {
            suffix: Some(ContextUrlSuffix::CollectionRef),
            ..ContextUrlParts::default()
        })
        .unwrap();
        assert_eq!(many.as_str(), "$metadata#Collection($ref)");
    }

    #[test]
    fn test_factory_rejects_contradictions() {
        let cases = [
            ContextUrlParts::default(),
            ContextUrlParts {
                entity_set: Some("People".to_owned()),
                type_name: Some("Edm.String".to_owned()),
                ..ContextUrlParts::default()
            },
            ContextUrlParts {
                entity_set: Some("People".to_owned()),
                suffix: Some(ContextUrlSuffix::Reference),
                ..ContextUrlParts::default()
            },
            ContextUrlParts {
                entity_set: Some("People".to_owned()),
                select_list: Some(String::new()),
                ..ContextUrlParts::default()
            },
            ContextUrlParts {
                type_name: Some("Ns.Person".to_owned()),
                suffix: Some(ContextUrlSuffix::Entity),
                ..ContextUrlParts::default()
            },
            ContextUrlParts {
                type_name: Some("Ns.Person".to_owned()),
                collection: true,
                suffix: Some(ContextUrlSuffix::Delta),
                ..ContextUrlParts::default()
            },
        ];
        for parts in cases {
            assert!(ContextUrl::new(parts.clone()).is_err(), "{parts:?}");
        }
    }
}
