//! Payload serializers.
//!
//! Every method builds the complete payload in memory and returns it in one
//! piece; nothing is written when serialization fails.

mod json;
mod xml;

pub use json::JsonSerializer;
pub use xml::XmlSerializer;

use crate::context_url::ContextUrl;
use crate::data::{Delta, Entity, EntityCollection, Value};
use crate::edm::{Edm, EdmBindingTarget, EdmProperty, FullQualifiedName};
use crate::problem_mapping::ODataServerError;
use crate::query::{ExpandOption, QueryOptions, SelectOption};
use crate::types::{Facets, PrimitiveValue, codec};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Wire format of a response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ODataFormat {
    /// JSON with minimal metadata.
    #[default]
    Json,
    /// JSON without control information except count and next link.
    #[serde(rename = "json-nometadata")]
    JsonNoMetadata,
    Xml,
}

impl ODataFormat {
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            ODataFormat::Json => "application/json;odata.metadata=minimal",
            ODataFormat::JsonNoMetadata => "application/json;odata.metadata=none",
            ODataFormat::Xml => "application/xml",
        }
    }

    /// Format named by `$format` (`json`, `xml` or a media type).
    #[must_use]
    pub fn from_query_value(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "json" | "application/json" | "application/json;odata.metadata=minimal" => {
                Some(ODataFormat::Json)
            }
            "application/json;odata.metadata=none" => Some(ODataFormat::JsonNoMetadata),
            "xml" | "application/xml" | "application/atom+xml" => Some(ODataFormat::Xml),
            _ => None,
        }
    }
}

/// Advertised bound action or function (`"#Ns.Op": {"title", "target"}`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundProcedure {
    pub name: FullQualifiedName,
    pub title: Option<String>,
    pub target: String,
}

/// Input to [`SerializerOptions::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializerOptionsParts {
    pub context_url: Option<ContextUrl>,
    /// Write `@odata.count` on collections.
    pub count: bool,
    pub expand: Option<ExpandOption>,
    pub select: Option<SelectOption>,
    pub bound_procedures: Vec<BoundProcedure>,
    /// Int64 and Decimal as JSON strings.
    pub ieee754_compatible: bool,
    /// Prefix for `@odata.id` values.
    pub service_root: Option<String>,
    /// Bound for `$levels=max` and nested expansion.
    pub max_expand_depth: u32,
}

impl Default for SerializerOptionsParts {
    fn default() -> Self {
        Self {
            context_url: None,
            count: false,
            expand: None,
            select: None,
            bound_procedures: Vec::new(),
            ieee754_compatible: false,
            service_root: None,
            max_expand_depth: 5,
        }
    }
}

impl SerializerOptionsParts {
    /// Take `$select`, `$expand` and `$count` from parsed query options.
    #[must_use]
    pub fn from_query(context_url: Option<ContextUrl>, query: &QueryOptions) -> Self {
        Self {
            context_url,
            count: query.count.unwrap_or(false),
            expand: query.expand.clone(),
            select: query.select.clone(),
            ..Self::default()
        }
    }
}

/// Immutable per-response serializer options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SerializerOptions {
    parts: SerializerOptionsParts,
}

impl SerializerOptions {
    /// # Errors
    /// `Error::Format` for a bound procedure advertised twice or an expand
    /// tree deeper than `max_expand_depth`.
    pub fn new(parts: SerializerOptionsParts) -> Result<Self, Error> {
        for (i, procedure) in parts.bound_procedures.iter().enumerate() {
            if parts.bound_procedures[..i].iter().any(|p| p.name == procedure.name) {
                return Err(Error::format(
                    "serializer options",
                    format!("bound procedure `{}` listed twice", procedure.name),
                ));
            }
        }
        if let Some(expand) = &parts.expand
            && expand_depth(expand) > parts.max_expand_depth
        {
            return Err(Error::format(
                "serializer options",
                format!("expand nesting exceeds {}", parts.max_expand_depth),
            ));
        }
        Ok(Self { parts })
    }

    #[must_use]
    pub fn context_url(&self) -> Option<&ContextUrl> {
        self.parts.context_url.as_ref()
    }

    #[must_use]
    pub fn count(&self) -> bool {
        self.parts.count
    }

    #[must_use]
    pub fn expand(&self) -> Option<&ExpandOption> {
        self.parts.expand.as_ref()
    }

    #[must_use]
    pub fn select(&self) -> Option<&SelectOption> {
        self.parts.select.as_ref()
    }

    #[must_use]
    pub fn bound_procedures(&self) -> &[BoundProcedure] {
        &self.parts.bound_procedures
    }

    #[must_use]
    pub fn ieee754_compatible(&self) -> bool {
        self.parts.ieee754_compatible
    }

    #[must_use]
    pub fn service_root(&self) -> Option<&str> {
        self.parts.service_root.as_deref()
    }

    #[must_use]
    pub fn max_expand_depth(&self) -> u32 {
        self.parts.max_expand_depth
    }
}

fn expand_depth(expand: &ExpandOption) -> u32 {
    1 + expand
        .items()
        .iter()
        .filter_map(|item| item.options.expand.as_ref())
        .map(expand_depth)
        .max()
        .unwrap_or(0)
}

/// One serializer per wire format.
pub trait ODataSerializer: Send + Sync {
    fn format(&self) -> ODataFormat;

    fn content_type(&self) -> &'static str {
        self.format().content_type()
    }

    /// Service document listing the container's entity sets, singletons
    /// and function imports.
    ///
    /// # Errors
    /// `NotImplemented` if the format does not support it.
    fn service_document(&self, options: &SerializerOptions) -> Result<Vec<u8>, Error>;

    /// # Errors
    /// `Serialization` when the entity does not fit its type; `NotImplemented`
    /// if the format does not support it.
    fn entity(
        &self,
        target: EdmBindingTarget<'_>,
        entity: &Entity,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error>;

    /// # Errors
    /// See [`ODataSerializer::entity`].
    fn entity_collection(
        &self,
        target: EdmBindingTarget<'_>,
        entities: &EntityCollection,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error>;

    /// Primitive, enum or complex property (or operation result), single or collection.
    ///
    /// # Errors
    /// See [`ODataSerializer::entity`].
    fn entity_property(
        &self,
        property: &EdmProperty,
        value: &Value,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error>;

    /// # Errors
    /// `InvalidKeyValue` when the entity id cannot be built.
    fn reference(
        &self,
        target: EdmBindingTarget<'_>,
        entity: &Entity,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error>;

    /// # Errors
    /// See [`ODataSerializer::reference`].
    fn reference_collection(
        &self,
        target: EdmBindingTarget<'_>,
        entities: &EntityCollection,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error>;

    /// Changes to `target`: added or changed entities, then deleted entities,
    /// added links and deleted links, closed by a next or delta link.
    ///
    /// # Errors
    /// `Serialization` for an unbound target or when both a next and a delta
    /// link are set; `NotImplemented` if the format does not support it.
    fn delta(
        &self,
        target: EdmBindingTarget<'_>,
        delta: &Delta,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error>;

    /// Raw text of a primitive value (`$value`).
    ///
    /// # Errors
    /// `Format` when the value violates `facets`.
    fn primitive_value(&self, value: &PrimitiveValue, facets: &Facets) -> Result<Vec<u8>, Error> {
        Ok(codec::format(value.kind(), value, facets)?.into_bytes())
    }

    /// Raw text of a `$count` result.
    ///
    /// # Errors
    /// Never fails for the built-in formats.
    fn count(&self, count: u64) -> Result<Vec<u8>, Error> {
        Ok(count.to_string().into_bytes())
    }

    /// # Errors
    /// `NotImplemented` if the format does not support it.
    fn error(&self, error: &ODataServerError) -> Result<Vec<u8>, Error>;
}

/// Serializer for `format` over `edm`.
#[must_use]
pub fn create_serializer(format: ODataFormat, edm: Arc<Edm>) -> Box<dyn ODataSerializer> {
    match format {
        ODataFormat::Json => Box::new(JsonSerializer::new(edm)),
        ODataFormat::JsonNoMetadata => Box::new(JsonSerializer::without_metadata(edm)),
        ODataFormat::Xml => Box::new(XmlSerializer::new()),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::query::ExpandItem;

    #[test]
    fn test_format_names() {
        assert_eq!(ODataFormat::from_query_value("JSON"), Some(ODataFormat::Json));
        assert_eq!(ODataFormat::from_query_value("xml"), Some(ODataFormat::Xml));
        assert_eq!(ODataFormat::from_query_value("csv"), None);
        let parsed: ODataFormat = serde_json::from_str("\"json-nometadata\"").unwrap();
        assert_eq!(parsed, ODataFormat::JsonNoMetadata);
    }

    #[test]
    fn test_options_factory_validates() {
        let procedure = BoundProcedure {
            name: FullQualifiedName::new("Ns", "Share"),
            title: None,
            target: "People('a')/Ns.Share".to_owned(),
        };
        let twice = SerializerOptionsParts {
            bound_procedures: vec![procedure.clone(), procedure],
            ..SerializerOptionsParts::default()
        };
        assert!(SerializerOptions::new(twice).is_err());

        let deep = ExpandItem::new("A").with_options(QueryOptions::new().with_expand(
            ExpandItem::new("B").with_options(QueryOptions::new().with_expand(ExpandItem::new("C"))),
        ));
        let parts = SerializerOptionsParts {
            expand: Some([deep].into_iter().collect()),
            max_expand_depth: 2,
            ..SerializerOptionsParts::default()
        };
        assert!(SerializerOptions::new(parts).is_err());
    }
}
