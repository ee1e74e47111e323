//! Client-side URI builder
//!
//! Composes resource paths and query options without a model. Literals are
//! rendered with the canonical codecs and percent-encoded per segment; query
//! option values are encoded with `%20` for spaces.
//!
//! # Example
//!
//! ```
//! use odata_core::uri::UriBuilder;
//! use odata_core::query::{ExpandItem, QueryOptions};
//!
//! let uri = UriBuilder::new("http://host/service/")
//!     .entity_set("Products")
//!     .key(5)
//!     .expand(ExpandItem::new("ProductDetails").with_options(
//!         QueryOptions::new()
//!             .with_expand(ExpandItem::new("ProductInfo"))
//!             .with_select(["Price"]),
//!     ))
//!     .expand(ExpandItem::new("Orders"))
//!     .build()
//!     .unwrap();
//! assert_eq!(
//!     uri,
//!     "http://host/service/Products(5)?$expand=ProductDetails($expand=ProductInfo;$select=Price),Orders"
//! );
//! ```

use super::encoding::encode_path_segment;
use crate::query::{ExpandItem, QueryOptions};
use crate::types::PrimitiveValue;
use crate::Error;

/// Fluent builder for request URIs.
#[derive(Debug, Clone)]
pub struct UriBuilder {
    service_root: String,
    segments: Vec<String>,
    options: QueryOptions,
    error: Option<Error>,
}

impl UriBuilder {
    /// Start at `service_root`; an empty root yields a relative URI.
    pub fn new(service_root: impl Into<String>) -> Self {
        let mut service_root = service_root.into();
        while service_root.ends_with('/') {
            service_root.pop();
        }
        Self {
            service_root,
            segments: Vec::new(),
            options: QueryOptions::default(),
            error: None,
        }
    }

    fn push(mut self, segment: String) -> Self {
        self.segments.push(segment);
        self
    }

    fn fail(mut self, error: Error) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Append `(...)` to the last segment.
    fn append_to_last(mut self, text: &str) -> Self {
        match self.segments.last_mut() {
            Some(last) => {
                last.push_str(text);
                self
            }
            None => self.fail(Error::format("key predicate", "no segment to attach to")),
        }
    }

    #[must_use]
    pub fn entity_set(self, name: &str) -> Self {
        self.push(encode_path_segment(name).into_owned())
    }

    #[must_use]
    pub fn singleton(self, name: &str) -> Self {
        self.entity_set(name)
    }

    /// Single-property key: `(value)`.
    #[must_use]
    pub fn key(self, value: impl Into<PrimitiveValue>) -> Self {
        match literal(&value.into()) {
            Ok(text) => self.append_to_last(&format!("({text})")),
            Err(err) => self.fail(err),
        }
    }

    /// Composite key: `(k1=v1,k2=v2)` in the given order.
    #[must_use]
    pub fn composite_key(self, keys: &[(&str, PrimitiveValue)]) -> Self {
        match name_value_list(keys) {
            Ok(text) => self.append_to_last(&format!("({text})")),
            Err(err) => self.fail(err),
        }
    }

    #[must_use]
    pub fn navigation(self, name: &str) -> Self {
        self.push(encode_path_segment(name).into_owned())
    }

    #[must_use]
    pub fn property(self, name: &str) -> Self {
        self.navigation(name)
    }

    /// Derived-type segment, e.g. `Model.VipCustomer`.
    #[must_use]
    pub fn type_cast(self, qualified_name: &str) -> Self {
        self.push(qualified_name.to_owned())
    }

    /// Function segment; always rendered with parentheses.
    #[must_use]
    pub fn function(self, qualified_name: &str, parameters: &[(&str, PrimitiveValue)]) -> Self {
        match name_value_list(parameters) {
            Ok(text) => self.push(format!("{qualified_name}({text})")),
            Err(err) => self.fail(err),
        }
    }

    #[must_use]
    pub fn action(self, qualified_name: &str) -> Self {
        self.push(qualified_name.to_owned())
    }

    #[must_use]
    pub fn count(self) -> Self {
        self.push("$count".to_owned())
    }

    #[must_use]
    pub fn value(self) -> Self {
        self.push("$value".to_owned())
    }

    #[must_use]
    pub fn reference(self) -> Self {
        self.push("$ref".to_owned())
    }

    #[must_use]
    pub fn metadata(self) -> Self {
        self.push("$metadata".to_owned())
    }

    /// `$entity?$id=...`
    #[must_use]
    pub fn entity_id(mut self, id: impl Into<String>) -> Self {
        self.options.id = Some(id.into());
        self.push("$entity".to_owned())
    }

    /// `$ref?$id=...`, used to delete a reference from a collection.
    #[must_use]
    pub fn reference_id(mut self, id: impl Into<String>) -> Self {
        self.options.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn crossjoin(self, entity_sets: &[&str]) -> Self {
        let names: Vec<String> = entity_sets
            .iter()
            .map(|s| encode_path_segment(s).into_owned())
            .collect();
        self.push(format!("$crossjoin({})", names.join(",")))
    }

    #[must_use]
    pub fn all(self) -> Self {
        self.push("$all".to_owned())
    }

    /// Replace all query options.
    #[must_use]
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn select<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.with_select(items);
        self
    }

    #[must_use]
    pub fn expand(mut self, item: ExpandItem) -> Self {
        self.options = self.options.with_expand(item);
        self
    }

    /// `$count=true|false` query option.
    #[must_use]
    pub fn inline_count(mut self, count: bool) -> Self {
        self.options.count = Some(count);
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.options.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.options.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, orderby: impl Into<String>) -> Self {
        self.options.orderby = Some(orderby.into());
        self
    }

    #[must_use]
    pub fn top(mut self, top: u64) -> Self {
        self.options.top = Some(top);
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn custom(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.custom.push((name.into(), value.into()));
        self
    }

    /// Render the URI.
    ///
    /// # Errors
    /// The first literal that could not be formatted, or a key without a
    /// preceding segment.
    pub fn build(self) -> Result<String, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut out = self.service_root;
        let path = self.segments.join("/");
        if !out.is_empty() && !path.is_empty() {
            out.push('/');
        }
        out.push_str(&path);
        let query = self.options.to_query_string();
        if !query.is_empty() {
            out.push('?');
            out.push_str(&query);
        }
        Ok(out)
    }
}

fn literal(value: &PrimitiveValue) -> Result<String, Error> {
    Ok(encode_path_segment(&value.to_uri_literal()?).into_owned())
}

fn name_value_list(pairs: &[(&str, PrimitiveValue)]) -> Result<String, Error> {
    let rendered = pairs
        .iter()
        .map(|(name, value)| Ok(format!("{name}={}", literal(value)?)))
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(rendered.join(","))
}
