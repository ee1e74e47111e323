//! System query options: `$select`, `$expand` (nested), `$count`, `$levels`,
//! `$search` and the pass-through options.
//!
//! Top-level options render `&`-separated with percent-encoded values; nested
//! `$expand` options render `;`-separated inside `Name(...)`, unencoded, and
//! get encoded once as part of the enclosing value.

mod parser;

pub use parser::{parse_query, parse_query_for};

use crate::edm::{Edm, EdmStructuredType};
use crate::limits::ODataLimits;
use crate::uri::encoding::encode_query_value;
use crate::Error;
use std::fmt;

/// `$select` items; insertion order kept, each name at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectOption {
    items: Vec<String>,
}

impl SelectOption {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item`; returns `false` if it was already selected.
    pub fn insert(&mut self, item: impl Into<String>) -> bool {
        let item = item.into();
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    #[must_use]
    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }

    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `*` selects every structural property.
    #[must_use]
    pub fn is_star(&self) -> bool {
        self.contains("*")
    }
}

impl<S: Into<String>> FromIterator<S> for SelectOption {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut select = SelectOption::new();
        for item in iter {
            select.insert(item);
        }
        select
    }
}

impl fmt::Display for SelectOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.items.join(","))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Levels {
    Max,
    Depth(u32),
}

impl Levels {
    /// Concrete depth, with `max` bounded by `max_depth`.
    #[must_use]
    pub fn resolve(self, max_depth: u32) -> u32 {
        match self {
            Levels::Max => max_depth,
            Levels::Depth(depth) => depth.min(max_depth),
        }
    }
}

impl fmt::Display for Levels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Levels::Max => f.write_str("max"),
            Levels::Depth(depth) => depth.fmt(f),
        }
    }
}

/// One `$expand` item: a navigation path with its nested options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandItem {
    /// Navigation property name, optionally behind a type cast (`Ns.Type/Nav`).
    pub path: String,
    /// `Nav/$ref`: expand references only.
    pub is_ref: bool,
    /// `*`: every navigation property.
    pub is_star: bool,
    pub options: QueryOptions,
}

impl ExpandItem {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_ref: false,
            is_star: false,
            options: QueryOptions::default(),
        }
    }

    #[must_use]
    pub fn star() -> Self {
        Self {
            is_star: true,
            ..Self::new("*")
        }
    }

    #[must_use]
    pub fn reference(mut self) -> Self {
        self.is_ref = true;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Navigation property name without any type-cast prefix.
    #[must_use]
    pub fn navigation_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&self.path);
        if self.is_ref {
            out.push_str("/$ref");
        }
        let nested = self.options.render(";", false);
        if !nested.is_empty() {
            out.push('(');
            out.push_str(&nested);
            out.push(')');
        }
    }
}

/// Ordered `$expand` items.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpandOption {
    items: Vec<ExpandItem>,
}

impl ExpandOption {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ExpandItem) {
        self.items.push(item);
    }

    #[must_use]
    pub fn items(&self) -> &[ExpandItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item expanding `navigation`, either by name or through `*`.
    #[must_use]
    pub fn get(&self, navigation: &str) -> Option<&ExpandItem> {
        self.items
            .iter()
            .find(|i| !i.is_star && i.navigation_name() == navigation)
            .or_else(|| self.items.iter().find(|i| i.is_star))
    }
}

impl FromIterator<ExpandItem> for ExpandOption {
    fn from_iter<I: IntoIterator<Item = ExpandItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ExpandOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            item.write_to(&mut out);
        }
        f.write_str(&out)
    }
}

/// Parsed or composed query options of one request (or one expand level).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub select: Option<SelectOption>,
    pub expand: Option<ExpandOption>,
    pub count: Option<bool>,
    /// Only valid inside `$expand`.
    pub levels: Option<Levels>,
    pub search: Option<String>,
    /// Raw `$filter` text; expressions are not interpreted here.
    pub filter: Option<String>,
    /// Raw `$orderby` text.
    pub orderby: Option<String>,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub skiptoken: Option<String>,
    pub id: Option<String>,
    pub format: Option<String>,
    /// Non-system options (`name=value`, parameter aliases) in arrival order.
    pub custom: Vec<(String, String)>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_select<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let select = self.select.get_or_insert_with(SelectOption::new);
        for item in items {
            select.insert(item);
        }
        self
    }

    #[must_use]
    pub fn with_expand(mut self, item: ExpandItem) -> Self {
        self.expand.get_or_insert_with(ExpandOption::new).push(item);
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_levels(mut self, levels: Levels) -> Self {
        self.levels = Some(levels);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_orderby(mut self, orderby: impl Into<String>) -> Self {
        self.orderby = Some(orderby.into());
        self
    }

    #[must_use]
    pub fn with_top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    #[must_use]
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn with_skiptoken(mut self, token: impl Into<String>) -> Self {
        self.skiptoken = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_custom(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check every `$select`/`$expand` name against `target`, recursively.
    ///
    /// # Errors
    /// `ResourceNotFound` for unknown properties, navigation properties or
    /// type casts; `InvalidQueryOption` for options that do not apply.
    pub fn validate(
        &self,
        edm: &Edm,
        target: &EdmStructuredType,
        limits: &ODataLimits,
    ) -> Result<(), Error> {
        parser::validate(self, edm, target, limits, 1)
    }

    /// Render as a query string (without the leading `?`).
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.render("&", true)
    }

    fn render(&self, separator: &str, encode: bool) -> String {
        let value = |text: &str| -> String {
            if encode {
                encode_query_value(text).into_owned()
            } else {
                text.to_owned()
            }
        };

        let mut parts: Vec<String> = Vec::new();
        if let Some(id) = &self.id {
            parts.push(format!("$id={}", value(id)));
        }
        if let Some(expand) = &self.expand {
            parts.push(format!("$expand={}", value(&expand.to_string())));
        }
        if let Some(select) = &self.select {
            parts.push(format!("$select={}", value(&select.to_string())));
        }
        if let Some(filter) = &self.filter {
            parts.push(format!("$filter={}", value(filter)));
        }
        if let Some(orderby) = &self.orderby {
            parts.push(format!("$orderby={}", value(orderby)));
        }
        if let Some(search) = &self.search {
            parts.push(format!("$search={}", value(search)));
        }
        if let Some(count) = self.count {
            parts.push(format!("$count={count}"));
        }
        if let Some(top) = self.top {
            parts.push(format!("$top={top}"));
        }
        if let Some(skip) = self.skip {
            parts.push(format!("$skip={skip}"));
        }
        if let Some(token) = &self.skiptoken {
            parts.push(format!("$skiptoken={}", value(token)));
        }
        if let Some(levels) = self.levels {
            parts.push(format!("$levels={levels}"));
        }
        if let Some(format) = &self.format {
            parts.push(format!("$format={}", value(format)));
        }
        for (name, custom) in &self.custom {
            parts.push(format!("{}={}", value(name), value(custom)));
        }
        parts.join(separator)
    }
}

impl fmt::Display for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_nested_expand_renders_semicolons() {
        let options = QueryOptions::new()
            .with_expand(
                ExpandItem::new("ProductDetails").with_options(
                    QueryOptions::new()
                        .with_expand(ExpandItem::new("ProductInfo"))
                        .with_select(["Price"]),
                ),
            )
            .with_expand(ExpandItem::new("Orders"))
            .with_expand(ExpandItem::new("Customers"));
        assert_eq!(
            options.to_query_string(),
            "$expand=ProductDetails($expand=ProductInfo;$select=Price),Orders,Customers"
        );
    }

    #[test]
    fn test_search_space_is_percent_twenty() {
        let options = QueryOptions::new().with_search("blue OR green");
        assert_eq!(options.to_query_string(), "$search=blue%20OR%20green");
    }

    #[test]
    fn test_render_order_is_fixed() {
        let options = QueryOptions::new()
            .with_custom("debug", "1")
            .with_top(5)
            .with_count(true)
            .with_select(["Name", "ID"])
            .with_id("Products(0)");
        assert_eq!(
            options.to_query_string(),
            "$id=Products(0)&$select=Name,ID&$count=true&$top=5&debug=1"
        );
    }

    #[test]
    fn test_select_keeps_insertion_order_and_set_semantics() {
        let mut select: SelectOption = ["B", "A"].into_iter().collect();
        assert!(!select.insert("B"));
        assert!(select.insert("C"));
        assert_eq!(select.to_string(), "B,A,C");
    }

    #[test]
    fn test_expand_get_falls_back_to_star() {
        let expand: ExpandOption = [
            ExpandItem::new("Ns.Derived/Trips").reference(),
            ExpandItem::star(),
        ]
        .into_iter()
        .collect();
        assert!(expand.get("Trips").is_some_and(|i| i.is_ref));
        assert!(expand.get("Friends").is_some_and(|i| i.is_star));
        assert_eq!(expand.to_string(), "Ns.Derived/Trips/$ref,*");
    }

    #[test]
    fn test_levels_resolve_bounds_max() {
        assert_eq!(Levels::Max.resolve(5), 5);
        assert_eq!(Levels::Depth(9).resolve(5), 5);
        assert_eq!(Levels::Depth(2).resolve(5), 2);
    }
}
