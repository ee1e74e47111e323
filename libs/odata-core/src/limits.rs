//! Input validation and safety limits for URI and query parsing
//!
//! Caps that keep request parsing bounded:
//! - Maximum number of resource path segments
//! - Maximum `$expand` nesting depth (also what `$levels=max` means)
//! - Maximum number of `$select` items
//! - Maximum `$search` and key literal length

use crate::Error;
use serde::{Deserialize, Serialize};

/// Default configuration for OData input limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ODataLimits {
    /// Maximum number of path segments (default: 32)
    pub max_path_segments: usize,
    /// Maximum `$expand` nesting depth (default: 5)
    pub max_expand_depth: u32,
    /// Maximum number of items in one `$select` (default: 100)
    pub max_select_items: usize,
    /// Maximum length of `$search` in characters (default: 1000)
    pub max_search_length: usize,
    /// Maximum length of a single key literal (default: 512)
    pub max_key_length: usize,
}

impl Default for ODataLimits {
    fn default() -> Self {
        Self {
            max_path_segments: 32,
            max_expand_depth: 5,
            max_select_items: 100,
            max_search_length: 1000,
            max_key_length: 512,
        }
    }
}

impl ODataLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_path_segments(mut self, max: usize) -> Self {
        self.max_path_segments = max;
        self
    }

    #[must_use]
    pub fn with_max_expand_depth(mut self, max: u32) -> Self {
        self.max_expand_depth = max;
        self
    }

    #[must_use]
    pub fn with_max_select_items(mut self, max: usize) -> Self {
        self.max_select_items = max;
        self
    }

    #[must_use]
    pub fn with_max_search_length(mut self, max: usize) -> Self {
        self.max_search_length = max;
        self
    }

    #[must_use]
    pub fn with_max_key_length(mut self, max: usize) -> Self {
        self.max_key_length = max;
        self
    }

    /// Validate the number of path segments
    ///
    /// # Errors
    /// `Error::UriParse` with `TooManySegments`, reported at the first segment over the cap.
    pub fn validate_path_segments(&self, segments: &[&str]) -> Result<(), Error> {
        match segments.get(self.max_path_segments) {
            Some(extra) => Err(Error::UriParse {
                index: self.max_path_segments,
                segment: (*extra).to_owned(),
                reason: crate::UriParseReason::TooManySegments,
            }),
            None => Ok(()),
        }
    }

    /// Validate an `$expand` nesting depth (1 = top level)
    ///
    /// # Errors
    /// `Error::InvalidQueryOption` when deeper than allowed.
    pub fn validate_expand_depth(&self, depth: u32) -> Result<(), Error> {
        if depth > self.max_expand_depth {
            return Err(Error::query(
                "$expand",
                format!("nesting exceeds maximum depth of {}", self.max_expand_depth),
            ));
        }
        Ok(())
    }

    /// # Errors
    /// `Error::InvalidQueryOption` when `$select` lists too many items.
    pub fn validate_select_items(&self, count: usize) -> Result<(), Error> {
        if count > self.max_select_items {
            return Err(Error::query(
                "$select",
                format!("too many items (max: {})", self.max_select_items),
            ));
        }
        Ok(())
    }

    /// # Errors
    /// `Error::InvalidQueryOption` when `$search` is too long.
    pub fn validate_search(&self, search: &str) -> Result<(), Error> {
        if search.chars().count() > self.max_search_length {
            return Err(Error::query(
                "$search",
                format!(
                    "expression exceeds maximum length of {} characters",
                    self.max_search_length
                ),
            ));
        }
        Ok(())
    }

    /// Key literals longer than the cap are rejected before parsing.
    #[must_use]
    pub fn key_literal_fits(&self, literal: &str) -> bool {
        literal.len() <= self.max_key_length
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = ODataLimits::default();
        assert_eq!(limits.max_path_segments, 32);
        assert_eq!(limits.max_expand_depth, 5);
        assert_eq!(limits.max_select_items, 100);
    }

    #[test]
    fn test_validate_path_segments_exceeds() {
        let limits = ODataLimits::new().with_max_path_segments(2);
        assert!(limits.validate_path_segments(&["a", "b"]).is_ok());
        let err = limits.validate_path_segments(&["a", "b", "c"]).unwrap_err();
        assert!(matches!(
            err,
            Error::UriParse {
                index: 2,
                reason: crate::UriParseReason::TooManySegments,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_expand_depth() {
        let limits = ODataLimits::new().with_max_expand_depth(2);
        assert!(limits.validate_expand_depth(2).is_ok());
        assert!(limits.validate_expand_depth(3).is_err());
    }

    #[test]
    fn test_validate_search_counts_chars() {
        let limits = ODataLimits::new().with_max_search_length(3);
        assert!(limits.validate_search("\u{e4}\u{e4}\u{e4}").is_ok());
        assert!(limits.validate_search("abcd").is_err());
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let limits: ODataLimits =
            serde_json::from_value(serde_json::json!({ "max_expand_depth": 3 })).unwrap();
        assert_eq!(limits.max_expand_depth, 3);
        assert_eq!(limits.max_path_segments, 32);
        assert!(
            serde_json::from_value::<ODataLimits>(serde_json::json!({ "max_top": 1 })).is_err()
        );
    }
}
