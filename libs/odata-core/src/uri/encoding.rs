//! Percent-encoding sets for resource paths and query values.

use crate::Error;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::borrow::Cow;

/// Path segment: keeps unreserved characters and the sub-delimiters
/// `!$&'()*+,;=`; encodes `:`, `/`, `%`, `@` and the rest.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Query option value: keeps `$'(),;=:@/?*!` so nested options stay
/// readable; encodes `&`, `+`, `#`, `%` and space (as `%20`).
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[must_use]
pub fn encode_path_segment(text: &str) -> Cow<'_, str> {
    utf8_percent_encode(text, PATH_SEGMENT).into()
}

#[must_use]
pub fn encode_query_value(text: &str) -> Cow<'_, str> {
    utf8_percent_encode(text, QUERY_VALUE).into()
}

/// Decode `%XX` escapes; the result must be UTF-8.
///
/// # Errors
/// `Error::UriParse` with `InvalidEncoding` at segment `index`.
pub fn decode(text: &str, index: usize) -> Result<Cow<'_, str>, Error> {
    percent_decode_str(text)
        .decode_utf8()
        .map_err(|_| Error::UriParse {
            index,
            segment: text.to_owned(),
            reason: super::UriParseReason::InvalidEncoding,
        })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment_keeps_sub_delims() {
        assert_eq!(
            encode_path_segment("PropertyString='First',T=07:16"),
            "PropertyString='First',T=07%3A16"
        );
        assert_eq!(encode_path_segment("a/b%c d"), "a%2Fb%25c%20d");
    }

    #[test]
    fn test_query_value_spaces_are_percent_twenty() {
        assert_eq!(encode_query_value("blue OR green"), "blue%20OR%20green");
        assert_eq!(encode_query_value("a+b&c"), "a%2Bb%26c");
        assert_eq!(
            encode_query_value("ProductDetails($expand=ProductInfo;$select=Price)"),
            "ProductDetails($expand=ProductInfo;$select=Price)"
        );
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert_eq!(decode("O%27Neil", 0).unwrap(), "O'Neil");
        assert!(decode("%FF", 3).is_err());
    }
}
