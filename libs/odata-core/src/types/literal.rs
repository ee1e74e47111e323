//! URI literal decoration on top of the canonical codecs.
//!
//! Strings are single-quoted with embedded quotes doubled; durations, binary
//! and spatial values carry a type prefix (`duration'PT6S'`); everything else
//! is the bare canonical text.

use super::{Facets, PrimitiveTypeKind, PrimitiveValue, codec};
use crate::Error;

pub const NULL_LITERAL: &str = "null";

/// Render `value` as a URI literal of `kind`.
///
/// # Errors
/// Propagates `Error::Format` from the codec.
pub fn to_uri_literal(
    kind: PrimitiveTypeKind,
    value: &PrimitiveValue,
    facets: &Facets,
) -> Result<String, Error> {
    let text = codec::format(kind, value, facets)?;
    Ok(match literal_prefix(kind) {
        Some(prefix) => format!("{prefix}{}", quote(&text)),
        None if kind == PrimitiveTypeKind::String => quote(&text),
        None => text,
    })
}

/// Parse a URI literal of `kind`. `null` is not a value here; callers that
/// accept it check [`is_null_literal`] first.
///
/// # Errors
/// Returns `Error::Parse` when the decoration is missing or the text inside it
/// is not a valid value.
pub fn from_uri_literal(
    kind: PrimitiveTypeKind,
    literal: &str,
    facets: &Facets,
) -> Result<PrimitiveValue, Error> {
    let malformed = |reason: &str| Error::parse(kind, literal, reason);

    let body = match literal_prefix(kind) {
        Some(prefix) => {
            let quoted = literal
                .get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &literal[prefix.len()..])
                .ok_or_else(|| malformed(&format!("expected {prefix}'...'")))?;
            unquote(quoted).ok_or_else(|| malformed("malformed quoted literal"))?
        }
        None if kind == PrimitiveTypeKind::String => {
            unquote(literal).ok_or_else(|| malformed("expected a single-quoted string"))?
        }
        None => literal.to_owned(),
    };
    codec::parse(kind, &body, facets).map_err(|err| match err {
        Error::Parse { reason, .. } => Error::parse(kind, literal, reason),
        other => other,
    })
}

#[must_use]
pub fn is_null_literal(literal: &str) -> bool {
    literal == NULL_LITERAL
}

fn literal_prefix(kind: PrimitiveTypeKind) -> Option<&'static str> {
    match kind {
        PrimitiveTypeKind::Duration => Some("duration"),
        PrimitiveTypeKind::Binary => Some("binary"),
        PrimitiveTypeKind::Geography(_) => Some("geography"),
        PrimitiveTypeKind::Geometry(_) => Some("geometry"),
        _ => None,
    }
}

/// Wrap in single quotes, doubling embedded quotes.
#[must_use]
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Inverse of [`quote`]; `None` if the quoting is broken.
#[must_use]
pub fn unquote(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\'' {
            // a lone quote would have terminated the literal
            if chars.next() != Some('\'') {
                return None;
            }
        }
        out.push(c);
    }
    Some(out)
}
