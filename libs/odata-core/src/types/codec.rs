//! Canonical text codecs for EDM primitive values.
//!
//! `format` and `parse` are inverse for every value the kind can represent:
//! `parse(k, &format(k, v, f)?, f)? == v`.

use super::{Facets, PrimitiveTypeKind, PrimitiveValue, geo, temporal};
use crate::Error;
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use bigdecimal::BigDecimal;
use std::str::FromStr;
use uuid::Uuid;

/// Exponents beyond this are rejected so that plain rendering stays bounded.
const MAX_DECIMAL_EXPONENT: i64 = 6144;

/// Format `value` as the canonical text of `kind`.
///
/// Integral values are accepted by any wider integral kind, and by `Decimal`,
/// `Single` and `Double`, provided the value fits. Every other kind requires
/// the matching variant.
///
/// # Errors
/// Returns `Error::Format` if the variant does not match `kind` or the value
/// violates `facets`.
pub fn format(
    kind: PrimitiveTypeKind,
    value: &PrimitiveValue,
    facets: &Facets,
) -> Result<String, Error> {
    let mismatch = || {
        Error::format(
            kind,
            format!("value of type {} does not match", value.variant_name()),
        )
    };

    match kind {
        PrimitiveTypeKind::Boolean => match value {
            PrimitiveValue::Boolean(b) => Ok(b.to_string()),
            _ => Err(mismatch()),
        },
        PrimitiveTypeKind::Byte
        | PrimitiveTypeKind::SByte
        | PrimitiveTypeKind::Int16
        | PrimitiveTypeKind::Int32
        | PrimitiveTypeKind::Int64 => {
            let n = value.as_i64().ok_or_else(mismatch)?;
            if integral_fits(kind, n) {
                Ok(n.to_string())
            } else {
                Err(Error::format(kind, format!("{n} is out of range")))
            }
        }
        PrimitiveTypeKind::Decimal => {
            let decimal = match value {
                PrimitiveValue::Decimal(d) => d.clone(),
                other => BigDecimal::from(other.as_i64().ok_or_else(mismatch)?),
            };
            check_decimal(&decimal, facets).map_err(|reason| Error::format(kind, reason))?;
            Ok(render_decimal(&decimal))
        }
        PrimitiveTypeKind::Single => match value {
            PrimitiveValue::Single(v) => Ok(render_float(f64::from(*v), true)),
            other => {
                let n = other.as_i64().ok_or_else(mismatch)?;
                let small = i16::try_from(n).map_err(|_| mismatch())?;
                Ok(render_float(f64::from(small), true))
            }
        },
        PrimitiveTypeKind::Double => match value {
            PrimitiveValue::Double(v) => Ok(render_float(*v, false)),
            PrimitiveValue::Single(v) => Ok(render_float(f64::from(*v), false)),
            other => {
                let n = other.as_i64().ok_or_else(mismatch)?;
                let exact = i32::try_from(n).map_err(|_| mismatch())?;
                Ok(render_float(f64::from(exact), false))
            }
        },
        PrimitiveTypeKind::String => match value {
            PrimitiveValue::String(s) => {
                check_string(s, facets).map_err(|reason| Error::format(kind, reason))?;
                Ok(s.clone())
            }
            _ => Err(mismatch()),
        },
        PrimitiveTypeKind::Binary => match value {
            PrimitiveValue::Binary(bytes) => {
                check_max_length(bytes.len(), facets)
                    .map_err(|reason| Error::format(kind, reason))?;
                Ok(URL_SAFE_NO_PAD.encode(bytes))
            }
            _ => Err(mismatch()),
        },
        PrimitiveTypeKind::Guid => match value {
            PrimitiveValue::Guid(id) => Ok(id.hyphenated().to_string()),
            _ => Err(mismatch()),
        },
        PrimitiveTypeKind::Date => match value {
            PrimitiveValue::Date(d) => Ok(temporal::format_date(*d)),
            _ => Err(mismatch()),
        },
        PrimitiveTypeKind::DateTimeOffset => match value {
            PrimitiveValue::DateTimeOffset(dt) => temporal::format_date_time_offset(dt, facets),
            _ => Err(mismatch()),
        },
        PrimitiveTypeKind::TimeOfDay => match value {
            PrimitiveValue::TimeOfDay(t) => temporal::format_time_of_day(*t, facets),
            _ => Err(mismatch()),
        },
        PrimitiveTypeKind::Duration => match value {
            PrimitiveValue::Duration(d) => temporal::format_duration(*d, facets),
            _ => Err(mismatch()),
        },
        PrimitiveTypeKind::Stream => Err(Error::format(kind, "stream values have no text form")),
        PrimitiveTypeKind::Geography(_) | PrimitiveTypeKind::Geometry(_) => match value {
            PrimitiveValue::Geo(g) => geo::format_geo(kind, g, facets),
            _ => Err(mismatch()),
        },
    }
}

/// Parse the canonical text of `kind`.
///
/// # Errors
/// Returns `Error::Parse` on malformed text or a facet violation.
pub fn parse(
    kind: PrimitiveTypeKind,
    text: &str,
    facets: &Facets,
) -> Result<PrimitiveValue, Error> {
    let bad = |reason: &str| Error::parse(kind, text, reason);

    match kind {
        PrimitiveTypeKind::Boolean => {
            if text.eq_ignore_ascii_case("true") {
                Ok(PrimitiveValue::Boolean(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(PrimitiveValue::Boolean(false))
            } else {
                Err(bad("expected `true` or `false`"))
            }
        }
        PrimitiveTypeKind::Byte => text
            .parse::<u8>()
            .map(PrimitiveValue::Byte)
            .map_err(|_| bad("not a Byte")),
        PrimitiveTypeKind::SByte => text
            .parse::<i8>()
            .map(PrimitiveValue::SByte)
            .map_err(|_| bad("not an SByte")),
        PrimitiveTypeKind::Int16 => text
            .parse::<i16>()
            .map(PrimitiveValue::Int16)
            .map_err(|_| bad("not an Int16")),
        PrimitiveTypeKind::Int32 => text
            .parse::<i32>()
            .map(PrimitiveValue::Int32)
            .map_err(|_| bad("not an Int32")),
        PrimitiveTypeKind::Int64 => text
            .parse::<i64>()
            .map(PrimitiveValue::Int64)
            .map_err(|_| bad("not an Int64")),
        PrimitiveTypeKind::Decimal => {
            if !is_decimal_syntax(text) {
                return Err(bad("malformed decimal"));
            }
            let decimal = BigDecimal::from_str(text).map_err(|_| bad("malformed decimal"))?;
            check_decimal(&decimal, facets).map_err(|reason| bad(&reason))?;
            Ok(PrimitiveValue::Decimal(decimal))
        }
        PrimitiveTypeKind::Single => {
            let v = parse_float(text).ok_or_else(|| bad("malformed floating point value"))?;
            let single = text
                .parse::<f32>()
                .map_err(|_| bad("malformed floating point value"))?;
            if single.is_infinite() && v.is_finite() {
                return Err(bad("out of range for Single"));
            }
            Ok(PrimitiveValue::Single(single))
        }
        PrimitiveTypeKind::Double => {
            let v = parse_float(text).ok_or_else(|| bad("malformed floating point value"))?;
            if v.is_infinite() && !is_special_float(text) {
                return Err(bad("out of range for Double"));
            }
            Ok(PrimitiveValue::Double(v))
        }
        PrimitiveTypeKind::String => {
            check_string(text, facets).map_err(|reason| bad(&reason))?;
            Ok(PrimitiveValue::String(text.to_owned()))
        }
        PrimitiveTypeKind::Binary => {
            let bytes = [URL_SAFE_NO_PAD, URL_SAFE, STANDARD, STANDARD_NO_PAD]
                .iter()
                .find_map(|engine| engine.decode(text).ok())
                .ok_or_else(|| bad("not base64 encoded"))?;
            check_max_length(bytes.len(), facets).map_err(|reason| bad(&reason))?;
            Ok(PrimitiveValue::Binary(bytes))
        }
        PrimitiveTypeKind::Guid => {
            if !is_hyphenated_guid(text) {
                return Err(bad("expected 8-4-4-4-12 hexadecimal groups"));
            }
            Uuid::parse_str(text)
                .map(PrimitiveValue::Guid)
                .map_err(|_| bad("not a GUID"))
        }
        PrimitiveTypeKind::Date => temporal::parse_date(text).map(PrimitiveValue::Date),
        PrimitiveTypeKind::DateTimeOffset => {
            temporal::parse_date_time_offset(text, facets).map(PrimitiveValue::DateTimeOffset)
        }
        PrimitiveTypeKind::TimeOfDay => {
            temporal::parse_time_of_day(text, facets).map(PrimitiveValue::TimeOfDay)
        }
        PrimitiveTypeKind::Duration => {
            temporal::parse_duration(text, facets).map(PrimitiveValue::Duration)
        }
        PrimitiveTypeKind::Stream => Err(bad("stream values have no text form")),
        PrimitiveTypeKind::Geography(_) | PrimitiveTypeKind::Geometry(_) => {
            geo::parse_geo(kind, text, facets).map(PrimitiveValue::Geo)
        }
    }
}

fn integral_fits(kind: PrimitiveTypeKind, n: i64) -> bool {
    match kind {
        PrimitiveTypeKind::Byte => u8::try_from(n).is_ok(),
        PrimitiveTypeKind::SByte => i8::try_from(n).is_ok(),
        PrimitiveTypeKind::Int16 => i16::try_from(n).is_ok(),
        PrimitiveTypeKind::Int32 => i32::try_from(n).is_ok(),
        _ => true,
    }
}

fn check_max_length(len: usize, facets: &Facets) -> Result<(), String> {
    match facets.max_length {
        Some(max) if usize::try_from(max).is_ok_and(|max| len > max) => {
            Err(format!("length {len} exceeds MaxLength {max}"))
        }
        _ => Ok(()),
    }
}

fn check_string(s: &str, facets: &Facets) -> Result<(), String> {
    check_max_length(s.chars().count(), facets)?;
    if facets.unicode == Some(false) && !s.is_ascii() {
        return Err("non-ASCII text where Unicode=false".to_owned());
    }
    Ok(())
}

/// Sign, significant digits and scale of the normalized decimal.
fn decimal_parts(value: &BigDecimal) -> (bool, String, i64) {
    let (int, scale) = value.normalized().into_bigint_and_exponent();
    let text = int.to_string();
    match text.strip_prefix('-') {
        Some(digits) => (true, digits.to_owned(), scale),
        None => (false, text, scale),
    }
}

fn check_decimal(value: &BigDecimal, facets: &Facets) -> Result<(), String> {
    let (_, digits, scale) = decimal_parts(value);
    if scale.abs() > MAX_DECIMAL_EXPONENT {
        return Err("exponent out of range".to_owned());
    }
    let len = i64::try_from(digits.len()).map_err(|_| "too many digits".to_owned())?;
    let fraction = scale.max(0);
    let integer = if digits == "0" { 0 } else { (len - scale).max(0) };

    if let Some(max_scale) = facets.scale
        && fraction > i64::from(max_scale)
    {
        return Err(format!("{fraction} fractional digits exceed Scale {max_scale}"));
    }
    if let Some(precision) = facets.precision {
        let precision = i64::from(precision);
        if integer + fraction > precision {
            return Err(format!(
                "{} significant digits exceed Precision {precision}",
                integer + fraction
            ));
        }
        if let Some(max_scale) = facets.scale
            && integer > precision - i64::from(max_scale)
        {
            return Err(format!(
                "{integer} integer digits exceed Precision {precision} minus Scale {max_scale}"
            ));
        }
    }
    Ok(())
}

/// Plain (non-exponent) rendering without trailing fractional zeros.
pub(crate) fn render_decimal(value: &BigDecimal) -> String {
    let (negative, digits, scale) = decimal_parts(value);
    if digits == "0" {
        return "0".to_owned();
    }
    let body = if scale <= 0 {
        let zeros = usize::try_from(scale.unsigned_abs()).unwrap_or(0);
        format!("{digits}{}", "0".repeat(zeros))
    } else {
        let scale = usize::try_from(scale).unwrap_or(usize::MAX);
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            format!("{int}.{frac}")
        } else {
            format!("0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    };
    if negative { format!("-{body}") } else { body }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn is_decimal_syntax(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let mantissa_ok = match mantissa.split_once('.') {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => all_digits(mantissa),
    };
    let exponent_ok = exponent.is_none_or(|e| all_digits(e.strip_prefix(['+', '-']).unwrap_or(e)));
    mantissa_ok && exponent_ok
}

fn is_special_float(text: &str) -> bool {
    matches!(text, "INF" | "-INF" | "NaN")
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ if is_decimal_syntax(text) => text.parse::<f64>().ok(),
        _ => None,
    }
}

/// Shortest text that reads back to the same value; exponent form outside a
/// readable magnitude window.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn render_float(v: f64, single: bool) -> String {
    if v.is_nan() {
        return "NaN".to_owned();
    }
    if v.is_infinite() {
        return if v > 0.0 { "INF" } else { "-INF" }.to_owned();
    }
    let magnitude = v.abs();
    let plain = magnitude == 0.0 || (1e-6..1e16).contains(&magnitude);
    match (single, plain) {
        (true, true) => format!("{}", v as f32),
        (true, false) => format!("{:e}", v as f32),
        (false, true) => format!("{v}"),
        (false, false) => format!("{v:e}"),
    }
}

fn is_hyphenated_guid(text: &str) -> bool {
    let groups: Vec<&str> = text.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn facets_precision(precision: u32, scale: u32) -> Facets {
        Facets {
            precision: Some(precision),
            scale: Some(scale),
            ..Facets::NONE
        }
    }

    #[test]
    fn test_integral_widening_and_range() {
        let v = PrimitiveValue::Byte(255);
        assert_eq!(format(PrimitiveTypeKind::Int16, &v, &Facets::NONE).unwrap(), "255");
        let big = PrimitiveValue::Int32(70_000);
        assert!(matches!(
            format(PrimitiveTypeKind::Int16, &big, &Facets::NONE),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_string_into_int16_is_mismatch() {
        let err = format(
            PrimitiveTypeKind::Int16,
            &PrimitiveValue::from("wrong"),
            &Facets::NONE,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Edm.Int16"));
    }

    #[test]
    fn test_decimal_plain_rendering() {
        for (input, expected) in [
            ("34", "34"),
            ("34.000", "34"),
            ("-0.050", "-0.05"),
            ("1.5E3", "1500"),
            ("0", "0"),
            ("12.3400", "12.34"),
        ] {
            let d = BigDecimal::from_str(input).unwrap();
            assert_eq!(render_decimal(&d), expected, "input {input}");
        }
    }

    #[test]
    fn test_decimal_facets() {
        let value = PrimitiveValue::Decimal(BigDecimal::from_str("123.45").unwrap());
        assert!(format(PrimitiveTypeKind::Decimal, &value, &facets_precision(5, 2)).is_ok());
        assert!(format(PrimitiveTypeKind::Decimal, &value, &facets_precision(5, 1)).is_err());
        assert!(format(PrimitiveTypeKind::Decimal, &value, &facets_precision(4, 2)).is_err());
        assert!(parse(PrimitiveTypeKind::Decimal, "1234.5", &facets_precision(5, 2)).is_err());
    }

    #[test]
    fn test_decimal_syntax() {
        assert!(is_decimal_syntax("-1.5e10"));
        assert!(is_decimal_syntax("+7"));
        assert!(!is_decimal_syntax("1."));
        assert!(!is_decimal_syntax(".5"));
        assert!(!is_decimal_syntax("1e"));
        assert!(!is_decimal_syntax("0x10"));
    }

    #[test]
    fn test_float_special_values() {
        let nan = parse(PrimitiveTypeKind::Double, "NaN", &Facets::NONE).unwrap();
        assert!(matches!(nan, PrimitiveValue::Double(v) if v.is_nan()));
        assert_eq!(render_float(f64::NEG_INFINITY, false), "-INF");
        assert!(parse(PrimitiveTypeKind::Double, "inf", &Facets::NONE).is_err());
        assert!(parse(PrimitiveTypeKind::Single, "1e40", &Facets::NONE).is_err());
        assert!(parse(PrimitiveTypeKind::Double, "1e400", &Facets::NONE).is_err());
    }

    #[test]
    fn test_float_rendering() {
        assert_eq!(render_float(1.5, false), "1.5");
        assert_eq!(render_float(1e300, false), "1e300");
        assert_eq!(render_float(f64::from(0.1_f32), true), "0.1");
    }

    #[test]
    fn test_string_facets() {
        let facets = Facets {
            max_length: Some(3),
            unicode: Some(false),
            ..Facets::NONE
        };
        assert!(parse(PrimitiveTypeKind::String, "abc", &facets).is_ok());
        assert!(parse(PrimitiveTypeKind::String, "abcd", &facets).is_err());
        assert!(parse(PrimitiveTypeKind::String, "\u{e4}b", &facets).is_err());
    }

    #[test]
    fn test_binary_accepts_padding_and_standard_alphabet() {
        let expected = PrimitiveValue::Binary(vec![0xfb, 0xff]);
        for text in ["-_8", "-_8=", "+/8=", "+/8"] {
            assert_eq!(
                parse(PrimitiveTypeKind::Binary, text, &Facets::NONE).unwrap(),
                expected,
                "input {text}"
            );
        }
        assert_eq!(
            format(PrimitiveTypeKind::Binary, &expected, &Facets::NONE).unwrap(),
            "-_8"
        );
    }

    #[test]
    fn test_guid_lowercase_hyphenated() {
        let text = "01234567-89AB-CDEF-0123-456789ABCDEF";
        let value = parse(PrimitiveTypeKind::Guid, text, &Facets::NONE).unwrap();
        assert_eq!(
            format(PrimitiveTypeKind::Guid, &value, &Facets::NONE).unwrap(),
            "01234567-89ab-cdef-0123-456789abcdef"
        );
        assert!(parse(PrimitiveTypeKind::Guid, "0123456789abcdef0123456789abcdef", &Facets::NONE).is_err());
    }

    #[test]
    fn test_boolean_case_insensitive_parse() {
        assert_eq!(
            parse(PrimitiveTypeKind::Boolean, "TRUE", &Facets::NONE).unwrap(),
            PrimitiveValue::Boolean(true)
        );
        assert!(parse(PrimitiveTypeKind::Boolean, "1", &Facets::NONE).is_err());
    }

    #[test]
    fn test_stream_has_no_text_form() {
        assert!(parse(PrimitiveTypeKind::Stream, "x", &Facets::NONE).is_err());
    }
}
