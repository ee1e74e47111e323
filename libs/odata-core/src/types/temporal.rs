//! Date, time and duration codecs (ISO 8601 subsets used by OData).

use super::{Facets, PrimitiveTypeKind};
use crate::Error;
use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc,
};

const NANOS_PER_SECOND: u32 = 1_000_000_000;
const MAX_FRACTION_DIGITS: usize = 12;

/// `[-]YYYY-MM-DD`; years beyond four digits are written without a `+`.
pub(super) fn format_date(date: NaiveDate) -> String {
    let sign = if date.year() < 0 { "-" } else { "" };
    format!(
        "{sign}{:04}-{:02}-{:02}",
        date.year().unsigned_abs(),
        date.month(),
        date.day()
    )
}

/// `[-]YYYY[Y..]-MM-DD` with exactly two-digit month and day.
pub(super) fn parse_date(text: &str) -> Result<NaiveDate, Error> {
    let kind = PrimitiveTypeKind::Date;
    let malformed = || Error::parse(kind, text, "expected YYYY-MM-DD");
    let (negative, body) = match text.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, text),
    };
    let mut parts = body.splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };
    if year.len() < 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let (Some(month), Some(day)) = (two_digits(month), two_digits(day)) else {
        return Err(malformed());
    };
    let year: i32 = year
        .parse()
        .map_err(|_| Error::parse(kind, text, "year out of range"))?;
    let year = if negative { -year } else { year };
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::parse(kind, text, "date out of range"))
}

fn render_fraction(nanos: u32, facets: &Facets, kind: PrimitiveTypeKind) -> Result<String, Error> {
    if nanos >= NANOS_PER_SECOND {
        return Err(Error::format(kind, "leap seconds are not representable"));
    }
    if nanos == 0 {
        return Ok(String::new());
    }
    let digits = format!("{nanos:09}");
    let trimmed = digits.trim_end_matches('0');
    if let Some(precision) = facets.precision
        && usize::try_from(precision).is_ok_and(|p| trimmed.len() > p)
    {
        return Err(Error::format(
            kind,
            format!("fractional seconds exceed Precision {precision}"),
        ));
    }
    Ok(format!(".{trimmed}"))
}

/// Parse fractional-second digits into nanoseconds, honouring `Precision`.
fn parse_fraction(
    digits: &str,
    text: &str,
    facets: &Facets,
    kind: PrimitiveTypeKind,
) -> Result<u32, Error> {
    if digits.is_empty()
        || digits.len() > MAX_FRACTION_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(Error::parse(kind, text, "malformed fractional seconds"));
    }
    let significant = digits.trim_end_matches('0');
    if significant.len() > 9 {
        return Err(Error::parse(kind, text, "sub-nanosecond precision"));
    }
    if let Some(precision) = facets.precision
        && usize::try_from(precision).is_ok_and(|p| significant.len() > p)
    {
        return Err(Error::parse(
            kind,
            text,
            format!("fractional seconds exceed Precision {precision}"),
        ));
    }
    let padded = format!("{significant:0<9}");
    padded
        .parse::<u32>()
        .map_err(|_| Error::parse(kind, text, "malformed fractional seconds"))
}

fn two_digits(s: &str) -> Option<u32> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// `HH:MM[:SS[.fffffffff]]`
fn parse_clock(
    clock: &str,
    text: &str,
    facets: &Facets,
    kind: PrimitiveTypeKind,
) -> Result<NaiveTime, Error> {
    let malformed = || Error::parse(kind, text, "expected HH:MM[:SS[.fraction]]");
    let mut parts = clock.split(':');
    let hour = parts.next().and_then(two_digits).ok_or_else(malformed)?;
    let minute = parts.next().and_then(two_digits).ok_or_else(malformed)?;
    let (second, nanos) = match parts.next() {
        None => (0, 0),
        Some(sec) => {
            let (whole, fraction) = match sec.split_once('.') {
                Some((whole, fraction)) => (whole, Some(fraction)),
                None => (sec, None),
            };
            let second = two_digits(whole).ok_or_else(malformed)?;
            let nanos = match fraction {
                Some(f) => parse_fraction(f, text, facets, kind)?,
                None => 0,
            };
            (second, nanos)
        }
    };
    if parts.next().is_some() {
        return Err(malformed());
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(|| Error::parse(kind, text, "time component out of range"))
}

pub(super) fn format_time_of_day(time: NaiveTime, facets: &Facets) -> Result<String, Error> {
    let fraction = render_fraction(time.nanosecond(), facets, PrimitiveTypeKind::TimeOfDay)?;
    Ok(format!("{}{fraction}", time.format("%H:%M:%S")))
}

pub(super) fn parse_time_of_day(text: &str, facets: &Facets) -> Result<NaiveTime, Error> {
    parse_clock(text, text, facets, PrimitiveTypeKind::TimeOfDay)
}

/// Always rendered in UTC with a `Z` designator.
pub(super) fn format_date_time_offset(
    value: &DateTime<Utc>,
    facets: &Facets,
) -> Result<String, Error> {
    let fraction = render_fraction(
        value.timestamp_subsec_nanos(),
        facets,
        PrimitiveTypeKind::DateTimeOffset,
    )?;
    Ok(format!(
        "{}T{}{fraction}Z",
        format_date(value.date_naive()),
        value.format("%H:%M:%S")
    ))
}

pub(super) fn parse_date_time_offset(text: &str, facets: &Facets) -> Result<DateTime<Utc>, Error> {
    let kind = PrimitiveTypeKind::DateTimeOffset;
    let (date, rest) = text
        .split_once('T')
        .ok_or_else(|| Error::parse(kind, text, "missing `T` separator"))?;
    let date = parse_date(date).map_err(|_| Error::parse(kind, text, "malformed date part"))?;

    let (clock, offset_minutes) = if let Some(clock) = rest.strip_suffix(['Z', 'z']) {
        (clock, 0)
    } else {
        let at = rest
            .rfind(['+', '-'])
            .ok_or_else(|| Error::parse(kind, text, "missing time zone offset"))?;
        let (clock, offset) = rest.split_at(at);
        (clock, parse_offset(offset).ok_or_else(|| Error::parse(kind, text, "malformed offset"))?)
    };
    let time = parse_clock(clock, text, facets, kind)?;
    let local = NaiveDateTime::new(date, time);
    let utc = local
        .checked_sub_signed(TimeDelta::minutes(offset_minutes))
        .ok_or_else(|| Error::parse(kind, text, "out of range"))?;
    Ok(Utc.from_utc_datetime(&utc))
}

/// `+HH:MM` / `-HH:MM` in minutes east of UTC.
fn parse_offset(offset: &str) -> Option<i64> {
    let (sign, body) = match offset.split_at_checked(1)? {
        ("+", body) => (1, body),
        ("-", body) => (-1, body),
        _ => return None,
    };
    let (hours, minutes) = body.split_once(':')?;
    let hours = two_digits(hours)?;
    let minutes = two_digits(minutes)?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * i64::from(hours * 60 + minutes))
}

/// `[-]P[nD][T[nH][nM][n[.f]S]]`, `PT0S` for zero.
#[allow(clippy::integer_division)]
pub(super) fn format_duration(value: TimeDelta, facets: &Facets) -> Result<String, Error> {
    let kind = PrimitiveTypeKind::Duration;
    let total = i128::from(value.num_seconds()) * i128::from(NANOS_PER_SECOND)
        + i128::from(value.subsec_nanos());
    let negative = total < 0;
    let total = total.unsigned_abs();
    let per_second = u128::from(NANOS_PER_SECOND);
    let nanos = u32::try_from(total % per_second)
        .map_err(|_| Error::format(kind, "out of range"))?;
    let seconds = total / per_second;

    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    let secs = seconds % 60;

    let mut time = Vec::new();
    if hours > 0 {
        time.push(format!("{hours}H"));
    }
    if minutes > 0 {
        time.push(format!("{minutes}M"));
    }
    if secs > 0 || nanos > 0 {
        let fraction = render_fraction(nanos, facets, kind)?;
        time.push(format!("{secs}{fraction}S"));
    }

    let sign = if negative { "-" } else { "" };
    let days = if days > 0 { format!("{days}D") } else { String::new() };
    let time = match (time.is_empty(), days.is_empty()) {
        (false, _) => format!("T{}", time.concat()),
        (true, true) => "T0S".to_owned(),
        (true, false) => String::new(),
    };
    Ok(format!("{sign}P{days}{time}"))
}

pub(super) fn parse_duration(text: &str, facets: &Facets) -> Result<TimeDelta, Error> {
    let kind = PrimitiveTypeKind::Duration;
    let malformed = || Error::parse(kind, text, "expected [-]P[nD][T[nH][nM][n[.f]S]]");

    let (negative, body) = match text.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, text),
    };
    let body = body.strip_prefix('P').ok_or_else(malformed)?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };
    if date_part.is_empty() && time_part.is_none() {
        return Err(malformed());
    }

    let mut seconds: i64 = 0;
    let mut nanos: u32 = 0;
    if !date_part.is_empty() {
        let days = date_part.strip_suffix('D').ok_or_else(malformed)?;
        seconds = component(days, 86_400).ok_or_else(malformed)?;
    }
    if let Some(mut rest) = time_part {
        if rest.is_empty() {
            return Err(malformed());
        }
        for (designator, unit) in [('H', 3_600), ('M', 60)] {
            if let Some((number, tail)) = rest.split_once(designator)
                && number.bytes().all(|b| b.is_ascii_digit())
            {
                let part = component(number, unit).ok_or_else(malformed)?;
                seconds = seconds.checked_add(part).ok_or_else(malformed)?;
                rest = tail;
            }
        }
        if !rest.is_empty() {
            let number = rest.strip_suffix('S').ok_or_else(malformed)?;
            let (whole, fraction) = match number.split_once('.') {
                Some((whole, fraction)) => (whole, Some(fraction)),
                None => (number, None),
            };
            let part = component(whole, 1).ok_or_else(malformed)?;
            seconds = seconds.checked_add(part).ok_or_else(malformed)?;
            if let Some(fraction) = fraction {
                nanos = parse_fraction(fraction, text, facets, kind)?;
            }
        }
    }

    let delta = TimeDelta::try_seconds(seconds)
        .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(i64::from(nanos))))
        .ok_or_else(|| Error::parse(kind, text, "out of range"))?;
    Ok(if negative { -delta } else { delta })
}

fn component(number: &str, unit: i64) -> Option<i64> {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse::<i64>().ok()?.checked_mul(unit)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_date_shape_is_strict() {
        assert!(parse_date("2012-12-03").is_ok());
        assert!(parse_date("2012-1-03").is_err());
        assert!(parse_date("12-12-03").is_err());
        assert!(parse_date("2012-02-30").is_err());
        assert!(parse_date("+2012-02-03").is_err());
    }

    #[test]
    fn test_years_beyond_four_digits_have_no_sign() {
        let date = NaiveDate::from_ymd_opt(10_000, 1, 1).unwrap();
        assert_eq!(format_date(date), "10000-01-01");
        assert_eq!(parse_date("10000-01-01").unwrap(), date);

        let bc = NaiveDate::from_ymd_opt(-44, 3, 15).unwrap();
        assert_eq!(format_date(bc), "-0044-03-15");
        assert_eq!(parse_date("-0044-03-15").unwrap(), bc);

        let far = Utc.with_ymd_and_hms(12_345, 6, 7, 8, 9, 10).unwrap();
        let text = format_date_time_offset(&far, &Facets::NONE).unwrap();
        assert_eq!(text, "12345-06-07T08:09:10Z");
        assert_eq!(parse_date_time_offset(&text, &Facets::NONE).unwrap(), far);
    }

    #[test]
    fn test_date_time_offset_normalized_to_utc() {
        let parsed = parse_date_time_offset("2012-12-03T08:16:23+01:00", &Facets::NONE).unwrap();
        assert_eq!(
            format_date_time_offset(&parsed, &Facets::NONE).unwrap(),
            "2012-12-03T07:16:23Z"
        );
        let short = parse_date_time_offset("2012-12-03T07:16Z", &Facets::NONE).unwrap();
        assert_eq!(
            format_date_time_offset(&short, &Facets::NONE).unwrap(),
            "2012-12-03T07:16:00Z"
        );
    }

    #[test]
    fn test_fraction_precision() {
        let facets = Facets {
            precision: Some(3),
            ..Facets::NONE
        };
        let t = parse_time_of_day("02:48:21.125", &facets).unwrap();
        assert_eq!(format_time_of_day(t, &facets).unwrap(), "02:48:21.125");
        assert!(parse_time_of_day("02:48:21.1255", &facets).is_err());
        let fine = NaiveTime::from_hms_nano_opt(1, 2, 3, 123_400_000).unwrap();
        assert!(format_time_of_day(fine, &facets).is_err());
        assert_eq!(format_time_of_day(fine, &Facets::NONE).unwrap(), "01:02:03.1234");
    }

    #[test]
    fn test_duration_rendering() {
        let cases = [
            (TimeDelta::seconds(6), "PT6S"),
            (TimeDelta::zero(), "PT0S"),
            (TimeDelta::days(1), "P1D"),
            (TimeDelta::seconds(-3_723), "-PT1H2M3S"),
            (TimeDelta::milliseconds(1_500), "PT1.5S"),
            (TimeDelta::days(2) + TimeDelta::minutes(5), "P2DT5M"),
        ];
        for (value, expected) in cases {
            assert_eq!(format_duration(value, &Facets::NONE).unwrap(), expected);
            assert_eq!(parse_duration(expected, &Facets::NONE).unwrap(), value);
        }
    }

    #[test]
    fn test_duration_rejects_malformed() {
        for text in ["P", "PT", "6S", "PT1H2", "P1DT", "PTxS", "P-1D"] {
            assert!(parse_duration(text, &Facets::NONE).is_err(), "input {text}");
        }
    }

    #[test]
    fn test_offset_bounds() {
        assert_eq!(parse_offset("+05:30"), Some(330));
        assert_eq!(parse_offset("-01:00"), Some(-60));
        assert_eq!(parse_offset("+24:00"), None);
        assert_eq!(parse_offset("05:00"), None);
    }
}
