use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::str::FromStr;

use super::bool::parse_bool;
use super::{Cell, CoercionError, Kind};

/// Timestamp format with a `+HHMM` or `+HH` offset, as written by most SQL engines.
pub const TIMESTAMP_FORMAT_HHMM: &str = "%Y-%m-%d %H:%M:%S%.f%#z";

/// Timestamp format with a `+HH:MM` offset.
pub const TIMESTAMP_FORMAT_HH_MM: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// Parses the canonical text form of `target` into a [`Cell`].
///
/// Grammars:
/// - integer: optional sign followed by decimal digits, fitting in an `i64`;
/// - decimal: any decimal literal accepted by [`BigDecimal`];
/// - boolean: exactly `true` or `false`;
/// - timestamp: RFC 3339, falling back to `YYYY-MM-DD HH:MM:SS[.f]` with an explicit offset.
///
/// Every timestamp is normalized to UTC. Text never parses into [`Kind::Structured`].
pub fn parse(target: Kind, s: &str) -> Result<Cell, CoercionError> {
    match target {
        Kind::Text => Ok(Cell::Text(s.to_string())),
        Kind::Integer => s
            .parse::<i64>()
            .map(Cell::Integer)
            .map_err(|_| mismatch(target, s, "not a valid 64-bit integer")),
        Kind::Decimal => BigDecimal::from_str(s)
            .map(Cell::Decimal)
            .map_err(|_| mismatch(target, s, "not a valid decimal number")),
        Kind::Boolean => Ok(Cell::Bool(parse_bool(s)?)),
        Kind::Timestamp => parse_timestamp(s)
            .map(|ts| Cell::Timestamp(ts.with_timezone(&Utc)))
            .ok_or_else(|| mismatch(target, s, "not a timestamp with an explicit offset")),
        Kind::Structured => Err(mismatch(
            target,
            s,
            "structured values are stored one leaf per path",
        )),
    }
}

/// Renders a [`Cell`] in its canonical text form.
///
/// Integers render without grouping or leading zeros, timestamps as RFC 3339 with an explicit
/// `+00:00` offset and only as many sub-second digits as needed.
pub fn render(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Integer(i) => i.to_string(),
        Cell::Decimal(d) => d.to_string(),
        Cell::Bool(b) => b.to_string(),
        Cell::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, false),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, TIMESTAMP_FORMAT_HH_MM))
        .or_else(|_| DateTime::parse_from_str(s, TIMESTAMP_FORMAT_HHMM))
        .ok()
}

fn mismatch(target: Kind, s: &str, reason: &'static str) -> CoercionError {
    CoercionError::new(Kind::Text, target, s).with_reason(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn parse_integers() {
        assert_eq!(parse(Kind::Integer, "123").unwrap(), Cell::Integer(123));
        assert_eq!(parse(Kind::Integer, "-456").unwrap(), Cell::Integer(-456));
        assert_eq!(
            parse(Kind::Integer, "9223372036854775807").unwrap(),
            Cell::Integer(i64::MAX)
        );
    }

    #[test]
    fn parse_integer_rejects_malformed_text() {
        assert!(parse(Kind::Integer, "").is_err());
        assert!(parse(Kind::Integer, "1,000").is_err());
        assert!(parse(Kind::Integer, " 12").is_err());
        assert!(parse(Kind::Integer, "12.0").is_err());
        assert!(parse(Kind::Integer, "9223372036854775808").is_err());
    }

    #[test]
    fn parse_decimal() {
        let cell = parse(Kind::Decimal, "123.45").unwrap();
        if let Cell::Decimal(d) = cell {
            assert_eq!(d.to_string(), "123.45");
        } else {
            panic!("Expected Decimal cell");
        }

        assert!(parse(Kind::Decimal, "one point five").is_err());
    }

    #[test]
    fn parse_boolean() {
        assert_eq!(parse(Kind::Boolean, "true").unwrap(), Cell::Bool(true));
        assert!(parse(Kind::Boolean, "yes").is_err());
    }

    #[test]
    fn parse_rfc3339_timestamp_normalizes_to_utc() {
        let cell = parse(Kind::Timestamp, "2023-12-25T14:30:45.123+02:00").unwrap();
        if let Cell::Timestamp(ts) = cell {
            assert_eq!(ts.year(), 2023);
            assert_eq!(ts.hour(), 12);
            assert_eq!(ts.minute(), 30);
        } else {
            panic!("Expected Timestamp cell");
        }
    }

    #[test]
    fn parse_sql_style_timestamps() {
        let expected = Utc.with_ymd_and_hms(2023, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(
            parse(Kind::Timestamp, "2023-12-25 14:30:45+00:00").unwrap(),
            Cell::Timestamp(expected)
        );
        assert_eq!(
            parse(Kind::Timestamp, "2023-12-25 14:30:45+00").unwrap(),
            Cell::Timestamp(expected)
        );
    }

    #[test]
    fn parse_timestamp_requires_an_offset() {
        assert!(parse(Kind::Timestamp, "2023-12-25 14:30:45").is_err());
        assert!(parse(Kind::Timestamp, "yesterday").is_err());
    }

    #[test]
    fn render_timestamp_with_explicit_offset() {
        let ts = Utc.with_ymd_and_hms(2023, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(
            render(&Cell::Timestamp(ts)),
            "2023-12-25T14:30:45+00:00".to_string()
        );
    }

    #[test]
    fn render_then_parse_keeps_the_instant() {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let original = offset
            .with_ymd_and_hms(2019, 7, 1, 23, 59, 1)
            .unwrap()
            .with_nanosecond(250_000_000)
            .unwrap();
        let cell = Cell::Timestamp(original.with_timezone(&Utc));

        let reparsed = parse(Kind::Timestamp, &render(&cell)).unwrap();

        assert_eq!(reparsed, cell);
    }

    #[test]
    fn render_integer_without_grouping() {
        assert_eq!(render(&Cell::Integer(1_000_000)), "1000000");
        assert_eq!(render(&Cell::Integer(-7)), "-7");
    }

    #[test]
    fn text_never_parses_into_structured() {
        let err = parse(Kind::Structured, "{}").unwrap_err();
        assert_eq!(err.target_kind(), Kind::Structured);
    }
}
