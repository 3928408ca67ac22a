use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use std::error;
use std::fmt;

use super::{Cell, Kind, text};

/// A value could not be converted between two kinds.
///
/// Carries both kind names and the rendered source value. The materializer and merger wrap it
/// into an [`crate::error::ErrorKind::TypeMismatch`] that also names the field path.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionError {
    from: Kind,
    to: Kind,
    value: String,
    reason: Option<&'static str>,
}

impl CoercionError {
    pub fn new(from: Kind, to: Kind, value: impl Into<String>) -> Self {
        Self {
            from,
            to,
            value: value.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn source_kind(&self) -> Kind {
        self.from
    }

    pub fn target_kind(&self) -> Kind {
        self.to
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot coerce {} to {} (value: `{}`)",
            self.from, self.to, self.value
        )?;
        if let Some(reason) = self.reason {
            write!(f, ": {reason}")?;
        }

        Ok(())
    }
}

impl error::Error for CoercionError {}

/// Converts `cell` into the representation of `target`.
///
/// Rules:
/// - identical kinds are returned unchanged;
/// - text is parsed with the target's canonical grammar (see [`text::parse`]);
/// - every scalar renders to canonical text;
/// - integers widen to decimals, decimals narrow to integers only when integral and in range;
/// - integers and timestamps convert through epoch milliseconds;
/// - any other pair, and every pair involving [`Kind::Structured`], is a mismatch.
pub fn coerce(cell: Cell, target: Kind) -> Result<Cell, CoercionError> {
    if cell.kind() == target {
        return Ok(cell);
    }

    match (cell, target) {
        (Cell::Text(s), target) => text::parse(target, &s),
        (cell, Kind::Text) => Ok(Cell::Text(text::render(&cell))),
        (Cell::Integer(i), Kind::Decimal) => Ok(Cell::Decimal(BigDecimal::from(i))),
        (Cell::Decimal(d), Kind::Integer) => {
            let integer = if d.is_integer() { d.to_i64() } else { None };
            integer.map(Cell::Integer).ok_or_else(|| {
                CoercionError::new(Kind::Decimal, Kind::Integer, d.to_string())
                    .with_reason("decimal is not an integral value within range")
            })
        }
        (Cell::Integer(millis), Kind::Timestamp) => {
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map(Cell::Timestamp)
                .ok_or_else(|| {
                    CoercionError::new(Kind::Integer, Kind::Timestamp, millis.to_string())
                        .with_reason("epoch milliseconds out of range")
                })
        }
        (Cell::Timestamp(ts), Kind::Integer) => Ok(Cell::Integer(ts.timestamp_millis())),
        (cell, target) => Err(CoercionError::new(cell.kind(), target, text::render(&cell))
            .with_reason("no coercion rule between these kinds")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn same_kind_is_identity() {
        let cell = Cell::Text("0042".to_string());
        assert_eq!(coerce(cell.clone(), Kind::Text).unwrap(), cell);
    }

    #[test]
    fn integer_reads_as_text() {
        assert_eq!(
            coerce(Cell::Integer(123), Kind::Text).unwrap(),
            Cell::Text("123".to_string())
        );
    }

    #[test]
    fn text_reads_as_integer() {
        assert_eq!(
            coerce(Cell::Text("123".to_string()), Kind::Integer).unwrap(),
            Cell::Integer(123)
        );
    }

    #[test]
    fn unparseable_text_is_a_mismatch() {
        let err = coerce(Cell::Text("12a".to_string()), Kind::Integer).unwrap_err();
        assert_eq!(err.source_kind(), Kind::Text);
        assert_eq!(err.target_kind(), Kind::Integer);
        assert_eq!(err.value(), "12a");
    }

    #[test]
    fn integer_widens_to_decimal() {
        assert_eq!(
            coerce(Cell::Integer(7), Kind::Decimal).unwrap(),
            Cell::Decimal(BigDecimal::from(7))
        );
    }

    #[test]
    fn integral_decimal_narrows_to_integer() {
        let decimal = BigDecimal::from_str("12.000").unwrap();
        assert_eq!(
            coerce(Cell::Decimal(decimal), Kind::Integer).unwrap(),
            Cell::Integer(12)
        );
    }

    #[test]
    fn fractional_decimal_does_not_narrow() {
        let decimal = BigDecimal::from_str("12.5").unwrap();
        let err = coerce(Cell::Decimal(decimal), Kind::Integer).unwrap_err();
        assert_eq!(err.source_kind(), Kind::Decimal);
        assert_eq!(err.target_kind(), Kind::Integer);
    }

    #[test]
    fn timestamp_converts_through_epoch_millis() {
        let ts = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        let millis = coerce(Cell::Timestamp(ts), Kind::Integer).unwrap();
        assert_eq!(millis, Cell::Integer(ts.timestamp_millis()));
        assert_eq!(coerce(millis, Kind::Timestamp).unwrap(), Cell::Timestamp(ts));
    }

    #[test]
    fn boolean_to_timestamp_has_no_rule() {
        let err = coerce(Cell::Bool(true), Kind::Timestamp).unwrap_err();
        assert_eq!(err.source_kind(), Kind::Boolean);
        assert_eq!(err.target_kind(), Kind::Timestamp);
        assert!(err.to_string().contains("no coercion rule"));
    }

    #[test]
    fn nothing_coerces_to_structured() {
        assert!(coerce(Cell::Integer(1), Kind::Structured).is_err());
        assert!(coerce(Cell::Text("{}".to_string()), Kind::Structured).is_err());
    }
}
