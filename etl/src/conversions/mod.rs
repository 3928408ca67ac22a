use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::fmt;

pub mod bool;
pub mod coerce;
pub mod scalar;
pub mod text;

pub use coerce::{CoercionError, coerce};
pub use scalar::ScalarField;

/// The closed set of value kinds a record field can be declared as or stored as.
///
/// [`Kind::Structured`] describes nested objects and maps. Those are never stored as a single
/// [`Cell`]; they are flattened into one path per leaf instead, so no scalar coercion applies
/// to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Text,
    Integer,
    Decimal,
    Boolean,
    Timestamp,
    Structured,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Text => "text",
            Kind::Integer => "integer",
            Kind::Decimal => "decimal",
            Kind::Boolean => "boolean",
            Kind::Timestamp => "timestamp",
            Kind::Structured => "structured",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single leaf value in a record store.
///
/// Timestamps are kept as UTC instants, whatever offset they were written with.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Decimal(BigDecimal),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Cell {
    /// Returns the [`Kind`] this cell is currently stored as.
    pub fn kind(&self) -> Kind {
        match self {
            Cell::Text(_) => Kind::Text,
            Cell::Integer(_) => Kind::Integer,
            Cell::Decimal(_) => Kind::Decimal,
            Cell::Bool(_) => Kind::Boolean,
            Cell::Timestamp(_) => Kind::Timestamp,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&text::render(self))
    }
}
