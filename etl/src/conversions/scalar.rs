use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive};
use chrono::{DateTime, FixedOffset, Utc};

use super::{Cell, CoercionError, Kind, coerce};

/// A Rust type that can be declared as a scalar field of a [`crate::record::Shape`].
///
/// [`ScalarField::KIND`] is the kind recorded in the shape's field descriptor table. Reading
/// goes through [`coerce`] first, so a field can be read from a cell stored under any kind
/// that has a coercion rule into [`ScalarField::KIND`].
pub trait ScalarField: Sized {
    const KIND: Kind;

    /// Converts the field value into its stored representation.
    fn to_cell(&self) -> Result<Cell, CoercionError>;

    /// Reads the field value back out of a stored cell.
    fn from_cell(cell: Cell) -> Result<Self, CoercionError>;
}

impl ScalarField for String {
    const KIND: Kind = Kind::Text;

    fn to_cell(&self) -> Result<Cell, CoercionError> {
        Ok(Cell::Text(self.clone()))
    }

    fn from_cell(cell: Cell) -> Result<Self, CoercionError> {
        match coerce(cell, Kind::Text)? {
            Cell::Text(s) => Ok(s),
            other => Err(unexpected(other, Kind::Text)),
        }
    }
}

impl ScalarField for i64 {
    const KIND: Kind = Kind::Integer;

    fn to_cell(&self) -> Result<Cell, CoercionError> {
        Ok(Cell::Integer(*self))
    }

    fn from_cell(cell: Cell) -> Result<Self, CoercionError> {
        match coerce(cell, Kind::Integer)? {
            Cell::Integer(i) => Ok(i),
            other => Err(unexpected(other, Kind::Integer)),
        }
    }
}

/// Narrower integer types are stored as `i64` and range checked on the way out.
macro_rules! narrow_integer_field {
    ($($ty:ty),*) => {
        $(
            impl ScalarField for $ty {
                const KIND: Kind = Kind::Integer;

                fn to_cell(&self) -> Result<Cell, CoercionError> {
                    Ok(Cell::Integer(i64::from(*self)))
                }

                fn from_cell(cell: Cell) -> Result<Self, CoercionError> {
                    let value = i64::from_cell(cell)?;
                    <$ty>::try_from(value).map_err(|_| {
                        CoercionError::new(Kind::Integer, Kind::Integer, value.to_string())
                            .with_reason(concat!("out of range for ", stringify!($ty)))
                    })
                }
            }
        )*
    };
}

narrow_integer_field!(i16, i32, u32);

impl ScalarField for BigDecimal {
    const KIND: Kind = Kind::Decimal;

    fn to_cell(&self) -> Result<Cell, CoercionError> {
        Ok(Cell::Decimal(self.clone()))
    }

    fn from_cell(cell: Cell) -> Result<Self, CoercionError> {
        match coerce(cell, Kind::Decimal)? {
            Cell::Decimal(d) => Ok(d),
            other => Err(unexpected(other, Kind::Decimal)),
        }
    }
}

impl ScalarField for f64 {
    const KIND: Kind = Kind::Decimal;

    fn to_cell(&self) -> Result<Cell, CoercionError> {
        BigDecimal::from_f64(*self).map(Cell::Decimal).ok_or_else(|| {
            CoercionError::new(Kind::Decimal, Kind::Decimal, self.to_string())
                .with_reason("only finite floating point values can be stored")
        })
    }

    fn from_cell(cell: Cell) -> Result<Self, CoercionError> {
        let decimal = BigDecimal::from_cell(cell)?;
        decimal.to_f64().ok_or_else(|| {
            CoercionError::new(Kind::Decimal, Kind::Decimal, decimal.to_string())
                .with_reason("out of range for f64")
        })
    }
}

impl ScalarField for bool {
    const KIND: Kind = Kind::Boolean;

    fn to_cell(&self) -> Result<Cell, CoercionError> {
        Ok(Cell::Bool(*self))
    }

    fn from_cell(cell: Cell) -> Result<Self, CoercionError> {
        match coerce(cell, Kind::Boolean)? {
            Cell::Bool(b) => Ok(b),
            other => Err(unexpected(other, Kind::Boolean)),
        }
    }
}

impl ScalarField for DateTime<Utc> {
    const KIND: Kind = Kind::Timestamp;

    fn to_cell(&self) -> Result<Cell, CoercionError> {
        Ok(Cell::Timestamp(*self))
    }

    fn from_cell(cell: Cell) -> Result<Self, CoercionError> {
        match coerce(cell, Kind::Timestamp)? {
            Cell::Timestamp(ts) => Ok(ts),
            other => Err(unexpected(other, Kind::Timestamp)),
        }
    }
}

/// Offsets are not kept: the value is stored as a UTC instant and read back with a `+00:00`
/// offset. Equality on [`DateTime`] compares instants, so a read value still equals the
/// written one.
impl ScalarField for DateTime<FixedOffset> {
    const KIND: Kind = Kind::Timestamp;

    fn to_cell(&self) -> Result<Cell, CoercionError> {
        Ok(Cell::Timestamp(self.with_timezone(&Utc)))
    }

    fn from_cell(cell: Cell) -> Result<Self, CoercionError> {
        DateTime::<Utc>::from_cell(cell).map(|ts| ts.fixed_offset())
    }
}

fn unexpected(cell: Cell, target: Kind) -> CoercionError {
    CoercionError::new(cell.kind(), target, cell.to_string())
}
