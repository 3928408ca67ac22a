use super::{CoercionError, Kind};

/// Parses a boolean from its canonical text form.
///
/// Only the exact lowercase words are accepted:
/// - `"true"` → `true`
/// - `"false"` → `false`
pub fn parse_bool(s: &str) -> Result<bool, CoercionError> {
    match s {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CoercionError::new(Kind::Text, Kind::Boolean, s)
            .with_reason("boolean text must be 'true' or 'false'")),
    }
}
