use std::error;
use std::fmt;

use crate::conversions::CoercionError;

/// Convenient result type for ETL operations using [`EtlError`] as the error type.
///
/// Most fallible operations in this crate, from reading a view out of a record envelope to
/// submitting work to an executor, return this type.
pub type EtlResult<T> = Result<T, EtlError>;

/// Main error type for ETL operations.
///
/// [`EtlError`] can represent a single error, an error with additional detail, or multiple
/// aggregated errors (for example every failure collected while closing a set of stages).
#[derive(Debug, Clone)]
pub struct EtlError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
///
/// Users should not interact with this type directly but use [`EtlError`] methods instead.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Error with kind and static description
    WithDescription(ErrorKind, &'static str),
    /// Error with kind, static description, and dynamic detail
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    /// Multiple aggregated errors
    Many(Vec<EtlError>),
}

/// Specific categories of errors that can occur while moving records through a pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Record & Coercion Errors
    TypeMismatch,
    InvalidFieldPath,

    // Stage Lifecycle Errors
    InvalidLifecycleUse,
    RejectedWork,
    WorkerPanic,

    // Source & Stage Errors
    BackingFailure,
    TransformFailed,
    ConsumeFailed,

    // Configuration Errors
    ConfigError,

    // IO & Serialization Errors
    IoError,
    SerializationError,
    DeserializationError,

    // Unknown / Uncategorized
    Unknown,
}

impl EtlError {
    /// Creates an [`EtlError`] containing multiple aggregated errors.
    pub fn many(errors: Vec<EtlError>) -> EtlError {
        EtlError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattening aggregated errors.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }
}

impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;

                Ok(())
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;
                f.write_str(" -> ")?;
                detail.fmt(f)?;

                Ok(())
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")?;
                } else if errors.len() == 1 {
                    errors[0].fmt(f)?;
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl error::Error for EtlError {}

/// Creates an [`EtlError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for EtlError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

/// Creates an [`EtlError`] from an error kind, static description, and dynamic detail.
impl From<(ErrorKind, &'static str, String)> for EtlError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

/// Creates an [`EtlError`] from a vector of errors for aggregation.
impl<E> From<Vec<E>> for EtlError
where
    E: Into<EtlError>,
{
    fn from(errors: Vec<E>) -> EtlError {
        EtlError {
            repr: ErrorRepr::Many(errors.into_iter().map(Into::into).collect()),
        }
    }
}

/// Converts a [`CoercionError`] raised outside of any field context into a
/// [`ErrorKind::TypeMismatch`].
///
/// The materializer and merger attach the offending field path themselves, this conversion is
/// only used when a bare value is coerced.
impl From<CoercionError> for EtlError {
    fn from(err: CoercionError) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::TypeMismatch,
                "Value cannot be coerced",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`std::io::Error`] to [`EtlError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::IoError,
                "I/O error occurred",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`serde_json::Error`] to [`EtlError`] with appropriate error kind.
///
/// Maps to [`ErrorKind::IoError`] for I/O failures and [`ErrorKind::DeserializationError`] for
/// syntax, data and EOF failures.
impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> EtlError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Converts [`etl_config::shared::ValidationError`] to [`EtlError`] with
/// [`ErrorKind::ConfigError`].
impl From<etl_config::shared::ValidationError> for EtlError {
    fn from(err: etl_config::shared::ValidationError) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConfigError,
                "Invalid pipeline configuration",
                err.to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::Kind;
    use crate::{bail, etl_error};

    #[test]
    fn test_simple_error_creation() {
        let err = EtlError::from((ErrorKind::RejectedWork, "Executor is shut down"));
        assert_eq!(err.kind(), ErrorKind::RejectedWork);
        assert_eq!(err.detail(), None);
        assert_eq!(err.kinds(), vec![ErrorKind::RejectedWork]);
    }

    #[test]
    fn test_error_with_detail() {
        let err = EtlError::from((
            ErrorKind::TypeMismatch,
            "Stored value cannot be read as the declared field type",
            "field `first`: cannot coerce text to integer".to_string(),
        ));
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(
            err.detail(),
            Some("field `first`: cannot coerce text to integer")
        );
    }

    #[test]
    fn test_multiple_errors() {
        let errors = vec![
            EtlError::from((ErrorKind::InvalidLifecycleUse, "Closed too many times")),
            EtlError::from((ErrorKind::TypeMismatch, "Type mismatch")),
            EtlError::from((ErrorKind::IoError, "Stream closed")),
        ];
        let multi_err = EtlError::many(errors);

        assert_eq!(multi_err.kind(), ErrorKind::InvalidLifecycleUse);
        assert_eq!(
            multi_err.kinds(),
            vec![
                ErrorKind::InvalidLifecycleUse,
                ErrorKind::TypeMismatch,
                ErrorKind::IoError
            ]
        );
        assert_eq!(multi_err.detail(), None);
    }

    #[test]
    fn test_empty_multiple_errors() {
        let multi_err = EtlError::many(vec![]);
        assert_eq!(multi_err.kind(), ErrorKind::Unknown);
        assert_eq!(multi_err.kinds(), vec![]);
        assert_eq!(multi_err.detail(), None);
    }

    #[test]
    fn test_from_vector_keeps_first_detail() {
        let errors = vec![
            EtlError::from((ErrorKind::ConsumeFailed, "Consumer failed")),
            EtlError::from((
                ErrorKind::BackingFailure,
                "Source failed",
                "disk unplugged".to_string(),
            )),
        ];
        let multi_err = EtlError::from(errors);
        assert_eq!(multi_err.kinds().len(), 2);
        assert_eq!(multi_err.detail(), Some("disk unplugged"));
    }

    #[test]
    fn test_error_equality_uses_kind() {
        let err1 = EtlError::from((ErrorKind::RejectedWork, "Rejected"));
        let err2 = EtlError::from((ErrorKind::RejectedWork, "Rejected again"));
        let err3 = EtlError::from((ErrorKind::BackingFailure, "Rejected"));

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }

    #[test]
    fn test_error_display_with_detail() {
        let err = EtlError::from((
            ErrorKind::BackingFailure,
            "Extractor source failed",
            "line 3 is not valid JSON".to_string(),
        ));
        let display_str = format!("{err}");
        assert!(display_str.contains("BackingFailure"));
        assert!(display_str.contains("Extractor source failed"));
        assert!(display_str.contains("line 3 is not valid JSON"));
    }

    #[test]
    fn test_multiple_errors_display() {
        let multi_err = EtlError::many(vec![
            EtlError::from((ErrorKind::TransformFailed, "First")),
            EtlError::from((ErrorKind::ConsumeFailed, "Second")),
        ]);
        let display_str = format!("{multi_err}");
        assert!(display_str.contains("Multiple errors"));
        assert!(display_str.contains("2 total"));
    }

    #[test]
    fn test_macro_usage() {
        let err = etl_error!(ErrorKind::InvalidLifecycleUse, "Consumer was never opened");
        assert_eq!(err.kind(), ErrorKind::InvalidLifecycleUse);
        assert_eq!(err.detail(), None);

        let err_with_detail = etl_error!(
            ErrorKind::TypeMismatch,
            "Type conversion failed",
            "cannot coerce text to integer: 'abc'"
        );
        assert_eq!(err_with_detail.kind(), ErrorKind::TypeMismatch);
        assert!(err_with_detail.detail().unwrap().contains("abc"));
    }

    #[test]
    fn test_bail_macro() {
        fn closes_too_often() -> EtlResult<()> {
            bail!(ErrorKind::InvalidLifecycleUse, "Close called too often");
        }

        let err = closes_too_often().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLifecycleUse);
    }

    #[test]
    fn test_coercion_error_becomes_type_mismatch() {
        let err = EtlError::from(CoercionError::new(Kind::Text, Kind::Integer, "abc"));
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.detail().unwrap().contains("text"));
        assert!(err.detail().unwrap().contains("integer"));
    }

    #[test]
    fn test_json_error_classification() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let etl_err = EtlError::from(json_err);
        assert_eq!(etl_err.kind(), ErrorKind::DeserializationError);
        assert!(etl_err.detail().unwrap().contains("expected"));
    }
}
