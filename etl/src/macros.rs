//! Macros for ETL error handling.
//!
//! Provides convenience macros for creating and returning [`crate::error::EtlError`] instances.

/// Creates an [`crate::error::EtlError`] from error kind and description, with an optional
/// dynamic detail.
#[macro_export]
macro_rules! etl_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::EtlError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::EtlError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates and returns an [`crate::error::EtlError`] from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::etl_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::etl_error!($kind, $desc, $detail))
    };
}

/// Declares a struct of optional fields together with its [`crate::record::Shape`] impl.
///
/// Each field names how it is stored: `scalar T` for a single [`crate::conversions::ScalarField`],
/// `object T` for a nested shape and `map T` for a string-keyed map of scalars. The field
/// descriptor table and both view conversions are generated from the same list, so they cannot
/// drift apart.
///
/// ```
/// use etl::record::RecordEnvelope;
///
/// etl::shape! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Person {
///         pub name: scalar String,
///         pub age: scalar i32,
///     }
/// }
///
/// let person = Person {
///     name: Some("Ada".to_string()),
///     age: Some(36),
/// };
/// let record = RecordEnvelope::with_initial(&person)?;
///
/// assert_eq!(record.get::<Person>()?, person);
/// # Ok::<(), etl::error::EtlError>(())
/// ```
#[macro_export]
macro_rules! shape {
    (@type scalar $ty:ty) => { ::std::option::Option<$ty> };
    (@type object $ty:ty) => { ::std::option::Option<$ty> };
    (@type map $ty:ty) => {
        ::std::option::Option<::std::collections::HashMap<::std::string::String, $ty>>
    };
    (@put $view:ident, scalar, $name:expr, $value:expr) => {
        $view.put_scalar($name, $value.as_ref())?
    };
    (@put $view:ident, object, $name:expr, $value:expr) => {
        $view.put_object($name, $value.as_ref())?
    };
    (@put $view:ident, map, $name:expr, $value:expr) => {
        $view.put_map($name, $value.as_ref())?
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $kind:ident $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $crate::shape!(@type $kind $ty),
            )*
        }

        impl $crate::record::Shape for $name {
            const FIELDS: &'static [$crate::record::FieldDescriptor] = &[
                $($crate::record::FieldDescriptor::$kind::<$ty>(stringify!($field)),)*
            ];

            fn from_view(
                view: &$crate::record::FieldSet,
            ) -> $crate::error::EtlResult<Self> {
                ::std::result::Result::Ok($name {
                    $($field: view.$kind(stringify!($field))?,)*
                })
            }

            fn to_view(&self) -> $crate::error::EtlResult<$crate::record::FieldSet> {
                let mut view = $crate::record::FieldSet::new();
                $($crate::shape!(@put view, $kind, stringify!($field), self.$field);)*
                ::std::result::Result::Ok(view)
            }
        }
    };
}
