use std::collections::{BTreeMap, HashMap};

use crate::conversions::{Cell, Kind, ScalarField};
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::etl_error;
use crate::record::path::FieldPath;

/// Declared type of one field of a [`Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A single leaf value of the given kind.
    Scalar(Kind),
    /// A nested object whose fields are described by the given table.
    Object(&'static [FieldDescriptor]),
    /// A string-keyed map of leaf values of the given kind.
    Map(Kind),
}

impl FieldType {
    /// Returns the kind this type is declared as. Objects and maps are [`Kind::Structured`].
    pub fn kind(&self) -> Kind {
        match self {
            FieldType::Scalar(kind) => *kind,
            FieldType::Object(_) | FieldType::Map(_) => Kind::Structured,
        }
    }
}

/// Name and declared type of one field of a [`Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub const fn scalar<T: ScalarField>(name: &'static str) -> FieldDescriptor {
        FieldDescriptor {
            name,
            field_type: FieldType::Scalar(T::KIND),
        }
    }

    pub const fn object<T: Shape>(name: &'static str) -> FieldDescriptor {
        FieldDescriptor {
            name,
            field_type: FieldType::Object(T::FIELDS),
        }
    }

    pub const fn map<T: ScalarField>(name: &'static str) -> FieldDescriptor {
        FieldDescriptor {
            name,
            field_type: FieldType::Map(T::KIND),
        }
    }
}

/// A typed view over a record.
///
/// The descriptor table in [`Shape::FIELDS`] is what the materializer reads and the merger
/// writes; any path of the record that it does not reach is left alone. Conversion between the
/// typed value and the store goes through a type-erased [`FieldSet`] keyed by field name.
/// [`crate::shape!`] generates all three from one field list; a hand-written impl looks like:
///
/// ```ignore
/// struct Person {
///     first: Option<String>,
///     age: Option<i32>,
/// }
///
/// impl Shape for Person {
///     const FIELDS: &'static [FieldDescriptor] = &[
///         FieldDescriptor::scalar::<String>("first"),
///         FieldDescriptor::scalar::<i32>("age"),
///     ];
///
///     fn from_view(view: &FieldSet) -> EtlResult<Self> {
///         Ok(Person {
///             first: view.scalar("first")?,
///             age: view.scalar("age")?,
///         })
///     }
///
///     fn to_view(&self) -> EtlResult<FieldSet> {
///         let mut view = FieldSet::new();
///         view.put_scalar("first", self.first.as_ref())?;
///         view.put_scalar("age", self.age.as_ref())?;
///         Ok(view)
///     }
/// }
/// ```
pub trait Shape: Sized {
    const FIELDS: &'static [FieldDescriptor];

    fn from_view(view: &FieldSet) -> EtlResult<Self>;

    fn to_view(&self) -> EtlResult<FieldSet>;
}

/// The universal shape. It declares no fields, so reading it never touches the store and
/// writing it never changes the store.
impl Shape for () {
    const FIELDS: &'static [FieldDescriptor] = &[];

    fn from_view(_view: &FieldSet) -> EtlResult<Self> {
        Ok(())
    }

    fn to_view(&self) -> EtlResult<FieldSet> {
        Ok(FieldSet::new())
    }
}

/// Value of one field inside a [`FieldSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Cell),
    Object(FieldSet),
    Map(BTreeMap<String, Cell>),
}

/// Type-erased field values of one shape instance, keyed by field name.
///
/// A field that is not present in the set is absent: it was `None` on the typed value when
/// writing, or had no stored path when reading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    location: Option<FieldPath>,
    values: BTreeMap<&'static str, FieldValue>,
}

impl FieldSet {
    pub fn new() -> FieldSet {
        FieldSet::default()
    }

    /// Creates an empty set for the nested object stored at `location`. The location only
    /// appears in error messages.
    pub(crate) fn at(location: Option<FieldPath>) -> FieldSet {
        FieldSet {
            location,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: &'static str, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(name, value)
    }

    /// Iterates over the names of the fields that carry a value.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads a scalar field.
    pub fn scalar<T: ScalarField>(&self, name: &str) -> EtlResult<Option<T>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(FieldValue::Scalar(cell)) => {
                let value = T::from_cell(cell.clone()).map_err(|err| {
                    etl_error!(
                        ErrorKind::TypeMismatch,
                        "Stored value cannot be read as the declared field type",
                        format!("field `{}`: {err}", self.path_of(name))
                    )
                })?;

                Ok(Some(value))
            }
            Some(_) => Err(self.not_declared_as(name, "scalar")),
        }
    }

    /// Reads a scalar field, falling back to the type's default when it is absent.
    pub fn scalar_or_default<T: ScalarField + Default>(&self, name: &str) -> EtlResult<T> {
        Ok(self.scalar(name)?.unwrap_or_default())
    }

    /// Reads a nested object field.
    pub fn object<T: Shape>(&self, name: &str) -> EtlResult<Option<T>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(FieldValue::Object(nested)) => T::from_view(nested).map(Some),
            Some(_) => Err(self.not_declared_as(name, "object")),
        }
    }

    /// Reads a string-keyed map field.
    pub fn map<T: ScalarField>(&self, name: &str) -> EtlResult<Option<HashMap<String, T>>> {
        let entries = match self.values.get(name) {
            None => return Ok(None),
            Some(FieldValue::Map(entries)) => entries,
            Some(_) => return Err(self.not_declared_as(name, "map")),
        };

        let mut map = HashMap::with_capacity(entries.len());
        for (key, cell) in entries {
            let value = T::from_cell(cell.clone()).map_err(|err| {
                etl_error!(
                    ErrorKind::TypeMismatch,
                    "Stored value cannot be read as the declared field type",
                    format!("field `{}`: {err}", self.path_of(name).child(key.as_str()))
                )
            })?;
            map.insert(key.clone(), value);
        }

        Ok(Some(map))
    }

    /// Writes a scalar field. `None` leaves the field absent.
    pub fn put_scalar<T: ScalarField>(
        &mut self,
        name: &'static str,
        value: Option<&T>,
    ) -> EtlResult<()> {
        if let Some(value) = value {
            let cell = value.to_cell().map_err(|err| {
                etl_error!(
                    ErrorKind::TypeMismatch,
                    "Field value cannot be stored",
                    format!("field `{name}`: {err}")
                )
            })?;
            self.values.insert(name, FieldValue::Scalar(cell));
        }

        Ok(())
    }

    /// Writes a nested object field. `None` leaves the field absent.
    pub fn put_object<T: Shape>(
        &mut self,
        name: &'static str,
        value: Option<&T>,
    ) -> EtlResult<()> {
        if let Some(value) = value {
            self.values.insert(name, FieldValue::Object(value.to_view()?));
        }

        Ok(())
    }

    /// Writes a string-keyed map field. `None` leaves the field absent.
    pub fn put_map<T: ScalarField>(
        &mut self,
        name: &'static str,
        value: Option<&HashMap<String, T>>,
    ) -> EtlResult<()> {
        if let Some(value) = value {
            let mut entries = BTreeMap::new();
            for (key, entry) in value {
                let cell = entry.to_cell().map_err(|err| {
                    etl_error!(
                        ErrorKind::TypeMismatch,
                        "Field value cannot be stored",
                        format!("field `{name}` key `{key}`: {err}")
                    )
                })?;
                entries.insert(key.clone(), cell);
            }
            self.values.insert(name, FieldValue::Map(entries));
        }

        Ok(())
    }

    fn path_of(&self, name: &str) -> FieldPath {
        match &self.location {
            Some(location) => location.child(name),
            None => FieldPath::field(name),
        }
    }

    fn not_declared_as(&self, name: &str, expected: &str) -> EtlError {
        etl_error!(
            ErrorKind::TypeMismatch,
            "Field holds a different structure than requested",
            format!("field `{}` is not a {expected}", self.path_of(name))
        )
    }
}
