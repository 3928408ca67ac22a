use std::collections::BTreeMap;

use tracing::trace;

use crate::conversions::{Cell, Kind, coerce};
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::etl_error;
use crate::record::path::FieldPath;
use crate::record::shape::{FieldDescriptor, FieldSet, FieldType, FieldValue, Shape};
use crate::record::store::RecordStore;

/// Builds an instance of shape `S` from the values in `store`.
///
/// Every declared field is looked up under its path and coerced to its declared kind. Fields
/// without a stored value are left absent. A nested object is present when its path carries a
/// structure marker or anything is stored below it. A map collects every direct child of its
/// path and is present when it has an entry or a structure marker. Paths the shape does not
/// declare are ignored.
///
/// Fails with [`ErrorKind::TypeMismatch`] when a stored value cannot be coerced to the
/// declared kind.
pub fn materialize<S: Shape>(store: &RecordStore) -> EtlResult<S> {
    if S::FIELDS.is_empty() {
        return S::from_view(&FieldSet::new());
    }

    let view = read_fields(store, None, S::FIELDS)?;
    trace!(fields = view.len(), "materialized record view");

    S::from_view(&view)
}

fn read_fields(
    store: &RecordStore,
    location: Option<&FieldPath>,
    fields: &'static [FieldDescriptor],
) -> EtlResult<FieldSet> {
    let mut view = FieldSet::at(location.cloned());

    for field in fields {
        let path = match location {
            Some(location) => location.child(field.name),
            None => FieldPath::field(field.name),
        };

        match field.field_type {
            FieldType::Scalar(kind) => {
                if let Some(cell) = store.get_path(&path) {
                    let cell = coerce_stored(&path, cell, kind)?;
                    view.insert(field.name, FieldValue::Scalar(cell));
                }
            }
            FieldType::Object(nested) => {
                if store.is_structure(&path) || store.has_paths_under(&path) {
                    let nested_view = read_fields(store, Some(&path), nested)?;
                    view.insert(field.name, FieldValue::Object(nested_view));
                }
            }
            FieldType::Map(kind) => {
                let mut entries = BTreeMap::new();
                for (entry_path, cell) in store.iter_under(&path) {
                    // Deeper paths belong to some other view of the record.
                    if entry_path.depth() != path.depth() + 1 {
                        continue;
                    }

                    let cell = coerce_stored(entry_path, cell, kind)?;
                    entries.insert(entry_path.leaf().to_string(), cell);
                }

                if !entries.is_empty() || store.is_structure(&path) {
                    view.insert(field.name, FieldValue::Map(entries));
                }
            }
        }
    }

    Ok(view)
}

fn coerce_stored(path: &FieldPath, cell: &Cell, kind: Kind) -> EtlResult<Cell> {
    coerce(cell.clone(), kind).map_err(|err| type_mismatch(path, err))
}

fn type_mismatch(path: &FieldPath, err: impl std::fmt::Display) -> EtlError {
    etl_error!(
        ErrorKind::TypeMismatch,
        "Stored value cannot be read as the declared field type",
        format!("field `{path}`: {err}")
    )
}
