use tracing::trace;

use crate::conversions::{Cell, coerce};
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::etl_error;
use crate::record::path::FieldPath;
use crate::record::shape::{FieldDescriptor, FieldSet, FieldType, FieldValue, Shape};
use crate::record::store::RecordStore;

/// Writes the fields of `value` into `store`.
///
/// Present fields overwrite the value under their path. Absent fields clear what their
/// declaration covers: the path of a scalar, every path declared by a nested object, or every
/// path below a map. A present map only replaces the keys it carries. Present objects and maps
/// leave a structure marker at their own path, so an empty one reads back as present. Paths the
/// shape does not declare are never touched.
///
/// All values are coerced to their declared kinds before the store is modified, so a failing
/// merge leaves `store` unchanged. A view carrying a field its shape does not declare fails
/// with [`ErrorKind::TypeMismatch`].
pub fn merge<S: Shape>(value: &S, store: &mut RecordStore) -> EtlResult<()> {
    if S::FIELDS.is_empty() {
        return Ok(());
    }

    let view = value.to_view()?;

    let mut plan = MergePlan::default();
    plan.add_fields(&view, None, S::FIELDS)?;
    trace!(
        writes = plan.writes.len(),
        clears = plan.clears.len() + plan.subtree_clears.len(),
        "merging record view"
    );

    plan.apply(store);

    Ok(())
}

/// Store mutations collected from a validated view.
#[derive(Debug, Default)]
struct MergePlan {
    writes: Vec<(FieldPath, Cell)>,
    clears: Vec<FieldPath>,
    subtree_clears: Vec<FieldPath>,
    marks: Vec<FieldPath>,
    unmarks: Vec<FieldPath>,
}

impl MergePlan {
    fn add_fields(
        &mut self,
        view: &FieldSet,
        location: Option<&FieldPath>,
        fields: &'static [FieldDescriptor],
    ) -> EtlResult<()> {
        if let Some(name) = view
            .names()
            .find(|name| !fields.iter().any(|field| field.name == *name))
        {
            let path = match location {
                Some(location) => location.child(name),
                None => FieldPath::field(name),
            };

            return Err(etl_error!(
                ErrorKind::TypeMismatch,
                "Field value is not declared by its shape",
                format!("field `{path}` is missing from the shape's field descriptors")
            ));
        }

        for field in fields {
            let path = match location {
                Some(location) => location.child(field.name),
                None => FieldPath::field(field.name),
            };

            match (field.field_type, view.get(field.name)) {
                (FieldType::Scalar(_), None) => self.clears.push(path),
                (FieldType::Scalar(kind), Some(FieldValue::Scalar(cell))) => {
                    let cell = coerce(cell.clone(), kind)
                        .map_err(|err| declared_kind_mismatch(&path, err))?;
                    self.writes.push((path, cell));
                }
                (FieldType::Object(nested), None) => self.add_object_clear(&path, nested),
                (FieldType::Object(nested), Some(FieldValue::Object(nested_view))) => {
                    self.add_fields(nested_view, Some(&path), nested)?;
                    self.marks.push(path);
                }
                (FieldType::Map(_), None) => self.add_map_clear(path),
                (FieldType::Map(kind), Some(FieldValue::Map(entries))) => {
                    for (key, cell) in entries {
                        let entry_path = path.child(key.as_str());
                        let cell = coerce(cell.clone(), kind)
                            .map_err(|err| declared_kind_mismatch(&entry_path, err))?;
                        self.writes.push((entry_path, cell));
                    }
                    self.marks.push(path);
                }
                (_, Some(_)) => {
                    return Err(etl_error!(
                        ErrorKind::TypeMismatch,
                        "Field value does not match its declared structure",
                        format!("field `{path}` is declared as {}", field.field_type.kind())
                    ));
                }
            }
        }

        Ok(())
    }

    fn add_object_clear(&mut self, location: &FieldPath, fields: &'static [FieldDescriptor]) {
        for field in fields {
            let path = location.child(field.name);
            match field.field_type {
                FieldType::Scalar(_) => self.clears.push(path),
                FieldType::Object(nested) => self.add_object_clear(&path, nested),
                FieldType::Map(_) => self.add_map_clear(path),
            }
        }
        self.unmarks.push(location.clone());
    }

    fn add_map_clear(&mut self, path: FieldPath) {
        self.unmarks.push(path.clone());
        self.subtree_clears.push(path);
    }

    fn apply(self, store: &mut RecordStore) {
        for path in &self.clears {
            store.remove_path(path);
        }
        for path in &self.subtree_clears {
            store.remove_under(path);
        }
        for path in &self.unmarks {
            store.unmark_structure(path);
        }
        for (path, cell) in self.writes {
            store.set_path(path, cell);
        }
        for path in self.marks {
            store.mark_structure(path);
        }
    }
}

fn declared_kind_mismatch(path: &FieldPath, err: impl std::fmt::Display) -> EtlError {
    etl_error!(
        ErrorKind::TypeMismatch,
        "Field value cannot be stored as its declared kind",
        format!("field `{path}`: {err}")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::shapes::{
        Labels, Misdeclared, Nested, NestedFirst, Outer, OuterFirst, Simple,
    };
    use std::collections::HashMap;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn present_fields_overwrite() {
        let mut store = RecordStore::new();
        store.set_path(path("first"), Cell::Text("old".to_string()));

        let simple = Simple {
            first: Some(1),
            second: Some("two".to_string()),
        };
        merge(&simple, &mut store).unwrap();

        assert_eq!(store.get_path(&path("first")), Some(&Cell::Integer(1)));
        assert_eq!(
            store.get_path(&path("second")),
            Some(&Cell::Text("two".to_string()))
        );
    }

    #[test]
    fn absent_scalar_clears_its_path_only() {
        let mut store = RecordStore::new();
        store.set_path(path("first"), Cell::Integer(1));
        store.set_path(path("unrelated"), Cell::Integer(2));

        merge(&Simple::default(), &mut store).unwrap();

        assert_eq!(store.get_path(&path("first")), None);
        assert_eq!(store.get_path(&path("unrelated")), Some(&Cell::Integer(2)));
    }

    #[test]
    fn absent_object_clears_only_declared_nested_paths() {
        let mut store = RecordStore::new();
        store.set_path(path("outer.first"), Cell::Integer(1));
        store.set_path(path("outer.second"), Cell::Text("b".to_string()));
        store.set_path(path("outer.extra"), Cell::Bool(true));

        merge(&NestedFirst { outer: None }, &mut store).unwrap();

        assert_eq!(store.get_path(&path("outer.first")), None);
        assert!(store.get_path(&path("outer.second")).is_some());
        assert!(store.get_path(&path("outer.extra")).is_some());
    }

    #[test]
    fn nested_merge_keeps_siblings() {
        let mut store = RecordStore::new();
        let nested = Nested {
            top: Some("top".to_string()),
            outer: Some(Outer {
                first: Some(1),
                second: Some("b".to_string()),
            }),
        };
        merge(&nested, &mut store).unwrap();

        let partial = NestedFirst {
            outer: Some(OuterFirst { first: Some(10) }),
        };
        merge(&partial, &mut store).unwrap();

        assert_eq!(store.get_path(&path("outer.first")), Some(&Cell::Integer(10)));
        assert_eq!(
            store.get_path(&path("outer.second")),
            Some(&Cell::Text("b".to_string()))
        );
        assert_eq!(
            store.get_path(&path("top")),
            Some(&Cell::Text("top".to_string()))
        );
    }

    #[test]
    fn map_merge_replaces_only_incoming_keys() {
        let mut store = RecordStore::new();
        store.set_path(path("labels.a"), Cell::Integer(1));
        store.set_path(path("labels.b"), Cell::Integer(2));

        let labels = Labels {
            labels: Some(HashMap::from([
                ("b".to_string(), 20),
                ("c".to_string(), 30),
            ])),
        };
        merge(&labels, &mut store).unwrap();

        assert_eq!(store.get_path(&path("labels.a")), Some(&Cell::Integer(1)));
        assert_eq!(store.get_path(&path("labels.b")), Some(&Cell::Integer(20)));
        assert_eq!(store.get_path(&path("labels.c")), Some(&Cell::Integer(30)));
    }

    #[test]
    fn absent_map_clears_every_key() {
        let mut store = RecordStore::new();
        store.set_path(path("labels.a"), Cell::Integer(1));
        store.set_path(path("labels.b"), Cell::Integer(2));
        store.set_path(path("name"), Cell::Text("kept".to_string()));

        merge(&Labels { labels: None }, &mut store).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get_path(&path("name")).is_some());
    }

    #[test]
    fn failed_merge_leaves_the_store_unchanged() {
        let mut store = RecordStore::new();
        store.set_path(path("count"), Cell::Integer(5));
        store.set_path(path("label"), Cell::Text("before".to_string()));
        let before = store.clone();

        let err = merge(&Misdeclared::default(), &mut store).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.detail().unwrap().contains("count"));
        assert_eq!(store, before);
    }

    #[test]
    fn empty_object_and_map_leave_structure_markers() {
        let mut store = RecordStore::new();
        let nested = Nested {
            top: None,
            outer: Some(Outer::default()),
        };
        merge(&nested, &mut store).unwrap();
        merge(
            &Labels {
                labels: Some(HashMap::new()),
            },
            &mut store,
        )
        .unwrap();

        assert_eq!(store.len(), 0);
        assert!(store.is_structure(&path("outer")));
        assert!(store.is_structure(&path("labels")));

        merge(&Nested::default(), &mut store).unwrap();
        merge(&Labels::default(), &mut store).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn undeclared_view_field_is_rejected() {
        struct Sloppy;

        impl Shape for Sloppy {
            const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::scalar::<i64>("first")];

            fn from_view(_view: &FieldSet) -> EtlResult<Self> {
                Ok(Sloppy)
            }

            fn to_view(&self) -> EtlResult<FieldSet> {
                let mut view = FieldSet::new();
                view.put_scalar("first", Some(&1i64))?;
                view.put_scalar("second", Some(&2i64))?;
                Ok(view)
            }
        }

        let mut store = RecordStore::new();
        let err = merge(&Sloppy, &mut store).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.detail().unwrap().contains("second"));
        assert!(store.is_empty());
    }

    #[test]
    fn universal_shape_never_changes_the_store() {
        let mut store = RecordStore::new();
        store.set_path(path("a"), Cell::Integer(1));
        let before = store.clone();

        merge(&(), &mut store).unwrap();

        assert_eq!(store, before);
    }
}
