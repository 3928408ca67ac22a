use std::collections::{BTreeMap, BTreeSet};

use crate::conversions::Cell;
use crate::record::path::FieldPath;

/// The canonical, schema-less representation of one in-flight record.
///
/// Every leaf value lives under exactly one [`FieldPath`]. The store does not remember which
/// view wrote a value or which kind it was first written as: replacing a value with one of a
/// different kind is legal, and readers coerce on the way out.
///
/// Nested objects and maps have no leaf of their own. A present but empty one is remembered
/// as a structure marker at its path, so it reads back as present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    cells: BTreeMap<FieldPath, Cell>,
    structures: BTreeSet<FieldPath>,
}

impl RecordStore {
    pub fn new() -> RecordStore {
        RecordStore::default()
    }

    /// Stores `cell` under `path`, returning the value it replaced.
    pub fn set_path(&mut self, path: FieldPath, cell: Cell) -> Option<Cell> {
        self.cells.insert(path, cell)
    }

    pub fn get_path(&self, path: &FieldPath) -> Option<&Cell> {
        self.cells.get(path)
    }

    pub fn remove_path(&mut self, path: &FieldPath) -> Option<Cell> {
        self.cells.remove(path)
    }

    /// Removes every value and structure marker strictly below `prefix` and returns how many
    /// values were removed.
    pub fn remove_under(&mut self, prefix: &FieldPath) -> usize {
        let doomed = self.paths_under(prefix).cloned().collect::<Vec<_>>();
        for path in &doomed {
            self.cells.remove(path);
        }

        let markers = self.structures_under(prefix).cloned().collect::<Vec<_>>();
        for path in &markers {
            self.structures.remove(path);
        }

        doomed.len()
    }

    /// Marks `path` as holding a nested object or map, even when nothing is stored below it.
    pub fn mark_structure(&mut self, path: FieldPath) -> bool {
        self.structures.insert(path)
    }

    pub fn unmark_structure(&mut self, path: &FieldPath) -> bool {
        self.structures.remove(path)
    }

    pub fn is_structure(&self, path: &FieldPath) -> bool {
        self.structures.contains(path)
    }

    /// Iterates over all structure markers in order.
    pub fn structures(&self) -> impl Iterator<Item = &FieldPath> {
        self.structures.iter()
    }

    fn structures_under<'a>(&'a self, prefix: &'a FieldPath) -> impl Iterator<Item = &'a FieldPath> {
        self.structures
            .range(prefix.clone()..)
            .take_while(move |path| path.starts_with(prefix))
            .filter(move |path| path.depth() > prefix.depth())
    }

    /// Iterates over all stored paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.cells.keys()
    }

    /// Iterates over all stored paths strictly below `prefix`.
    pub fn paths_under<'a>(&'a self, prefix: &'a FieldPath) -> impl Iterator<Item = &'a FieldPath> {
        self.iter_under(prefix).map(|(path, _)| path)
    }

    /// Iterates over all stored entries strictly below `prefix`.
    pub fn iter_under<'a>(
        &'a self,
        prefix: &'a FieldPath,
    ) -> impl Iterator<Item = (&'a FieldPath, &'a Cell)> {
        self.cells
            .range(prefix.clone()..)
            .take_while(move |(path, _)| path.starts_with(prefix))
            .filter(move |(path, _)| path.depth() > prefix.depth())
    }

    /// Returns `true` when at least one value or structure marker is stored strictly below
    /// `prefix`.
    pub fn has_paths_under(&self, prefix: &FieldPath) -> bool {
        self.paths_under(prefix).next().is_some() || self.structures_under(prefix).next().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &Cell)> {
        self.cells.iter()
    }

    /// Returns the number of stored values. Structure markers are not counted.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` when the store holds neither values nor structure markers.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.structures.is_empty()
    }
}
