//! Typed views over schema-less records.
//!
//! A [`RecordEnvelope`] owns the canonical [`RecordStore`] of one record. Stages read and write
//! it through their own [`Shape`]s; the materializer builds a view from the store and the
//! merger writes a view back, leaving every undeclared path as it was.

pub mod envelope;
pub mod materialize;
pub mod merge;
pub mod path;
pub mod shape;
pub mod store;

pub use envelope::RecordEnvelope;
pub use materialize::materialize;
pub use merge::merge;
pub use path::FieldPath;
pub use shape::{FieldDescriptor, FieldSet, FieldType, FieldValue, Shape};
pub use store::RecordStore;
