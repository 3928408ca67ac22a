use crate::error::EtlResult;
use crate::record::materialize::materialize;
use crate::record::merge::merge;
use crate::record::shape::Shape;
use crate::record::store::RecordStore;

/// One in-flight record, readable and writable as any number of typed views.
///
/// The envelope owns a single [`RecordStore`]. Reading a view never changes the record, and
/// writing a view only touches the paths that view declares, so fields unknown to a stage
/// travel through it untouched. Cloning yields an independent record, which is how a stage
/// emits several outputs for one input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordEnvelope {
    store: RecordStore,
}

impl RecordEnvelope {
    /// Creates an envelope with an empty record.
    pub fn new() -> RecordEnvelope {
        RecordEnvelope::default()
    }

    /// Creates an envelope holding the fields of `value`.
    pub fn with_initial<S: Shape>(value: &S) -> EtlResult<RecordEnvelope> {
        let mut envelope = RecordEnvelope::new();
        envelope.set(value)?;

        Ok(envelope)
    }

    /// Wraps an existing store.
    pub fn from_store(store: RecordStore) -> RecordEnvelope {
        RecordEnvelope { store }
    }

    /// Returns a copy of this envelope with `value` written into it. `self` is left unchanged.
    pub fn with<S: Shape>(&self, value: &S) -> EtlResult<RecordEnvelope> {
        let mut envelope = self.clone();
        envelope.set(value)?;

        Ok(envelope)
    }

    /// Reads the record as shape `S`.
    pub fn get<S: Shape>(&self) -> EtlResult<S> {
        materialize(&self.store)
    }

    /// Writes `value` into the record. On error the record is left unchanged.
    pub fn set<S: Shape>(&mut self, value: &S) -> EtlResult<()> {
        merge(value, &mut self.store)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn into_store(self) -> RecordStore {
        self.store
    }
}
