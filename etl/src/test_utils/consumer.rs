use std::sync::{Arc, Mutex, MutexGuard};

use crate::consumer::Consumer;
use crate::error::{ErrorKind, EtlResult};
use crate::metrics::EtlMetrics;
use crate::record::{RecordEnvelope, Shape};
use crate::{bail, etl_error};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<RecordEnvelope>,
    consume_calls: usize,
    open_calls: usize,
    close_calls: usize,
}

/// A consumer that keeps every record it receives in memory.
///
/// Clones share the same storage, so a test can hand one clone to a pipeline and inspect the
/// other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsumer {
    inner: Arc<Mutex<Inner>>,
    fail_open: bool,
    fail_every: Option<usize>,
}

impl MemoryConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A consumer whose `open` always fails.
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// A consumer that fails every `n`-th call to `consume`, counting from one.
    pub fn failing_every(n: usize) -> Self {
        Self {
            fail_every: Some(n),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<RecordEnvelope> {
        self.lock().records.clone()
    }

    /// Reads every stored record as `S`, in the order they were consumed.
    pub fn shapes<S: Shape>(&self) -> Vec<S> {
        self.lock()
            .records
            .iter()
            .map(|record| record.get::<S>().expect("stored record cannot be read"))
            .collect()
    }

    pub fn open_calls(&self) -> usize {
        self.lock().open_calls
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory consumer lock poisoned")
    }
}

impl Consumer for MemoryConsumer {
    fn open(&self, _metrics: &dyn EtlMetrics) -> EtlResult<()> {
        if self.fail_open {
            bail!(ErrorKind::ConsumeFailed, "Consumer failed to open");
        }

        self.lock().open_calls += 1;

        Ok(())
    }

    fn consume(&self, record: RecordEnvelope) -> EtlResult<()> {
        let mut inner = self.lock();
        inner.consume_calls += 1;

        if let Some(n) = self.fail_every {
            if inner.consume_calls % n == 0 {
                return Err(etl_error!(
                    ErrorKind::ConsumeFailed,
                    "Consumer rejected the record",
                    format!("call {}", inner.consume_calls)
                ));
            }
        }

        inner.records.push(record);

        Ok(())
    }

    fn close(&self) -> EtlResult<()> {
        self.lock().close_calls += 1;

        Ok(())
    }
}
