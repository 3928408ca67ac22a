use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::bail;
use crate::consumer::base::Consumer;
use crate::error::{ErrorKind, EtlResult};
use crate::metrics::EtlMetrics;
use crate::record::RecordEnvelope;

/// A [`Consumer`] that can be opened and closed by several pipelines.
///
/// The wrapped consumer is opened when the first user opens it and closed when the last user
/// closes it. Every [`Consumer::open`] must be matched by exactly one [`Consumer::close`]:
/// closing more often than opening, or consuming while nobody holds it open, fails with
/// [`ErrorKind::InvalidLifecycleUse`].
///
/// Records are forwarded under a shared lock and opening or closing takes it exclusively, so
/// the last close waits for records already in flight.
#[derive(Debug)]
pub struct SharedConsumer<C> {
    consumer: C,
    open_count: RwLock<usize>,
}

impl<C> SharedConsumer<C>
where
    C: Consumer,
{
    pub fn new(consumer: C) -> Self {
        Self {
            consumer,
            open_count: RwLock::new(0),
        }
    }

    /// Returns how many users currently hold the consumer open.
    pub fn open_count(&self) -> usize {
        *self.read_count()
    }

    pub fn inner(&self) -> &C {
        &self.consumer
    }

    fn read_count(&self) -> RwLockReadGuard<'_, usize> {
        match self.open_count.read() {
            Ok(count) => count,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_count(&self) -> RwLockWriteGuard<'_, usize> {
        match self.open_count.write() {
            Ok(count) => count,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<C> Consumer for SharedConsumer<C>
where
    C: Consumer,
{
    fn open(&self, metrics: &dyn EtlMetrics) -> EtlResult<()> {
        let mut count = self.write_count();
        if *count == 0 {
            debug!("opening shared consumer for its first user");
            self.consumer.open(metrics)?;
        }
        *count += 1;

        Ok(())
    }

    fn consume(&self, record: RecordEnvelope) -> EtlResult<()> {
        let count = self.read_count();
        if *count == 0 {
            bail!(
                ErrorKind::InvalidLifecycleUse,
                "Shared consumer received a record while not open"
            );
        }

        self.consumer.consume(record)
    }

    fn close(&self) -> EtlResult<()> {
        let mut count = self.write_count();
        match *count {
            0 => bail!(
                ErrorKind::InvalidLifecycleUse,
                "Shared consumer was closed more times than it was opened"
            ),
            1 => {
                *count = 0;
                debug!("closing shared consumer after its last user");
                self.consumer.close()
            }
            _ => {
                *count -= 1;
                Ok(())
            }
        }
    }
}
