use std::sync::Arc;

use crate::error::EtlResult;
use crate::metrics::EtlMetrics;
use crate::record::RecordEnvelope;

/// Receives records at the end of a pipeline.
///
/// Records are handed over by the executor, possibly from several worker threads at once, so
/// consumers only get shared access to themselves and must synchronize internally.
pub trait Consumer: Send + Sync {
    fn open(&self, metrics: &dyn EtlMetrics) -> EtlResult<()>;

    fn consume(&self, record: RecordEnvelope) -> EtlResult<()>;

    fn close(&self) -> EtlResult<()>;
}

impl<C> Consumer for Arc<C>
where
    C: Consumer + ?Sized,
{
    fn open(&self, metrics: &dyn EtlMetrics) -> EtlResult<()> {
        (**self).open(metrics)
    }

    fn consume(&self, record: RecordEnvelope) -> EtlResult<()> {
        (**self).consume(record)
    }

    fn close(&self) -> EtlResult<()> {
        (**self).close()
    }
}
