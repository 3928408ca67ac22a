use std::sync::Arc;

use crate::error::EtlResult;
use crate::metrics::EtlMetrics;

/// Turns one input value into zero, one or many output values.
///
/// Transformers may be called from several worker threads at once, so they only get shared
/// access to themselves.
pub trait Transformer<T, R>: Send + Sync {
    fn open(&self, _metrics: &dyn EtlMetrics) -> EtlResult<()> {
        Ok(())
    }

    fn transform(&self, input: T) -> EtlResult<Vec<R>>;

    fn close(&self) -> EtlResult<()> {
        Ok(())
    }
}

impl<T, R, X> Transformer<T, R> for Arc<X>
where
    X: Transformer<T, R> + ?Sized,
{
    fn open(&self, metrics: &dyn EtlMetrics) -> EtlResult<()> {
        (**self).open(metrics)
    }

    fn transform(&self, input: T) -> EtlResult<Vec<R>> {
        (**self).transform(input)
    }

    fn close(&self) -> EtlResult<()> {
        (**self).close()
    }
}
