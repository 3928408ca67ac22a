use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tracing::trace;

use crate::consumer::base::Consumer;
use crate::error::{EtlError, EtlResult};
use crate::metrics::{EtlMetrics, RECORDS_TRANSFORMED};
use crate::record::{RecordEnvelope, Shape};
use crate::transformer::Transformer;

/// A [`Consumer`] that runs a [`Transformer`] and forwards its outputs downstream.
///
/// For every record, the input view `T` is read from the envelope and transformed. Each output
/// is written into its own copy of the envelope, so fields unknown to the transformer reach the
/// downstream consumer untouched, and every copy is consumed independently.
pub struct TransformConsumer<T, R, X, C> {
    transformer: X,
    downstream: C,
    metrics: Mutex<Option<Arc<dyn EtlMetrics>>>,
    _marker: PhantomData<fn(T) -> R>,
}

impl<T, R, X, C> TransformConsumer<T, R, X, C>
where
    T: Shape,
    R: Shape,
    X: Transformer<T, R>,
    C: Consumer,
{
    pub fn new(transformer: X, downstream: C) -> Self {
        Self {
            transformer,
            downstream,
            metrics: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    fn record_outputs(&self, outputs: usize) {
        let metrics = match self.metrics.lock() {
            Ok(metrics) => metrics.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        if let Some(metrics) = metrics {
            metrics.add_count(RECORDS_TRANSFORMED, outputs as f64);
        }
    }
}

impl<T, R, X, C> Consumer for TransformConsumer<T, R, X, C>
where
    T: Shape,
    R: Shape,
    X: Transformer<T, R>,
    C: Consumer,
{
    fn open(&self, metrics: &dyn EtlMetrics) -> EtlResult<()> {
        self.downstream.open(metrics)?;
        if let Err(err) = self.transformer.open(metrics) {
            // Downstream was already opened, so it is released before reporting the failure.
            return match self.downstream.close() {
                Ok(()) => Err(err),
                Err(close_err) => Err(EtlError::many(vec![err, close_err])),
            };
        }

        let scope = metrics.create_child_metrics();
        match self.metrics.lock() {
            Ok(mut slot) => *slot = Some(scope),
            Err(poisoned) => *poisoned.into_inner() = Some(scope),
        }

        Ok(())
    }

    fn consume(&self, record: RecordEnvelope) -> EtlResult<()> {
        let input = record.get::<T>()?;
        let outputs = self.transformer.transform(input)?;
        trace!(outputs = outputs.len(), "transformed record");
        self.record_outputs(outputs.len());

        for output in outputs {
            let forwarded = record.with(&output)?;
            self.downstream.consume(forwarded)?;
        }

        Ok(())
    }

    fn close(&self) -> EtlResult<()> {
        let mut errors = vec![];
        if let Err(err) = self.transformer.close() {
            errors.push(err);
        }
        if let Err(err) = self.downstream.close() {
            errors.push(err);
        }

        let scope = match self.metrics.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(scope) = scope {
            scope.close();
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(())
    }
}
