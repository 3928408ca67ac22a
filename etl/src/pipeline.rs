//! Pipeline orchestration.
//!
//! Contains the [`Pipeline`] struct that drives an extractor to exhaustion and hands every
//! extracted record to a consumer through an executor.

use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{error, info};

use etl_config::shared::PipelineConfig;

use crate::consumer::Consumer;
use crate::error::{EtlError, EtlResult};
use crate::executor::{Executor, Work, build_executor};
use crate::extractor::Extractor;
use crate::metrics::{
    EtlMetrics, PIPELINE_RUN, ProfilingScope, RECORDS_CONSUMED, RECORDS_EXTRACTED,
    RecordingMetrics, register_metrics,
};
use crate::record::{RecordEnvelope, Shape};

/// A complete extract → consume run.
///
/// Running a pipeline:
/// 1. opens the extractor and the consumer;
/// 2. pulls every value from the extractor on the calling thread, wraps it in a
///    [`RecordEnvelope`] and submits its consumption to the executor;
/// 3. shuts the executor down, which waits for all submitted work;
/// 4. closes the consumer and the extractor.
///
/// Transformations are expressed as [`crate::consumer::TransformConsumer`] stages wrapping the
/// final consumer. Failures of individual records, including values that cannot be stored in
/// a record, are contained by the executor and counted as failed work. A failing extractor
/// ends the run and is reported, after every stage has been closed.
pub struct Pipeline<T, X, C> {
    config: Arc<PipelineConfig>,
    extractor: X,
    consumer: Arc<C>,
    executor: Box<dyn Executor>,
    metrics: Arc<dyn EtlMetrics>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, X, C> Pipeline<T, X, C>
where
    T: Shape + Send + 'static,
    X: Extractor<T>,
    C: Consumer + 'static,
{
    /// Creates a pipeline using the executor described in `config`.
    pub fn new(config: PipelineConfig, extractor: X, consumer: C) -> EtlResult<Self> {
        config.validate()?;
        let executor = build_executor(&config.executor)?;

        Ok(Self {
            config: Arc::new(config),
            extractor,
            consumer: Arc::new(consumer),
            executor,
            metrics: Arc::new(RecordingMetrics::new()),
            _marker: PhantomData,
        })
    }

    /// Replaces the executor built from the configuration.
    pub fn with_executor(mut self, executor: Box<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Sets the root metrics scope the run records into.
    pub fn with_metrics(mut self, metrics: Arc<dyn EtlMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Runs the pipeline to completion.
    ///
    /// Returns the number of records extracted. Errors from the extractor and from opening or
    /// closing stages are aggregated and returned once every stage has been closed.
    pub fn run(mut self) -> EtlResult<u64> {
        register_metrics();
        info!(pipeline = %self.config.name, "starting pipeline");

        let scope = ProfilingScope::new(self.metrics.as_ref(), PIPELINE_RUN);
        let metrics = scope.metrics().clone();

        self.extractor.open(metrics.as_ref())?;
        if let Err(err) = self.consumer.open(metrics.as_ref()) {
            return Err(self.close_extractor_after(err));
        }

        let mut extracted = 0u64;
        let mut errors = vec![];
        loop {
            let value = match self.extractor.next() {
                Ok(Some(value)) => value,
                Ok(None) => break,
                Err(err) => {
                    error!(pipeline = %self.config.name, error = %err, "extractor failed");
                    errors.push(err);
                    break;
                }
            };
            extracted += 1;
            metrics.add_count(RECORDS_EXTRACTED, 1.0);

            let consumer = self.consumer.clone();
            let work: Work = Box::new(move |metrics| {
                let record = RecordEnvelope::with_initial(&value)?;
                consumer.consume(record)?;
                metrics.add_count(RECORDS_CONSUMED, 1.0);

                Ok(())
            });
            if let Err(err) = self.executor.submit(work, metrics.clone()) {
                errors.push(err);
                break;
            }
        }

        if let Err(err) = self.executor.shutdown() {
            errors.push(err);
        }
        if let Err(err) = self.consumer.close() {
            errors.push(err);
        }
        if let Err(err) = self.extractor.close() {
            errors.push(err);
        }

        info!(pipeline = %self.config.name, extracted, "pipeline finished");

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(extracted)
    }

    /// Closes the extractor after a failed start and bundles its close error with `err`.
    fn close_extractor_after(&mut self, err: EtlError) -> EtlError {
        match self.extractor.close() {
            Ok(()) => err,
            Err(close_err) => EtlError::many(vec![err, close_err]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::etl_error;
    use crate::executor::ImmediateExecutor;
    use crate::extractor::IteratorExtractor;
    use crate::metrics::WORK_FAILED;
    use crate::test_utils::consumer::MemoryConsumer;
    use crate::test_utils::shapes::{Person, Ratio};
    use etl_config::shared::ExecutorConfig;

    fn config() -> PipelineConfig {
        PipelineConfig {
            name: "people".to_string(),
            executor: ExecutorConfig::Immediate,
        }
    }

    fn person(age: i32) -> Person {
        Person {
            name: Some(format!("person-{age}")),
            age: Some(age),
        }
    }

    #[test]
    fn every_extracted_value_is_consumed() {
        let memory = MemoryConsumer::new();
        let metrics = RecordingMetrics::new();
        let extractor = IteratorExtractor::from_values(vec![person(1), person(2), person(3)]);

        let extracted = Pipeline::new(config(), extractor, memory.clone())
            .unwrap()
            .with_metrics(Arc::new(metrics.clone()))
            .run()
            .unwrap();

        assert_eq!(extracted, 3);
        assert_eq!(memory.shapes::<Person>(), vec![person(1), person(2), person(3)]);
        assert_eq!(memory.open_calls(), 1);
        assert_eq!(memory.close_calls(), 1);
        assert_eq!(metrics.count(RECORDS_EXTRACTED), 3.0);
        assert_eq!(metrics.count(RECORDS_CONSUMED), 3.0);
        assert!(metrics.times().contains_key(PIPELINE_RUN));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig {
            name: String::new(),
            executor: ExecutorConfig::Immediate,
        };

        let result = Pipeline::new(
            config,
            IteratorExtractor::from_values(Vec::<Person>::new()),
            MemoryConsumer::new(),
        );

        assert_eq!(result.err().map(|err| err.kind()), Some(ErrorKind::ConfigError));
    }

    #[test]
    fn extractor_failure_is_reported_after_closing_stages() {
        let memory = MemoryConsumer::new();
        let values = vec![
            Ok(person(1)),
            Err(etl_error!(ErrorKind::BackingFailure, "Source went away")),
            Ok(person(2)),
        ];

        let extractor = IteratorExtractor::new(values.into_iter());

        let err = Pipeline::new(config(), extractor, memory.clone())
            .unwrap()
            .with_executor(Box::new(ImmediateExecutor::new()))
            .run()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BackingFailure);
        assert_eq!(memory.records().len(), 1);
        assert_eq!(memory.close_calls(), 1);
    }

    #[test]
    fn failing_records_do_not_stop_the_run() {
        let memory = MemoryConsumer::failing_every(2);
        let metrics = RecordingMetrics::new();
        let extractor = IteratorExtractor::from_values((1..=4).map(person).collect());

        let extracted = Pipeline::new(config(), extractor, memory.clone())
            .unwrap()
            .with_metrics(Arc::new(metrics.clone()))
            .run()
            .unwrap();

        assert_eq!(extracted, 4);
        assert_eq!(memory.records().len(), 2);
        assert_eq!(metrics.count(WORK_FAILED), 2.0);
    }

    #[test]
    fn unstorable_values_are_counted_as_failed_work() {
        let memory = MemoryConsumer::new();
        let metrics = RecordingMetrics::new();
        let extractor = IteratorExtractor::from_values(vec![
            Ratio { r: Some(1.0) },
            Ratio { r: Some(f64::NAN) },
        ]);

        let extracted = Pipeline::new(config(), extractor, memory.clone())
            .unwrap()
            .with_metrics(Arc::new(metrics.clone()))
            .run()
            .unwrap();

        assert_eq!(extracted, 2);
        assert_eq!(memory.shapes::<Ratio>(), vec![Ratio { r: Some(1.0) }]);
        assert_eq!(metrics.count(WORK_FAILED), 1.0);
        assert_eq!(metrics.count(RECORDS_CONSUMED), 1.0);
    }

    #[test]
    fn consumer_open_failure_closes_the_extractor() {
        let memory = MemoryConsumer::failing_open();

        let err = Pipeline::new(
            config(),
            IteratorExtractor::from_values(vec![person(1)]),
            memory.clone(),
        )
        .unwrap()
        .run()
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConsumeFailed);
        assert!(memory.records().is_empty());
    }
}
