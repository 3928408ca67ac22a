use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use etl::error::ErrorKind;
use etl::etl_error;
use etl::executor::{Executor, ImmediateExecutor, Work, WorkerPoolExecutor};
use etl::metrics::{EtlMetrics, RecordingMetrics, WORK_FAILED, WORK_PANICKED};
use etl_telemetry::init_test_tracing;

const SUBMISSIONS: usize = 100;

/// Submits work where every third unit fails and every seventh panics, then shuts down.
fn submit_mixed_work(executor: &dyn Executor) -> (usize, RecordingMetrics) {
    let completed = Arc::new(AtomicUsize::new(0));
    let metrics = RecordingMetrics::new();

    for i in 1..=SUBMISSIONS {
        let completed = completed.clone();
        let work: Work = Box::new(move |_| {
            if i % 7 == 0 {
                panic!("unit {i} panicked");
            }
            if i % 3 == 0 {
                return Err(etl_error!(
                    ErrorKind::ConsumeFailed,
                    "Unit of work failed",
                    format!("unit {i}")
                ));
            }
            completed.fetch_add(1, Ordering::SeqCst);

            Ok(())
        });

        executor.submit(work, Arc::new(metrics.clone())).unwrap();
    }

    executor.shutdown().unwrap();

    (completed.load(Ordering::SeqCst), metrics)
}

fn expected() -> (usize, f64, f64) {
    let panicked = (1..=SUBMISSIONS).filter(|i| i % 7 == 0).count();
    let failed = (1..=SUBMISSIONS).filter(|i| i % 7 != 0 && i % 3 == 0).count();

    (SUBMISSIONS - panicked - failed, failed as f64, panicked as f64)
}

#[test]
fn immediate_executor_contains_failures() {
    init_test_tracing();
    let executor = ImmediateExecutor::new();

    let (completed, metrics) = submit_mixed_work(&executor);

    let (expected_completed, failed, panicked) = expected();
    assert_eq!(completed, expected_completed);
    assert_eq!(metrics.count(WORK_FAILED), failed);
    assert_eq!(metrics.count(WORK_PANICKED), panicked);
}

#[test]
fn worker_pool_contains_failures() {
    init_test_tracing();
    let executor = WorkerPoolExecutor::new(4).unwrap();

    let (completed, metrics) = submit_mixed_work(&executor);

    let (expected_completed, failed, panicked) = expected();
    assert_eq!(completed, expected_completed);
    assert_eq!(metrics.count(WORK_FAILED), failed);
    assert_eq!(metrics.count(WORK_PANICKED), panicked);
}

#[test]
fn submit_after_shutdown_is_rejected() {
    init_test_tracing();
    let executors: Vec<Box<dyn Executor>> = vec![
        Box::new(ImmediateExecutor::new()),
        Box::new(WorkerPoolExecutor::new(2).unwrap()),
    ];

    for executor in executors {
        executor.shutdown().unwrap();
        assert!(executor.is_shutdown());

        let metrics: Arc<dyn EtlMetrics> = Arc::new(RecordingMetrics::new());
        let err = executor.submit(Box::new(|_| Ok(())), metrics).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RejectedWork);
    }
}
