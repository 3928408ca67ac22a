use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;

use crate::error::EtlResult;
use crate::metrics::{EtlMetrics, WORK_FAILED, WORK_PANICKED};

/// A unit of work. It receives the metrics scope it was submitted with.
pub type Work = Box<dyn FnOnce(&dyn EtlMetrics) -> EtlResult<()> + Send + 'static>;

pub trait Executor: Send + Sync {
    /// Schedules `work` to run.
    ///
    /// Only fails when the work cannot be accepted, with
    /// [`crate::error::ErrorKind::RejectedWork`] once the executor is shut down. Failures of the
    /// work itself are contained by the executor.
    fn submit(&self, work: Work, metrics: Arc<dyn EtlMetrics>) -> EtlResult<()>;

    /// Stops accepting work and waits for all accepted work to finish.
    fn shutdown(&self) -> EtlResult<()>;

    fn is_shutdown(&self) -> bool;
}

/// Runs `work`, logging and counting an error or panic instead of propagating it.
///
/// Returns `true` when the work completed successfully.
pub fn run_contained(work: Work, metrics: &dyn EtlMetrics) -> bool {
    match catch_unwind(AssertUnwindSafe(|| work(metrics))) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            error!(error = %err, "unit of work failed");
            metrics.add_count(WORK_FAILED, 1.0);

            false
        }
        Err(payload) => {
            error!(panic = panic_message(payload.as_ref()), "unit of work panicked");
            metrics.add_count(WORK_PANICKED, 1.0);

            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
