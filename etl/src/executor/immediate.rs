use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::executor::base::{Executor, Work, run_contained};
use crate::metrics::EtlMetrics;

/// Runs every unit of work on the submitting thread before [`Executor::submit`] returns.
#[derive(Debug, Default)]
pub struct ImmediateExecutor {
    shutdown: AtomicBool,
}

impl ImmediateExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for ImmediateExecutor {
    fn submit(&self, work: Work, metrics: Arc<dyn EtlMetrics>) -> EtlResult<()> {
        if self.is_shutdown() {
            bail!(
                ErrorKind::RejectedWork,
                "Work was submitted to an executor that is shut down"
            );
        }

        run_contained(work, metrics.as_ref());

        Ok(())
    }

    fn shutdown(&self) -> EtlResult<()> {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            debug!("immediate executor shut down");
        }

        Ok(())
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}
