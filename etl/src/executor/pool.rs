use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::executor::base::{Executor, Work, run_contained};
use crate::metrics::EtlMetrics;

/// Runs units of work on a fixed number of blocking worker threads.
///
/// The executor owns a dedicated tokio runtime; every submission becomes a blocking task on it,
/// and no more than `workers` of them run at the same time. [`Executor::shutdown`] stops
/// accepting work and blocks until everything accepted so far has run, so it must not be called
/// from within an async context.
pub struct WorkerPoolExecutor {
    workers: usize,
    runtime: Mutex<Option<Runtime>>,
    tasks: Mutex<JoinSet<bool>>,
}

impl WorkerPoolExecutor {
    pub fn new(workers: usize) -> EtlResult<Self> {
        if workers == 0 {
            bail!(
                ErrorKind::ConfigError,
                "Worker pool executor needs at least one worker"
            );
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("etl-worker")
            .build()?;

        info!(workers, "started worker pool executor");

        Ok(Self {
            workers,
            runtime: Mutex::new(Some(runtime)),
            tasks: Mutex::new(JoinSet::new()),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn lock_runtime(&self) -> MutexGuard<'_, Option<Runtime>> {
        match self.runtime.lock() {
            Ok(runtime) => runtime,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<bool>> {
        match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Executor for WorkerPoolExecutor {
    fn submit(&self, work: Work, metrics: Arc<dyn EtlMetrics>) -> EtlResult<()> {
        let guard = self.lock_runtime();
        let Some(runtime) = guard.as_ref() else {
            bail!(
                ErrorKind::RejectedWork,
                "Work was submitted to an executor that is shut down"
            );
        };

        let mut tasks = self.lock_tasks();
        // Finished tasks are reaped here so the set only grows with outstanding work.
        while tasks.try_join_next().is_some() {}
        tasks.spawn_blocking_on(
            move || run_contained(work, metrics.as_ref()),
            runtime.handle(),
        );

        Ok(())
    }

    fn shutdown(&self) -> EtlResult<()> {
        let Some(runtime) = self.lock_runtime().take() else {
            return Ok(());
        };

        let mut tasks = mem::take(&mut *self.lock_tasks());
        debug!(outstanding = tasks.len(), "draining worker pool executor");

        let failed = runtime.block_on(async {
            let mut failed = 0usize;
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(true) => {}
                    Ok(false) => failed += 1,
                    Err(err) => {
                        error!(error = %err, "worker task could not be joined");
                        failed += 1;
                    }
                }
            }

            failed
        });
        drop(runtime);

        info!(failed, "worker pool executor shut down");

        Ok(())
    }

    fn is_shutdown(&self) -> bool {
        self.lock_runtime().is_none()
    }
}

impl fmt::Debug for WorkerPoolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPoolExecutor")
            .field("workers", &self.workers)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
