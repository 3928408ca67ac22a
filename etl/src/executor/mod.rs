//! Runs units of work on behalf of a pipeline.
//!
//! A unit of work that fails or panics never takes its executor, or the thread that submitted
//! it, down with it: the failure is logged, counted in the metrics scope the work was submitted
//! with, and dropped.

mod base;
mod immediate;
mod pool;

pub use base::{Executor, Work, run_contained};
pub use immediate::ImmediateExecutor;
pub use pool::WorkerPoolExecutor;

use etl_config::shared::ExecutorConfig;

use crate::error::EtlResult;

/// Builds the executor described by `config`.
pub fn build_executor(config: &ExecutorConfig) -> EtlResult<Box<dyn Executor>> {
    match config {
        ExecutorConfig::Immediate => Ok(Box::new(ImmediateExecutor::new())),
        ExecutorConfig::WorkerPool { workers } => {
            Ok(Box::new(WorkerPoolExecutor::new(*workers)?))
        }
    }
}
