use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The pipeline name is empty or only whitespace.
    #[error("`name` cannot be empty")]
    EmptyPipelineName,
    /// A worker pool executor is configured with zero workers.
    #[error("`executor.workers` cannot be zero")]
    WorkerPoolWithoutWorkers,
}
