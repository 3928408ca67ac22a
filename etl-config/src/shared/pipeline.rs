use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::ValidationError;

/// How a pipeline runs the consumption of extracted records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorConfig {
    /// Every record is consumed on the thread that extracted it.
    #[default]
    Immediate,
    /// Records are consumed concurrently by a fixed number of worker threads.
    WorkerPool {
        /// Maximum number of records consumed at the same time.
        workers: usize,
    },
}

/// Configuration for an ETL pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name used to identify the pipeline in logs.
    pub name: String,
    /// Executor consuming the extracted records.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl PipelineConfig {
    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyPipelineName);
        }

        if let ExecutorConfig::WorkerPool { workers: 0 } = self.executor {
            return Err(ValidationError::WorkerPoolWithoutWorkers);
        }

        Ok(())
    }
}

impl Config for PipelineConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
