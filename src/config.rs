use crate::error::{EngineError, Result};

pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Sizing of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of workers, fixed for the lifetime of the pool.
    pub workers: usize,
    /// Work items that may wait for a free worker before `run` applies backpressure.
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(EngineError::ConfigError(
                "at least one worker is required".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EngineError::ConfigError(
                "queue capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
