//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("YouTube error: {0}")]
    YouTube(#[from] tuberank_youtube::YouTubeError),

    #[error("Storage error: {0}")]
    Storage(#[from] tuberank_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] tuberank_queue::QueueError),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Only transient upstream failures qualify. A `NotFound` or any
    /// other 4xx fails the job on the first attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::YouTube(e) => e.is_retryable(),
            WorkerError::Storage(_) | WorkerError::Queue(_) => true,
            WorkerError::JobFailed(_) | WorkerError::ConfigError(_) => false,
        }
    }
}
