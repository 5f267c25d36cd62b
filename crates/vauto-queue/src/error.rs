//! Queue error types.

use thiserror::Error;
use vauto_models::{JobStatus, TransitionError};

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {id} is {status}; only failed jobs can be retried")]
    NotRetryable { id: String, status: JobStatus },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

impl QueueError {
    pub fn job_not_found(id: impl ToString) -> Self {
        Self::JobNotFound(id.to_string())
    }

    /// Whether the error means "unknown id" rather than "wrong state".
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueueError::JobNotFound(_))
    }
}
