//! Worker error types.

use std::time::Duration;

use thiserror::Error;
use vauto_models::RequestError;

use crate::engine::RenderError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failure of a single job's pipeline. Recorded on the job, never fatal to a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Timeline error: {0}")]
    Timeline(#[from] vauto_timeline::TimelineError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Render timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Render engine panicked: {0}")]
    Panicked(String),

    /// The job left `processing` while the pipeline was running.
    #[error("Job is no longer processing")]
    Cancelled,
}

impl WorkerError {
    pub fn panicked(msg: impl Into<String>) -> Self {
        Self::Panicked(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled)
    }
}

/// Rejected submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid request: {0}")]
    Invalid(#[from] RequestError),

    #[error("Invalid request at index {index}: {source}")]
    InvalidBatchItem {
        index: usize,
        #[source]
        source: RequestError,
    },
}
