//! Structured job logging.

use tracing::{error, info, warn, Span};
use vauto_models::JobId;

/// Logs job lifecycle events with the job id and operation attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    worker: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, worker: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            worker: worker.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, worker = %self.worker, "Job started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, worker = %self.worker, "Job progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, worker = %self.worker, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, worker = %self.worker, "Job error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, worker = %self.worker, "Job completed: {}", message);
    }

    /// Span wrapping the whole pipeline of one job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, worker = %self.worker)
    }
}
