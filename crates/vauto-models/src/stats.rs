//! Aggregate batch processing statistics.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::JobStatus;

/// Batch processing statistics.
///
/// A projection of job history: every field is updated by the registry on
/// job transitions and never edited directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchStats {
    pub total_jobs: u64,
    pub queued_jobs: u64,
    pub processing_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub cancelled_jobs: u64,
    /// Mean processing time of completed jobs, in seconds
    pub average_processing_time: f64,
    /// Sum of processing time of completed jobs, in seconds
    pub total_processing_time: f64,
    /// `completed / (completed + failed) * 100`, zero until a job finishes
    pub success_rate: f64,
}

impl BatchStats {
    /// Account for a newly queued job.
    pub fn record_submitted(&mut self) {
        self.total_jobs += 1;
        self.queued_jobs += 1;
    }

    /// Account for a job leaving `from` for `to`.
    ///
    /// `actual_duration` is only used for `completed` transitions.
    pub fn record_transition(&mut self, from: JobStatus, to: JobStatus, actual_duration: Option<f64>) {
        match from {
            JobStatus::Queued => self.queued_jobs = self.queued_jobs.saturating_sub(1),
            JobStatus::Processing => self.processing_jobs = self.processing_jobs.saturating_sub(1),
            _ => {}
        }

        match to {
            JobStatus::Queued => self.queued_jobs += 1,
            JobStatus::Processing => self.processing_jobs += 1,
            JobStatus::Completed => {
                self.completed_jobs += 1;
                self.total_processing_time += actual_duration.unwrap_or(0.0);
                self.average_processing_time =
                    self.total_processing_time / self.completed_jobs as f64;
            }
            JobStatus::Failed => self.failed_jobs += 1,
            JobStatus::Cancelled => self.cancelled_jobs += 1,
        }

        if to.is_terminal() {
            self.recompute_success_rate();
        }
    }

    fn recompute_success_rate(&mut self) {
        let finished = self.completed_jobs + self.failed_jobs;
        self.success_rate = if finished == 0 {
            0.0
        } else {
            self.completed_jobs as f64 / finished as f64 * 100.0
        };
    }
}
