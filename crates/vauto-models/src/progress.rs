//! Job progress events.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Progress update emitted while a job moves through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    pub job_id: JobId,
    /// Progress (0-100)
    pub progress: f64,
    pub stage: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        job_id: JobId,
        progress: f64,
        stage: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            progress: progress.clamp(0.0, 100.0),
            stage: stage.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.stage.as_str(), "completed" | "failed" | "cancelled")
    }
}
