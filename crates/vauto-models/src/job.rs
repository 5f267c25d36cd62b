//! Job records and the job lifecycle state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::{JobRequest, RenderMetrics};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job priority. Higher priorities are dequeued first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Urgent = 4,
}

impl JobPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPriority::Low => "low",
            JobPriority::Normal => "normal",
            JobPriority::High => "high",
            JobPriority::Urgent => "urgent",
        }
    }

    /// Numeric weight of the priority (1 = low, 4 = urgent).
    pub fn weight(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown priority: {0}")]
pub struct PriorityParseError(pub String);

impl FromStr for JobPriority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(JobPriority::Low),
            "normal" => Ok(JobPriority::Normal),
            "high" => Ok(JobPriority::High),
            "urgent" => Ok(JobPriority::Urgent),
            other => Err(PriorityParseError(other.to_string())),
        }
    }
}

/// Job status.
///
/// `Queued` is initial; `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting in queue
    #[default]
    Queued,
    /// Job is being processed by a worker
    Processing,
    /// Job completed successfully
    Completed,
    /// Job failed (retryable as a new job)
    Failed,
    /// Job was cancelled by the user or by shutdown
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Queued, JobStatus::Cancelled)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid job transition from {from} to {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// A submitted render job and its mutable lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Unique job ID
    pub id: JobId,

    /// Project this job renders
    pub project_id: String,

    /// Immutable request parameters
    pub request: JobRequest,

    /// Queue priority
    #[serde(default)]
    pub priority: JobPriority,

    /// Lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Progress (0-100)
    #[serde(default)]
    pub progress: f64,

    /// Current processing stage
    pub stage: String,

    /// Human-readable status message
    pub message: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Started at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Terminal transition timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Render result (if completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RenderMetrics>,

    /// Estimated processing time in seconds
    pub estimated_duration: f64,

    /// Measured processing time in seconds (if completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<f64>,
}

impl JobRecord {
    /// Create a new queued job record.
    pub fn new(request: JobRequest, priority: JobPriority, project_id: Option<String>) -> Self {
        let estimated_duration = request.estimated_processing_secs();

        Self {
            id: JobId::new(),
            project_id: project_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            request,
            priority,
            status: JobStatus::Queued,
            progress: 0.0,
            stage: "queued".to_string(),
            message: "Job queued for processing".to_string(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            result: None,
            estimated_duration,
            actual_duration: None,
        }
    }

    /// Build a fresh queued record with the same request, priority and project.
    pub fn retry_of(original: &JobRecord) -> Self {
        Self::new(
            original.request.clone(),
            original.priority,
            Some(original.project_id.clone()),
        )
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Move to `processing`.
    pub fn start(&mut self, worker_name: &str) -> Result<(), TransitionError> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(Utc::now());
        self.stage = "processing".to_string();
        self.message = format!("Processing with {}", worker_name);
        Ok(())
    }

    /// Move to `completed` with the render result.
    pub fn complete(&mut self, result: RenderMetrics) -> Result<(), TransitionError> {
        self.transition(JobStatus::Completed)?;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.progress = 100.0;
        self.stage = "completed".to_string();
        self.message = "Video created successfully".to_string();
        self.result = Some(result);
        self.actual_duration = self
            .started_at
            .map(|started| (now - started).num_milliseconds().max(0) as f64 / 1000.0);
        Ok(())
    }

    /// Move to `failed`.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        let error = error.into();
        self.completed_at = Some(Utc::now());
        self.stage = "failed".to_string();
        self.message = format!("Processing failed: {}", error);
        self.error = Some(error);
        Ok(())
    }

    /// Move to `cancelled`.
    pub fn cancel(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Cancelled)?;
        self.completed_at = Some(Utc::now());
        self.stage = "cancelled".to_string();
        self.message = message.into();
        Ok(())
    }

    /// Record intermediate progress. Ignored once the job is terminal.
    pub fn set_progress(&mut self, progress: f64, stage: &str, message: &str) {
        if self.status.is_terminal() {
            return;
        }
        self.progress = progress.clamp(0.0, 100.0);
        self.stage = stage.to_string();
        self.message = message.to_string();
    }

    /// Timestamp used for history ordering and pruning.
    pub fn finished_or_created_at(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }

    pub fn is_retryable(&self) -> bool {
        self.status == JobStatus::Failed
    }
}
