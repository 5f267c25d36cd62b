//! Scheduler metrics.
//!
//! Recorded through the `metrics` facade; the binary installs a Prometheus
//! recorder, library users may install their own or none.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder. Returns a handle that renders the metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vauto_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vauto_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vauto_jobs_failed_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "vauto_jobs_cancelled_total";
    pub const QUEUE_LENGTH: &str = "vauto_queue_length";
    pub const JOB_DURATION_SECONDS: &str = "vauto_job_duration_seconds";
}

pub fn record_job_submitted(priority: &str) {
    let labels = [("priority", priority.to_string())];
    counter!(names::JOBS_SUBMITTED_TOTAL, &labels).increment(1);
}

/// Record a completed job and its processing time.
pub fn record_job_completed(template: &str, duration_secs: f64) {
    let labels = [("template", template.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_failed(template: &str) {
    let labels = [("template", template.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record cancellations; `reason` is "user" or "shutdown".
pub fn record_jobs_cancelled(reason: &str, count: u64) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOBS_CANCELLED_TOTAL, &labels).increment(count);
}

pub fn set_queue_length(length: usize) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}
