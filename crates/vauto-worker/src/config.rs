//! Scheduler configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Shortest period the history pruning task runs at.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Scheduler and worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of worker loops started by the scheduler
    pub max_concurrent_jobs: usize,
    /// Bounded wait of each dequeue, so idle workers notice shutdown
    pub poll_interval: Duration,
    /// Upper bound on a single render
    pub job_timeout: Duration,
    /// How long shutdown waits for workers before aborting them
    pub shutdown_timeout: Duration,
    /// Directory the manifest render engine writes to
    pub output_dir: PathBuf,
    /// Age after which finished jobs are pruned from history
    pub history_retention: Duration,
    /// How often the pruning task runs
    pub cleanup_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            poll_interval: Duration::from_millis(5000),
            job_timeout: Duration::from_secs(3600), // 1 hour
            shutdown_timeout: Duration::from_secs(30),
            output_dir: PathBuf::from("/tmp/video_output"),
            history_retention: Duration::from_secs(24 * 3600),
            cleanup_interval: Duration::from_secs(600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: env_or("VAUTO_MAX_CONCURRENT_JOBS", 3usize).max(1),
            poll_interval: Duration::from_millis(env_or("VAUTO_POLL_INTERVAL_MS", 5000)),
            job_timeout: Duration::from_secs(env_or("VAUTO_JOB_TIMEOUT", 3600)),
            shutdown_timeout: Duration::from_secs(env_or("VAUTO_SHUTDOWN_TIMEOUT", 30)),
            output_dir: std::env::var("VAUTO_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/video_output")),
            history_retention: Duration::from_secs(
                env_or::<u64>("VAUTO_HISTORY_RETENTION_HOURS", 24).saturating_mul(3600),
            ),
            cleanup_interval: Duration::from_secs(env_or("VAUTO_CLEANUP_INTERVAL", 600))
                .max(MIN_CLEANUP_INTERVAL),
        }
    }

    /// Retention as a chrono duration, for comparing against job timestamps.
    ///
    /// Saturates at the largest chrono duration.
    pub fn history_retention_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.history_retention).unwrap_or(chrono::Duration::MAX)
    }

    /// Period of the pruning task, never shorter than [`MIN_CLEANUP_INTERVAL`].
    pub fn cleanup_period(&self) -> Duration {
        self.cleanup_interval.max(MIN_CLEANUP_INTERVAL)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
