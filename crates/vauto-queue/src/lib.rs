//! In-process job queue and job bookkeeping.
//!
//! This crate provides:
//! - A priority job queue with FIFO ordering inside a priority level
//! - The job registry (active/completed jobs, history, statistics)
//! - Progress events with per-job observers and broadcast subscriptions

pub mod error;
pub mod progress;
pub mod queue;
pub mod registry;

pub use error::{QueueError, QueueResult};
pub use progress::{ObserverError, ObserverId, ProgressChannel, ProgressObserver, PROGRESS_CHANNEL_CAPACITY};
pub use queue::{PriorityJobQueue, QueuedJob};
pub use registry::JobRegistry;
