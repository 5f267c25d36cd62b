//! Video creation scheduler.
//!
//! This crate provides:
//! - The scheduler: submission API, cancel/retry and statistics
//! - A fixed-size worker pool with graceful shutdown
//! - The per-job pipeline (segment, populate, style, render)
//! - The render engine seam and a manifest-writing engine
//! - Structured job logging and metrics

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod scheduler;

pub use config::{WorkerConfig, MIN_CLEANUP_INTERVAL};
pub use engine::{ManifestRenderEngine, RenderEngine, RenderError, RenderRequest};
pub use error::{SubmitError, WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use processor::JobProcessor;
pub use scheduler::{Scheduler, SHUTDOWN_CANCEL_MESSAGE};
