//! Shared data models for the vauto backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job records, priorities and the job lifecycle state machine
//! - Job requests and submission validation
//! - Script segments and background configuration
//! - Render quality presets and render metrics
//! - Batch statistics and progress events

pub mod job;
pub mod progress;
pub mod quality;
pub mod render;
pub mod request;
pub mod segment;
pub mod stats;

// Re-export common types
pub use job::{JobId, JobPriority, JobRecord, JobStatus, PriorityParseError, TransitionError};
pub use progress::ProgressEvent;
pub use quality::{Quality, QualityParseError, QualitySettings};
pub use render::RenderMetrics;
pub use request::{BackgroundConfig, JobRequest, RequestError, KNOWN_TEMPLATES, MAX_SCRIPT_CHARS};
pub use segment::{Segment, SegmentKind};
pub use stats::BatchStats;
