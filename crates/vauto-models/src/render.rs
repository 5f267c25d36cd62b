//! Render engine output.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metrics reported by the render engine for a finished video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderMetrics {
    /// Path or URL of the encoded output
    pub output_file: String,
    /// Output size in bytes
    pub file_size: u64,
    /// Video duration in seconds
    pub duration: f64,
    /// Wall-clock render time in seconds
    pub render_time: f64,
}
