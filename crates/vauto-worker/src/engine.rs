//! Render engine seam.
//!
//! The scheduler hands a populated, styled timeline to a [`RenderEngine`]
//! and records whatever it reports. Encoding itself lives behind this trait.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use vauto_models::{JobId, Quality, RenderMetrics};
use vauto_timeline::Timeline;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RenderError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Per-job render parameters.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub job_id: JobId,
    pub quality: Quality,
    pub template_id: String,
}

/// Turns a timeline into an output video.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Name of this engine for logging.
    fn name(&self) -> &'static str;

    async fn render(
        &self,
        timeline: &Timeline,
        request: &RenderRequest,
    ) -> Result<RenderMetrics, RenderError>;
}

/// Writes the timeline as a JSON render manifest instead of encoding video.
#[derive(Debug, Clone)]
pub struct ManifestRenderEngine {
    output_dir: PathBuf,
}

impl ManifestRenderEngine {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl RenderEngine for ManifestRenderEngine {
    fn name(&self) -> &'static str {
        "manifest"
    }

    async fn render(
        &self,
        timeline: &Timeline,
        request: &RenderRequest,
    ) -> Result<RenderMetrics, RenderError> {
        let started = Instant::now();
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let settings = request.quality.settings();
        let manifest = json!({
            "job_id": request.job_id,
            "template": request.template_id,
            "quality": {
                "preset": request.quality,
                "width": settings.width,
                "height": settings.height,
                "fps": settings.fps,
                "bitrate_kbps": settings.bitrate_kbps,
            },
            "timeline": timeline,
        });

        let path = self.output_dir.join(format!("{}.json", timeline.id));
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        tokio::fs::write(&path, &bytes).await?;
        let file_size = tokio::fs::metadata(&path).await?.len();

        debug!(
            job_id = %request.job_id,
            path = %path.display(),
            file_size,
            "Wrote render manifest"
        );

        Ok(RenderMetrics {
            output_file: path.to_string_lossy().into_owned(),
            file_size,
            duration: timeline.duration,
            render_time: started.elapsed().as_secs_f64(),
        })
    }
}
