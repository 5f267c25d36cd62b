//! Per-job video creation pipeline.
//!
//! A worker hands every dequeued job id to [`JobProcessor::run`], which moves
//! the job to `processing`, builds the timeline, renders it and commits the
//! outcome to the registry. Errors end up on the job record; nothing here
//! propagates to the worker loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tracing::Instrument;

use vauto_models::{JobId, JobRecord, RenderMetrics};
use vauto_queue::JobRegistry;
use vauto_timeline::Timeline;

use crate::engine::{RenderEngine, RenderRequest};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

pub struct JobProcessor {
    registry: Arc<JobRegistry>,
    engine: Arc<dyn RenderEngine>,
    job_timeout: Duration,
}

impl JobProcessor {
    pub fn new(registry: Arc<JobRegistry>, engine: Arc<dyn RenderEngine>, job_timeout: Duration) -> Self {
        Self {
            registry,
            engine,
            job_timeout,
        }
    }

    /// Process one dequeued job to a terminal state.
    ///
    /// Jobs that are no longer queued (cancelled while waiting) are skipped.
    pub async fn run(&self, worker_name: &str, job_id: &JobId) {
        let record = match self.registry.begin_processing(job_id, worker_name).await {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(job_id = %job_id, worker = worker_name, "Skipping job: {}", e);
                return;
            }
        };

        let logger = JobLogger::new(job_id, worker_name);
        let span = logger.create_span();
        self.run_pipeline(&record, &logger).instrument(span).await;
    }

    async fn run_pipeline(&self, record: &JobRecord, logger: &JobLogger) {
        logger.log_start(&format!(
            "template={}, quality={}",
            record.request.template_id, record.request.quality
        ));
        let started = Instant::now();

        let outcome = AssertUnwindSafe(self.process(record, logger))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(WorkerError::panicked(panic_message(panic.as_ref()))));

        let template = record.request.template_id.as_str();
        match outcome {
            Ok(result) => {
                let output = result.output_file.clone();
                if self.registry.complete(&record.id, result).await {
                    metrics::record_job_completed(template, started.elapsed().as_secs_f64());
                    logger.log_completion(&output);
                } else {
                    logger.log_warning("Job left processing during render; result discarded");
                }
            }
            Err(e) if e.is_cancelled() => {
                logger.log_progress("Stopped: job was cancelled");
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                if self.registry.fail(&record.id, e.to_string()).await {
                    metrics::record_job_failed(template);
                }
            }
        }
    }

    /// Build, style and render the timeline for a processing job.
    async fn process(&self, record: &JobRecord, logger: &JobLogger) -> WorkerResult<RenderMetrics> {
        let request = &record.request;

        self.stage(record, 5.0, "initialization", "Initializing timeline").await?;
        let mut timeline = Timeline::new(record.project_id.clone());
        let settings = request.quality.settings();
        timeline.resolution = (settings.width, settings.height);
        timeline.frame_rate = settings.fps;

        self.stage(record, 15.0, "timeline_creation", "Populating timeline from script")
            .await?;
        let summary = timeline.populate_from_script_and_voice(
            &request.script_content,
            request.voice_reference.as_deref(),
            &request.background_config,
        )?;
        logger.log_progress(&format!(
            "{} segments, {} assets, {:.1}s",
            summary.segments_processed, summary.assets_created, summary.total_duration
        ));

        self.stage(record, 40.0, "effects_processing", "Applying template style")
            .await?;
        timeline.apply_template_style(&request.template_id)?;

        self.stage(record, 80.0, "rendering", "Rendering video").await?;
        let render_request = RenderRequest {
            job_id: record.id.clone(),
            quality: request.quality,
            template_id: request.template_id.clone(),
        };

        tracing::debug!(job_id = %record.id, engine = self.engine.name(), "Starting render");
        let result = tokio::time::timeout(
            self.job_timeout,
            self.engine.render(&timeline, &render_request),
        )
        .await
        .map_err(|_| WorkerError::Timeout(self.job_timeout))??;

        Ok(result)
    }

    /// Publish a stage; fails with `Cancelled` once the job left `processing`.
    async fn stage(&self, record: &JobRecord, progress: f64, stage: &str, message: &str) -> WorkerResult<()> {
        if self
            .registry
            .update_progress(&record.id, progress, stage, message)
            .await
        {
            Ok(())
        } else {
            Err(WorkerError::Cancelled)
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
