//! Video creation worker binary.
//!
//! Submits one job per script file, runs the worker pool until every job is
//! finished (or Ctrl-C), then prints the batch statistics as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vauto_models::{JobId, JobPriority, JobRequest, Quality};
use vauto_worker::{metrics, ManifestRenderEngine, Scheduler, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "vauto-worker", version)]
struct Cli {
    /// Template applied to every job.
    #[arg(long = "template", default_value = "minimal")]
    template_id: String,

    /// Output quality preset (720p, 1080p, 4k).
    #[arg(long, default_value_t = Quality::default())]
    quality: Quality,

    /// Voice reference attached to every job.
    #[arg(long = "voice")]
    voice_reference: Option<String>,

    /// Queue priority (low, normal, high, urgent).
    #[arg(long, default_value_t = JobPriority::Normal)]
    priority: JobPriority,

    /// Script files, one job each.
    #[arg(required = true)]
    scripts: Vec<PathBuf>,
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vauto=info,info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn all_finished(scheduler: &Scheduler, ids: &[JobId]) -> bool {
    for id in ids {
        match scheduler.status(id).await {
            Some(record) if !record.status.is_terminal() => return false,
            _ => {}
        }
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let metrics_handle = match metrics::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to install metrics recorder: {}", e);
            None
        }
    };

    let args = Cli::parse();
    let config = WorkerConfig::from_env();

    let mut requests = Vec::with_capacity(args.scripts.len());
    for path in &args.scripts {
        let script = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let mut request = JobRequest::new(script)
            .with_template(args.template_id.clone())
            .with_quality(args.quality);
        if let Some(voice) = &args.voice_reference {
            request = request.with_voice(voice.clone());
        }
        requests.push(request);
    }

    let engine = Arc::new(ManifestRenderEngine::new(config.output_dir.clone()));
    let scheduler = Scheduler::new(config, engine);
    info!("Worker config: {:?}", scheduler.config());
    let ids = scheduler.submit_many(requests, args.priority).await?;
    scheduler.start().await;

    let wait_for_jobs = async {
        while !all_finished(&scheduler, &ids).await {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };
    tokio::select! {
        _ = wait_for_jobs => info!("All jobs finished"),
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
    }

    scheduler.shutdown().await;

    for id in &ids {
        if let Some(record) = scheduler.status(id).await {
            info!(
                job_id = %id,
                status = %record.status,
                output = record.result.as_ref().map(|r| r.output_file.as_str()).unwrap_or("-"),
                "{}", record.message
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&scheduler.stats().await)?);
    if let Some(handle) = metrics_handle {
        tracing::debug!("Metrics:\n{}", handle.render());
    }

    info!("Worker shutdown complete");
    Ok(())
}
