//! Job scheduler: submission API and worker pool.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vauto_models::{BatchStats, JobId, JobPriority, JobRecord, JobRequest, JobStatus, ProgressEvent};
use vauto_queue::{JobRegistry, ObserverId, PriorityJobQueue, ProgressObserver};

use crate::config::WorkerConfig;
use crate::engine::RenderEngine;
use crate::error::SubmitError;
use crate::metrics;
use crate::processor::JobProcessor;

/// Message recorded on jobs force-cancelled by [`Scheduler::shutdown`].
pub const SHUTDOWN_CANCEL_MESSAGE: &str = "Processing cancelled: scheduler shutting down";

const USER_CANCEL_MESSAGE: &str = "Job cancelled by user";

/// State shared between the scheduler handle and its worker tasks.
struct Shared {
    queue: PriorityJobQueue,
    registry: Arc<JobRegistry>,
    processor: JobProcessor,
}

/// Owns the queue, the registry and the worker pool.
pub struct Scheduler {
    config: WorkerConfig,
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    scheduler_id: String,
}

impl Scheduler {
    pub fn new(config: WorkerConfig, engine: Arc<dyn RenderEngine>) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let processor = JobProcessor::new(Arc::clone(&registry), engine, config.job_timeout);
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            shared: Arc::new(Shared {
                queue: PriorityJobQueue::new(),
                registry,
                processor,
            }),
            shutdown,
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            scheduler_id: format!("scheduler-{}", Uuid::new_v4()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the worker pool and the history pruning task.
    ///
    /// Jobs submitted before `start` stay queued until a worker picks them up.
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;
        if self.running.swap(true, Ordering::SeqCst) {
            warn!(scheduler = %self.scheduler_id, "Scheduler already running");
            return;
        }
        self.shutdown.send_replace(false);

        let workers = self.config.max_concurrent_jobs.max(1);
        info!(
            scheduler = %self.scheduler_id,
            "Starting scheduler with {} workers", workers
        );

        for index in 0..workers {
            let shared = Arc::clone(&self.shared);
            let shutdown_rx = self.shutdown.subscribe();
            let poll_interval = self.config.poll_interval;
            let name = format!("worker_{}", index);
            tasks.push(tokio::spawn(async move {
                worker_loop(name, shared, shutdown_rx, poll_interval).await;
            }));
        }

        let registry = Arc::clone(&self.shared.registry);
        let mut shutdown_rx = self.shutdown.subscribe();
        let cleanup_interval = self.config.cleanup_period();
        let retention = self.config.history_retention_chrono();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = interval.tick() => {
                        let pruned = registry.cleanup(retention).await;
                        debug!(pruned, "Periodic history cleanup");
                    }
                }
            }
        }));
    }

    /// Stop the worker pool.
    ///
    /// Processing jobs are moved to `cancelled` right away; in-flight renders
    /// get `shutdown_timeout` to return before their workers are aborted, and
    /// any result they produce is discarded. Queued jobs stay queued.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!(scheduler = %self.scheduler_id, "Shutting down scheduler");
        self.shutdown.send_replace(true);

        let mut cancelled = self
            .shared
            .registry
            .cancel_all_processing(SHUTDOWN_CANCEL_MESSAGE)
            .await
            .len();

        let handles: Vec<JoinHandle<()>> = tasks.drain(..).collect();
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let joined = tokio::time::timeout(
            self.config.shutdown_timeout,
            futures_util::future::join_all(handles),
        )
        .await;

        if joined.is_err() {
            warn!(
                scheduler = %self.scheduler_id,
                "Workers did not stop within {:?}, aborting", self.config.shutdown_timeout
            );
            for abort in aborts {
                abort.abort();
            }
        }

        // A worker may have started a job between the signal and the first sweep.
        cancelled += self
            .shared
            .registry
            .cancel_all_processing(SHUTDOWN_CANCEL_MESSAGE)
            .await
            .len();

        if cancelled > 0 {
            metrics::record_jobs_cancelled("shutdown", cancelled as u64);
        }
        info!(
            scheduler = %self.scheduler_id,
            cancelled, "Scheduler stopped"
        );
    }

    /// Validate and enqueue one request.
    pub async fn submit(
        &self,
        request: JobRequest,
        priority: JobPriority,
        project_id: Option<String>,
    ) -> Result<JobId, SubmitError> {
        request.validate()?;
        Ok(self.enqueue(JobRecord::new(request, priority, project_id)).await)
    }

    /// Enqueue a batch. Nothing is enqueued unless every request is valid.
    pub async fn submit_many(
        &self,
        requests: Vec<JobRequest>,
        priority: JobPriority,
    ) -> Result<Vec<JobId>, SubmitError> {
        for (index, request) in requests.iter().enumerate() {
            request
                .validate()
                .map_err(|source| SubmitError::InvalidBatchItem { index, source })?;
        }

        let mut ids = Vec::with_capacity(requests.len());
        for request in requests {
            ids.push(self.enqueue(JobRecord::new(request, priority, None)).await);
        }
        info!(count = ids.len(), priority = %priority, "Submitted batch");
        Ok(ids)
    }

    pub async fn status(&self, job_id: &JobId) -> Option<JobRecord> {
        self.shared.registry.get_status(job_id).await
    }

    /// Active jobs first, then most recently finished ones.
    pub async fn get_all(&self, limit: usize) -> Vec<JobRecord> {
        self.shared.registry.get_all(limit).await
    }

    /// Cancel a queued or processing job. Returns `false` for unknown or finished jobs.
    pub async fn cancel(&self, job_id: &JobId) -> bool {
        match self.shared.registry.cancel(job_id, USER_CANCEL_MESSAGE).await {
            Ok(previous) => {
                if previous == JobStatus::Queued {
                    self.shared.queue.remove(job_id).await;
                    metrics::set_queue_length(self.shared.queue.len().await);
                }
                metrics::record_jobs_cancelled("user", 1);
                true
            }
            Err(e) => {
                debug!(job_id = %job_id, "Cancel rejected: {}", e);
                false
            }
        }
    }

    /// Resubmit a failed job as a new job. Returns `None` unless the job failed.
    pub async fn retry(&self, job_id: &JobId) -> Option<JobId> {
        match self.shared.registry.retry_request(job_id).await {
            Ok(record) => {
                let new_id = self.enqueue(record).await;
                info!(job_id = %job_id, retry_id = %new_id, "Retrying failed job");
                Some(new_id)
            }
            Err(e) => {
                debug!(job_id = %job_id, "Retry rejected: {}", e);
                None
            }
        }
    }

    pub async fn stats(&self) -> BatchStats {
        self.shared.registry.stats().await
    }

    /// Prune finished jobs older than `max_age`. Returns how many were removed.
    pub async fn cleanup(&self, max_age: chrono::Duration) -> usize {
        self.shared.registry.cleanup(max_age).await
    }

    pub async fn queue_len(&self) -> usize {
        self.shared.queue.len().await
    }

    pub async fn add_progress_observer(
        &self,
        job_id: &JobId,
        observer: Arc<dyn ProgressObserver>,
    ) -> ObserverId {
        self.shared.registry.add_observer(job_id, observer).await
    }

    pub async fn remove_progress_observer(&self, job_id: &JobId, observer_id: ObserverId) -> bool {
        self.shared.registry.remove_observer(job_id, observer_id).await
    }

    /// Progress stream of one job, ending after its terminal event.
    ///
    /// Finished jobs yield their final state once; unknown jobs yield nothing.
    pub async fn subscribe(&self, job_id: &JobId) -> Pin<Box<dyn Stream<Item = ProgressEvent> + Send>> {
        self.shared.registry.subscribe(job_id).await
    }

    /// Progress events of every job.
    pub fn subscribe_all(&self) -> broadcast::Receiver<ProgressEvent> {
        self.shared.registry.progress().subscribe_all()
    }

    async fn enqueue(&self, record: JobRecord) -> JobId {
        let job_id = record.id.clone();
        let priority = record.priority;

        // Register first so a worker never dequeues an unknown id.
        self.shared.registry.insert(record).await;
        self.shared.queue.enqueue(job_id.clone(), priority).await;

        metrics::record_job_submitted(priority.as_str());
        metrics::set_queue_length(self.shared.queue.len().await);
        job_id
    }
}

async fn worker_loop(
    name: String,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
    poll_interval: Duration,
) {
    debug!(worker = %name, "Worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = tokio::select! {
            _ = shutdown.changed() => break,
            next = shared.queue.dequeue_timeout(poll_interval) => next,
        };
        let Some(entry) = next else {
            continue;
        };

        if *shutdown.borrow() {
            // Keep the job for the next start.
            shared.queue.requeue(entry).await;
            break;
        }

        metrics::set_queue_length(shared.queue.len().await);
        shared.processor.run(&name, &entry.job_id).await;
    }

    debug!(worker = %name, "Worker stopped");
}
