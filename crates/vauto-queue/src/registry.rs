//! Job registry and batch statistics.
//!
//! The registry owns every job record from submission until it is pruned.
//! Active jobs (queued or processing) and terminal jobs live in separate
//! maps; terminal jobs are also appended to a history list in the order they
//! finished. Statistics are updated on every transition under the same lock
//! as the record itself, so a record and the counters never disagree.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use futures_util::{stream, Stream};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use vauto_models::{BatchStats, JobId, JobRecord, JobStatus, ProgressEvent, RenderMetrics};

use crate::error::{QueueError, QueueResult};
use crate::progress::{ObserverId, ProgressChannel, ProgressObserver};

#[derive(Default)]
struct RegistryState {
    active: HashMap<JobId, JobRecord>,
    completed: HashMap<JobId, JobRecord>,
    history: Vec<JobId>,
    stats: BatchStats,
}

impl RegistryState {
    /// Apply a terminal transition to an active job and move it to history.
    fn finish<F>(&mut self, job_id: &JobId, apply: F) -> QueueResult<JobRecord>
    where
        F: FnOnce(&mut JobRecord) -> Result<(), vauto_models::TransitionError>,
    {
        let record = self
            .active
            .get_mut(job_id)
            .ok_or_else(|| QueueError::job_not_found(job_id))?;

        let from = record.status;
        apply(record)?;
        let to = record.status;

        let record = self
            .active
            .remove(job_id)
            .ok_or_else(|| QueueError::job_not_found(job_id))?;
        self.stats
            .record_transition(from, to, record.actual_duration);
        self.history.push(job_id.clone());
        self.completed.insert(job_id.clone(), record.clone());
        Ok(record)
    }
}

/// Shared store of job records, statistics and progress observers.
#[derive(Default)]
pub struct JobRegistry {
    state: RwLock<RegistryState>,
    /// Held from a job transition until its event is published, so events
    /// reach observers in transition order. Always taken before `state`.
    events: Mutex<()>,
    progress: Arc<ProgressChannel>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The progress channel events are published on.
    pub fn progress(&self) -> &Arc<ProgressChannel> {
        &self.progress
    }

    /// Track a newly submitted, queued job.
    pub async fn insert(&self, record: JobRecord) {
        let mut state = self.state.write().await;
        state.stats.record_submitted();
        debug!(job_id = %record.id, priority = %record.priority, "Registered job");
        state.active.insert(record.id.clone(), record);
    }

    /// Move a queued job to `processing` and return a snapshot of it.
    ///
    /// Fails when the job is unknown or no longer queued (for example it was
    /// cancelled while waiting).
    pub async fn begin_processing(&self, job_id: &JobId, worker_name: &str) -> QueueResult<JobRecord> {
        let _events = self.events.lock().await;
        let snapshot = {
            let mut state = self.state.write().await;
            let record = state
                .active
                .get_mut(job_id)
                .ok_or_else(|| QueueError::job_not_found(job_id))?;

            let from = record.status;
            record.start(worker_name)?;
            let to = record.status;
            let snapshot = record.clone();
            state.stats.record_transition(from, to, None);
            snapshot
        };

        self.progress
            .publish(ProgressEvent::new(
                job_id.clone(),
                0.0,
                "processing",
                snapshot.message.clone(),
            ))
            .await;
        Ok(snapshot)
    }

    /// Record intermediate progress of a processing job.
    ///
    /// Returns `false` when the job is no longer processing; the event is not
    /// published in that case.
    pub async fn update_progress(&self, job_id: &JobId, progress: f64, stage: &str, message: &str) -> bool {
        let _events = self.events.lock().await;
        {
            let mut state = self.state.write().await;
            match state.active.get_mut(job_id) {
                Some(record) if record.status == JobStatus::Processing => {
                    record.set_progress(progress, stage, message);
                }
                _ => return false,
            }
        }

        self.progress
            .publish(ProgressEvent::new(job_id.clone(), progress, stage, message))
            .await;
        true
    }

    /// Commit a successful render. Returns `false` (and discards the result)
    /// if the job is no longer processing.
    pub async fn complete(&self, job_id: &JobId, result: RenderMetrics) -> bool {
        let _events = self.events.lock().await;
        let finished = {
            let mut state = self.state.write().await;
            state.finish(job_id, |record| record.complete(result))
        };

        match finished {
            Ok(record) => {
                info!(
                    job_id = %job_id,
                    actual_duration = record.actual_duration.unwrap_or_default(),
                    "Job completed"
                );
                self.publish_terminal(&record).await;
                true
            }
            Err(e) => {
                debug!(job_id = %job_id, "Discarding render result: {}", e);
                false
            }
        }
    }

    /// Commit a processing failure. Returns `false` if the job is no longer processing.
    pub async fn fail(&self, job_id: &JobId, error: impl Into<String>) -> bool {
        let error = error.into();
        let _events = self.events.lock().await;
        let finished = {
            let mut state = self.state.write().await;
            state.finish(job_id, |record| record.fail(error))
        };

        match finished {
            Ok(record) => {
                self.publish_terminal(&record).await;
                true
            }
            Err(e) => {
                debug!(job_id = %job_id, "Discarding failure: {}", e);
                false
            }
        }
    }

    /// Cancel an active job. Returns the status it had before cancellation.
    pub async fn cancel(&self, job_id: &JobId, message: &str) -> QueueResult<JobStatus> {
        let _events = self.events.lock().await;
        let (previous, record) = {
            let mut state = self.state.write().await;
            if !state.active.contains_key(job_id) {
                return match state.completed.get(job_id) {
                    Some(record) => Err(QueueError::InvalidTransition(
                        vauto_models::TransitionError {
                            from: record.status,
                            to: JobStatus::Cancelled,
                        },
                    )),
                    None => Err(QueueError::job_not_found(job_id)),
                };
            }

            let previous = state.active[job_id].status;
            let record = state.finish(job_id, |record| record.cancel(message))?;
            (previous, record)
        };

        info!(job_id = %job_id, previous = %previous, "Job cancelled");
        self.publish_terminal(&record).await;
        Ok(previous)
    }

    /// Force every processing job to `cancelled`. Returns the cancelled ids.
    pub async fn cancel_all_processing(&self, message: &str) -> Vec<JobId> {
        let _events = self.events.lock().await;
        let records = {
            let mut state = self.state.write().await;
            let processing: Vec<JobId> = state
                .active
                .values()
                .filter(|r| r.status == JobStatus::Processing)
                .map(|r| r.id.clone())
                .collect();

            let mut records = Vec::with_capacity(processing.len());
            for job_id in &processing {
                if let Ok(record) = state.finish(job_id, |record| record.cancel(message)) {
                    records.push(record);
                }
            }
            records
        };

        for record in &records {
            self.publish_terminal(record).await;
        }
        records.into_iter().map(|r| r.id).collect()
    }

    /// Build a fresh queued record from a failed job.
    ///
    /// The new record is not registered; the caller inserts and enqueues it.
    pub async fn retry_request(&self, job_id: &JobId) -> QueueResult<JobRecord> {
        let state = self.state.read().await;
        if let Some(record) = state.active.get(job_id) {
            return Err(QueueError::NotRetryable {
                id: job_id.to_string(),
                status: record.status,
            });
        }

        let original = state
            .completed
            .get(job_id)
            .ok_or_else(|| QueueError::job_not_found(job_id))?;
        if !original.is_retryable() {
            return Err(QueueError::NotRetryable {
                id: job_id.to_string(),
                status: original.status,
            });
        }
        Ok(JobRecord::retry_of(original))
    }

    /// Snapshot of one job.
    pub async fn get_status(&self, job_id: &JobId) -> Option<JobRecord> {
        let state = self.state.read().await;
        state
            .active
            .get(job_id)
            .or_else(|| state.completed.get(job_id))
            .cloned()
    }

    /// Whether the job is currently processing.
    pub async fn is_processing(&self, job_id: &JobId) -> bool {
        self.state
            .read()
            .await
            .active
            .get(job_id)
            .is_some_and(|r| r.status == JobStatus::Processing)
    }

    /// Active jobs (oldest first), then most recently finished jobs, capped at `limit`.
    pub async fn get_all(&self, limit: usize) -> Vec<JobRecord> {
        let state = self.state.read().await;

        let mut active: Vec<&JobRecord> = state.active.values().collect();
        active.sort_by_key(|r| r.created_at);

        active
            .into_iter()
            .chain(
                state
                    .history
                    .iter()
                    .rev()
                    .filter_map(|id| state.completed.get(id)),
            )
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop finished jobs older than `max_age` together with their observers.
    ///
    /// Active jobs are never pruned. Statistics are cumulative and unchanged.
    pub async fn cleanup(&self, max_age: ChronoDuration) -> usize {
        // An age beyond the representable range prunes nothing.
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            debug!("Cleanup age out of range, nothing pruned");
            return 0;
        };

        let pruned: Vec<JobId> = {
            let mut state = self.state.write().await;
            let pruned: Vec<JobId> = state
                .completed
                .values()
                .filter(|r| r.finished_or_created_at() <= cutoff)
                .map(|r| r.id.clone())
                .collect();

            for job_id in &pruned {
                state.completed.remove(job_id);
            }
            let RegistryState {
                history, completed, ..
            } = &mut *state;
            history.retain(|id| completed.contains_key(id));
            pruned
        };

        for job_id in &pruned {
            self.progress.remove_job(job_id).await;
        }

        info!("Cleaned up {} old jobs", pruned.len());
        pruned.len()
    }

    pub async fn stats(&self) -> BatchStats {
        self.state.read().await.stats.clone()
    }

    pub async fn active_count(&self) -> usize {
        self.state.read().await.active.len()
    }

    pub async fn add_observer(&self, job_id: &JobId, observer: Arc<dyn ProgressObserver>) -> ObserverId {
        self.progress.add_observer(job_id, observer).await
    }

    pub async fn remove_observer(&self, job_id: &JobId, observer_id: ObserverId) -> bool {
        self.progress.remove_observer(job_id, observer_id).await
    }

    /// Stream the progress events of one job, ending after its terminal event.
    ///
    /// A job that already finished yields a single event describing its final
    /// state. An unknown job yields nothing.
    pub async fn subscribe(&self, job_id: &JobId) -> Pin<Box<dyn Stream<Item = ProgressEvent> + Send>> {
        // Receiver exists before the state read, so a finish after the read is still delivered.
        let live = self.progress.subscribe(job_id);

        let state = self.state.read().await;
        if state.active.contains_key(job_id) {
            return live;
        }
        match state.completed.get(job_id) {
            Some(record) => Box::pin(stream::iter([terminal_event(record)])),
            None => Box::pin(stream::empty()),
        }
    }

    async fn publish_terminal(&self, record: &JobRecord) {
        self.progress.publish(terminal_event(record)).await;
    }
}

fn terminal_event(record: &JobRecord) -> ProgressEvent {
    ProgressEvent::new(
        record.id.clone(),
        record.progress,
        record.status.as_str(),
        record.message.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use vauto_models::{JobPriority, JobRequest};

    fn queued(priority: JobPriority) -> JobRecord {
        JobRecord::new(JobRequest::new("[HOOK]\nHello"), priority, None)
    }

    fn metrics() -> RenderMetrics {
        RenderMetrics {
            output_file: "out.mp4".to_string(),
            file_size: 10,
            duration: 30.0,
            render_time: 0.1,
        }
    }

    async fn registered(registry: &JobRegistry) -> JobId {
        let record = queued(JobPriority::Normal);
        let id = record.id.clone();
        registry.insert(record).await;
        id
    }

    #[tokio::test]
    async fn test_lifecycle_updates_stats() {
        let registry = JobRegistry::new();
        let done = registered(&registry).await;
        let broken = registered(&registry).await;

        registry.begin_processing(&done, "worker_0").await.unwrap();
        registry.begin_processing(&broken, "worker_1").await.unwrap();
        assert_eq!(registry.stats().await.processing_jobs, 2);
        assert!(registry.is_processing(&done).await);

        assert!(registry.complete(&done, metrics()).await);
        assert!(!registry.is_processing(&done).await);
        assert!(registry.fail(&broken, "render crashed").await);

        let stats = registry.stats().await;
        assert_eq!(stats.total_jobs, 2);
        assert_eq!(stats.queued_jobs, 0);
        assert_eq!(stats.processing_jobs, 0);
        assert_eq!(stats.completed_jobs, 1);
        assert_eq!(stats.failed_jobs, 1);
        assert_eq!(stats.success_rate, 50.0);

        let failed = registry.get_status(&broken).await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("render crashed"));
    }

    #[tokio::test]
    async fn test_begin_processing_requires_queued() {
        let registry = JobRegistry::new();
        let id = registered(&registry).await;

        registry.cancel(&id, "Job cancelled by user").await.unwrap();
        assert!(matches!(
            registry.begin_processing(&id, "worker_0").await,
            Err(QueueError::JobNotFound(_))
        ));
        assert!(registry
            .begin_processing(&JobId::new(), "worker_0")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_cancelled_job_result_is_discarded() {
        let registry = JobRegistry::new();
        let id = registered(&registry).await;
        registry.begin_processing(&id, "worker_0").await.unwrap();

        let previous = registry.cancel(&id, "Job cancelled by user").await.unwrap();
        assert_eq!(previous, JobStatus::Processing);

        assert!(!registry.complete(&id, metrics()).await);
        assert!(!registry.fail(&id, "late failure").await);

        let record = registry.get_status(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Cancelled);
        assert!(record.result.is_none());

        let stats = registry.stats().await;
        assert_eq!(stats.cancelled_jobs, 1);
        assert_eq!(stats.completed_jobs, 0);
        assert_eq!(stats.processing_jobs, 0);
    }

    #[tokio::test]
    async fn test_cancel_terminal_or_unknown_job() {
        let registry = JobRegistry::new();
        let id = registered(&registry).await;
        registry.begin_processing(&id, "worker_0").await.unwrap();
        registry.complete(&id, metrics()).await;

        assert!(matches!(
            registry.cancel(&id, "too late").await,
            Err(QueueError::InvalidTransition(_))
        ));
        assert!(registry.cancel(&JobId::new(), "who").await.unwrap_err().is_not_found());
        assert_eq!(registry.get_status(&id).await.unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_retry_request_only_for_failed() {
        let registry = JobRegistry::new();
        let failed = registered(&registry).await;
        let completed = registered(&registry).await;
        let queued_id = registered(&registry).await;

        registry.begin_processing(&failed, "worker_0").await.unwrap();
        registry.fail(&failed, "boom").await;
        registry.begin_processing(&completed, "worker_0").await.unwrap();
        registry.complete(&completed, metrics()).await;

        let retry = registry.retry_request(&failed).await.unwrap();
        assert_ne!(retry.id, failed);
        assert_eq!(retry.status, JobStatus::Queued);

        assert!(matches!(
            registry.retry_request(&completed).await,
            Err(QueueError::NotRetryable { status: JobStatus::Completed, .. })
        ));
        assert!(matches!(
            registry.retry_request(&queued_id).await,
            Err(QueueError::NotRetryable { status: JobStatus::Queued, .. })
        ));
        assert!(registry.retry_request(&JobId::new()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_all_orders_active_first() {
        let registry = JobRegistry::new();
        let first_done = registered(&registry).await;
        let second_done = registered(&registry).await;
        let waiting = registered(&registry).await;

        for id in [&first_done, &second_done] {
            registry.begin_processing(id, "worker_0").await.unwrap();
            registry.complete(id, metrics()).await;
        }

        let all: Vec<JobId> = registry.get_all(10).await.into_iter().map(|r| r.id).collect();
        assert_eq!(all, vec![waiting.clone(), second_done.clone(), first_done]);

        let capped: Vec<JobId> = registry.get_all(2).await.into_iter().map(|r| r.id).collect();
        assert_eq!(capped, vec![waiting, second_done]);
    }

    #[tokio::test]
    async fn test_cleanup_never_prunes_active_jobs() {
        let registry = JobRegistry::new();
        let done = registered(&registry).await;
        let running = registered(&registry).await;
        let waiting = registered(&registry).await;

        registry.begin_processing(&done, "worker_0").await.unwrap();
        registry.complete(&done, metrics()).await;
        registry.begin_processing(&running, "worker_1").await.unwrap();

        let observer = |_: &ProgressEvent| -> Result<(), crate::ObserverError> { Ok(()) };
        registry.add_observer(&done, Arc::new(observer)).await;

        assert_eq!(registry.cleanup(ChronoDuration::hours(24)).await, 0);
        assert_eq!(registry.cleanup(ChronoDuration::zero()).await, 1);

        assert!(registry.get_status(&done).await.is_none());
        assert!(registry.get_status(&running).await.is_some());
        assert!(registry.get_status(&waiting).await.is_some());
        assert_eq!(registry.progress().observer_count(&done).await, 0);
        assert_eq!(registry.get_all(10).await.len(), 2);
        assert_eq!(registry.active_count().await, 2);
        // Stats are cumulative.
        assert_eq!(registry.stats().await.completed_jobs, 1);
    }

    #[tokio::test]
    async fn test_cancel_all_processing() {
        let registry = JobRegistry::new();
        let a = registered(&registry).await;
        let b = registered(&registry).await;
        let waiting = registered(&registry).await;
        registry.begin_processing(&a, "worker_0").await.unwrap();
        registry.begin_processing(&b, "worker_1").await.unwrap();

        let mut cancelled = registry.cancel_all_processing("shutting down").await;
        cancelled.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        let mut expected = vec![a, b];
        expected.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        assert_eq!(cancelled, expected);

        let stats = registry.stats().await;
        assert_eq!(stats.cancelled_jobs, 2);
        assert_eq!(stats.queued_jobs, 1);
        assert_eq!(
            registry.get_status(&waiting).await.unwrap().status,
            JobStatus::Queued
        );
    }

    #[tokio::test]
    async fn test_progress_events_reach_observers() {
        let registry = JobRegistry::new();
        let id = registered(&registry).await;

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |event: &ProgressEvent| -> Result<(), crate::ObserverError> {
            sink.lock().unwrap().push(event.stage.clone());
            Ok(())
        };
        registry.add_observer(&id, Arc::new(observer)).await;

        assert!(!registry.update_progress(&id, 10.0, "early", "not started").await);
        registry.begin_processing(&id, "worker_0").await.unwrap();
        assert!(registry.update_progress(&id, 15.0, "timeline_creation", "Creating").await);
        registry.complete(&id, metrics()).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["processing", "timeline_creation", "completed"]
        );
    }

    #[tokio::test]
    async fn test_cleanup_with_out_of_range_age_prunes_nothing() {
        let registry = JobRegistry::new();
        let id = registered(&registry).await;
        registry.cancel(&id, "Job cancelled by user").await.unwrap();

        assert_eq!(registry.cleanup(ChronoDuration::days(365 * 1_000_000)).await, 0);
        assert_eq!(registry.cleanup(ChronoDuration::MAX).await, 0);
        assert!(registry.get_status(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_subscribe_to_finished_job_yields_final_state() {
        let registry = JobRegistry::new();
        let id = registered(&registry).await;
        registry.begin_processing(&id, "worker_0").await.unwrap();
        assert!(registry.fail(&id, "encoder crashed").await);

        let events: Vec<ProgressEvent> = registry.subscribe(&id).await.collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].job_id, id);
        assert_eq!(events[0].stage, "failed");
        assert!(events[0].is_terminal());
    }

    #[tokio::test]
    async fn test_subscribe_to_unknown_job_is_empty() {
        let registry = JobRegistry::new();
        let events: Vec<ProgressEvent> = registry.subscribe(&JobId::new()).await.collect().await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_to_active_job_streams_until_terminal() {
        let registry = JobRegistry::new();
        let id = registered(&registry).await;
        let stream = registry.subscribe(&id).await;

        registry.begin_processing(&id, "worker_0").await.unwrap();
        registry.update_progress(&id, 40.0, "effects_processing", "Styling").await;
        registry.complete(&id, metrics()).await;

        let stages: Vec<String> = stream.map(|e| e.stage).collect().await;
        assert_eq!(stages, vec!["processing", "effects_processing", "completed"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_progress_published_after_cancel() {
        for _ in 0..20 {
            let registry = Arc::new(JobRegistry::new());
            let id = registered(&registry).await;

            let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            let observer = move |event: &ProgressEvent| -> Result<(), crate::ObserverError> {
                sink.lock().unwrap().push(event.stage.clone());
                Ok(())
            };
            registry.add_observer(&id, Arc::new(observer)).await;
            registry.begin_processing(&id, "worker_0").await.unwrap();

            let updater = {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                tokio::spawn(async move {
                    while registry.update_progress(&id, 50.0, "rendering", "Rendering").await {
                        tokio::task::yield_now().await;
                    }
                })
            };
            tokio::task::yield_now().await;
            registry.cancel(&id, "Job cancelled by user").await.unwrap();
            updater.await.unwrap();

            let stages = seen.lock().unwrap().clone();
            assert_eq!(stages.last().map(String::as_str), Some("cancelled"));
            assert_eq!(stages.iter().filter(|s| *s == "cancelled").count(), 1);
        }
    }
}
