//! Progress events: per-job observers and broadcast subscriptions.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::Stream;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use vauto_models::{JobId, ProgressEvent};

/// Buffered events per broadcast subscriber before it starts lagging.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Error reported by an observer. Logged, never propagated.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ObserverError(pub String);

/// Callback invoked for every progress event of the job it is registered on.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent) -> Result<(), ObserverError>;
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) -> Result<(), ObserverError> {
        self(event)
    }
}

/// Handle returned on observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverList = Vec<(ObserverId, Arc<dyn ProgressObserver>)>;

/// Fan-out point for job progress.
pub struct ProgressChannel {
    observers: RwLock<HashMap<JobId, ObserverList>>,
    next_observer: AtomicU64,
    sender: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self {
            observers: RwLock::new(HashMap::new()),
            next_observer: AtomicU64::new(1),
            sender,
        }
    }

    /// Register an observer for one job.
    pub async fn add_observer(
        &self,
        job_id: &JobId,
        observer: Arc<dyn ProgressObserver>,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .await
            .entry(job_id.clone())
            .or_default()
            .push((id, observer));
        id
    }

    /// Unregister an observer. Returns whether it was registered.
    pub async fn remove_observer(&self, job_id: &JobId, observer_id: ObserverId) -> bool {
        let mut observers = self.observers.write().await;
        let Some(list) = observers.get_mut(job_id) else {
            return false;
        };

        let before = list.len();
        list.retain(|(id, _)| *id != observer_id);
        let removed = before != list.len();
        if list.is_empty() {
            observers.remove(job_id);
        }
        removed
    }

    /// Drop every observer of a job.
    pub async fn remove_job(&self, job_id: &JobId) {
        self.observers.write().await.remove(job_id);
    }

    pub async fn observer_count(&self, job_id: &JobId) -> usize {
        self.observers
            .read()
            .await
            .get(job_id)
            .map_or(0, Vec::len)
    }

    /// Deliver an event to the job's observers and to broadcast subscribers.
    ///
    /// Observer errors and panics are logged and swallowed.
    pub async fn publish(&self, event: ProgressEvent) {
        let observers: Vec<Arc<dyn ProgressObserver>> = self
            .observers
            .read()
            .await
            .get(&event.job_id)
            .map(|list| list.iter().map(|(_, o)| Arc::clone(o)).collect())
            .unwrap_or_default();

        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_progress(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(job_id = %event.job_id, "Progress observer error: {}", e),
                Err(_) => warn!(job_id = %event.job_id, "Progress observer panicked"),
            }
        }

        debug!(
            job_id = %event.job_id,
            progress = event.progress,
            stage = %event.stage,
            "Progress"
        );
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Receive every event of every job.
    pub fn subscribe_all(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Stream the events of one job. The stream ends after its terminal event.
    pub fn subscribe(&self, job_id: &JobId) -> Pin<Box<dyn Stream<Item = ProgressEvent> + Send>> {
        let receiver = self.sender.subscribe();
        let job_id = job_id.clone();

        let stream = futures_util::stream::unfold(Some(receiver), move |state| {
            let job_id = job_id.clone();
            async move {
                let mut receiver = state?;
                loop {
                    match receiver.recv().await {
                        Ok(event) if event.job_id == job_id => {
                            let next = if event.is_terminal() { None } else { Some(receiver) };
                            return Some((event, next));
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(job_id = %job_id, skipped, "Progress subscriber lagged");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        Box::pin(stream)
    }
}
