//! Priority job queue.
//!
//! Jobs are ordered by priority (highest first) and then by a monotonic
//! sequence number assigned at enqueue time, so equal-priority jobs come
//! out in submission order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

use vauto_models::{JobId, JobPriority};

/// A pending job reference held by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub priority: JobPriority,
    /// Enqueue order, unique per queue
    pub sequence: u64,
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Concurrent priority queue of job ids.
#[derive(Debug, Default)]
pub struct PriorityJobQueue {
    heap: Mutex<BinaryHeap<QueuedJob>>,
    sequence: AtomicU64,
    notify: Notify,
}

impl PriorityJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job and wake one waiting consumer.
    pub async fn enqueue(&self, job_id: JobId, priority: JobPriority) -> QueuedJob {
        let entry = QueuedJob {
            job_id,
            priority,
            sequence: self.sequence.fetch_add(1, AtomicOrdering::SeqCst),
        };

        self.heap.lock().await.push(entry.clone());
        self.notify.notify_one();

        debug!(
            job_id = %entry.job_id,
            priority = %entry.priority,
            sequence = entry.sequence,
            "Enqueued job"
        );
        entry
    }

    /// Put a dequeued job back with its original sequence number, so it keeps
    /// its place ahead of equal-priority jobs submitted after it.
    pub async fn requeue(&self, entry: QueuedJob) {
        debug!(
            job_id = %entry.job_id,
            sequence = entry.sequence,
            "Requeued job"
        );
        self.heap.lock().await.push(entry);
        self.notify.notify_one();
    }

    /// Pop the highest-priority job without waiting.
    pub async fn try_dequeue(&self) -> Option<QueuedJob> {
        self.heap.lock().await.pop()
    }

    /// Pop the highest-priority job, waiting at most `wait` for one to arrive.
    pub async fn dequeue_timeout(&self, wait: Duration) -> Option<QueuedJob> {
        let deadline = Instant::now() + wait;

        loop {
            if let Some(job) = self.try_dequeue().await {
                return Some(job);
            }

            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.try_dequeue().await;
            }
        }
    }

    /// Drop a queued job. Returns whether it was present.
    pub async fn remove(&self, job_id: &JobId) -> bool {
        let mut heap = self.heap.lock().await;
        let before = heap.len();
        heap.retain(|entry| &entry.job_id != job_id);
        before != heap.len()
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }
}
