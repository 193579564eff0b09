use crate::jobs::Priority;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: String,
    pub priority: Priority,
}

/// Single-consumer priority queue of job ids.
///
/// Higher tiers are served first; within a tier jobs keep arrival order.
/// `pop` parks the consumer until something is pushed.
#[derive(Default)]
pub struct JobQueue {
    entries: Mutex<VecDeque<QueuedJob>>,
    ready: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert before the first entry with a strictly lower priority.
    ///
    /// A job id that is already queued is ignored.
    pub fn push(&self, job_id: impl Into<String>, priority: Priority) {
        let job_id = job_id.into();
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.iter().any(|e| e.job_id == job_id) {
                debug!("Job {} is already queued", job_id);
                return;
            }

            let position = entries
                .iter()
                .position(|e| e.priority.rank() > priority.rank())
                .unwrap_or(entries.len());
            entries.insert(position, QueuedJob { job_id, priority });
        }
        self.ready.notify_one();
    }

    pub fn try_pop(&self) -> Option<QueuedJob> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.pop_front()
    }

    /// Wait for the next job.
    pub async fn pop(&self) -> QueuedJob {
        loop {
            if let Some(entry) = self.try_pop() {
                return entry;
            }
            // notify_one leaves a permit when nobody is waiting, so a push
            // between try_pop and here is not lost.
            self.ready.notified().await;
        }
    }

    pub fn contains(&self, job_id: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().any(|e| e.job_id == job_id)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue contents in dequeue order.
    pub fn snapshot(&self) -> Vec<QueuedJob> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
