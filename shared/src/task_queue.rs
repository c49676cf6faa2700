/// Shared work queue for the bounded download worker pool.
///
/// Workers claim items in input order and report outcomes back by index, so
/// results can be read out in input order no matter which worker finished first.
use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{FetchOutcome, WorkItem};

/// Status of a tracked item in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Queued,
    Running,
    Done,
    Skipped,
    Failed,
}

impl ItemState {
    fn from_outcome(outcome: &FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Succeeded { .. } => ItemState::Done,
            FetchOutcome::Skipped { .. } => ItemState::Skipped,
            FetchOutcome::Failed { .. } => ItemState::Failed,
        }
    }
}

/// Bookkeeping for one item.
#[derive(Debug, Clone)]
pub struct TrackedItem {
    pub index: usize,
    pub item: WorkItem,
    pub status: ItemState,
    pub outcome: Option<FetchOutcome>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Queue of pending items plus per-item state.
pub struct WorkQueue {
    /// Items not yet claimed, front is next.
    pending: Mutex<VecDeque<usize>>,
    /// Tracked state, indexed by input position.
    tasks: Mutex<Vec<TrackedItem>>,
}

impl WorkQueue {
    /// Build a queue from items in input order.
    ///
    /// Every item is tracked so each gets an outcome. A repeated id is resolved
    /// up front as a duplicate and never queued, so no two workers share a
    /// destination file.
    pub fn new(items: Vec<WorkItem>) -> Self {
        let now = Utc::now();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending = VecDeque::with_capacity(items.len());
        let mut tasks = Vec::with_capacity(items.len());

        for item in items {
            let index = tasks.len();
            let mut tracked = TrackedItem {
                index,
                item,
                status: ItemState::Queued,
                outcome: None,
                enqueued_at: now,
                started_at: None,
                finished_at: None,
            };

            if seen.insert(tracked.item.id.clone()) {
                pending.push_back(index);
            } else {
                warn!("Item {} already in queue, not fetching it twice", tracked.item.id);
                tracked.status = ItemState::Skipped;
                tracked.outcome = Some(FetchOutcome::duplicate());
                tracked.finished_at = Some(now);
            }
            tasks.push(tracked);
        }

        Self {
            pending: Mutex::new(pending),
            tasks: Mutex::new(tasks),
        }
    }

    /// Claim the next queued item. Returns `None` once the queue is drained.
    pub async fn claim(&self) -> Option<(usize, WorkItem)> {
        let index = self.pending.lock().await.pop_front()?;

        let mut tasks = self.tasks.lock().await;
        let task = &mut tasks[index];
        task.status = ItemState::Running;
        task.started_at = Some(Utc::now());
        debug!("Item {} claimed", task.item.id);
        Some((index, task.item.clone()))
    }

    /// Record the terminal outcome for a claimed item.
    pub async fn finish(&self, index: usize, outcome: FetchOutcome) {
        let mut tasks = self.tasks.lock().await;
        match tasks.get_mut(index) {
            Some(task) => {
                let finished_at = Utc::now();
                let started_at = task.started_at.unwrap_or(task.enqueued_at);
                debug!(
                    "Item {} finished: waited {}ms, ran {}ms",
                    task.item.id,
                    (started_at - task.enqueued_at).num_milliseconds(),
                    (finished_at - started_at).num_milliseconds()
                );
                task.status = ItemState::from_outcome(&outcome);
                task.finished_at = Some(finished_at);
                task.outcome = Some(outcome);
            }
            None => warn!("Outcome reported for unknown index {}", index),
        }
    }

    /// Get queue statistics.
    pub async fn stats(&self) -> QueueStats {
        let tasks = self.tasks.lock().await;
        let count = |state: ItemState| tasks.iter().filter(|t| t.status == state).count();
        QueueStats {
            queued: count(ItemState::Queued),
            running: count(ItemState::Running),
            completed: count(ItemState::Done),
            skipped: count(ItemState::Skipped),
            failed: count(ItemState::Failed),
            total_tracked: tasks.len(),
        }
    }

    /// Snapshot of all tracked items in input order.
    pub async fn snapshot(&self) -> Vec<TrackedItem> {
        self.tasks.lock().await.clone()
    }
}

/// Queue statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_tracked: usize,
}
