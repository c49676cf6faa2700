/// Runs a batch of work items through the fetcher.
///
/// Sequential mode fetches one item at a time in input order. Concurrent mode
/// starts a fixed pool of workers that pull from a shared [`WorkQueue`]. Either
/// way every item ends up with exactly one outcome, reported in input order.
use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use videy_shared::config::DownloaderConfig;
use videy_shared::errors::FetchError;
use videy_shared::models::{DownloadEvent, FetchOutcome, RunMode, RunSummary, SummaryEntry, WorkItem};
use videy_shared::task_queue::WorkQueue;

use crate::fetcher::{ExistenceCheck, Fetcher, FsExistence};

/// Drives work items through a [`Fetcher`] and collects a [`RunSummary`].
pub struct Orchestrator {
    fetcher: Fetcher,
    exists: Arc<dyn ExistenceCheck>,
    pool_size: usize,
}

impl Orchestrator {
    pub fn new(config: &DownloaderConfig, fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            exists: Arc::new(FsExistence),
            pool_size: config.pool_size.max(1),
        }
    }

    /// Replace the filesystem existence check.
    pub fn with_existence_check(mut self, exists: Arc<dyn ExistenceCheck>) -> Self {
        self.exists = exists;
        self
    }

    /// Fetch every item and return their outcomes in input order.
    ///
    /// Per-item failures are recorded in the summary; the run itself never fails.
    pub async fn run(&self, items: Vec<WorkItem>, mode: RunMode, max_retries: u32) -> RunSummary {
        let started_at = Utc::now();
        info!(
            "Starting {} run: {} item(s), {} retries per item",
            mode,
            items.len(),
            max_retries
        );

        let entries = match mode {
            RunMode::Sequential => self.run_sequential(items, max_retries).await,
            RunMode::Concurrent => self.run_concurrent(items, max_retries).await,
        };

        let summary = RunSummary::new(mode, started_at, Utc::now(), entries);
        info!(
            "Run finished in {}s: {}",
            summary.elapsed().num_seconds(),
            summary.counts
        );
        summary
    }

    async fn run_sequential(&self, items: Vec<WorkItem>, max_retries: u32) -> Vec<SummaryEntry> {
        let mut entries = Vec::with_capacity(items.len());
        let mut seen = HashSet::new();
        for item in items {
            let outcome = if seen.insert(item.id.clone()) {
                fetch_and_report(&self.fetcher, &item, self.exists.as_ref(), max_retries).await
            } else {
                let outcome = FetchOutcome::duplicate();
                report_outcome(&self.fetcher, &item, &outcome);
                outcome
            };
            entries.push(SummaryEntry { item, outcome });
        }
        entries
    }

    async fn run_concurrent(&self, items: Vec<WorkItem>, max_retries: u32) -> Vec<SummaryEntry> {
        let workers = self.pool_size.min(items.len()).max(1);
        let queue = Arc::new(WorkQueue::new(items));
        debug!("Spawning {} download worker(s)", workers);

        // Repeated ids are resolved by the queue up front
        for tracked in queue.snapshot().await {
            if let Some(outcome) = &tracked.outcome {
                report_outcome(&self.fetcher, &tracked.item, outcome);
            }
        }

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue = queue.clone();
            let fetcher = self.fetcher.clone();
            let exists = self.exists.clone();

            handles.push(tokio::spawn(async move {
                while let Some((index, item)) = queue.claim().await {
                    let outcome = fetch_and_report(&fetcher, &item, exists.as_ref(), max_retries).await;
                    queue.finish(index, outcome).await;
                }
                debug!("Worker {} drained the queue", worker_id);
            }));
        }

        // Wait for all workers
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Download worker stopped early: {}", e);
            }
        }
        debug!("Queue drained: {:?}", queue.stats().await);

        queue
            .snapshot()
            .await
            .into_iter()
            .map(|tracked| {
                let outcome = tracked.outcome.unwrap_or_else(|| {
                    let outcome = FetchOutcome::Failed {
                        attempts: 0,
                        last_error: FetchError::Interrupted(
                            "download worker stopped before finishing".to_string(),
                        ),
                    };
                    report_outcome(&self.fetcher, &tracked.item, &outcome);
                    outcome
                });
                SummaryEntry {
                    item: tracked.item,
                    outcome,
                }
            })
            .collect()
    }
}

async fn fetch_and_report(
    fetcher: &Fetcher,
    item: &WorkItem,
    exists: &dyn ExistenceCheck,
    max_retries: u32,
) -> FetchOutcome {
    let outcome = fetcher.fetch(item, exists, max_retries).await;
    report_outcome(fetcher, item, &outcome);
    outcome
}

/// Log the terminal outcome and forward it to the event listener.
fn report_outcome(fetcher: &Fetcher, item: &WorkItem, outcome: &FetchOutcome) {
    match outcome {
        FetchOutcome::Failed { .. } => warn!(id = %item.id, "{}", outcome.describe(item)),
        _ => info!(id = %item.id, "{}", outcome.describe(item)),
    }
    fetcher.emit(DownloadEvent::Finished {
        id: item.id.clone(),
        outcome: outcome.clone(),
    });
}
