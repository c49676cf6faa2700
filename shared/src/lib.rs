//! Shared types, errors, configuration and work queue for Videy-DL.

pub mod config;
pub mod errors;
pub mod models;
pub mod task_queue;

pub use config::DownloaderConfig;
pub use errors::{ErrorKind, FetchError, VideyError, VideyResult};
pub use models::{
    destination_name_for, DownloadEvent, FetchOutcome, RunMode, RunSummary, SummaryCounts,
    SummaryEntry, WorkItem,
};
pub use task_queue::{ItemState, QueueStats, TrackedItem, WorkQueue};
