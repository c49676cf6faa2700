//! Videy batch downloader engine.
//!
//! Pulls video links out of free text, fetches each one with bounded retries
//! and reports a per-item outcome for the whole batch.

pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod progress_display;
pub mod prompt;
pub mod retry;
pub mod workspace;

pub use extractor::Extractor;
pub use fetcher::{ExistenceCheck, Fetcher, FsExistence};
pub use orchestrator::Orchestrator;
pub use retry::{RetryDecision, RetryPolicy};
