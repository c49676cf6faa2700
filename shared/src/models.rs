/// Domain models shared across Videy-DL crates.
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FetchError, VideyError};

/// File extension of every fetched video.
pub const VIDEO_EXTENSION: &str = "mp4";

/// Reason recorded on `FetchOutcome::Skipped` when the file is already on disk.
pub const SKIP_REASON_EXISTS: &str = "already exists";

/// Reason recorded when the same id appears earlier in the batch.
pub const SKIP_REASON_DUPLICATE: &str = "duplicate";

/// Local file name for a video id. Pure, so re-runs map to the same paths.
pub fn destination_name_for(id: &str) -> String {
    format!("{}.{}", id, VIDEO_EXTENSION)
}

/// One video to fetch: id, where to get it, what to call it locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub source_url: String,
    pub destination_name: String,
}

impl WorkItem {
    /// Resolve an id against the CDN base URL that serves the raw files.
    pub fn resolve(id: impl Into<String>, cdn_base_url: &str) -> Self {
        let id = id.into();
        Self {
            source_url: format!(
                "{}/{}.{}",
                cdn_base_url.trim_end_matches('/'),
                id,
                VIDEO_EXTENSION
            ),
            destination_name: destination_name_for(&id),
            id,
        }
    }
}

/// Scheduling policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Sequential,
    Concurrent,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Sequential => write!(f, "sequential"),
            RunMode::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl FromStr for RunMode {
    type Err = VideyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(RunMode::Sequential),
            "concurrent" | "parallel" => Ok(RunMode::Concurrent),
            other => Err(VideyError::Config(format!(
                "unknown run mode '{}' (expected 'sequential' or 'concurrent')",
                other
            ))),
        }
    }
}

/// Terminal result for one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Skipped {
        reason: String,
    },
    Succeeded {
        bytes_written: u64,
        destination_path: PathBuf,
    },
    Failed {
        attempts: u32,
        last_error: FetchError,
    },
}

impl FetchOutcome {
    pub fn skipped() -> Self {
        FetchOutcome::Skipped {
            reason: SKIP_REASON_EXISTS.to_string(),
        }
    }

    /// Outcome for a repeated id; only its first occurrence is fetched.
    pub fn duplicate() -> Self {
        FetchOutcome::Skipped {
            reason: SKIP_REASON_DUPLICATE.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Succeeded { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FetchOutcome::Skipped { .. })
    }

    /// Human-readable status line for the run summary.
    pub fn describe(&self, item: &WorkItem) -> String {
        match self {
            FetchOutcome::Skipped { reason } if reason == SKIP_REASON_DUPLICATE => format!(
                "Duplicate of an earlier link to \"{}\", skipping download.",
                item.destination_name
            ),
            FetchOutcome::Skipped { .. } => format!(
                "File \"{}\" already exists, skipping download.",
                item.destination_name
            ),
            FetchOutcome::Succeeded { destination_path, .. } => {
                format!("Saved to: {}", destination_path.display())
            }
            FetchOutcome::Failed { attempts, last_error } => {
                format!("Error: {} (after {} attempt(s))", last_error, attempts)
            }
        }
    }
}

/// Progress and lifecycle notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    /// Response headers received. `total_bytes` is the size hint, if any.
    Started { id: String, total_bytes: Option<u64> },
    /// Integer percentage changed. Only sent when a size hint exists.
    Progress { id: String, percent: u8 },
    /// An attempt failed and the next one starts after `delay`.
    Retrying {
        id: String,
        attempt: u32,
        error: FetchError,
        delay: Duration,
    },
    /// Terminal outcome for the item.
    Finished { id: String, outcome: FetchOutcome },
}

impl DownloadEvent {
    /// Percent carried by this notification, `None` for start/finish style events.
    pub fn percent(&self) -> Option<u8> {
        match self {
            DownloadEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        }
    }
}

/// One resolved entry in a run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub item: WorkItem,
    pub outcome: FetchOutcome,
}

/// Derived counts over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl std::fmt::Display for SummaryCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.succeeded, self.skipped, self.failed
        )
    }
}

/// Outcome of a whole run, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counts: SummaryCounts,
    entries: Vec<SummaryEntry>,
}

impl RunSummary {
    pub fn new(
        mode: RunMode,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        entries: Vec<SummaryEntry>,
    ) -> Self {
        let mut counts = SummaryCounts::default();
        for entry in &entries {
            match entry.outcome {
                FetchOutcome::Succeeded { .. } => counts.succeeded += 1,
                FetchOutcome::Skipped { .. } => counts.skipped += 1,
                FetchOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        Self {
            mode,
            started_at,
            finished_at,
            counts,
            entries,
        }
    }

    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.entries.iter().map(|e| &e.outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run completed but at least one item failed.
    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_work_item() {
        let item = WorkItem::resolve("abc123", "https://cdn.videy.co/");
        assert_eq!(item.id, "abc123");
        assert_eq!(item.source_url, "https://cdn.videy.co/abc123.mp4");
        assert_eq!(item.destination_name, "abc123.mp4");
    }

    #[test]
    fn test_destination_name_is_stable() {
        let first = destination_name_for("Zx_9");
        let second = destination_name_for("Zx_9");
        assert_eq!(first, second);
        assert_ne!(destination_name_for("a"), destination_name_for("A"));
    }

    #[test]
    fn test_run_mode_parse() {
        assert_eq!("Sequential".parse::<RunMode>().unwrap(), RunMode::Sequential);
        assert_eq!(" concurrent ".parse::<RunMode>().unwrap(), RunMode::Concurrent);
        assert!("sometimes".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_summary_counts() {
        let now = Utc::now();
        let entries = vec![
            SummaryEntry {
                item: WorkItem::resolve("a", "https://cdn"),
                outcome: FetchOutcome::skipped(),
            },
            SummaryEntry {
                item: WorkItem::resolve("b", "https://cdn"),
                outcome: FetchOutcome::Succeeded {
                    bytes_written: 10,
                    destination_path: PathBuf::from("downloads/b.mp4"),
                },
            },
            SummaryEntry {
                item: WorkItem::resolve("c", "https://cdn"),
                outcome: FetchOutcome::Failed {
                    attempts: 4,
                    last_error: FetchError::HttpStatus(404),
                },
            },
        ];
        let summary = RunSummary::new(RunMode::Concurrent, now, now, entries);
        assert_eq!(summary.len(), 3);
        assert_eq!(
            summary.counts,
            SummaryCounts { succeeded: 1, skipped: 1, failed: 1 }
        );
        assert!(summary.has_failures());
        assert_eq!(summary.counts.to_string(), "1 succeeded, 1 skipped, 1 failed");
    }

    #[test]
    fn test_describe_lines() {
        let item = WorkItem::resolve("abc", "https://cdn");
        assert_eq!(
            FetchOutcome::skipped().describe(&item),
            "File \"abc.mp4\" already exists, skipping download."
        );
        let failed = FetchOutcome::Failed {
            attempts: 3,
            last_error: FetchError::HttpStatus(500),
        };
        assert_eq!(
            FetchOutcome::duplicate().describe(&item),
            "Duplicate of an earlier link to \"abc.mp4\", skipping download."
        );
        assert_eq!(
            failed.describe(&item),
            "Error: Server responded with HTTP 500 (after 3 attempt(s))"
        );
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(FetchOutcome::skipped()).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "already exists");
    }
}
