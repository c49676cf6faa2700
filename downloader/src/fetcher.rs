/// Single-item HTTP fetcher with fixed-delay retries and progress reporting.
///
/// Bodies are streamed into `<name>.part` next to the destination and renamed
/// once complete, so the destination only ever exists fully written.
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use videy_shared::config::DownloaderConfig;
use videy_shared::errors::{FetchError, VideyError, VideyResult};
use videy_shared::models::{DownloadEvent, FetchOutcome, WorkItem};

use crate::retry::{tokio_delay, DelayFn, RetryDecision, RetryPolicy};

const USER_AGENT: &str = concat!("videy-dl/", env!("CARGO_PKG_VERSION"));

/// Suffix of in-flight downloads.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Existence check against the download directory.
pub trait ExistenceCheck: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

impl<F> ExistenceCheck for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn exists(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Checks the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsExistence;

impl ExistenceCheck for FsExistence {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Mutable state of one `fetch` call's retry loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchAttemptState {
    pub attempt_number: u32,
    /// Bytes received by the current attempt.
    pub bytes_downloaded: u64,
    /// Highest percent reported so far, across attempts.
    pub last_reported_percent: Option<u8>,
}

impl FetchAttemptState {
    fn begin_attempt(&mut self, attempt_number: u32) {
        self.attempt_number = attempt_number;
        self.bytes_downloaded = 0;
    }

    /// Percent to report after the byte count changed, if it moved forward.
    fn advance_percent(&mut self, total: u64) -> Option<u8> {
        let percent = percent_of(self.bytes_downloaded, total);
        match self.last_reported_percent {
            Some(last) if percent <= last => None,
            _ => {
                self.last_reported_percent = Some(percent);
                Some(percent)
            }
        }
    }
}

/// `floor(done / total * 100)`, capped at 100.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (u128::from(done) * 100) / u128::from(total);
    percent.min(100) as u8
}

/// Path of the in-flight download for a destination.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}

/// Downloads one work item into the download directory.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    download_dir: PathBuf,
    retry: RetryPolicy,
    stall_timeout: Duration,
    delay: DelayFn,
    events: Option<mpsc::UnboundedSender<DownloadEvent>>,
}

impl Fetcher {
    /// Create a fetcher with an HTTP client built from the configuration.
    pub fn new(config: &DownloaderConfig) -> VideyResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| VideyError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &DownloaderConfig) -> Self {
        Self {
            client,
            download_dir: config.download_dir.clone(),
            retry: RetryPolicy::from_config(config),
            stall_timeout: config.stall_timeout,
            delay: tokio_delay(),
            events: None,
        }
    }

    /// Replace the wait between attempts.
    pub fn with_delay(mut self, delay: DelayFn) -> Self {
        self.delay = delay;
        self
    }

    /// Send progress notifications to `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn destination_path(&self, item: &WorkItem) -> PathBuf {
        self.download_dir.join(&item.destination_name)
    }

    pub(crate) fn emit(&self, event: DownloadEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is rendering; the download goes on.
            let _ = tx.send(event);
        }
    }

    /// Fetch one item, making at most `max_retries + 1` attempts.
    ///
    /// Always resolves to an outcome; errors never escape.
    pub async fn fetch(
        &self,
        item: &WorkItem,
        exists: &dyn ExistenceCheck,
        max_retries: u32,
    ) -> FetchOutcome {
        let destination = self.destination_path(item);

        if exists.exists(&destination) {
            debug!("{} already exists, skipping", destination.display());
            return FetchOutcome::skipped();
        }

        let policy = self.retry.with_max_retries(max_retries);
        let mut state = FetchAttemptState::default();
        state.begin_attempt(1);

        loop {
            match self.attempt(item, &destination, &mut state).await {
                Ok(bytes_written) => {
                    info!(
                        id = %item.id,
                        bytes = bytes_written,
                        attempts = state.attempt_number,
                        "Downloaded {}",
                        item.destination_name
                    );
                    return FetchOutcome::Succeeded {
                        bytes_written,
                        destination_path: destination,
                    };
                }
                Err(err) => match policy.decide(state.attempt_number, &err) {
                    RetryDecision::Retry { next_attempt, delay } => {
                        warn!(
                            id = %item.id,
                            attempt = state.attempt_number,
                            max_attempts = policy.max_attempts(),
                            kind = %err.kind(),
                            delay_ms = delay.as_millis() as u64,
                            "Attempt failed, retrying: {}",
                            err
                        );
                        self.emit(DownloadEvent::Retrying {
                            id: item.id.clone(),
                            attempt: state.attempt_number,
                            error: err,
                            delay,
                        });
                        (self.delay)(delay).await;
                        state.begin_attempt(next_attempt);
                    }
                    RetryDecision::GiveUp { attempts } => {
                        error!(
                            id = %item.id,
                            attempts,
                            kind = %err.kind(),
                            "Giving up on {}: {}",
                            item.destination_name,
                            err
                        );
                        return FetchOutcome::Failed {
                            attempts,
                            last_error: err,
                        };
                    }
                },
            }
        }
    }

    /// One request: stream the body into the partial file, then move it into place.
    async fn attempt(
        &self,
        item: &WorkItem,
        destination: &Path,
        state: &mut FetchAttemptState,
    ) -> Result<u64, FetchError> {
        debug!("GET {} (attempt {})", item.source_url, state.attempt_number);

        let response = self
            .client
            .get(&item.source_url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let total = response.content_length().filter(|len| *len > 0);
        self.emit(DownloadEvent::Started {
            id: item.id.clone(),
            total_bytes: total,
        });
        if let Some(total) = total {
            self.report_progress(item, state, total);
        }

        let partial = partial_path(destination);
        let streamed = self.stream_to_file(response, &partial, total, item, state).await;
        let finished = match streamed {
            Ok(()) => tokio::fs::rename(&partial, destination)
                .await
                .map_err(|e| FetchError::Write(format!("rename {}: {}", partial.display(), e))),
            Err(e) => Err(e),
        };

        if let Err(e) = finished {
            remove_partial(&partial).await;
            return Err(e);
        }
        Ok(state.bytes_downloaded)
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        partial: &Path,
        total: Option<u64>,
        item: &WorkItem,
        state: &mut FetchAttemptState,
    ) -> Result<(), FetchError> {
        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|e| FetchError::Write(format!("create {}: {}", partial.display(), e)))?;

        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::time::timeout(self.stall_timeout, stream.next())
                .await
                .map_err(|_| {
                    FetchError::Network(format!(
                        "no data received for {}s",
                        self.stall_timeout.as_secs()
                    ))
                })?;

            let chunk = match next {
                Some(chunk) => chunk.map_err(|e| FetchError::Network(e.to_string()))?,
                None => break,
            };

            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::Write(e.to_string()))?;
            state.bytes_downloaded += chunk.len() as u64;

            if let Some(total) = total {
                self.report_progress(item, state, total);
            }
        }

        file.flush()
            .await
            .map_err(|e| FetchError::Write(e.to_string()))?;

        if let Some(total) = total {
            if state.bytes_downloaded < total {
                return Err(FetchError::Network(format!(
                    "connection closed after {} of {} bytes",
                    state.bytes_downloaded, total
                )));
            }
        }
        Ok(())
    }

    fn report_progress(&self, item: &WorkItem, state: &mut FetchAttemptState, total: u64) {
        if let Some(percent) = state.advance_percent(total) {
            debug!("{}: {}%", item.id, percent);
            self.emit(DownloadEvent::Progress {
                id: item.id.clone(),
                percent,
            });
        }
    }
}

/// Best-effort removal of a partial file.
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial file {}: {}", path.display(), e),
    }
}
