/// Terminal rendering of download events and the final run summary.
use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use videy_shared::models::{DownloadEvent, FetchOutcome, RunSummary};

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:>16} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
        .unwrap()
        .progress_chars("#>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {prefix:>16} {msg}")
        .unwrap()
}

/// One bar per item, created on the item's first event.
pub struct ProgressDisplay {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stdout())
    }

    /// Display drawing nowhere.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
        }
    }

    fn bar(&mut self, id: &str) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(id.to_string()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(spinner_style());
            bar.set_prefix(id.to_string());
            bar.set_message("waiting...");
            bar
        })
    }

    pub fn handle(&mut self, event: &DownloadEvent) {
        match event {
            DownloadEvent::Started { id, total_bytes } => {
                let bar = self.bar(id);
                match total_bytes {
                    Some(_) => {
                        bar.set_style(bar_style());
                        bar.set_length(100);
                    }
                    None => bar.enable_steady_tick(std::time::Duration::from_millis(120)),
                }
                bar.set_message("downloading...");
            }
            DownloadEvent::Progress { id, percent } => {
                self.bar(id).set_position(u64::from(*percent));
            }
            DownloadEvent::Retrying { id, attempt, error, delay } => {
                self.bar(id).set_message(format!(
                    "attempt {} failed ({}), retrying in {}s",
                    attempt,
                    error,
                    delay.as_secs()
                ));
            }
            DownloadEvent::Finished { id, outcome } => {
                let bar = self.bar(id);
                bar.disable_steady_tick();
                let message = match outcome {
                    FetchOutcome::Succeeded { .. } => "done".to_string(),
                    FetchOutcome::Skipped { reason } => format!("skipped ({})", reason),
                    FetchOutcome::Failed { last_error, .. } => {
                        format!("failed ({}): {}", last_error.kind(), last_error)
                    }
                };
                bar.finish_with_message(message);
            }
        }
    }

    /// Render events until every sender is dropped.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<DownloadEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(&event);
        }
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// Start rendering on a background task.
pub fn spawn(events: mpsc::UnboundedReceiver<DownloadEvent>) -> JoinHandle<()> {
    tokio::spawn(ProgressDisplay::new().run(events))
}

/// The end-of-run report: one line per item, then the counts.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::from("Download Summary:\n");
    for (index, entry) in summary.entries().iter().enumerate() {
        out.push_str(&format!(
            "- Video {}: {}\n",
            index + 1,
            entry.outcome.describe(&entry.item)
        ));
    }
    out.push_str(&format!(
        "{} video(s): {}\n",
        summary.len(),
        summary.counts
    ));
    out
}
