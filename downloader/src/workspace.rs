/// Filesystem helpers around a run: input list, download directory, run report.
use std::path::Path;

use tracing::{debug, info, warn};

use videy_shared::errors::{VideyError, VideyResult};
use videy_shared::models::RunSummary;

/// Read the input list.
///
/// A missing file is created empty so the user has somewhere to paste links;
/// the run still stops with `InputMissing`. Whitespace-only content is `InputEmpty`.
pub async fn read_input(path: &Path) -> VideyResult<String> {
    if !tokio::fs::try_exists(path).await? {
        info!("{} not found, creating it", path.display());
        tokio::fs::write(path, "").await?;
        return Err(VideyError::InputMissing(path.to_path_buf()));
    }

    let text = tokio::fs::read_to_string(path).await?;
    if text.trim().is_empty() {
        return Err(VideyError::InputEmpty(path.to_path_buf()));
    }
    Ok(text)
}

/// Make sure the download directory exists.
pub async fn prepare_download_dir(dir: &Path) -> VideyResult<()> {
    tokio::fs::create_dir_all(dir).await?;
    debug!("Download directory ready: {}", dir.display());
    Ok(())
}

/// Remove every regular file in the download directory.
///
/// Per-file failures are logged and skipped. Returns how many files were removed.
pub async fn clean_download_dir(dir: &Path) -> VideyResult<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match entry.file_type().await {
            Ok(kind) if kind.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!("Cannot inspect {}: {}", path.display(), e);
                continue;
            }
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
        }
    }

    info!("Removed {} old file(s) from {}", removed, dir.display());
    Ok(removed)
}

/// Write the run summary as pretty JSON.
pub async fn write_report(path: &Path, summary: &RunSummary) -> VideyResult<()> {
    let json = serde_json::to_string_pretty(summary)?;
    tokio::fs::write(path, json).await?;
    info!("Run report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use videy_shared::models::{FetchOutcome, RunMode, SummaryEntry, WorkItem};

    #[tokio::test]
    async fn test_missing_input_is_created() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("urls.txt");

        let err = read_input(&input).await.unwrap_err();

        assert!(matches!(err, VideyError::InputMissing(_)));
        assert_eq!(std::fs::read_to_string(&input).unwrap(), "");
    }

    #[tokio::test]
    async fn test_blank_input_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("urls.txt");
        std::fs::write(&input, "  \n\t\n").unwrap();

        let err = read_input(&input).await.unwrap_err();
        assert!(matches!(err, VideyError::InputEmpty(_)));
    }

    #[tokio::test]
    async fn test_read_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("urls.txt");
        std::fs::write(&input, "https://videy.co/v?id=abc\n").unwrap();

        assert_eq!(read_input(&input).await.unwrap(), "https://videy.co/v?id=abc\n");
    }

    #[tokio::test]
    async fn test_clean_removes_files_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"a").unwrap();
        std::fs::write(dir.path().join("b.mp4.part"), b"b").unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();

        let removed = clean_download_dir(dir.path()).await.unwrap();

        assert_eq!(removed, 2);
        assert!(!dir.path().join("a.mp4").exists());
        assert!(dir.path().join("keep").is_dir());
    }

    #[tokio::test]
    async fn test_prepare_creates_nested_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("x").join("downloads");
        prepare_download_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.json");
        let now = Utc::now();
        let summary = RunSummary::new(
            RunMode::Sequential,
            now,
            now,
            vec![SummaryEntry {
                item: WorkItem::resolve("abc", "https://cdn.videy.co"),
                outcome: FetchOutcome::skipped(),
            }],
        );

        write_report(&report, &summary).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["mode"], "sequential");
        assert_eq!(json["counts"]["skipped"], 1);
        assert_eq!(json["entries"][0]["item"]["id"], "abc");
        assert_eq!(json["entries"][0]["outcome"]["status"], "skipped");
    }
}
