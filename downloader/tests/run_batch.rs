//! End-to-end batch runs: pasted text in, files and a summary out.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use videy_downloader::retry::{no_delay, DelayFn};
use videy_downloader::{progress_display, Extractor, Fetcher, Orchestrator};
use videy_shared::config::{DownloaderConfig, DEFAULT_SOURCE_HOST};
use videy_shared::errors::FetchError;
use videy_shared::models::{FetchOutcome, RunMode};

fn config(dir: &TempDir, server: &MockServer) -> DownloaderConfig {
    DownloaderConfig {
        download_dir: dir.path().to_path_buf(),
        cdn_base_url: server.uri(),
        pool_size: 2,
        ..DownloaderConfig::default()
    }
}

#[tokio::test]
async fn pasted_text_to_files() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/aaa.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"old".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bbb.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh video".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    std::fs::write(dir.path().join("aaa.mp4"), b"cached").unwrap();

    let config = config(&dir, &server);
    let text = "watch https://videy.co/v?id=aaa and\nhttp://videy.co/v?id=bbb, \
                again https://videy.co/v?id=aaa";
    let items = Extractor::from_config(&config).unwrap().extract_required(text).unwrap();
    assert_eq!(items.len(), 2);

    let fetcher = Fetcher::new(&config).unwrap().with_delay(no_delay());
    let summary = Orchestrator::new(&config, fetcher)
        .run(items, RunMode::Concurrent, 3)
        .await;

    let outcomes: Vec<&FetchOutcome> = summary.outcomes().collect();
    assert_eq!(outcomes[0], &FetchOutcome::skipped());
    assert_eq!(
        outcomes[1],
        &FetchOutcome::Succeeded {
            bytes_written: 11,
            destination_path: dir.path().join("bbb.mp4"),
        }
    );
    assert_eq!(std::fs::read(dir.path().join("aaa.mp4")).unwrap(), b"cached");
    assert_eq!(std::fs::read(dir.path().join("bbb.mp4")).unwrap(), b"fresh video");
    assert!(!dir.path().join("bbb.mp4.part").exists());

    let report = progress_display::render_summary(&summary);
    assert!(report.contains("- Video 1: File \"aaa.mp4\" already exists, skipping download."));
    assert!(report.contains("- Video 2: Saved to: "));
}

#[tokio::test]
async fn one_bad_link_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    for id in ["one", "three"] {
        Mock::given(method("GET"))
            .and(path(format!("/{}.mp4", id)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(id.as_bytes().to_vec()))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/two.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = config(&dir, &server);
    let items = Extractor::new(DEFAULT_SOURCE_HOST, server.uri())
        .unwrap()
        .extract("https://videy.co/v?id=one https://videy.co/v?id=two https://videy.co/v?id=three");

    for mode in [RunMode::Sequential, RunMode::Concurrent] {
        let fetcher = Fetcher::new(&config).unwrap().with_delay(no_delay());
        let summary = Orchestrator::new(&config, fetcher)
            .run(items.clone(), mode, 1)
            .await;

        assert_eq!(summary.len(), 3);
        assert_eq!(summary.counts.failed, 1);
        assert!(summary.has_failures());
        let outcomes: Vec<&FetchOutcome> = summary.outcomes().collect();
        assert!(matches!(
            outcomes[1],
            FetchOutcome::Failed { attempts: 2, last_error: FetchError::HttpStatus(404) }
        ));
        assert!(!dir.path().join("two.mp4").exists());

        std::fs::remove_file(dir.path().join("one.mp4")).unwrap();
        std::fs::remove_file(dir.path().join("three.mp4")).unwrap();
    }
}

#[tokio::test]
async fn retries_are_bounded_and_spaced() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down.mp4"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let waits: Arc<Mutex<Vec<Duration>>> = Arc::default();
    let recorded = waits.clone();
    let delay: DelayFn = Arc::new(move |d: Duration| {
        recorded.lock().unwrap().push(d);
        async {}.boxed()
    });

    let config = config(&dir, &server);
    let items = Extractor::from_config(&config)
        .unwrap()
        .extract("https://videy.co/v?id=down");
    let fetcher = Fetcher::new(&config).unwrap().with_delay(delay);
    let summary = Orchestrator::new(&config, fetcher)
        .run(items, RunMode::Sequential, 3)
        .await;

    assert_eq!(
        summary.entries()[0].outcome,
        FetchOutcome::Failed {
            attempts: 4,
            last_error: FetchError::HttpStatus(503),
        }
    );
    assert_eq!(*waits.lock().unwrap(), vec![Duration::from_secs(2); 3]);
}
