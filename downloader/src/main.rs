/// videy-dl - batch downloader entry point
///
/// Reads links from the input file, resolves them to CDN files and downloads
/// them into the download directory, sequentially or with a worker pool.
use std::process::ExitCode;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use videy_downloader::{progress_display, prompt, workspace, Extractor, Fetcher, Orchestrator};
use videy_shared::config::DownloaderConfig;
use videy_shared::models::RunSummary;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so they don't fight the progress bars on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("videy_downloader=info".parse().unwrap())
                .add_directive("videy_shared=info".parse().unwrap()),
        )
        .init();

    match run().await {
        Ok(summary) if summary.has_failures() => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run() -> anyhow::Result<RunSummary> {
    let config = DownloaderConfig::from_env()?;
    info!("=== videy-dl starting ({} mode) ===", config.mode);

    let text = workspace::read_input(&config.input_file).await?;
    let items = Extractor::from_config(&config)?.extract_required(&text)?;
    println!("Found {} video(s).", items.len());

    let truncate = match config.overwrite {
        Some(truncate) => truncate,
        None => prompt::ask_overwrite().await?,
    };

    workspace::prepare_download_dir(&config.download_dir).await?;
    if truncate {
        workspace::clean_download_dir(&config.download_dir).await?;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let display = progress_display::spawn(rx);

    let fetcher = Fetcher::new(&config)?.with_events(tx);
    let orchestrator = Orchestrator::new(&config, fetcher);
    let summary = orchestrator
        .run(items, config.mode, config.max_retries)
        .await;

    // Closes the event channel so the display task can finish
    drop(orchestrator);
    if let Err(e) = display.await {
        warn!("Progress display stopped: {}", e);
    }

    print!("\n{}", progress_display::render_summary(&summary));

    if let Some(path) = &config.summary_file {
        if let Err(e) = workspace::write_report(path, &summary).await {
            warn!("Failed to write run report: {}", e);
        }
    }

    Ok(summary)
}
