/// Runtime configuration, read from the environment (and `.env`).
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{VideyError, VideyResult};
use crate::models::RunMode;

pub const DEFAULT_INPUT_FILE: &str = "urls.txt";
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub const DEFAULT_SOURCE_HOST: &str = "videy.co";
pub const DEFAULT_CDN_BASE_URL: &str = "https://cdn.videy.co";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STALL_TIMEOUT_SECS: u64 = 60;

/// Everything a run needs, passed explicitly into the fetcher and orchestrator.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Text file holding the links to fetch.
    pub input_file: PathBuf,
    /// Directory videos are written into.
    pub download_dir: PathBuf,
    /// Host of the share links found in the input.
    pub source_host: String,
    /// Base URL serving the raw video files.
    pub cdn_base_url: String,
    pub mode: RunMode,
    /// Retries after the first attempt; an item gets `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Constant delay between attempts.
    pub retry_delay: Duration,
    /// Worker count in concurrent mode.
    pub pool_size: usize,
    pub connect_timeout: Duration,
    /// Max silence between two body chunks before the attempt is abandoned.
    pub stall_timeout: Duration,
    /// `Some(true)` truncates the download dir, `Some(false)` adds to it,
    /// `None` asks interactively.
    pub overwrite: Option<bool>,
    /// Where to write the JSON run report, if anywhere.
    pub summary_file: Option<PathBuf>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from(DEFAULT_INPUT_FILE),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            source_host: DEFAULT_SOURCE_HOST.to_string(),
            cdn_base_url: DEFAULT_CDN_BASE_URL.to_string(),
            mode: RunMode::Concurrent,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            pool_size: DEFAULT_POOL_SIZE,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            stall_timeout: Duration::from_secs(DEFAULT_STALL_TIMEOUT_SECS),
            overwrite: None,
            summary_file: None,
        }
    }
}

impl DownloaderConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> VideyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset keys fall back
    /// to defaults; set-but-invalid keys are an error.
    pub fn from_lookup<F>(lookup: F) -> VideyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let pool_size = match get("VIDEY_POOL_SIZE") {
            Some(raw) => parse_value::<usize>("VIDEY_POOL_SIZE", &raw)?,
            None => defaults.pool_size,
        };
        if pool_size == 0 {
            return Err(VideyError::Config("VIDEY_POOL_SIZE must be at least 1".into()));
        }

        Ok(Self {
            input_file: get("VIDEY_INPUT_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.input_file),
            download_dir: get("VIDEY_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            source_host: get("VIDEY_SOURCE_HOST").unwrap_or(defaults.source_host),
            cdn_base_url: get("VIDEY_CDN_BASE_URL").unwrap_or(defaults.cdn_base_url),
            mode: match get("VIDEY_MODE") {
                Some(raw) => raw.parse()?,
                None => defaults.mode,
            },
            max_retries: match get("VIDEY_MAX_RETRIES") {
                Some(raw) => parse_value("VIDEY_MAX_RETRIES", &raw)?,
                None => defaults.max_retries,
            },
            retry_delay: secs_or("VIDEY_RETRY_DELAY_SECS", get("VIDEY_RETRY_DELAY_SECS"), defaults.retry_delay)?,
            pool_size,
            connect_timeout: secs_or("VIDEY_CONNECT_TIMEOUT_SECS", get("VIDEY_CONNECT_TIMEOUT_SECS"), defaults.connect_timeout)?,
            stall_timeout: secs_or("VIDEY_STALL_TIMEOUT_SECS", get("VIDEY_STALL_TIMEOUT_SECS"), defaults.stall_timeout)?,
            overwrite: match get("VIDEY_OVERWRITE") {
                Some(raw) => Some(parse_bool("VIDEY_OVERWRITE", &raw)?),
                None => None,
            },
            summary_file: get("VIDEY_SUMMARY_FILE").map(PathBuf::from),
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> VideyResult<T> {
    raw.parse::<T>()
        .map_err(|_| VideyError::Config(format!("{} has invalid value '{}'", key, raw)))
}

fn secs_or(key: &str, raw: Option<String>, default: Duration) -> VideyResult<Duration> {
    match raw {
        Some(raw) => parse_value::<u64>(key, &raw).map(Duration::from_secs),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> VideyResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "t" => Ok(true),
        "0" | "false" | "no" | "a" => Ok(false),
        _ => Err(VideyError::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}
