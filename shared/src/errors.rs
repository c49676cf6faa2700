/// Unified error types for Videy-DL.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type. Only raised before a run starts; per-item
/// failures are folded into `FetchOutcome::Failed` instead.
#[derive(Debug, Error)]
pub enum VideyError {
    #[error("No valid video URLs found in the input")]
    NoWorkItems,

    #[error("Input file {0} not found")]
    InputMissing(PathBuf),

    #[error("Input file {0} is empty")]
    InputEmpty(PathBuf),

    #[error("Invalid option '{0}', expected 'A' or 'T'")]
    InvalidChoice(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid link pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classification of a failed fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkFailure,
    HttpStatus,
    WriteFailure,
    Interrupted,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NetworkFailure => write!(f, "network_failure"),
            ErrorKind::HttpStatus => write!(f, "http_status"),
            ErrorKind::WriteFailure => write!(f, "write_failure"),
            ErrorKind::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Error from a single fetch attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server responded with HTTP {0}")]
    HttpStatus(u16),

    #[error("Write error: {0}")]
    Write(String),

    /// The worker handling the item stopped before producing an outcome.
    #[error("Interrupted: {0}")]
    Interrupted(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network(_) => ErrorKind::NetworkFailure,
            FetchError::HttpStatus(_) => ErrorKind::HttpStatus,
            FetchError::Write(_) => ErrorKind::WriteFailure,
            FetchError::Interrupted(_) => ErrorKind::Interrupted,
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self,
            FetchError::Network(_)
            | FetchError::HttpStatus(_)
            | FetchError::Write(_)
        )
    }
}

/// Result type alias for Videy-DL operations.
pub type VideyResult<T> = Result<T, VideyError>;
