//! Retry policy for fetch attempts.
//!
//! The policy is a pure function of the attempt number and the error, so it can
//! be tested without a scheduler. Waiting is delegated to an injected
//! [`DelayFn`], which production code backs with `tokio::time::sleep`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use videy_shared::config::DownloaderConfig;
use videy_shared::errors::FetchError;

/// Trait for errors that can be classified as retryable or not.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        self.is_retriable()
    }
}

/// Async wait between attempts.
pub type DelayFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Delay backed by the tokio timer.
pub fn tokio_delay() -> DelayFn {
    Arc::new(|delay: Duration| tokio::time::sleep(delay).boxed())
}

/// Delay that returns immediately.
pub fn no_delay() -> DelayFn {
    Arc::new(|_: Duration| async {}.boxed())
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then make attempt number `next_attempt`.
    Retry { next_attempt: u32, delay: Duration },
    /// Stop; `attempts` were made in total.
    GiveUp { attempts: u32 },
}

/// Fixed-delay retry policy: `max_retries` extra attempts after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: videy_shared::config::DEFAULT_MAX_RETRIES,
            delay: Duration::from_secs(videy_shared::config::DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay)
    }

    /// Same delay, different retry budget.
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self { max_retries, ..self }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decide after attempt number `attempt` (1-based) failed with `error`.
    pub fn decide<E: IsRetryable>(&self, attempt: u32, error: &E) -> RetryDecision {
        if error.is_retryable() && attempt <= self.max_retries {
            RetryDecision::Retry {
                next_attempt: attempt.saturating_add(1),
                delay: self.delay,
            }
        } else {
            RetryDecision::GiveUp { attempts: attempt }
        }
    }
}
