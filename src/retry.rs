//! Retry logic with exponential backoff and cooperative cancellation
//!
//! Each item fetch gets a fixed attempt budget. Between attempts the caller waits
//! `initial_delay * backoff_multiplier^n` (capped at `max_delay`) plus uniform jitter.
//! The cancellation token is checked at the start of every attempt and every wait;
//! an attempt that is already running is never interrupted.
//!
//! # Example
//!
//! ```no_run
//! use playlist_dl::retry::{IsRetryable, RetryError, download_with_retry};
//! use playlist_dl::config::RetryConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! struct Flaky;
//!
//! impl std::fmt::Display for Flaky {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("flaky")
//!     }
//! }
//!
//! impl IsRetryable for Flaky {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn example() -> Result<(), RetryError<Flaky>> {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! download_with_retry(&config, &cancel, |_attempt| async { Ok::<_, Flaky>(()) }, |_, _, _| {})
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::EngineError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, throttling, connection resets) should return `true`.
/// Permanent failures (access restrictions, invalid input) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for EngineError {
    fn is_retryable(&self) -> bool {
        // An age gate or sign-in wall will not go away on its own
        !self.is_access_restricted()
    }
}

/// Why [`download_with_retry`] gave up
#[derive(Debug)]
pub enum RetryError<E> {
    /// Cancellation was observed at an attempt or wait checkpoint
    Cancelled,
    /// The last attempt failed (budget exhausted or error not retryable)
    Failed {
        /// Error from the last attempt
        error: E,
        /// Attempts made, first try included
        attempts: u32,
    },
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::Cancelled => f.write_str("cancelled"),
            RetryError::Failed { error, attempts } => {
                write!(f, "{} (after {} attempts)", error, attempts)
            }
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryError<E> {}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Attempt budget, delays, backoff multiplier, jitter
/// * `cancel` - Checked before every attempt and every backoff wait
/// * `operation` - Called with the zero-based attempt number
/// * `on_retry` - Called with the failed attempt's error, the upcoming attempt number
///   (1-based retry count) and the delay about to be waited
///
/// # Returns
///
/// The successful result, [`RetryError::Cancelled`], or the last error together
/// with the number of attempts made.
pub async fn download_with_retry<F, Fut, T, E, R>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
    mut on_retry: R,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
    R: FnMut(&E, u32, Duration),
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!(attempt, "Cancellation observed before attempt");
            return Err(RetryError::Cancelled);
        }

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                let delay = backoff_delay(config, attempt);
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );
                on_retry(&e, attempt, delay);

                if cancel.is_cancelled() {
                    return Err(RetryError::Cancelled);
                }
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                }
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err(RetryError::Failed {
                    error: e,
                    attempts: attempt + 1,
                });
            }
        }
    }
}

/// Delay to wait after the zero-based `attempt` failed
///
/// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`, plus
/// jitter uniformly drawn from `[0, max_jitter)` when enabled.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = config.backoff_multiplier.powi(attempt as i32);
    let base_secs = config.initial_delay.as_secs_f64() * factor;
    let base = Duration::try_from_secs_f64(base_secs)
        .map_or(config.max_delay, |d| d.min(config.max_delay));

    if config.jitter {
        base.saturating_add(add_jitter(config.max_jitter))
    } else {
        base
    }
}

/// Random duration uniformly distributed in `[0, max)`
pub(crate) fn add_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let mut rng = rand::thread_rng();
    let jitter_secs: f64 = rng.gen_range(0.0..max.as_secs_f64());
    Duration::from_secs_f64(jitter_secs)
}
