//! Caller-side retry with exponential backoff.
//!
//! The engine itself never retries. Wrapping a whole `sync` call here is
//! safe because a rerun recomputes the plan and only fetches what is still
//! missing.

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncFailure};
use tracing::warn;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    /// Returns true if the operation may be retried.
    fn is_retryable(&self) -> bool;
}

impl Retryable for SyncError {
    fn is_retryable(&self) -> bool {
        SyncError::is_retryable(self)
    }
}

impl Retryable for SyncFailure {
    fn is_retryable(&self) -> bool {
        SyncFailure::is_retryable(self)
    }
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` attempts have been made.
///
/// `f` receives the 0-based attempt number. The last error is returned.
pub fn with_retry<T, E, F>(config: &RetryConfig, mut f: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            std::thread::sleep(config.delay_for_attempt(attempt));
        }

        match f(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                warn!(attempt, error = %e, "retrying after transient failure");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
