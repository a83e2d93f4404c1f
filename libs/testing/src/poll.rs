//! Bounded polling.
//!
//! A check runs immediately and then once per interval until it succeeds or
//! the timeout has elapsed. The number of attempts is therefore bounded by
//! `timeout / interval + 1`.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How long and how often to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Upper bound on the number of check attempts.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let rounds = self.timeout.as_nanos() / self.interval.as_nanos();
        u32::try_from(rounds).unwrap_or(u32::MAX - 1) + 1
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60), Duration::from_secs(5))
    }
}

/// Errors from [`wait_until`].
#[derive(Debug, Error)]
pub enum WaitError<E> {
    /// The check never succeeded within the policy bounds.
    #[error("{what} did not succeed within {timeout:?} ({attempts} attempts): {last_error}")]
    TimedOut {
        what: String,
        timeout: Duration,
        attempts: u32,
        elapsed: Duration,
        last_error: E,
    },

    /// The timeout elapsed while a check was still running.
    #[error("{what} did not succeed within {timeout:?}: attempt {attempts} did not complete")]
    Stalled {
        what: String,
        timeout: Duration,
        attempts: u32,
        previous_error: Option<E>,
    },
}

impl<E> WaitError<E> {
    /// The error returned by the last completed check attempt.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::TimedOut { last_error, .. } => Some(last_error),
            Self::Stalled { previous_error, .. } => previous_error.as_ref(),
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::TimedOut { attempts, .. } | Self::Stalled { attempts, .. } => *attempts,
        }
    }

    pub fn is_stalled(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }
}

/// Run `check` until it succeeds or `policy` is exhausted.
///
/// A running check is cancelled once the policy timeout has elapsed.
pub async fn wait_until<T, E, F, Fut>(
    what: &str,
    policy: &PollPolicy,
    mut check: F,
) -> Result<T, WaitError<E>>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;
    let mut previous_error = None;

    loop {
        attempts += 1;
        let remaining = policy.timeout.saturating_sub(start.elapsed());
        let outcome = match tokio::time::timeout(remaining, check()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(what, attempts, timeout = ?policy.timeout, "check still running at timeout");
                return Err(WaitError::Stalled {
                    what: what.to_string(),
                    timeout: policy.timeout,
                    attempts,
                    previous_error,
                });
            }
        };

        match outcome {
            Ok(value) => {
                info!(what, attempts, elapsed = ?start.elapsed(), "wait succeeded");
                return Ok(value);
            }
            Err(err) => {
                let elapsed = start.elapsed();
                debug!(what, attempts, error = %err, "check failed");

                if attempts >= max_attempts || elapsed + policy.interval > policy.timeout {
                    return Err(WaitError::TimedOut {
                        what: what.to_string(),
                        timeout: policy.timeout,
                        attempts,
                        elapsed,
                        last_error: err,
                    });
                }
                previous_error = Some(err);
            }
        }

        tokio::time::sleep(policy.interval).await;
    }
}
