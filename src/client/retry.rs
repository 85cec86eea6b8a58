//! Bounded retry with exponential backoff
//!
//! Wraps one API call and re-runs it on transient failures, sleeping
//! `base * 2^attempt` seconds between tries. The attempt budget is checked
//! before sleeping, so a policy of `m` attempts performs exactly `m + 1`
//! invocations before giving up.

use std::future::Future;
use tracing::{debug, warn};

use crate::config::{calculate_backoff, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_SECS};

/// Classifier separating retryable connectivity/temporary-server failures
/// from structural errors.
pub trait TransientError {
    /// Whether this failure is eligible for another attempt.
    fn is_transient(&self) -> bool;

    /// The error surfaced once the retry budget is exhausted.
    fn retry_limit_exceeded() -> Self;
}

/// Retry policy with clamped parameters.
///
/// The platform client has always silently corrected out-of-range values:
/// attempts outside `[1, 15]` reset to 8, base delay outside `[1, 30]`
/// seconds resets to 10. That correction is preserved here, but logged at
/// warn level since the caller asked for something else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_secs: u64,
}

/// Attempt bounds accepted without correction.
const ATTEMPTS_RANGE: std::ops::RangeInclusive<u32> = 1..=15;
/// Fallback attempt count for out-of-range requests.
const ATTEMPTS_FALLBACK: u32 = 8;
/// Base-delay bounds (seconds) accepted without correction.
const DELAY_RANGE: std::ops::RangeInclusive<u64> = 1..=30;
/// Fallback base delay (seconds) for out-of-range requests.
const DELAY_FALLBACK: u64 = 10;

impl RetryPolicy {
    /// Build a policy, clamping out-of-range parameters.
    pub fn new(max_attempts: u32, base_delay_secs: u64) -> Self {
        let attempts = if ATTEMPTS_RANGE.contains(&max_attempts) {
            max_attempts
        } else {
            warn!(
                requested = max_attempts,
                clamped = ATTEMPTS_FALLBACK,
                "retry attempt count out of range, falling back"
            );
            ATTEMPTS_FALLBACK
        };
        let delay = if DELAY_RANGE.contains(&base_delay_secs) {
            base_delay_secs
        } else {
            warn!(
                requested = base_delay_secs,
                clamped = DELAY_FALLBACK,
                "retry base delay out of range, falling back"
            );
            DELAY_FALLBACK
        };
        Self {
            max_attempts: attempts,
            base_delay_secs: delay,
        }
    }

    /// Maximum number of retries after the initial invocation.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff delay for the first retry, in seconds.
    pub fn base_delay_secs(&self) -> u64 {
        self.base_delay_secs
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_SECS)
    }
}

/// Retries a unit of work under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Retrier {
    policy: RetryPolicy,
}

impl Retrier {
    /// Build a retrier from a policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `op`, retrying transient failures with exponential backoff.
    ///
    /// Non-transient errors propagate immediately without another attempt.
    ///
    /// # Errors
    /// `E::retry_limit_exceeded()` after `max_attempts` failed retries, or
    /// the operation's own error if it is not transient.
    pub async fn execute<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: TransientError + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "call succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() => {
                    let remaining = self.policy.max_attempts.saturating_sub(attempt);
                    warn!(error = %err, remaining, "transient failure contacting the API");
                    if attempt >= self.policy.max_attempts {
                        return Err(E::retry_limit_exceeded());
                    }
                    let backoff = calculate_backoff(self.policy.base_delay_secs, attempt);
                    debug!(delay = ?backoff, "backing off before next attempt");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
