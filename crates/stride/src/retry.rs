//! Retry gating for transient failures
//!
//! Only server-side failures (5xx) and timeouts are worth repeating. Client
//! errors, decoding failures, connection errors and pin mismatches are
//! returned on the first occurrence.

use crate::error::Error;
use std::time::Duration;
use stride_core::retry::{BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder};

/// Status used to report a transport timeout to the retry policy.
pub const TIMEOUT_STATUS: u16 = 0;

/// Decides whether a failed attempt is repeated, and after how long.
///
/// # Example
///
/// ```rust
/// use stride::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(4)
///     .initial_delay(Duration::from_millis(250))
///     .build();
///
/// assert!(policy.should_retry(503, 0));
/// assert!(!policy.should_retry(404, 0));
/// assert!(!policy.should_retry(503, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RetryPolicy {
    backoff: ExponentialBackoff,
}

impl RetryPolicy {
    /// Builder starting from the defaults (3 attempts, 500ms, x2, 20% jitter, 30s cap).
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::builder().max_attempts(1).build()
    }

    /// Whether `status` signals a transient failure.
    pub fn is_retryable_status(status: u16) -> bool {
        status == TIMEOUT_STATUS || (500..=599).contains(&status)
    }

    /// Whether the attempt with 0-based index `attempt` that ended with
    /// `status` should be followed by another one.
    pub fn should_retry(&self, status: u16, attempt: u32) -> bool {
        Self::is_retryable_status(status) && self.backoff.has_next(attempt)
    }

    /// Delay before the attempt following `attempt`, or `None` once the
    /// attempt budget is spent.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        self.backoff.next_delay(attempt)
    }

    /// Total transport attempts allowed for one logical request.
    pub fn max_attempts(&self) -> u32 {
        self.backoff.max_attempts()
    }

    /// Underlying backoff curve.
    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.backoff
    }
}

impl From<ExponentialBackoff> for RetryPolicy {
    fn from(backoff: ExponentialBackoff) -> Self {
        Self { backoff }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default, Clone)]
pub struct RetryPolicyBuilder {
    backoff: ExponentialBackoffBuilder,
}

impl RetryPolicyBuilder {
    /// Total attempts, including the first (minimum 1).
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.backoff = self.backoff.max_attempts(max_attempts);
        self
    }

    /// Delay after the first failed attempt, before jitter (at least 1ms).
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.backoff = self.backoff.initial_delay(delay);
        self
    }

    /// Upper bound for any single delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.backoff = self.backoff.max_delay(delay);
        self
    }

    /// Growth factor between delays (clamped to at least 1.1).
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.backoff = self.backoff.multiplier(multiplier);
        self
    }

    /// Additive jitter fraction (clamped to `[0, multiplier - 1]`).
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.backoff = self.backoff.jitter(jitter);
        self
    }

    /// Build the policy.
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            backoff: self.backoff.build(),
        }
    }
}

/// Position within one logical request's attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 0-based attempt index.
    pub index: u32,
    /// Failure that ended the previous attempt, if any.
    pub last_failure: Option<Error>,
}

impl RetryAttempt {
    /// The first attempt.
    pub fn first() -> Self {
        Self::default()
    }

    /// The attempt that follows one which ended in `failure`.
    pub fn next(self, failure: Error) -> Self {
        Self {
            index: self.index.saturating_add(1),
            last_failure: Some(failure),
        }
    }

    /// Whether this is a retry rather than the initial attempt.
    pub fn is_retry(&self) -> bool {
        self.index > 0
    }
}
