//! Exponential backoff with jitter.

use super::strategy::BackoffStrategy;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);
const MIN_INITIAL_DELAY: Duration = Duration::from_millis(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_MULTIPLIER: f64 = 2.0;
const DEFAULT_JITTER: f64 = 0.2;
const MIN_MULTIPLIER: f64 = 1.1;

/// Exponential backoff strategy with bounded, additive jitter.
///
/// # Mathematical Formula
///
/// For attempt `n` (0-indexed, the delay after the `n`th attempt failed):
/// ```text
/// base_delay   = initial_delay * multiplier^n
/// jittered     = base_delay * (1 + jitter * random[0, 1))
/// final_delay  = min(jittered, max_delay)
/// ```
///
/// Jitter only ever adds time and is clamped to `multiplier - 1`, so the
/// largest possible delay for attempt `n` is still below the smallest possible
/// delay for attempt `n + 1`. Below `max_delay` the sequence is strictly
/// increasing whatever the random draw.
///
/// # Examples
///
/// ```rust
/// use stride_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30))
///     .multiplier(2.0)
///     .jitter(0.1)
///     .build();
///
/// let first = backoff.next_delay(0).unwrap();
/// let second = backoff.next_delay(1).unwrap();
/// assert!(second > first);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Delay before jitter and capping for attempt `attempt`.
    fn base_nanos(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent)
    }

    /// Compute the delay for `attempt` with an explicit jitter sample in `[0, 1)`.
    ///
    /// Exposed so callers (and tests) can reason about the curve
    /// deterministically.
    pub fn delay_with_sample(&self, attempt: u32, sample: f64) -> Duration {
        let sample = sample.clamp(0.0, 1.0);
        let jittered = self.base_nanos(attempt) * (1.0 + self.jitter * sample);
        let capped = jittered.min(self.max_delay.as_nanos() as f64);
        Duration::from_nanos(capped as u64)
    }

    /// Initial delay before the second attempt (without jitter).
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound for any single delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor between consecutive delays.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Effective jitter fraction after clamping.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }
}

impl Default for ExponentialBackoff {
    /// Defaults:
    /// - `max_attempts`: 3
    /// - `initial_delay`: 500ms
    /// - `max_delay`: 30s
    /// - `multiplier`: 2.0
    /// - `jitter`: 0.2
    fn default() -> Self {
        ExponentialBackoffBuilder::default().build()
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if !self.has_next(attempt) {
            return None;
        }
        Some(self.delay_with_sample(attempt, rand::random::<f64>()))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Builder for configuring `ExponentialBackoff`.
///
/// # Examples
///
/// ```rust
/// use stride_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(100))
///     .build();
///
/// assert_eq!(backoff.max_attempts(), 5);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ExponentialBackoffBuilder {
    max_attempts: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Set the total number of attempts, including the first one.
    ///
    /// Values below 1 are raised to 1. Default: 3
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Set the delay after the first failed attempt.
    ///
    /// Raised to at least 1ms at build time; shorter delays would round to
    /// whole nanoseconds that no longer grow. Default: 500ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the maximum delay between attempts.
    ///
    /// Default: 30s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier.
    ///
    /// Clamped to at least 1.1 so delays keep growing. Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Set the jitter fraction.
    ///
    /// A jitter of 0.2 lengthens each delay by up to 20%. Clamped to
    /// `[0, multiplier - 1]` at build time. Default: 0.2
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Build the `ExponentialBackoff` instance.
    ///
    /// Uses default values for any unset parameters.
    pub fn build(self) -> ExponentialBackoff {
        let multiplier = match self.multiplier {
            Some(m) if m.is_finite() => m.max(MIN_MULTIPLIER),
            _ => DEFAULT_MULTIPLIER,
        };
        let jitter = match self.jitter {
            Some(j) if j.is_finite() => j.clamp(0.0, multiplier - 1.0),
            _ => DEFAULT_JITTER.min(multiplier - 1.0),
        };

        ExponentialBackoff {
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            initial_delay: self
                .initial_delay
                .unwrap_or(DEFAULT_INITIAL_DELAY)
                .max(MIN_INITIAL_DELAY),
            max_delay: self.max_delay.unwrap_or(DEFAULT_MAX_DELAY),
            multiplier,
            jitter,
        }
    }
}
