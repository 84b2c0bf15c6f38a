//! The backoff strategy trait.

use std::time::Duration;

/// A strategy deciding how many attempts an operation gets and how long to
/// wait between them.
///
/// Attempt indices are 0-based: `next_delay(0)` is the wait between the first
/// and the second attempt.
///
/// # Examples
///
/// ```rust
/// use stride_core::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// struct Fixed;
///
/// impl BackoffStrategy for Fixed {
///     fn next_delay(&self, attempt: u32) -> Option<Duration> {
///         self.has_next(attempt).then(|| Duration::from_millis(10))
///     }
///
///     fn max_attempts(&self) -> u32 {
///         2
///     }
/// }
///
/// assert_eq!(Fixed.next_delay(0), Some(Duration::from_millis(10)));
/// assert_eq!(Fixed.next_delay(1), None);
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Delay to wait after attempt `attempt` failed.
    ///
    /// Returns `None` once the attempt ceiling is reached.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Total number of attempts, including the first one.
    fn max_attempts(&self) -> u32;

    /// Whether another attempt may follow attempt `attempt`.
    fn has_next(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts()
    }
}
