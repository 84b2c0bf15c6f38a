//! Backoff strategies for retry loops.
//!
//! The retry loop itself lives with the caller (it needs to know which
//! failures are retryable); this module only answers "how many attempts" and
//! "how long to wait before the next one".
//!
//! # Key Types
//!
//! - [`BackoffStrategy`] - Core trait for delay calculation
//! - [`ExponentialBackoff`] - Exponential backoff with jitter
//!
//! # Examples
//!
//! ```rust
//! use stride_core::retry::{BackoffStrategy, ExponentialBackoff};
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::builder()
//!     .max_attempts(4)
//!     .initial_delay(Duration::from_millis(250))
//!     .build();
//!
//! // Three delays separate four attempts.
//! assert!(backoff.next_delay(2).is_some());
//! assert!(backoff.next_delay(3).is_none());
//! ```

mod exponential;
mod strategy;

pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use strategy::BackoffStrategy;
