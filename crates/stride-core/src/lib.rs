#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core primitives for the Stride API client.
//!
//! This crate holds the pieces of the client that have no knowledge of HTTP,
//! credentials or TLS:
//!
//! - **Backoff strategies** via the `BackoffStrategy` trait
//!   - Exponential growth with bounded, additive jitter
//!   - Attempt ceilings expressed as total attempts, not retries
//!
//! # Examples
//!
//! ```rust
//! use stride_core::prelude::*;
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .jitter(0.0)
//!     .build();
//!
//! assert_eq!(backoff.next_delay(0), Some(Duration::from_millis(100)));
//! assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(200)));
//! ```

pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use stride_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::retry::{BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder};
}
