//! # Stride
//!
//! Resilient API client core for the Stride training companion:
//! - Collapsing of concurrent identical GETs into one network call
//! - Bounded, jittered retries for 5xx responses and timeouts
//! - One-shot credential refresh on 401
//! - Idempotency keys and request signing
//! - Public-key pinning enforced in the TLS handshake
//! - A closed error taxonomy for the rest of the application to switch on
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde::Deserialize;
//! use stride::{Client, ClientConfig, RequestDescriptor};
//!
//! #[derive(Deserialize)]
//! struct Workout {
//!     id: String,
//!     distance_m: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::from_config(ClientConfig::new("https://api.stride.app/v1"))?;
//!
//!     let workouts: Vec<Workout> = client
//!         .request(RequestDescriptor::get("/workouts").with_query([("limit", "20")]).public())
//!         .await?;
//!
//!     for workout in workouts {
//!         println!("{} {}m", workout.id, workout.distance_m);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// Re-export commonly used types
pub use auth::{AuthError, AuthProvider, NoSession, Token};
pub use builder::RequestBuilder;
pub use client::{Client, ClientBuilder, EmptyResponse};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use descriptor::{DedupKey, Method, RequestDescriptor};
pub use error::{Error, Result};
pub use idempotency::{IdempotencyKeyProvider, UuidKeyProvider};
pub use retry::{RetryAttempt, RetryPolicy, RetryPolicyBuilder, TIMEOUT_STATUS};
pub use signing::{NoopSigner, RequestSigner};
pub use stride_transport::{
    HttpRequest, HttpResponse, HttpTransport, PinningConfig, Transport, TransportError,
    TrustValidator,
};

// Module declarations
pub mod auth;
pub mod builder;
pub mod client;
pub mod config;
mod dedup;
pub mod descriptor;
pub mod error;
pub mod idempotency;
pub mod observability;
pub mod retry;
pub mod signing;

// Re-export key dependencies for convenience
pub use async_trait::async_trait;

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use stride::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AuthProvider, Client, ClientConfig, EmptyResponse, Error, RequestDescriptor, Result,
        RetryPolicy, Token,
    };
}

/// Crate version, sent as `X-Client-Version` unless overridden
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header carrying the client version.
pub const CLIENT_VERSION_HEADER: &str = "x-client-version";

/// Header carrying the per-operation idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
