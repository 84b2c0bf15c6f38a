//! Transport layer for the Stride API client
//!
//! Provides the boundary between the client core and the network: a
//! trait-based transport abstraction, a reqwest-backed HTTP implementation,
//! and public-key pinning that runs inside every TLS handshake.
//!
//! # Architecture
//!
//! - **Transport trait**: one request in, one response (or transport error) out
//! - **HTTP transport**: REST client via reqwest, no retries of its own
//! - **Pinning**: `TrustValidator` decides, `PinnedServerVerifier` enforces
//! - **Error handling**: timeouts are kept distinct from every other failure
//!
//! # Usage
//!
//! ```ignore
//! use stride_transport::{HttpRequest, HttpTransport, Transport};
//!
//! let transport = HttpTransport::new()?;
//! let url = "https://api.stride.app/v1/athlete".parse()?;
//! let request = HttpRequest::new(::http::Method::GET, url);
//! let response = transport.send(request).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod pinning;
pub mod traits;

// Re-export commonly used types
pub use crate::error::{Result, TransportError};
pub use crate::http::{HttpTransport, HttpTransportConfig};
pub use crate::pinning::{PinningConfig, TrustValidator};
pub use crate::traits::{HttpRequest, HttpResponse, Transport};
