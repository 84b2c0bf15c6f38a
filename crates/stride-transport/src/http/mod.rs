//! HTTP transport implementation
//!
//! Provides a reqwest-backed client that implements the [`Transport`](crate::Transport)
//! trait. It sends a single attempt per call and, when pinning is configured,
//! verifies the server's public key during the TLS handshake.

pub mod client;

pub use client::{HttpTransport, HttpTransportConfig};
