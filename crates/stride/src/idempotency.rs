//! Idempotency key injection
//!
//! Every logical request is stamped exactly once. Retries and the post-refresh
//! replay reuse the stamped request, so the server sees one key per operation
//! however many times it is transmitted.

use crate::IDEMPOTENCY_KEY_HEADER;
use http::{HeaderName, HeaderValue};
use stride_transport::HttpRequest;
use uuid::Uuid;

/// Adds an idempotency key to an outgoing request.
pub trait IdempotencyKeyProvider: Send + Sync {
    /// Stamp `request` with a fresh key.
    fn add_key(&self, request: &mut HttpRequest);
}

/// Stamps `Idempotency-Key` with a random UUID v4.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeyProvider;

impl IdempotencyKeyProvider for UuidKeyProvider {
    fn add_key(&self, request: &mut HttpRequest) {
        let key = Uuid::new_v4().hyphenated().to_string();
        // A hyphenated UUID is always a valid header value.
        if let Ok(value) = HeaderValue::from_str(&key) {
            request.set_header(HeaderName::from_static(IDEMPOTENCY_KEY_HEADER), value);
        }
    }
}
