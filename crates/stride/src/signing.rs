//! Request signing hook

use stride_transport::HttpRequest;

/// Signs an outgoing request in place.
///
/// Called once per attempt for authenticated requests, after the idempotency
/// key and bearer token are attached, so the signature covers both.
pub trait RequestSigner: Send + Sync {
    /// Add whatever headers the signing scheme requires.
    fn sign(&self, request: &mut HttpRequest);
}

/// Signer that leaves requests untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSigner;

impl RequestSigner for NoopSigner {
    fn sign(&self, _request: &mut HttpRequest) {}
}
