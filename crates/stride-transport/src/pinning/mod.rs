//! Public-key pinning
//!
//! The [`TrustValidator`] is a pure function of a server-trust challenge and
//! an immutable [`PinningConfig`]: it holds no mutable state and is safe to
//! call concurrently from whatever thread the TLS stack runs the handshake on.
//! [`PinnedServerVerifier`] plugs it into rustls so the check happens once per
//! handshake, before any request bytes are written.
//!
//! Pins are base64-encoded SHA-256 digests of the server certificate's DER
//! `SubjectPublicKeyInfo` (the same format as `openssl x509 -pubkey | openssl
//! pkey -pubin -outform der | openssl dgst -sha256 -binary | base64`).

mod verifier;

pub use verifier::{PinnedServerVerifier, end_entity_public_key_info};
pub(crate) use verifier::pinned_client_config;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Static pinning configuration: one host and the accepted key hashes.
///
/// An empty hash set is valid and means "explicitly unpinned": the validator
/// defers to default trust and logs a warning on every handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinningConfig {
    pinned_host: String,
    accepted_hashes: BTreeSet<String>,
}

impl PinningConfig {
    /// Create a configuration for `host` accepting any of `hashes`.
    pub fn new<I, S>(host: impl Into<String>, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pinned_host: host.into().trim().to_ascii_lowercase(),
            accepted_hashes: hashes
                .into_iter()
                .map(|h| h.into().trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// The host whose challenges are subject to pinning.
    pub fn pinned_host(&self) -> &str {
        &self.pinned_host
    }

    /// Accepted base64 SHA-256 SPKI hashes.
    pub fn accepted_hashes(&self) -> &BTreeSet<String> {
        &self.accepted_hashes
    }

    /// Whether at least one pin is configured.
    pub fn is_enforced(&self) -> bool {
        !self.accepted_hashes.is_empty()
    }
}

/// Kind of authentication challenge raised by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    /// The server presented its certificate chain for evaluation.
    ServerTrust,
    /// Any other challenge (client certificates, HTTP auth, ...).
    Other,
}

/// A server identity challenge as seen by the validator.
#[derive(Debug, Clone, Copy)]
pub struct ServerTrustChallenge<'a> {
    /// Challenge kind.
    pub kind: ChallengeKind,
    /// Host the connection was opened to.
    pub host: &'a str,
    /// DER `SubjectPublicKeyInfo` of the presented leaf certificate, if it
    /// could be extracted.
    pub public_key_info: Option<&'a [u8]>,
}

impl<'a> ServerTrustChallenge<'a> {
    /// A server-trust challenge for `host` presenting `public_key_info`.
    pub fn server_trust(host: &'a str, public_key_info: Option<&'a [u8]>) -> Self {
        Self {
            kind: ChallengeKind::ServerTrust,
            host,
            public_key_info,
        }
    }
}

/// Why a challenge was handed back to default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultHandlingReason {
    /// Not a server-trust challenge, or not for the pinned host.
    NotApplicable,
    /// Pinned host matched but no hashes are configured. Logged as a warning.
    PinningDisabled,
}

/// Outcome of evaluating a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDisposition {
    /// The presented key matched a pin; accept the presented trust.
    UseCredential,
    /// The presented key matched no pin; abort the connection.
    CancelChallenge,
    /// Not ours to decide; use platform trust.
    PerformDefaultHandling(DefaultHandlingReason),
}

/// Validates server-trust challenges against a [`PinningConfig`].
#[derive(Debug, Clone)]
pub struct TrustValidator {
    config: PinningConfig,
}

impl TrustValidator {
    /// Create a validator; the configuration is read once here.
    pub fn new(config: PinningConfig) -> Self {
        if !config.is_enforced() {
            warn!(
                host = %config.pinned_host,
                "No public-key pins configured, connections fall back to default trust"
            );
        }
        Self { config }
    }

    /// The configuration this validator enforces.
    pub fn config(&self) -> &PinningConfig {
        &self.config
    }

    /// Decide what to do with a challenge.
    pub fn evaluate(&self, challenge: &ServerTrustChallenge<'_>) -> TrustDisposition {
        if challenge.kind != ChallengeKind::ServerTrust
            || !challenge.host.eq_ignore_ascii_case(&self.config.pinned_host)
        {
            return TrustDisposition::PerformDefaultHandling(DefaultHandlingReason::NotApplicable);
        }

        if !self.config.is_enforced() {
            warn!(
                host = %challenge.host,
                "Public-key pinning disabled, deferring to default trust"
            );
            return TrustDisposition::PerformDefaultHandling(DefaultHandlingReason::PinningDisabled);
        }

        let Some(public_key_info) = challenge.public_key_info else {
            warn!(host = %challenge.host, "Server certificate carries no readable public key");
            return TrustDisposition::CancelChallenge;
        };

        let presented = spki_sha256_base64(public_key_info);
        if self.config.accepted_hashes.contains(&presented) {
            debug!(host = %challenge.host, "Public-key pin matched");
            TrustDisposition::UseCredential
        } else {
            warn!(
                host = %challenge.host,
                presented = %presented,
                "Public-key pin mismatch, cancelling challenge"
            );
            TrustDisposition::CancelChallenge
        }
    }
}

/// Base64 (standard alphabet, padded) SHA-256 digest of a DER SPKI.
pub fn spki_sha256_base64(public_key_info: &[u8]) -> String {
    BASE64.encode(Sha256::digest(public_key_info))
}
