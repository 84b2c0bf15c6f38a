//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur before an HTTP status is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The per-attempt timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established (includes TLS and pin failures).
    #[error("connection error: {0}")]
    Connection(String),

    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The transport itself could not be configured.
    #[error("transport configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// Whether this failure is the timeout class.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(error_chain(&err))
        } else {
            Self::Http(error_chain(&err))
        }
    }
}

/// Flatten an error and its sources so TLS failures stay visible.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
