//! Error taxonomy for the Stride API client
//!
//! This module defines the closed set of failures the rest of the application
//! switches on. Status-derived variants are produced only by the client's
//! response mapping; everything else arrives through `From` conversions at the
//! transport and auth boundaries.

use crate::auth::AuthError;
use stride_transport::TransportError as TransportFailure;
use thiserror::Error;

/// Result type alias for operations that can fail with a client error.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way a request through the client can fail.
///
/// The type is `Clone` because one failed in-flight GET is fanned out to every
/// caller that was collapsed onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The path and query could not be composed into a valid address.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The transport returned something that is not an HTTP response.
    #[error("Invalid response from server")]
    InvalidResponse,

    /// 401 that survived the one-shot credential refresh.
    #[error("Unauthorized")]
    Unauthorized,

    /// 409. Still a client error, reported distinctly so callers can reconcile.
    #[error("Conflict")]
    Conflict,

    /// Any other 4xx.
    #[error("Client error (status {0})")]
    ClientError(u16),

    /// 5xx.
    #[error("Server error (status {0})")]
    ServerError(u16),

    /// A 2xx body that could not be decoded into the requested type.
    #[error("Failed to decode response: {0}")]
    DecodingError(String),

    /// Timeout, connection, TLS or pinning failure.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Any status outside the classes above (1xx, 3xx, 6xx+).
    #[error("Unexpected status {0}")]
    Unknown(u16),

    /// The auth collaborator could not provide or refresh a credential.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}

impl Error {
    /// Map a final status code to an error, or `None` for 2xx.
    pub(crate) fn for_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 => Some(Error::Unauthorized),
            409 => Some(Error::Conflict),
            400..=499 => Some(Error::ClientError(status)),
            500..=599 => Some(Error::ServerError(status)),
            100..=999 => Some(Error::Unknown(status)),
            _ => Some(Error::InvalidResponse),
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized => Some(401),
            Error::Conflict => Some(409),
            Error::ClientError(code) | Error::ServerError(code) | Error::Unknown(code) => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Whether the server rejected the request itself (4xx, including 401 and 409).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized | Error::Conflict | Error::ClientError(_)
        )
    }

    /// Whether the server failed to handle a valid request (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::ServerError(_))
    }

    /// Whether this is the 409 conflict signal.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict)
    }
}

impl From<TransportFailure> for Error {
    fn from(err: TransportFailure) -> Self {
        Error::TransportError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DecodingError(err.to_string())
    }
}
