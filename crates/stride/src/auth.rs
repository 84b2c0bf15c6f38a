//! Bearer credentials and the auth collaborator contract
//!
//! Token issuance and refresh belong to the application's session layer. The
//! client only needs a currently-valid token before sending, and a forced
//! refresh after a 401.

use async_trait::async_trait;
use http::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use thiserror::Error;

/// Failures reported by an [`AuthProvider`]. Propagated to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No user session exists.
    #[error("no active session")]
    NoSession,

    /// The session could not be refreshed.
    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    /// The provider returned a token that cannot be sent in a header.
    #[error("token is not a valid header value")]
    MalformedToken,
}

/// A bearer token. The secret is never printed.
#[derive(Clone)]
pub struct Token(SecretString);

impl Token {
    /// Wrap a raw bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into().into_boxed_str()))
    }

    /// `Authorization` header value for this token, marked sensitive.
    pub(crate) fn authorization_value(&self) -> Result<HeaderValue, AuthError> {
        let mut value = HeaderValue::try_from(format!("Bearer {}", self.0.expose_secret()))
            .map_err(|_| AuthError::MalformedToken)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token([REDACTED])")
    }
}

/// Supplies and refreshes bearer credentials.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// A token valid right now, or [`AuthError::NoSession`].
    async fn valid_token(&self) -> Result<Token, AuthError>;

    /// Force a refresh after the server rejected the current token.
    async fn handle_unauthorized(&self) -> Result<Token, AuthError>;
}

/// Provider for clients without a session: every authenticated call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSession;

#[async_trait]
impl AuthProvider for NoSession {
    async fn valid_token(&self) -> Result<Token, AuthError> {
        Err(AuthError::NoSession)
    }

    async fn handle_unauthorized(&self) -> Result<Token, AuthError> {
        Err(AuthError::NoSession)
    }
}
