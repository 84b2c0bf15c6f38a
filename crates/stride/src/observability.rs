//! Structured logging for requests passing through the client
//!
//! Every logical request is logged through this layer so field names stay
//! consistent: `method`, `path`, `status`, `elapsed_ms`, `retries`.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Request metadata for structured logging
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// HTTP method (GET, POST, etc.)
    pub method: &'static str,
    /// Path relative to the base URL
    pub path: String,
    /// Request body size in bytes (optional)
    pub body_size: Option<usize>,
    /// Whether a bearer token is attached
    pub authenticated: bool,
}

impl RequestMetadata {
    /// Create new request metadata
    pub fn new(method: &'static str, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body_size: None,
            authenticated: false,
        }
    }

    /// Set the request body size
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// Mark the request as authenticated
    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    /// Log request being dispatched
    pub fn log_request(&self) {
        debug!(
            method = self.method,
            path = %self.path,
            body_size = self.body_size,
            authenticated = self.authenticated,
            "Dispatching request"
        );
    }

    /// Log a transient failure that will be retried after `delay`
    pub fn log_retry(&self, attempt: u32, status: u16, delay: Duration) {
        warn!(
            method = self.method,
            path = %self.path,
            attempt,
            status,
            delay_ms = delay.as_millis(),
            "Transient failure, retrying"
        );
    }

    /// Log a 401 that triggers a credential refresh
    pub fn log_refresh(&self) {
        warn!(
            method = self.method,
            path = %self.path,
            "Received 401, refreshing credentials and replaying"
        );
    }
}

/// Response metadata for structured logging
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// HTTP status code (0 when no response was received)
    pub status: u16,
    /// Response body size in bytes (optional)
    pub body_size: Option<usize>,
    /// Time elapsed for the whole logical request
    pub elapsed: Duration,
    /// Number of retries taken
    pub retries: u32,
}

impl ResponseMetadata {
    /// Create new response metadata
    pub fn new(status: u16, elapsed: Duration) -> Self {
        Self {
            status,
            body_size: None,
            elapsed,
            retries: 0,
        }
    }

    /// Set the response body size
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// Set the number of retries
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Log successful response
    pub fn log_success(&self, request: &RequestMetadata) {
        info!(
            method = request.method,
            path = %request.path,
            status = self.status,
            elapsed_ms = self.elapsed.as_millis(),
            body_size = self.body_size,
            retries = self.retries,
            "Request succeeded"
        );
    }

    /// Log failed request
    pub fn log_error(&self, request: &RequestMetadata, error: &str) {
        warn!(
            method = request.method,
            path = %request.path,
            status = self.status,
            elapsed_ms = self.elapsed.as_millis(),
            error = %error,
            retries = self.retries,
            "Request failed"
        );
    }
}

/// Timer for measuring request duration
///
/// Uses tokio's clock, so paused-time tests see backoff sleeps as elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metadata_builders() {
        let meta = RequestMetadata::new("POST", "/v1/workouts")
            .with_body_size(42)
            .authenticated(true);
        assert_eq!(meta.method, "POST");
        assert_eq!(meta.body_size, Some(42));
        assert!(meta.authenticated);
    }

    #[test]
    fn test_response_metadata_builders() {
        let meta = ResponseMetadata::new(200, Duration::from_millis(15))
            .with_body_size(128)
            .with_retries(2);
        assert_eq!(meta.retries, 2);
        assert_eq!(meta.body_size, Some(128));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_follows_tokio_clock() {
        let timer = RequestTimer::start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(timer.elapsed() >= Duration::from_secs(3));
    }
}
