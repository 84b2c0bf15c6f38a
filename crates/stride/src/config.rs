//! Configuration for the Stride client

use crate::VERSION;
use crate::retry::RetryPolicy;
use std::time::Duration;
use stride_transport::{HttpTransportConfig, PinningConfig};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.stride.app/v1";

/// Configuration for the Stride client.
///
/// Read once when the client is built; changing it afterwards has no effect
/// on existing clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every descriptor path is resolved against
    pub base_url: String,

    /// Value of the `X-Client-Version` header
    pub client_version: String,

    /// Per-attempt timeout
    pub timeout: Duration,

    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,

    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,

    /// Public-key pinning for the API host
    pub pinning: Option<PinningConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_version: VERSION.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 8,
            retry: RetryPolicy::default(),
            pinning: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `base_url` with defaults for everything else.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables (and `.env`, if present).
    ///
    /// This will look for:
    /// - `STRIDE_BASE_URL` for the API base URL
    /// - `STRIDE_TIMEOUT_SECS` for the per-attempt timeout
    /// - `STRIDE_MAX_ATTEMPTS` for total attempts per request
    /// - `STRIDE_PINNED_HOST` and `STRIDE_PINNED_KEYS` (comma-separated base64
    ///   SHA-256 SPKI hashes) for public-key pinning
    ///
    /// Unparseable numeric values are ignored. A pinned host without keys
    /// yields an explicitly unpinned configuration, which is logged on every
    /// handshake.
    #[cfg(feature = "env")]
    pub fn from_env() -> Self {
        use std::env;

        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(base_url) = env::var("STRIDE_BASE_URL") {
            config.base_url = base_url;
        }

        if let Ok(timeout_str) = env::var("STRIDE_TIMEOUT_SECS")
            && let Ok(timeout_secs) = timeout_str.trim().parse::<u64>()
        {
            config.timeout = Duration::from_secs(timeout_secs);
        }

        if let Ok(attempts_str) = env::var("STRIDE_MAX_ATTEMPTS")
            && let Ok(max_attempts) = attempts_str.trim().parse::<u32>()
        {
            config.retry = RetryPolicy::builder().max_attempts(max_attempts).build();
        }

        if let Ok(host) = env::var("STRIDE_PINNED_HOST") {
            let keys = env::var("STRIDE_PINNED_KEYS").unwrap_or_default();
            config.pinning = Some(PinningConfig::new(host, keys.split(',')));
        }

        config
    }

    /// Set the per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enable public-key pinning
    pub fn pinning(mut self, pinning: PinningConfig) -> Self {
        self.pinning = Some(pinning);
        self
    }

    /// Transport settings derived from this configuration.
    pub(crate) fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            connect_timeout: self.connect_timeout,
            pool_max_idle_per_host: self.pool_max_idle_per_host,
            user_agent: Some(format!("stride/{}", self.client_version)),
            pinning: self.pinning.clone(),
        }
    }
}
