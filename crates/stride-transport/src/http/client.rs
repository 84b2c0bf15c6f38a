//! HTTP transport client implementation
//!
//! Implements the Transport trait on top of reqwest with connection pooling,
//! per-attempt timeouts and optional public-key pinning.

use crate::error::{Result, TransportError};
use crate::pinning::{PinningConfig, TrustValidator, pinned_client_config};
use crate::traits::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::debug;

/// HTTP transport implementation
///
/// Handles HTTP requests with:
/// - Connection pooling
/// - Per-attempt timeout handling (taken from each [`HttpRequest`])
/// - Public-key pinning enforced during the TLS handshake
///
/// Each call is exactly one attempt; the retry loop lives in the client core.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: ReqwestClient,
    pinned: bool,
}

impl HttpTransport {
    /// Create a new HTTP transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a new HTTP transport with custom configuration
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host);

        if let Some(user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let pinned = config.pinning.is_some();
        if let Some(pinning) = config.pinning {
            debug!(
                host = %pinning.pinned_host(),
                pins = pinning.accepted_hashes().len(),
                "Installing pinned TLS verifier"
            );
            let tls = pinned_client_config(TrustValidator::new(pinning))?;
            builder = builder.use_preconfigured_tls(tls);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        Ok(Self { client, pinned })
    }

    /// Whether TLS handshakes go through the pinned verifier.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;

        let mut req = self
            .client
            .request(method, url)
            .headers(headers)
            .timeout(timeout);

        if let Some(body) = body {
            req = req.body(body);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User-Agent header sent on every request
    pub user_agent: Option<String>,

    /// Public-key pinning; `None` uses platform trust only
    pub pinning: Option<PinningConfig>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 8,
            user_agent: None,
            pinning: None,
        }
    }
}
