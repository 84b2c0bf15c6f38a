//! The request orchestrator
//!
//! [`Client`] turns a [`RequestDescriptor`] into a network exchange:
//!
//! 1. GETs are collapsed with identical in-flight GETs
//! 2. the descriptor is built into a wire request and stamped with an
//!    idempotency key, once
//! 3. each attempt attaches the bearer token and signs (authenticated calls only)
//! 4. a 401 triggers one credential refresh and a replay
//! 5. 5xx and timeouts are retried with backoff until the attempt budget is spent
//! 6. the final status is mapped onto [`Error`], or the body is decoded

use crate::auth::{AuthProvider, NoSession, Token};
use crate::builder::RequestBuilder;
use crate::config::ClientConfig;
use crate::dedup::RequestDeduplicator;
use crate::descriptor::RequestDescriptor;
use crate::error::{Error, Result};
use crate::idempotency::{IdempotencyKeyProvider, UuidKeyProvider};
use crate::observability::{RequestMetadata, RequestTimer, ResponseMetadata};
use crate::retry::{RetryAttempt, RetryPolicy, TIMEOUT_STATUS};
use crate::signing::{NoopSigner, RequestSigner};
use futures::FutureExt;
use http::header::AUTHORIZATION;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stride_transport::{HttpRequest, HttpResponse, HttpTransport, PinningConfig, Transport};
use url::Url;

/// Client for the Stride API.
///
/// Cheap to clone; clones share the connection pool and the in-flight
/// registry, so identical GETs issued through any clone are collapsed.
///
/// # Example
///
/// ```rust,no_run
/// use serde::Deserialize;
/// use stride::{Client, RequestDescriptor};
///
/// #[derive(Deserialize)]
/// struct Athlete {
///     id: String,
/// }
///
/// # async fn example() -> stride::Result<()> {
/// let client = Client::builder()
///     .base_url("https://api.stride.app/v1")
///     .build()?;
///
/// let athlete: Athlete = client.request(RequestDescriptor::get("/athlete")).await?;
/// println!("{}", athlete.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    signer: Arc<dyn RequestSigner>,
    idempotency: Arc<dyn IdempotencyKeyProvider>,
    retry: RetryPolicy,
    dedup: RequestDeduplicator,
}

/// Credential state of one logical request.
enum AuthPhase {
    /// Using whatever the provider considers valid.
    Initial,
    /// Replaying after a 401 with a freshly issued token. A further 401 is final.
    Refreshed(Token),
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create an unauthenticated client from a configuration object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] for a bad base URL and
    /// [`Error::TransportError`] if the HTTP stack cannot be initialized.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Create an unauthenticated client configured from the environment.
    ///
    /// See [`ClientConfig::from_env`].
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env())
    }

    /// Base URL every descriptor path is resolved against.
    pub fn base_url(&self) -> &Url {
        self.inner.builder.base_url()
    }

    /// Perform `descriptor` and decode the JSON response into `T`.
    ///
    /// An empty 2xx body decodes as JSON `null`, so `Option<T>` and `()` accept it.
    ///
    /// # Errors
    ///
    /// Any [`Error`] variant; see the module docs for which failures are
    /// retried before being reported.
    pub async fn request<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T> {
        let response = self.dispatch(descriptor).await?;
        decode(&response.body)
    }

    /// Perform `descriptor`, discarding whatever body a 2xx response carries.
    ///
    /// # Errors
    ///
    /// Same as [`Client::request`], except that decoding never fails.
    pub async fn request_void(&self, descriptor: RequestDescriptor) -> Result<()> {
        self.dispatch(descriptor).await.map(|_| ())
    }

    async fn dispatch(&self, descriptor: RequestDescriptor) -> Result<HttpResponse> {
        match descriptor.dedup_key() {
            Some(key) => {
                let inner = Arc::clone(&self.inner);
                let call = self.inner.dedup.execute(key, move || {
                    async move { inner.perform(&descriptor).await }.boxed()
                });
                call.await
            }
            None => self.inner.perform(&descriptor).await,
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.inner.dedup.in_flight_len()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.builder.base_url().as_str())
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl ClientInner {
    /// Run one logical request to completion: refresh, retries and status mapping.
    async fn perform(&self, descriptor: &RequestDescriptor) -> Result<HttpResponse> {
        let mut meta = RequestMetadata::new(descriptor.method().as_str(), descriptor.path())
            .authenticated(descriptor.requires_auth());
        if let Some(body) = descriptor.body() {
            meta = meta.with_body_size(body.len());
        }
        meta.log_request();
        let timer = RequestTimer::start();

        let mut prepared = self.builder.build(descriptor)?;
        self.idempotency.add_key(&mut prepared);

        let mut attempt = RetryAttempt::first();
        let mut phase = AuthPhase::Initial;

        let outcome = loop {
            let request = match self.authorize(&prepared, descriptor, &phase).await {
                Ok(request) => request,
                Err(err) => break Err(err),
            };

            let (status, failure) = match self.transport.send(request).await {
                Ok(response) if response.status == 401 && descriptor.requires_auth() => {
                    if matches!(phase, AuthPhase::Refreshed(_)) {
                        break Err(Error::Unauthorized);
                    }
                    meta.log_refresh();
                    // The replay does not count against the retry budget.
                    match self.auth.handle_unauthorized().await {
                        Ok(token) => {
                            phase = AuthPhase::Refreshed(token);
                            continue;
                        }
                        Err(err) => break Err(err.into()),
                    }
                }
                Ok(response) => match Error::for_status(response.status) {
                    None => break Ok(response),
                    Some(err @ Error::InvalidResponse) => break Err(err),
                    Some(err) => (response.status, err),
                },
                Err(err) if err.is_timeout() => (TIMEOUT_STATUS, err.into()),
                Err(err) => break Err(err.into()),
            };

            match self.backoff(&attempt, status) {
                Some(delay) => {
                    meta.log_retry(attempt.index, status, delay);
                    tokio::time::sleep(delay).await;
                    attempt = attempt.next(failure);
                }
                None => break Err(failure),
            }
        };

        let status = match &outcome {
            Ok(response) => response.status,
            Err(err) => err.status().unwrap_or(TIMEOUT_STATUS),
        };
        let report = ResponseMetadata::new(status, timer.elapsed()).with_retries(attempt.index);
        match &outcome {
            Ok(response) => report.with_body_size(response.body.len()).log_success(&meta),
            Err(err) => report.log_error(&meta, &err.to_string()),
        }

        outcome
    }

    /// Copy of the prepared request with credentials for this attempt.
    ///
    /// The idempotency key is already on `prepared`; the bearer token follows
    /// and the signature comes last so it covers both.
    async fn authorize(
        &self,
        prepared: &HttpRequest,
        descriptor: &RequestDescriptor,
        phase: &AuthPhase,
    ) -> Result<HttpRequest> {
        let mut request = prepared.clone();
        if !descriptor.requires_auth() {
            return Ok(request);
        }

        let token = match phase {
            AuthPhase::Initial => self.auth.valid_token().await?,
            AuthPhase::Refreshed(token) => token.clone(),
        };
        request.set_header(AUTHORIZATION, token.authorization_value()?);
        self.signer.sign(&mut request);

        Ok(request)
    }

    /// Delay before the next attempt, or `None` if the failure is final.
    fn backoff(&self, attempt: &RetryAttempt, status: u16) -> Option<Duration> {
        if !self.retry.should_retry(status, attempt.index) {
            return None;
        }
        self.retry.delay(attempt.index)
    }
}

/// Decode a 2xx body. Empty bodies are treated as JSON `null`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(Error::from)
}

/// Response type for calls that return no meaningful content.
///
/// Accepts any JSON body, including an empty one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyResponse;

impl<'de> Deserialize<'de> for EmptyResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| EmptyResponse)
    }
}

/// Builder for [`Client`].
///
/// Collaborators default to: the reqwest transport built from the
/// configuration, no session, no signing, and UUID idempotency keys.
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    auth: Option<Arc<dyn AuthProvider>>,
    signer: Option<Arc<dyn RequestSigner>>,
    idempotency: Option<Arc<dyn IdempotencyKeyProvider>>,
}

impl ClientBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL for the API.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the `X-Client-Version` header value.
    pub fn client_version(mut self, version: impl Into<String>) -> Self {
        self.config.client_version = version.into();
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connect timeout of the default transport.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Pin the API host's public keys (default transport only).
    pub fn pinning(mut self, pinning: PinningConfig) -> Self {
        self.config.pinning = Some(pinning);
        self
    }

    /// Use a custom transport instead of the reqwest one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the credential provider.
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the request signer.
    pub fn signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Set the idempotency key provider.
    pub fn idempotency(mut self, idempotency: Arc<dyn IdempotencyKeyProvider>) -> Self {
        self.idempotency = Some(idempotency);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] for a bad base URL and
    /// [`Error::TransportError`] if the default transport cannot be built.
    pub fn build(self) -> Result<Client> {
        let config = self.config;
        let builder =
            RequestBuilder::new(&config.base_url, &config.client_version, config.timeout)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::with_config(config.transport_config())?),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                builder,
                transport,
                auth: self.auth.unwrap_or_else(|| Arc::new(NoSession)),
                signer: self.signer.unwrap_or_else(|| Arc::new(NoopSigner)),
                idempotency: self
                    .idempotency
                    .unwrap_or_else(|| Arc::new(UuidKeyProvider)),
                retry: config.retry,
                dedup: RequestDeduplicator::new(),
            }),
        })
    }
}
