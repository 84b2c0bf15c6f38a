//! Common test utilities and helpers

use async_trait::async_trait;
use http::HeaderMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stride::{
    AuthError, AuthProvider, Client, HttpRequest, HttpResponse, RetryPolicy, Token, Transport,
    TransportError,
};
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Install a test-friendly subscriber once per binary. Honours `RUST_LOG`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted transport outcome.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16, &'static str),
    Timeout,
    Refused,
}

/// Transport answering from a script and recording every request it sees.
///
/// The last reply repeats once the script runs out.
#[allow(dead_code)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    seen: Mutex<Vec<(Instant, HttpRequest)>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(Reply::Status(200, "")),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().iter().map(|(_, req)| req.clone()).collect()
    }

    pub fn sends(&self) -> usize {
        self.seen.lock().len()
    }

    /// Gaps between consecutive sends, on tokio's clock.
    pub fn intervals(&self) -> Vec<Duration> {
        self.seen
            .lock()
            .windows(2)
            .map(|pair| pair[1].0 - pair[0].0)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().push((Instant::now(), request));

        let reply = {
            let mut script = self.script.lock();
            let mut last = self.last.lock();
            if let Some(next) = script.pop_front() {
                *last = next;
            }
            *last
        };

        match reply {
            Reply::Status(status, body) => Ok(HttpResponse::new(status, HeaderMap::new(), body)),
            Reply::Timeout => Err(TransportError::Timeout),
            Reply::Refused => Err(TransportError::Connection("connection refused".into())),
        }
    }
}

/// Transport that holds every send until permits are released, then answers
/// with `status` and `body`. Counts sends that were dropped before being released.
#[allow(dead_code)]
pub struct GatedTransport {
    status: u16,
    body: &'static str,
    echo_method: bool,
    seen: Mutex<Vec<HttpRequest>>,
    release: Semaphore,
    sends: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl GatedTransport {
    pub fn new(body: &'static str) -> Arc<Self> {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            echo_method: false,
            seen: Mutex::new(Vec::new()),
            release: Semaphore::new(0),
            sends: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Answers 200 with `{"method":"<METHOD>"}` so callers can tell whose
    /// request produced their response.
    pub fn echoing_method() -> Arc<Self> {
        Arc::new(Self {
            status: 200,
            body: "",
            echo_method: true,
            seen: Mutex::new(Vec::new()),
            release: Semaphore::new(0),
            sends: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }

    pub fn release(&self, sends: usize) {
        self.release.add_permits(sends);
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Yield until at least `n` sends have started.
    pub async fn wait_for_sends(&self, n: usize) {
        while self.sends() < n {
            tokio::task::yield_now().await;
        }
    }

    /// Wait for `sends` sends to start, give joiners a turn, then release
    /// `permits` of them. Meant to be joined with the requests themselves.
    pub async fn release_after(&self, sends: usize, permits: usize) {
        self.wait_for_sends(sends).await;
        tokio::task::yield_now().await;
        self.release(permits);
    }
}

struct CancelGuard {
    cancelled: Arc<AtomicUsize>,
    armed: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let body = if self.echo_method {
            format!(r#"{{"method":"{}"}}"#, request.method)
        } else {
            self.body.to_string()
        };
        self.seen.lock().push(request);
        self.sends.fetch_add(1, Ordering::SeqCst);
        let mut guard = CancelGuard {
            cancelled: Arc::clone(&self.cancelled),
            armed: true,
        };

        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
        guard.armed = false;

        Ok(HttpResponse::new(self.status, HeaderMap::new(), body))
    }
}

/// Session that hands out `old` until a refresh, then `new`.
#[allow(dead_code)]
pub struct RotatingAuth {
    current: Mutex<&'static str>,
    refreshes: AtomicUsize,
    refresh_fails: bool,
}

#[allow(dead_code)]
impl RotatingAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new("old"),
            refreshes: AtomicUsize::new(0),
            refresh_fails: false,
        })
    }

    pub fn failing_refresh() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new("old"),
            refreshes: AtomicUsize::new(0),
            refresh_fails: true,
        })
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for RotatingAuth {
    async fn valid_token(&self) -> Result<Token, AuthError> {
        Ok(Token::new(*self.current.lock()))
    }

    async fn handle_unauthorized(&self) -> Result<Token, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails {
            return Err(AuthError::RefreshFailed("refresh token revoked".into()));
        }
        *self.current.lock() = "new";
        Ok(Token::new("new"))
    }
}

/// Fast retry policy for tests: `attempts` total, 10ms initial delay.
#[allow(dead_code)]
pub fn quick_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::builder()
        .max_attempts(attempts)
        .initial_delay(Duration::from_millis(10))
        .build()
}

/// Client against a fake base URL with the given collaborators.
#[allow(dead_code)]
pub fn client_with(
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    retry: RetryPolicy,
) -> Client {
    Client::builder()
        .base_url("https://api.stride.test/v1")
        .client_version("9.9.9")
        .transport(transport)
        .auth(auth)
        .retry(retry)
        .build()
        .expect("Failed to build client")
}
