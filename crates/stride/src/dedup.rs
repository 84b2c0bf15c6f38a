//! In-flight collapsing of identical GET requests
//!
//! The registry maps a [`DedupKey`] to the one unit of work currently running
//! for it. Callers that arrive while it runs await the same
//! [`Shared`] future and all receive its result, success or failure.
//!
//! The registry only keeps a weak handle. Dropping every waiter therefore
//! drops the underlying call, and the entry is removed by a guard that lives
//! inside the unit of work: it runs when the call resolves and when it is
//! cancelled, so nothing outlives the request.

use crate::descriptor::DedupKey;
use crate::error::Error;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stride_transport::HttpResponse;
use tracing::debug;

/// Result fanned out to every collapsed caller.
pub(crate) type CallResult = Result<HttpResponse, Error>;

/// Handle to an in-flight call. Await it to receive the shared result.
pub(crate) type InFlightCall = Shared<BoxFuture<'static, CallResult>>;

type Registry = Arc<Mutex<HashMap<DedupKey, Entry>>>;

struct Entry {
    id: u64,
    call: WeakShared<BoxFuture<'static, CallResult>>,
}

/// Collapses concurrent identical reads into one call.
pub(crate) struct RequestDeduplicator {
    in_flight: Registry,
    next_id: AtomicU64,
}

impl RequestDeduplicator {
    pub(crate) fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the live call for `key`, or start one with `make`.
    ///
    /// Registration happens synchronously, so two calls issued back to back
    /// collapse even if neither has been polled yet. `make` is only invoked
    /// when a new call is registered.
    pub(crate) fn execute<F>(&self, key: DedupKey, make: F) -> InFlightCall
    where
        F: FnOnce() -> BoxFuture<'static, CallResult>,
    {
        let mut in_flight = self.in_flight.lock();

        if let Some(call) = in_flight.get(&key).and_then(|entry| entry.call.upgrade()) {
            debug!(key = %key, "Joining in-flight request");
            return call;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = RegistryGuard {
            registry: Arc::clone(&self.in_flight),
            key: key.clone(),
            id,
        };
        let work = make();
        let call = async move {
            let _guard = guard;
            work.await
        }
        .boxed()
        .shared();

        // `downgrade` only fails for a completed future; this one was never polled.
        if let Some(weak) = call.downgrade() {
            debug!(key = %key, id, "Registered in-flight request");
            in_flight.insert(key, Entry { id, call: weak });
        }

        call
    }

    /// Number of live registry entries.
    #[cfg(test)]
    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}

/// Removes its registry entry when the unit of work finishes or is dropped.
struct RegistryGuard {
    registry: Registry,
    key: DedupKey,
    id: u64,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let mut in_flight = self.registry.lock();
        // A newer call may already own the key if this one was abandoned.
        if in_flight.get(&self.key).is_some_and(|entry| entry.id == self.id) {
            in_flight.remove(&self.key);
            debug!(key = %self.key, id = self.id, "Cleared in-flight request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RequestDescriptor;
    use http::HeaderMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::Notify;

    fn key(path: &str) -> DedupKey {
        RequestDescriptor::get(path).dedup_key().unwrap()
    }

    fn ok(body: &'static str) -> CallResult {
        Ok(HttpResponse::new(200, HeaderMap::new(), body))
    }

    /// Unit of work that counts its runs and waits for `gate` before finishing.
    fn gated(
        calls: &Arc<AtomicUsize>,
        gate: &Arc<Notify>,
        result: CallResult,
    ) -> impl FnOnce() -> BoxFuture<'static, CallResult> {
        let calls = Arc::clone(calls);
        let gate = Arc::clone(gate);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                result
            }
            .boxed()
        }
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_identical_calls_collapse() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let a = dedup.execute(key("/v1/athlete"), gated(&calls, &gate, ok("athlete")));
        let b = dedup.execute(key("/v1/athlete"), gated(&calls, &gate, ok("other")));
        let c = dedup.execute(key("/v1/athlete"), gated(&calls, &gate, ok("other")));
        assert_eq!(dedup.in_flight_len(), 1);

        gate.notify_one();
        let (a, b, c) = tokio::join!(a, b, c);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in [a, b, c] {
            assert_eq!(result.unwrap().body.as_ref(), b"athlete");
        }
        assert_eq!(dedup.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_interfere() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (gate_a, gate_b) = (Arc::new(Notify::new()), Arc::new(Notify::new()));

        let a = dedup.execute(key("/v1/athlete"), gated(&calls, &gate_a, ok("a")));
        let b = dedup.execute(key("/v1/workouts"), gated(&calls, &gate_b, ok("b")));
        assert_eq!(dedup.in_flight_len(), 2);

        gate_a.notify_one();
        gate_b.notify_one();
        let (a, b) = tokio::join!(a, b);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.unwrap().body.as_ref(), b"a");
        assert_eq!(b.unwrap().body.as_ref(), b"b");
        assert_eq!(dedup.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_fanned_out_and_cleared() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let failing = Err(Error::ServerError(503));
        let a = dedup.execute(key("/v1/athlete"), gated(&calls, &gate, failing.clone()));
        let b = dedup.execute(key("/v1/athlete"), gated(&calls, &gate, failing));

        gate.notify_one();
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.unwrap_err(), Error::ServerError(503));
        assert_eq!(b.unwrap_err(), Error::ServerError(503));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_completed_calls_are_not_cached() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        gate.notify_one();
        dedup
            .execute(key("/v1/athlete"), gated(&calls, &gate, ok("first")))
            .await
            .unwrap();

        gate.notify_one();
        let second = dedup
            .execute(key("/v1/athlete"), gated(&calls, &gate, ok("second")))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.body.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_dropping_one_waiter_keeps_the_call_alive() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut a = dedup.execute(key("/v1/athlete"), gated(&calls, &gate, ok("athlete")));
        let b = dedup.execute(key("/v1/athlete"), gated(&calls, &gate, ok("other")));

        assert!((&mut a).now_or_never().is_none());
        drop(a);
        assert_eq!(dedup.in_flight_len(), 1);

        gate.notify_one();
        assert_eq!(b.await.unwrap().body.as_ref(), b"athlete");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_dropping_every_waiter_cancels_the_call() {
        let dedup = RequestDeduplicator::new();
        let dropped = Arc::new(AtomicBool::new(false));

        let flag = DropFlag(Arc::clone(&dropped));
        let mut a = dedup.execute(key("/v1/athlete"), move || {
            async move {
                let _flag = flag;
                std::future::pending::<CallResult>().await
            }
            .boxed()
        });
        let mut b = dedup.execute(key("/v1/athlete"), || -> BoxFuture<'static, CallResult> {
            unreachable!("joined calls never start new work")
        });
        assert!((&mut a).now_or_never().is_none());
        assert!((&mut b).now_or_never().is_none());
        assert!(!dropped.load(Ordering::SeqCst));

        drop(a);
        drop(b);

        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(dedup.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_entry_is_replaced() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        drop(dedup.execute(key("/v1/athlete"), gated(&calls, &gate, ok("stale"))));
        assert_eq!(dedup.in_flight_len(), 0);

        gate.notify_one();
        let fresh = dedup
            .execute(key("/v1/athlete"), gated(&calls, &gate, ok("fresh")))
            .await
            .unwrap();
        assert_eq!(fresh.body.as_ref(), b"fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
