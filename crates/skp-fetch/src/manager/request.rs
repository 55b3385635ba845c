//! Caller-side request handles and the cancellation bridge

use parking_lot::Mutex;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

use skp_fetch_core::{
    CacheError, CacheKey, CancelReason, Decision, EntrySnapshot, EntryState, Result,
};
use skp_fetch_store::{EntryStore, Flight, Outcome, WaiterId};

/// Data delivered to a caller
#[derive(Debug, Clone)]
pub struct Response<V> {
    /// Key the data is cached under
    pub key: CacheKey,
    /// The payload, shared with every other caller that received it
    pub data: Arc<V>,
    /// How the request was answered
    pub decision: Decision,
}

impl<V> Response<V> {
    /// Check if the data came from the cache without waiting
    pub fn is_cached(&self) -> bool {
        self.decision.serves_cached()
    }
}

struct Registration<V> {
    store: EntryStore<V>,
    key: CacheKey,
    flight: Arc<Flight<V>>,
    waiter: WaiterId,
}

struct CancelState<V> {
    reason: Option<CancelReason>,
    registration: Option<Registration<V>>,
}

/// Cancels one caller's interest in a request.
///
/// Cloneable and usable from any task. Cancelling detaches only this caller;
/// the shared transport call is aborted only when nobody else waits on it.
pub struct CancelHandle<V> {
    inner: Arc<Mutex<CancelState<V>>>,
}

impl<V> Clone for CancelHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> CancelHandle<V> {
    fn new(registration: Option<Registration<V>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CancelState {
                reason: None,
                registration,
            })),
        }
    }

    /// Cancel the request. Idempotent.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::Caller);
    }

    /// Check if the request was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().reason.is_some()
    }

    /// Why the request was cancelled, if it was
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.lock().reason
    }

    /// Returns `false` if the request was already cancelled.
    pub(crate) fn cancel_with(&self, reason: CancelReason) -> bool {
        let registration = {
            let mut state = self.inner.lock();
            if state.reason.is_some() {
                return false;
            }
            state.reason = Some(reason);
            state.registration.take()
        };

        if let Some(reg) = registration {
            let outcome = reg.store.cancel_waiter(&reg.key, &reg.flight, reg.waiter);
            debug!(
                target: "skp_fetch",
                key = %reg.key,
                reason = reason.as_str(),
                aborted = outcome.aborted,
                "request cancelled"
            );
        }
        true
    }

    /// The outcome arrived; later cancels only affect this caller's view.
    fn settle(&self) {
        self.inner.lock().registration = None;
    }
}

/// One caller's request.
///
/// Created synchronously by [`FetchCache::request`]: cached data is available
/// right away through [`data`](Request::data), otherwise
/// [`response`](Request::response) waits for the shared transport call.
/// Dropping an unfinished request cancels it.
///
/// [`FetchCache::request`]: crate::FetchCache::request
pub struct Request<V> {
    snapshot: EntrySnapshot<V>,
    decision: Decision,
    pending: Option<oneshot::Receiver<Outcome<V>>>,
    timeout: Option<Duration>,
    cancel: CancelHandle<V>,
}

impl<V> Request<V> {
    pub(crate) fn served(snapshot: EntrySnapshot<V>, decision: Decision) -> Self {
        Self {
            snapshot,
            decision,
            pending: None,
            timeout: None,
            cancel: CancelHandle::new(None),
        }
    }

    pub(crate) fn waiting(
        snapshot: EntrySnapshot<V>,
        receiver: oneshot::Receiver<Outcome<V>>,
        store: EntryStore<V>,
        flight: Arc<Flight<V>>,
        waiter: Option<WaiterId>,
        timeout: Option<Duration>,
    ) -> Self {
        let registration = waiter.map(|waiter| Registration {
            store,
            key: snapshot.key.clone(),
            flight,
            waiter,
        });
        Self {
            snapshot,
            decision: Decision::Refetch,
            pending: Some(receiver),
            timeout,
            cancel: CancelHandle::new(registration),
        }
    }

    /// Key of the request
    pub fn key(&self) -> &CacheKey {
        &self.snapshot.key
    }

    /// How the staleness policy answered this request
    pub fn decision(&self) -> Decision {
        self.decision
    }

    /// Entry as it was when the request was made
    pub fn snapshot(&self) -> &EntrySnapshot<V> {
        &self.snapshot
    }

    /// Entry state when the request was made
    pub fn state(&self) -> EntryState {
        self.snapshot.state
    }

    /// Cached data returned immediately, if the policy served any
    pub fn data(&self) -> Option<Arc<V>> {
        if self.decision.serves_cached() && !self.cancel.is_cancelled() {
            self.snapshot.data.clone()
        } else {
            None
        }
    }

    /// Last failure recorded on the entry when the request was made
    pub fn error(&self) -> Option<&CacheError> {
        self.snapshot.error.as_ref()
    }

    /// Check if the request needs no waiting
    pub fn is_ready(&self) -> bool {
        self.pending.is_none()
    }

    /// Cancel this caller's interest
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle that can cancel this request from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle<V> {
        self.cancel.clone()
    }

    /// Wait for the data.
    ///
    /// Returns immediately for served requests. A cancelled request (or one
    /// whose timeout elapsed) always yields [`CacheError::Cancelled`], even if
    /// the data raced in.
    pub async fn response(mut self) -> Result<Response<V>> {
        let received = match self.pending.as_mut() {
            None => None,
            Some(rx) => Some(match self.timeout {
                Some(limit) => tokio::time::timeout(limit, rx).await.ok(),
                None => Some(rx.await),
            }),
        };

        let outcome = match received {
            None => {
                if let Some(reason) = self.cancel.reason() {
                    return Err(CacheError::Cancelled(reason));
                }
                return match self.snapshot.data.clone() {
                    Some(data) => Ok(self.respond(data)),
                    None => Err(CacheError::Internal("served request without data".to_string())),
                };
            }
            Some(None) => {
                self.pending = None;
                self.cancel.cancel_with(CancelReason::Timeout);
                let reason = self.cancel.reason().unwrap_or(CancelReason::Timeout);
                return Err(CacheError::Cancelled(reason));
            }
            Some(Some(outcome)) => {
                self.pending = None;
                outcome
            }
        };

        self.cancel.settle();
        if let Some(reason) = self.cancel.reason() {
            return Err(CacheError::Cancelled(reason));
        }

        match outcome {
            Ok(Ok(data)) => Ok(self.respond(data)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CacheError::Internal(
                "in-flight request ended without an outcome".to_string(),
            )),
        }
    }

    fn respond(&self, data: Arc<V>) -> Response<V> {
        Response {
            key: self.snapshot.key.clone(),
            data,
            decision: self.decision,
        }
    }
}

impl<V> Drop for Request<V> {
    fn drop(&mut self) {
        if self.pending.is_some() {
            self.cancel.cancel_with(CancelReason::Caller);
        }
    }
}

impl<V> IntoFuture for Request<V>
where
    V: Send + Sync + 'static,
{
    type Output = Result<Response<V>>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.response())
    }
}

impl<V> std::fmt::Debug for Request<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("key", &self.snapshot.key)
            .field("decision", &self.decision)
            .field("state", &self.snapshot.state)
            .field("pending", &self.pending.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
