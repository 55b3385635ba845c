use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use skp_fetch_core::{
    CacheError, CacheKey, CacheMetrics, CacheOperation, EvictionReason, RequestDescriptor,
    Transport,
};
use skp_fetch_store::{BeginFetch, EntryStore, Flight, Outcome};

/// Ensures at most one transport call per key is outstanding.
///
/// The transport runs on its own task, so no single caller's future owns
/// it: a caller that goes away only detaches itself from the flight.
pub(crate) struct Coalescer<T: Transport, M> {
    store: EntryStore<T::Value>,
    transport: Arc<T>,
    metrics: Arc<M>,
}

impl<T: Transport, M> Clone for Coalescer<T, M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            transport: self.transport.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T, M> Coalescer<T, M>
where
    T: Transport,
    M: CacheMetrics,
{
    pub(crate) fn new(store: EntryStore<T::Value>, transport: Arc<T>, metrics: Arc<M>) -> Self {
        Self {
            store,
            transport,
            metrics,
        }
    }

    /// Join the running flight for `key`, or start one.
    ///
    /// A `None` waiter asks for a background refresh: nothing to wait on, and
    /// nothing happens if a flight is already running.
    pub(crate) fn fetch(
        &self,
        key: &CacheKey,
        descriptor: &RequestDescriptor,
        waiter: Option<oneshot::Sender<Outcome<T::Value>>>,
    ) -> BeginFetch<T::Value> {
        let begin = self.store.begin_fetch(key, waiter);

        if !begin.already_pending {
            debug!(
                target: "skp_fetch",
                key = %key,
                generation = begin.generation(),
                detached = begin.flight.is_detached(),
                "starting transport call"
            );
            self.spawn_transport(key.clone(), descriptor.clone(), begin.flight.clone());
        } else if begin.waiter.is_some() {
            self.metrics.record_coalesced(&key.to_string());
        }

        begin
    }

    fn spawn_transport(&self, key: CacheKey, descriptor: RequestDescriptor, flight: Arc<Flight<T::Value>>) {
        let transport = self.transport.clone();
        let metrics = self.metrics.clone();
        let guard = FlightGuard {
            store: self.store.clone(),
            key,
            flight,
        };

        tokio::spawn(async move {
            let token = guard.flight.token();

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                res = transport.fetch(&descriptor, token.clone()) => Some(res),
            };

            let elapsed = guard.flight.started_at().elapsed();
            metrics.record_latency(CacheOperation::Transport, elapsed);

            let label = guard.key.to_string();
            match result {
                Some(Ok(value)) => {
                    metrics.record_transport(&label, true, elapsed);
                    if !guard.resolve(value) {
                        metrics.record_eviction(EvictionReason::StaleGeneration);
                        debug!(target: "skp_fetch", key = %label, "dropping result of invalidated generation");
                    }
                }
                Some(Err(err)) => {
                    metrics.record_transport(&label, false, elapsed);
                    debug!(target: "skp_fetch", key = %label, error = %err, "transport call failed");
                    if !guard.reject(CacheError::Transport(err)) {
                        metrics.record_eviction(EvictionReason::StaleGeneration);
                    }
                }
                None => {
                    metrics.record_eviction(EvictionReason::Cancelled);
                    debug!(target: "skp_fetch", key = %label, "transport call cancelled");
                    guard.abandon();
                }
            }
        });
    }
}

/// Completes a flight exactly once, even if the transport task panics or is
/// torn down with the runtime.
struct FlightGuard<V> {
    store: EntryStore<V>,
    key: CacheKey,
    flight: Arc<Flight<V>>,
}

impl<V> FlightGuard<V> {
    fn resolve(&self, value: V) -> bool {
        self.store.resolve(&self.key, &self.flight, value)
    }

    fn reject(&self, error: CacheError) -> bool {
        self.store.reject(&self.key, &self.flight, error)
    }

    fn abandon(&self) {
        self.store.abandon(&self.key, &self.flight);
    }
}

impl<V> Drop for FlightGuard<V> {
    fn drop(&mut self) {
        if !self.flight.is_completed() {
            self.store.reject(
                &self.key,
                &self.flight,
                CacheError::Internal("transport task ended without an outcome".to_string()),
            );
        }
    }
}
