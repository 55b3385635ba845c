//! High-level fetch cache

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use skp_fetch_core::{
    decide, duration_ms, CacheKey, CacheMetrics, CacheOperation, Decision, EntrySnapshot,
    EvictionReason, FetchStats, KeyCodec, NoopMetrics, RequestDescriptor, RequestOptions, Result,
    Transport,
};
use skp_fetch_store::{EntryStore, StoreConfig};

mod coalescer;
use coalescer::Coalescer;

mod request;
pub use request::{CancelHandle, Request, Response};

mod shaped;
pub use shaped::{ShapedFetcher, ShapedResponse};

/// Configuration for FetchCache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchCacheConfig {
    /// TTL for requests without an explicit one. `None` never goes stale.
    #[serde(rename = "defaultTtlMs", with = "duration_ms")]
    pub default_ttl: Option<Duration>,
    /// Namespace prefix for all keys
    pub namespace: Option<String>,
    /// Headers that contribute to the key; empty means all of them
    pub vary_headers: Vec<String>,
    /// Initial capacity of the entry store
    pub initial_capacity: usize,
}

impl Default for FetchCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Some(Duration::from_secs(300)),
            namespace: None,
            vary_headers: Vec::new(),
            initial_capacity: StoreConfig::default().initial_capacity,
        }
    }
}

impl FetchCacheConfig {
    /// Create config with specific default TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            default_ttl: Some(ttl),
            ..Default::default()
        }
    }

    /// Create config with namespace
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Only let the named headers contribute to keys
    pub fn vary_by<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vary_headers.extend(headers.into_iter().map(Into::into));
        self
    }

    /// Build the key codec described by this config
    pub fn key_codec(&self) -> KeyCodec {
        let mut codec = KeyCodec::new();
        if let Some(ns) = &self.namespace {
            codec = codec.with_namespace(ns.clone());
        }
        if !self.vary_headers.is_empty() {
            codec = codec.vary_by(&self.vary_headers);
        }
        codec
    }
}

/// De-duplicating, staleness-aware request cache.
///
/// Cheap to clone; clones share the same entries. Generic over:
/// - `T`: the transport that performs the actual calls
/// - `M`: the metrics collector
pub struct FetchCache<T, M = NoopMetrics>
where
    T: Transport,
    M: CacheMetrics,
{
    store: EntryStore<T::Value>,
    coalescer: Coalescer<T, M>,
    codec: Arc<KeyCodec>,
    metrics: Arc<M>,
    config: Arc<FetchCacheConfig>,
}

// Constructors for default metrics
impl<T: Transport> FetchCache<T, NoopMetrics> {
    /// Create a new FetchCache with default config and no metrics
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FetchCacheConfig::default())
    }

    /// Create with custom config
    pub fn with_config(transport: T, config: FetchCacheConfig) -> Self {
        Self::with_metrics(transport, NoopMetrics, config)
    }
}

impl<T, M> FetchCache<T, M>
where
    T: Transport,
    M: CacheMetrics,
{
    /// Create a FetchCache with a custom metrics collector
    pub fn with_metrics(transport: T, metrics: M, config: FetchCacheConfig) -> Self {
        let store = EntryStore::new(StoreConfig::with_capacity(config.initial_capacity));
        let metrics = Arc::new(metrics);
        let coalescer = Coalescer::new(store.clone(), Arc::new(transport), metrics.clone());
        Self {
            store,
            coalescer,
            codec: Arc::new(config.key_codec()),
            metrics,
            config: Arc::new(config),
        }
    }

    /// Get the config
    pub fn config(&self) -> &FetchCacheConfig {
        &self.config
    }

    /// Compute the key a request is cached under
    pub fn key(&self, descriptor: &RequestDescriptor) -> CacheKey {
        self.codec.compute(descriptor)
    }

    /// Current entry for a request, with `Fresh`/`Stale` derived from the
    /// default TTL. Never blocks and never calls the transport.
    pub fn snapshot(&self, descriptor: &RequestDescriptor) -> EntrySnapshot<T::Value> {
        let key = self.key(descriptor);
        self.store
            .get_with_ttl(&key, tokio::time::Instant::now(), self.ttl_for(None))
    }

    fn ttl_for(&self, requested: Option<Duration>) -> Duration {
        requested
            .or(self.config.default_ttl)
            .unwrap_or(Duration::MAX)
    }

    /// Issue a request.
    ///
    /// Runs synchronously: the decision is made and any transport call is
    /// started before this returns. Cached data is available through
    /// [`Request::data`]; await the request for the final response.
    pub fn request(
        &self,
        descriptor: impl Into<RequestDescriptor>,
        options: impl Into<RequestOptions>,
    ) -> Request<T::Value> {
        let start = Instant::now();
        let descriptor = descriptor.into();
        let options = options.into();
        let key = self.key(&descriptor);
        let ttl = self.ttl_for(options.ttl);

        let snapshot = self
            .store
            .get_with_ttl(&key, tokio::time::Instant::now(), ttl);
        let decision = decide(&snapshot, tokio::time::Instant::now(), ttl, &options);

        self.store.record_decision(decision);
        let label = key.to_string();
        self.metrics.record_decision(&label, decision);
        trace!(
            target: "skp_fetch",
            key = %label,
            state = snapshot.state.as_str(),
            mode = options.cache.as_str(),
            decision = decision.as_str(),
            "request"
        );

        let request = match decision {
            Decision::Serve => Request::served(snapshot, decision),
            Decision::ServeAndRefresh => {
                self.coalescer.fetch(&key, &descriptor, None);
                Request::served(snapshot, decision)
            }
            Decision::Refetch => {
                let (tx, rx) = oneshot::channel();
                let begin = self.coalescer.fetch(&key, &descriptor, Some(tx));
                Request::waiting(
                    snapshot,
                    rx,
                    self.store.clone(),
                    begin.flight,
                    begin.waiter,
                    options.timeout,
                )
            }
        };

        self.metrics
            .record_latency(CacheOperation::Request, start.elapsed());
        request
    }

    /// Issue a request and wait for its response
    pub async fn fetch(
        &self,
        descriptor: impl Into<RequestDescriptor>,
        options: impl Into<RequestOptions>,
    ) -> Result<Response<T::Value>> {
        self.request(descriptor, options).response().await
    }

    /// Refresh an entry in the background, keeping its current data visible.
    ///
    /// Returns `false` if a call for the key was already running.
    pub fn revalidate(&self, descriptor: impl Into<RequestDescriptor>) -> bool {
        let descriptor = descriptor.into();
        let key = self.key(&descriptor);
        let begin = self.coalescer.fetch(&key, &descriptor, None);
        debug!(
            target: "skp_fetch",
            key = %key,
            started = !begin.already_pending,
            "revalidate"
        );
        !begin.already_pending
    }

    /// Invalidate the entry for a request.
    ///
    /// A call still running for it keeps serving its current waiters, but its
    /// result is discarded.
    pub fn invalidate(&self, descriptor: &RequestDescriptor) -> bool {
        let key = self.key(descriptor);
        self.invalidate_key(&key)
    }

    /// Invalidate an entry by key
    pub fn invalidate_key(&self, key: &CacheKey) -> bool {
        let start = Instant::now();
        let removed = self.store.invalidate(key);
        if removed {
            self.metrics.record_eviction(EvictionReason::Invalidated);
            self.metrics.record_size(self.store.len());
        }
        debug!(target: "skp_fetch", key = %key, removed, "invalidate");
        self.metrics
            .record_latency(CacheOperation::Invalidate, start.elapsed());
        removed
    }

    /// Invalidate every entry.
    ///
    /// Returns the number of entries removed
    pub fn invalidate_all(&self) -> usize {
        let start = Instant::now();
        let count = self.store.invalidate_all();
        for _ in 0..count {
            self.metrics.record_eviction(EvictionReason::Invalidated);
        }
        self.metrics.record_size(0);
        debug!(target: "skp_fetch", count, "invalidate all");
        self.metrics
            .record_latency(CacheOperation::Invalidate, start.elapsed());
        count
    }

    /// Bind a debounced/throttled call site to this cache
    pub fn shaped(&self, options: impl Into<RequestOptions>) -> ShapedFetcher<T::Value> {
        ShapedFetcher::new(self.clone(), options.into())
    }

    /// Get cache statistics
    pub fn stats(&self) -> FetchStats {
        self.store.stats()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<T, M> Clone for FetchCache<T, M>
where
    T: Transport,
    M: CacheMetrics,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            coalescer: self.coalescer.clone(),
            codec: self.codec.clone(),
            metrics: self.metrics.clone(),
            config: self.config.clone(),
        }
    }
}
