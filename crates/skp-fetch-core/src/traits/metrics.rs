//! Metrics trait for fetch cache observability

use std::time::Duration;

use crate::Decision;

/// Operation for latency tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    /// Synchronous lookup and decision
    Request,
    /// Transport round trip
    Transport,
    /// Explicit invalidation
    Invalidate,
}

impl CacheOperation {
    /// Get operation as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Request => "request",
            CacheOperation::Transport => "transport",
            CacheOperation::Invalidate => "invalidate",
        }
    }
}

/// Reason an entry or a result left the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// Explicitly invalidated
    Invalidated,
    /// Last waiter cancelled the in-flight call
    Cancelled,
    /// Result arrived for an invalidated generation and was dropped
    StaleGeneration,
}

impl EvictionReason {
    /// Get reason as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Invalidated => "invalidated",
            EvictionReason::Cancelled => "cancelled",
            EvictionReason::StaleGeneration => "stale_generation",
        }
    }
}

/// Trait for fetch cache metrics/observability
///
/// Implement this to integrate with your metrics system (Prometheus, StatsD, etc.)
pub trait CacheMetrics: Send + Sync + 'static {
    /// Record the staleness decision for a request
    fn record_decision(&self, key: &str, decision: Decision);

    /// Record a request that joined an in-flight call
    fn record_coalesced(&self, key: &str);

    /// Record a completed transport call
    fn record_transport(&self, key: &str, ok: bool, duration: Duration);

    /// Record operation latency
    fn record_latency(&self, operation: CacheOperation, duration: Duration);

    /// Record an eviction
    fn record_eviction(&self, reason: EvictionReason);

    /// Record cache size
    fn record_size(&self, size: usize);
}

/// No-op metrics implementation (default)
///
/// Zero overhead when metrics are not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    #[inline]
    fn record_decision(&self, _key: &str, _decision: Decision) {}

    #[inline]
    fn record_coalesced(&self, _key: &str) {}

    #[inline]
    fn record_transport(&self, _key: &str, _ok: bool, _duration: Duration) {}

    #[inline]
    fn record_latency(&self, _operation: CacheOperation, _duration: Duration) {}

    #[inline]
    fn record_eviction(&self, _reason: EvictionReason) {}

    #[inline]
    fn record_size(&self, _size: usize) {}
}

/// Metrics adapter using the `metrics` crate
///
/// Integrates with Prometheus, StatsD, and other exporters via the `metrics` ecosystem.
///
/// # Example
/// ```ignore
/// use skp_fetch_core::MetricsCrateAdapter;
///
/// // Set up a metrics recorder (e.g., prometheus_exporter)
/// // metrics::set_global_recorder(recorder);
///
/// let metrics = MetricsCrateAdapter::new("skp_fetch");
/// // Emits: skp_fetch_requests_total{decision=...}, skp_fetch_transport_total, etc.
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl CacheMetrics for MetricsCrateAdapter {
    fn record_decision(&self, _key: &str, decision: Decision) {
        metrics::counter!(self.metric_name("requests_total"), "decision" => decision.as_str())
            .increment(1);
    }

    fn record_coalesced(&self, _key: &str) {
        metrics::counter!(self.metric_name("coalesced_total")).increment(1);
    }

    fn record_transport(&self, _key: &str, ok: bool, duration: Duration) {
        let outcome = if ok { "ok" } else { "error" };
        metrics::counter!(self.metric_name("transport_total"), "outcome" => outcome).increment(1);
        metrics::histogram!(self.metric_name("transport_duration_seconds"), "outcome" => outcome)
            .record(duration.as_secs_f64());
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "operation" => operation.as_str()
        )
        .record(duration.as_secs_f64());
    }

    fn record_eviction(&self, reason: EvictionReason) {
        metrics::counter!(
            self.metric_name("evictions_total"),
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    fn record_size(&self, size: usize) {
        metrics::gauge!(self.metric_name("entries")).set(size as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_as_str() {
        assert_eq!(CacheOperation::Request.as_str(), "request");
        assert_eq!(CacheOperation::Transport.as_str(), "transport");
    }

    #[test]
    fn test_eviction_reason_as_str() {
        assert_eq!(EvictionReason::Invalidated.as_str(), "invalidated");
        assert_eq!(EvictionReason::StaleGeneration.as_str(), "stale_generation");
    }

    #[test]
    fn test_noop_metrics() {
        let metrics = NoopMetrics;
        // Just verify these don't panic
        metrics.record_decision("key", Decision::Serve);
        metrics.record_coalesced("key");
        metrics.record_transport("key", true, Duration::from_millis(3));
        metrics.record_latency(CacheOperation::Request, Duration::from_millis(1));
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_adapter_names() {
        let adapter = MetricsCrateAdapter::new("skp_fetch");
        assert_eq!(adapter.metric_name("entries"), "skp_fetch_entries");
        // No recorder installed: calls are no-ops
        adapter.record_decision("key", Decision::Refetch);
        adapter.record_size(3);
    }
}
