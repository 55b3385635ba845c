use crate::{CacheMetrics, CacheOperation, Decision, EvictionReason};
use std::time::Duration;
use tracing::{debug, trace};

/// Metrics adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    /// Service name/prefix (optional)
    service_name: Option<String>,
}

impl TracingMetrics {
    /// Create new tracing metrics adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl CacheMetrics for TracingMetrics {
    fn record_decision(&self, key: &str, decision: Decision) {
        debug!(
            target: "skp_fetch",
            event = "decision",
            key = %key,
            decision = decision.as_str(),
            service = ?self.service_name,
            "Fetch Decision"
        );
    }

    fn record_coalesced(&self, key: &str) {
        debug!(
            target: "skp_fetch",
            event = "coalesced",
            key = %key,
            service = ?self.service_name,
            "Joined In-Flight Request"
        );
    }

    fn record_transport(&self, key: &str, ok: bool, duration: Duration) {
        debug!(
            target: "skp_fetch",
            event = "transport",
            key = %key,
            ok = ok,
            duration_ms = duration.as_millis(),
            service = ?self.service_name,
            "Transport Call Completed"
        );
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        trace!(
            target: "skp_fetch",
            event = "latency",
            operation = operation.as_str(),
            duration_us = duration.as_micros(),
            service = ?self.service_name,
            "Fetch Operation Latency"
        );
    }

    fn record_eviction(&self, reason: EvictionReason) {
        debug!(
            target: "skp_fetch",
            event = "eviction",
            reason = reason.as_str(),
            service = ?self.service_name,
            "Fetch Cache Eviction"
        );
    }

    fn record_size(&self, size: usize) {
        trace!(
            target: "skp_fetch",
            event = "size",
            size = size,
            service = ?self.service_name,
            "Fetch Cache Size Update"
        );
    }
}
