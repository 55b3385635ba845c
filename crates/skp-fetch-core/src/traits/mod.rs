//! Core traits for fetch cache operations

mod metrics;
mod transport;

#[cfg(feature = "tracing")]
mod tracing;

pub use metrics::{CacheMetrics, CacheOperation, EvictionReason, NoopMetrics};
pub use transport::{transport_fn, FnTransport, Transport};

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;

#[cfg(feature = "tracing")]
pub use self::tracing::TracingMetrics;
