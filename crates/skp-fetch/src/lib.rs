//! skp-fetch: Request de-duplicating, stale-while-revalidate fetch cache
//!
//! # Features
//!
//! - **Request de-duplication**: concurrent requests for the same key share
//!   one transport call
//! - **Stale-while-revalidate**: expired data is served while a background
//!   refresh runs
//! - **Cache modes** (`default`, `no-store`, `force-cache`) and per-call TTLs
//! - **Debounce / throttle** for noisy call sites
//! - **Cancellation** that only aborts a call once nobody waits for it
//! - **Metrics integration**
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use skp_fetch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let transport = transport_fn(|req: RequestDescriptor, _cancel| async move {
//!         Ok::<_, TransportError>(format!("body of {}", req.url))
//!     });
//!     let cache = FetchCache::new(transport);
//!
//!     let request = cache.request("/api/users/42", RequestOpts::new().ttl_secs(60));
//!     if let Some(data) = request.data() {
//!         println!("cached: {data}");
//!     }
//!     let response = request.await?;
//!     println!("Got: {}", response.data);
//!
//!     Ok(())
//! }
//! ```

mod manager;
pub mod shaper;

// Re-export core
pub use skp_fetch_core::*;

// Re-export storage
pub use skp_fetch_store::{CancelOutcome, EntryStore, StoreConfig};

// Export manager
pub use manager::{
    CancelHandle, FetchCache, FetchCacheConfig, Request, Response, ShapedFetcher, ShapedResponse,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        transport_fn, CacheError, CacheKey, CacheMode, CancelHandle, CancelReason, CancellationToken,
        Decision, EntryState, FetchCache, FetchCacheConfig, Request, RequestDescriptor, RequestOptions,
        RequestOpts, Response, Result, Transport, TransportError,
    };

    #[cfg(feature = "tracing")]
    pub use crate::TracingMetrics;

    #[cfg(feature = "metrics")]
    pub use crate::MetricsCrateAdapter;
}
