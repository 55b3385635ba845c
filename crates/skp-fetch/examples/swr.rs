//! Stale-While-Revalidate (SWR) Example
//!
//! Demonstrates serving stale data immediately while refreshing
//! in the background, providing optimal latency for users.

use skp_fetch::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let version = Arc::new(AtomicUsize::new(0));
    let transport = {
        let version = version.clone();
        transport_fn(move |_req: RequestDescriptor, _cancel| {
            let version = version.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                let v = version.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, TransportError>(format!("Dashboard v{v}"))
            }
        })
    };
    let cache = FetchCache::with_config(transport, FetchCacheConfig::with_ttl(Duration::from_secs(1)));

    println!("=== Stale-While-Revalidate Demo ===\n");

    // First request: nothing cached, wait for the transport
    let response = cache.fetch("/dashboard", RequestOptions::default()).await?;
    println!("✓ Fetched '{}' with TTL=1s", response.data);

    // Immediately: should be fresh
    let request = cache.request("/dashboard", RequestOptions::default());
    println!("T+0s: {} ({}) - {:?}", request.decision(), request.state(), request.data());

    // Wait for TTL to expire
    tokio::time::sleep(Duration::from_millis(1100)).await;

    // Expired: served right away, refreshed in the background
    let request = cache.request("/dashboard", RequestOptions::default());
    println!("T+1.1s: {} ({}) - {:?}", request.decision(), request.state(), request.data());

    // Stale data without a refresh means waiting for the transport
    let response = cache
        .fetch("/dashboard", RequestOpts::new().ttl_ms(1).no_stale())
        .await?;
    println!("T+1.1s (no stale): waited for {}", response.data);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let request = cache.request("/dashboard", RequestOptions::default());
    println!("T+1.4s: {} ({}) - {:?}", request.decision(), request.state(), request.data());

    println!("\nStats: {:?}", cache.stats());
    Ok(())
}
