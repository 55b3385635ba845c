use skp_fetch::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // 1. Transport that counts the calls it actually performs
    let call_count = Arc::new(AtomicUsize::new(0));
    let transport = {
        let call_count = call_count.clone();
        transport_fn(move |req: RequestDescriptor, _cancel| {
            let call_count = call_count.clone();
            async move {
                // Simulate a slow endpoint (100ms)
                sleep(Duration::from_millis(100)).await;
                let count = call_count.fetch_add(1, Ordering::SeqCst) + 1;
                println!("Calling {}... (count: {})", req.url, count);
                Ok::<_, TransportError>(format!("profile from {}", req.url))
            }
        })
    };
    let cache = FetchCache::new(transport);

    let mut handles = Vec::new();
    let url = "/api/profile";

    println!("Spawning 10 concurrent requests for '{}'...", url);

    // 2. Launch concurrent requests
    for _ in 0..10 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let response = cache.fetch(url, RequestOptions::default()).await?;
            assert_eq!(*response.data, "profile from /api/profile");
            Ok::<_, CacheError>(response.data)
        }));
    }

    // 3. Wait for all to complete
    let mut values = Vec::new();
    for h in handles {
        values.push(h.await??);
    }

    // 4. Verify coalescing
    let total_calls = call_count.load(Ordering::SeqCst);
    println!("Total transport calls performed: {}", total_calls);
    println!("Stats: {:?}", cache.stats());

    let shared = values.iter().all(|v| Arc::ptr_eq(v, &values[0]));
    if total_calls != 1 || !shared {
        return Err(format!("Coalescing failed! Expected 1 shared call, got {}", total_calls).into());
    }
    println!("SUCCESS: Request coalescing worked correctly.");

    Ok(())
}
