//! Debounced search box
//!
//! Keystrokes arrive every 40ms; only the query typed last is fetched once
//! the user pauses, and older in-flight searches are cancelled.

use skp_fetch::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let transport = transport_fn(|req: RequestDescriptor, cancel: CancellationToken| async move {
        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::new("aborted")),
            _ = tokio::time::sleep(Duration::from_millis(150)) => {
                Ok(format!("results for {}", req.url))
            }
        }
    });
    let cache = FetchCache::new(transport);
    let mut search = cache.shaped(RequestOpts::new().debounce_ms(100));

    for query in ["r", "ru", "rus", "rust"] {
        println!("typed: {query}");
        search.trigger(format!("/search?q={query}"));
        tokio::time::sleep(Duration::from_millis(40)).await;
    }

    if let Some(delivered) = search.next().await {
        let response = delivered.result?;
        println!("{} -> {}", delivered.descriptor.url, response.data);
    }

    println!("Stats: {:?}", cache.stats());
    Ok(())
}
