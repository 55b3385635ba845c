use skp_fetch::prelude::*;
use skp_fetch::TracingMetrics; // Explicit import
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing subscriber
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE) // Enable TRACE to see decision logs
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    println!("🔍 Initialized tracing...");

    // 2. Create FetchCache with TracingMetrics
    let metrics = TracingMetrics::new().with_service_name("example-service");
    let transport = transport_fn(|req: RequestDescriptor, _cancel| async move {
        if req.url.ends_with("/99") {
            return Err(TransportError::new("user not found").with_status(404));
        }
        Ok(format!("user at {}", req.url))
    });

    let cache = FetchCache::with_metrics(transport, metrics, FetchCacheConfig::default());

    println!("\n⚡ Fetching (miss)...");
    let response = cache.fetch("/users/1", RequestOptions::default()).await?;
    println!("   Got: {:?}", response.data);

    println!("\n⚡ Fetching again (hit)...");
    let request = cache.request("/users/1", RequestOptions::default());
    println!("   Got: {:?} ({})", request.data(), request.decision());

    println!("\n⚡ Fetching a failing resource...");
    match cache.fetch("/users/99", RequestOptions::default()).await {
        Ok(response) => println!("   Got: {:?}", response.data),
        Err(err) => println!("   Error: {err}"),
    }

    println!("\n⚡ Invalidating...");
    cache.invalidate(&"/users/1".into());

    println!("\n✅ Check your console output for structured logs!");

    Ok(())
}
