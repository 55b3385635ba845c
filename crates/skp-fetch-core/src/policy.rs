//! Staleness policy

use std::time::Duration;

use tokio::time::Instant;

use crate::{CacheMode, Decision, EntrySnapshot, EntryState, RequestOptions};

/// Decide how to answer a request given what the store holds.
///
/// Pure: depends only on the snapshot, the clock reading and the options.
/// Rules, first match wins:
///
/// 1. `no-store` always refetches.
/// 2. `force-cache` serves any data that exists.
/// 3. A failed entry refetches, so one transient failure never sticks.
/// 4. Data younger than `ttl` is served.
/// 5. Older data is served while a background refresh runs, unless the call
///    site disabled stale-while-revalidate.
/// 6. Everything else refetches.
pub fn decide<V>(
    entry: &EntrySnapshot<V>,
    now: Instant,
    ttl: Duration,
    options: &RequestOptions,
) -> Decision {
    if options.cache == CacheMode::NoStore {
        return Decision::Refetch;
    }

    let has_data = entry.data.is_some();

    if options.cache == CacheMode::ForceCache && has_data {
        return Decision::Serve;
    }

    if entry.state == EntryState::Failed || !has_data {
        return Decision::Refetch;
    }

    if entry.is_fresh(now, ttl) {
        Decision::Serve
    } else if options.stale_while_revalidate {
        Decision::ServeAndRefresh
    } else {
        Decision::Refetch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheError, KeyCodec, RequestDescriptor, RequestOpts, TransportError};
    use std::sync::Arc;

    const TTL: Duration = Duration::from_millis(1000);

    fn snapshot(state: EntryState, data: bool, age_ms: u64, now: Instant) -> EntrySnapshot<&'static str> {
        EntrySnapshot {
            key: KeyCodec::new().compute(&RequestDescriptor::get("/policy")),
            data: data.then(|| Arc::new("v1")),
            error: (state == EntryState::Failed)
                .then(|| CacheError::from(TransportError::new("down"))),
            fetched_at: data.then(|| now - Duration::from_millis(age_ms)),
            state,
            generation: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_refetches() {
        let now = Instant::now() + Duration::from_secs(10);
        let entry = snapshot(EntryState::Empty, false, 0, now);
        assert_eq!(decide(&entry, now, TTL, &RequestOptions::default()), Decision::Refetch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let now = Instant::now() + Duration::from_secs(10);
        let opts = RequestOptions::default();

        let young = snapshot(EntryState::Fresh, true, 999, now);
        assert_eq!(decide(&young, now, TTL, &opts), Decision::Serve);

        let expired = snapshot(EntryState::Fresh, true, 1000, now);
        assert_eq!(decide(&expired, now, TTL, &opts), Decision::ServeAndRefresh);

        let blocking = RequestOpts::new().no_stale().build();
        assert_eq!(decide(&expired, now, TTL, &blocking), Decision::Refetch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_store_always_refetches() {
        let now = Instant::now() + Duration::from_secs(10);
        let young = snapshot(EntryState::Fresh, true, 1, now);
        let opts = RequestOpts::new().no_store().build();
        assert_eq!(decide(&young, now, TTL, &opts), Decision::Refetch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_cache_ignores_age() {
        let now = Instant::now() + Duration::from_secs(10);
        let opts = RequestOpts::new().force_cache().build();

        let ancient = snapshot(EntryState::Fresh, true, 9_000, now);
        assert_eq!(decide(&ancient, now, TTL, &opts), Decision::Serve);

        let empty = snapshot(EntryState::Empty, false, 0, now);
        assert_eq!(decide(&empty, now, TTL, &opts), Decision::Refetch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_retries() {
        let now = Instant::now() + Duration::from_secs(10);
        let failed = snapshot(EntryState::Failed, true, 1, now);
        assert_eq!(decide(&failed, now, TTL, &RequestOptions::default()), Decision::Refetch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_with_fresh_data_serves() {
        let now = Instant::now() + Duration::from_secs(10);
        let refreshing = snapshot(EntryState::Pending, true, 10, now);
        assert_eq!(decide(&refreshing, now, TTL, &RequestOptions::default()), Decision::Serve);

        let first_load = snapshot(EntryState::Pending, false, 0, now);
        assert_eq!(decide(&first_load, now, TTL, &RequestOptions::default()), Decision::Refetch);
    }
}
