//! Cache entry snapshot type

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::{CacheError, CacheKey};

/// Lifecycle state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Nothing cached, nothing in flight
    Empty,
    /// A transport call is in flight
    Pending,
    /// Data is within its freshness window
    Fresh,
    /// Data has outlived its freshness window
    Stale,
    /// The last transport call failed
    Failed,
}

impl EntryState {
    /// Get state as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Empty => "empty",
            EntryState::Pending => "pending",
            EntryState::Fresh => "fresh",
            EntryState::Stale => "stale",
            EntryState::Failed => "failed",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of a cache entry.
///
/// `Stale` is never stored; it is derived from `fetched_at` and the TTL the
/// snapshot was taken with.
#[derive(Debug, Clone)]
pub struct EntrySnapshot<V> {
    /// Key of the entry
    pub key: CacheKey,
    /// Last successful payload
    pub data: Option<Arc<V>>,
    /// Last failure, cleared on success
    pub error: Option<CacheError>,
    /// When data was last populated
    pub fetched_at: Option<Instant>,
    /// State at snapshot time
    pub state: EntryState,
    /// Generation the entry was at
    pub generation: u64,
}

impl<V> EntrySnapshot<V> {
    /// Snapshot of an entry that does not exist
    pub fn empty(key: CacheKey) -> Self {
        Self {
            key,
            data: None,
            error: None,
            fetched_at: None,
            state: EntryState::Empty,
            generation: 0,
        }
    }

    /// Age of the data at `now`
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.fetched_at.map(|at| now.saturating_duration_since(at))
    }

    /// Check if data exists and is younger than `ttl`
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.data.is_some() && self.age(now).is_some_and(|age| age < ttl)
    }

    /// Re-derive `Fresh`/`Stale` for a given TTL
    pub fn with_ttl(mut self, now: Instant, ttl: Duration) -> Self {
        if matches!(self.state, EntryState::Fresh | EntryState::Stale) {
            self.state = if self.is_fresh(now, ttl) {
                EntryState::Fresh
            } else {
                EntryState::Stale
            };
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyCodec, RequestDescriptor};

    fn key() -> CacheKey {
        KeyCodec::new().compute(&RequestDescriptor::get("/entry"))
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = EntrySnapshot::<String>::empty(key());
        assert_eq!(snap.state, EntryState::Empty);
        assert!(snap.data.is_none());
        assert!(!snap.is_fresh(Instant::now(), Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_is_derived_from_age() {
        let fetched = Instant::now();
        let snap = EntrySnapshot {
            key: key(),
            data: Some(Arc::new("v1".to_string())),
            error: None,
            fetched_at: Some(fetched),
            state: EntryState::Fresh,
            generation: 1,
        };
        let ttl = Duration::from_millis(1000);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(snap.clone().with_ttl(Instant::now(), ttl).state, EntryState::Fresh);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(snap.with_ttl(Instant::now(), ttl).state, EntryState::Stale);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(EntryState::Pending.as_str(), "pending");
        assert_eq!(EntryState::Stale.to_string(), "stale");
    }
}
