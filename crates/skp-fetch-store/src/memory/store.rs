//! In-memory entry store using DashMap

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use skp_fetch_core::{
    CacheError, CacheKey, CancelReason, Decision, EntrySnapshot, EntryState, FetchStats,
};

use super::flight::{Flight, Outcome, WaiterId};

/// Configuration for the entry store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Initial capacity of the entry map
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1_024,
        }
    }
}

impl StoreConfig {
    /// Create config with specific initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            initial_capacity: capacity,
        }
    }
}

/// Internal statistics tracking
#[derive(Debug, Default)]
struct StoreStats {
    hits: u64,
    stale_hits: u64,
    misses: u64,
    transport_calls: u64,
    coalesced: u64,
    failures: u64,
    dropped_results: u64,
    cancellations: u64,
}

/// Per-key state. `Stale` is never stored here.
struct Slot<V> {
    data: Option<Arc<V>>,
    error: Option<CacheError>,
    fetched_at: Option<Instant>,
    state: EntryState,
    generation: u64,
    flight: Option<Arc<Flight<V>>>,
}

impl<V> Slot<V> {
    fn empty(generation: u64) -> Self {
        Self {
            data: None,
            error: None,
            fetched_at: None,
            state: EntryState::Empty,
            generation,
            flight: None,
        }
    }

    fn snapshot(&self, key: &CacheKey) -> EntrySnapshot<V> {
        EntrySnapshot {
            key: key.clone(),
            data: self.data.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
            state: self.state,
            generation: self.generation,
        }
    }

    fn owns(&self, flight: &Flight<V>) -> bool {
        self.state == EntryState::Pending && self.generation == flight.generation()
    }
}

/// Result of [`EntryStore::begin_fetch`]
#[derive(Debug)]
pub struct BeginFetch<V> {
    /// A transport call was already running; nothing new must be started
    pub already_pending: bool,
    /// The flight the caller is attached to
    pub flight: Arc<Flight<V>>,
    /// The caller's registration, if it asked to wait
    pub waiter: Option<WaiterId>,
}

impl<V> BeginFetch<V> {
    /// Token to hand to the transport
    pub fn cancel_token(&self) -> skp_fetch_core::CancellationToken {
        self.flight.token()
    }

    /// Generation captured for this fetch
    pub fn generation(&self) -> u64 {
        self.flight.generation()
    }
}

/// Result of [`EntryStore::cancel_waiter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOutcome {
    /// The waiter was removed before receiving anything
    pub removed: bool,
    /// The transport call was aborted because nobody is left waiting
    pub aborted: bool,
}

/// The single owner of all cache entries.
///
/// Every mutation runs under the DashMap shard lock of its key, then (if
/// needed) the flight's own lock; never the other way round. None of the
/// operations suspend.
/// Cloning creates a new handle to the SAME underlying store.
pub struct EntryStore<V> {
    /// Main data store
    entries: Arc<DashMap<CacheKey, Slot<V>>>,
    /// Store-wide generation source; values never repeat
    generations: Arc<AtomicU64>,
    /// Statistics
    stats: Arc<RwLock<StoreStats>>,
}

impl<V> Clone for EntryStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            generations: self.generations.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<V> Default for EntryStore<V> {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl<V> EntryStore<V> {
    /// Create a new entry store
    pub fn new(config: StoreConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::with_capacity(config.initial_capacity)),
            generations: Arc::new(AtomicU64::new(1)),
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    /// Snapshot of an entry as stored; never blocks.
    ///
    /// Absent keys report [`EntryState::Empty`]. Use [`get_with_ttl`] to see
    /// `Stale`.
    ///
    /// [`get_with_ttl`]: EntryStore::get_with_ttl
    pub fn get(&self, key: &CacheKey) -> EntrySnapshot<V> {
        match self.entries.get(key) {
            Some(slot) => slot.snapshot(key),
            None => EntrySnapshot::empty(key.clone()),
        }
    }

    /// Snapshot with `Fresh`/`Stale` derived for `ttl` at `now`
    pub fn get_with_ttl(&self, key: &CacheKey, now: Instant, ttl: Duration) -> EntrySnapshot<V> {
        self.get(key).with_ttl(now, ttl)
    }

    /// Attach to the in-flight call for `key`, or start a new one.
    ///
    /// If the entry is already pending, `waiter` is registered on the running
    /// flight and `already_pending` is set: the caller must not call the
    /// transport. Otherwise the entry moves to `Pending` under a new
    /// generation and the caller owns the transport call. A `None` waiter
    /// starts a detached flight (background refresh).
    pub fn begin_fetch(
        &self,
        key: &CacheKey,
        waiter: Option<oneshot::Sender<Outcome<V>>>,
    ) -> BeginFetch<V> {
        let mut slot = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Slot::empty(0));

        let running = match (slot.state, &slot.flight) {
            (EntryState::Pending, Some(flight)) => Some(flight.clone()),
            _ => None,
        };

        if let Some(flight) = running {
            // Register before releasing the slot so a concurrent cancel cannot
            // abort the flight underneath us
            let waiter = waiter.map(|tx| flight.register(tx));
            drop(slot);
            if waiter.is_some() {
                self.stats.write().coalesced += 1;
            }
            return BeginFetch {
                already_pending: true,
                flight,
                waiter,
            };
        }

        let flight = Flight::new(self.next_generation(), waiter.is_none());
        let waiter = waiter.map(|tx| flight.register(tx));
        slot.state = EntryState::Pending;
        slot.error = None;
        slot.generation = flight.generation();
        slot.flight = Some(flight.clone());
        drop(slot);

        self.stats.write().transport_calls += 1;
        BeginFetch {
            already_pending: false,
            flight,
            waiter,
        }
    }

    /// Store a successful result and notify the flight's waiters.
    ///
    /// If the entry was invalidated since the flight started, the value is
    /// not cached; the waiters still receive it. Returns whether the value
    /// populated the entry.
    pub fn resolve(&self, key: &CacheKey, flight: &Arc<Flight<V>>, value: V) -> bool {
        let value = Arc::new(value);
        let applied = match self.entries.get_mut(key) {
            Some(mut slot) if slot.owns(flight) => {
                slot.data = Some(value.clone());
                slot.error = None;
                slot.fetched_at = Some(Instant::now());
                slot.state = EntryState::Fresh;
                slot.flight = None;
                true
            }
            _ => false,
        };
        if !applied {
            self.stats.write().dropped_results += 1;
        }

        flight.complete(Ok(value));
        applied
    }

    /// Store a failure and notify the flight's waiters.
    ///
    /// Previously cached data is kept so `force-cache` callers can still use
    /// it. Returns whether the failure was recorded on the entry.
    pub fn reject(&self, key: &CacheKey, flight: &Arc<Flight<V>>, error: CacheError) -> bool {
        let applied = match self.entries.get_mut(key) {
            Some(mut slot) if slot.owns(flight) => {
                slot.error = Some(error.clone());
                slot.state = EntryState::Failed;
                slot.flight = None;
                true
            }
            _ => false,
        };
        {
            let mut stats = self.stats.write();
            stats.failures += 1;
            if !applied {
                stats.dropped_results += 1;
            }
        }

        flight.complete(Err(error));
        applied
    }

    /// Close a flight whose transport call was cancelled.
    ///
    /// Normally every waiter is already gone; any that raced in get a
    /// cancellation error. If the entry still points at this flight it is
    /// reset to `Empty`.
    pub fn abandon(&self, key: &CacheKey, flight: &Arc<Flight<V>>) {
        if let Some(mut slot) = self.entries.get_mut(key) {
            if slot.owns(flight) {
                *slot = Slot::empty(self.next_generation());
            }
        }
        flight.complete(Err(CacheError::Cancelled(CancelReason::Caller)));
    }

    /// Detach one waiter from a flight.
    ///
    /// When the last waiter of an attached, unfinished flight leaves, the
    /// transport is told to stop and, if the flight is still the entry's
    /// current one, the entry becomes `Empty` under a new generation.
    pub fn cancel_waiter(
        &self,
        key: &CacheKey,
        flight: &Arc<Flight<V>>,
        waiter: WaiterId,
    ) -> CancelOutcome {
        let slot = self.entries.get_mut(key);
        let removal = flight.remove(waiter);
        let abort = removal.removed
            && removal.remaining == 0
            && !removal.completed
            && !flight.is_detached();

        if abort {
            flight.token().cancel();
            if let Some(mut slot) = slot {
                if slot.owns(flight) {
                    *slot = Slot::empty(self.next_generation());
                }
            }
        } else {
            drop(slot);
        }

        if removal.removed {
            self.stats.write().cancellations += 1;
        }
        CancelOutcome {
            removed: removal.removed,
            aborted: abort,
        }
    }

    /// Force an entry back to `Empty`.
    ///
    /// An in-flight call keeps running and its waiters still get its
    /// outcome, but the outcome no longer populates the entry. Returns
    /// whether the entry existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Force every entry back to `Empty`. Returns how many were removed.
    pub fn invalidate_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Count a staleness decision
    pub fn record_decision(&self, decision: Decision) {
        let mut stats = self.stats.write();
        match decision {
            Decision::Serve => stats.hits += 1,
            Decision::ServeAndRefresh => stats.stale_hits += 1,
            Decision::Refetch => stats.misses += 1,
        }
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get store statistics
    pub fn stats(&self) -> FetchStats {
        let stats = self.stats.read();
        FetchStats {
            hits: stats.hits,
            stale_hits: stats.stale_hits,
            misses: stats.misses,
            transport_calls: stats.transport_calls,
            coalesced: stats.coalesced,
            failures: stats.failures,
            dropped_results: stats.dropped_results,
            cancellations: stats.cancellations,
            size: self.entries.len(),
        }
    }
}
