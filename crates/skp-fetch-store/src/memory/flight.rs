//! In-flight transport call and its waiters

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;

use skp_fetch_core::{CacheError, CancellationToken};

/// Shared result of one transport call
pub type Outcome<V> = Result<Arc<V>, CacheError>;

/// Identifies one waiter on a [`Flight`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(u64);

/// Result of removing a waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// The waiter was still registered
    pub removed: bool,
    /// Waiters left after the removal
    pub remaining: usize,
    /// The flight already delivered its outcome
    pub completed: bool,
}

struct FlightInner<V> {
    waiters: Vec<(WaiterId, oneshot::Sender<Outcome<V>>)>,
    next_waiter: u64,
    completed: bool,
}

/// One outstanding transport call for a key.
///
/// Waiters are kept in registration order and all receive the same
/// [`Outcome`]. A detached flight was started by a background refresh; losing
/// its waiters never aborts it.
pub struct Flight<V> {
    generation: u64,
    token: CancellationToken,
    detached: bool,
    started_at: Instant,
    inner: Mutex<FlightInner<V>>,
}

impl<V> Flight<V> {
    pub(crate) fn new(generation: u64, detached: bool) -> Arc<Self> {
        Arc::new(Self {
            generation,
            token: CancellationToken::new(),
            detached,
            started_at: Instant::now(),
            inner: Mutex::new(FlightInner {
                waiters: Vec::new(),
                next_waiter: 0,
                completed: false,
            }),
        })
    }

    /// Generation of the entry this flight was started for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token handed to the transport
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Check if the flight was started without a caller attached
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// When the flight started
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Number of callers currently waiting
    pub fn waiter_count(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Check if the outcome was already delivered
    pub fn is_completed(&self) -> bool {
        self.inner.lock().completed
    }

    pub(crate) fn register(&self, sender: oneshot::Sender<Outcome<V>>) -> WaiterId {
        let mut inner = self.inner.lock();
        let id = WaiterId(inner.next_waiter);
        inner.next_waiter += 1;
        // A completed flight drops the sender, which the receiver observes
        if !inner.completed {
            inner.waiters.push((id, sender));
        }
        id
    }

    pub(crate) fn remove(&self, id: WaiterId) -> Removal {
        let mut inner = self.inner.lock();
        let before = inner.waiters.len();
        inner.waiters.retain(|(waiter, _)| *waiter != id);
        Removal {
            removed: inner.waiters.len() < before,
            remaining: inner.waiters.len(),
            completed: inner.completed,
        }
    }

    /// Deliver the outcome to every waiter, in registration order.
    ///
    /// Returns how many waiters were still listening.
    pub(crate) fn complete(&self, outcome: Outcome<V>) -> usize {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.completed = true;
            std::mem::take(&mut inner.waiters)
        };

        let mut delivered = 0;
        for (_, sender) in waiters {
            if sender.send(outcome.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

impl<V> std::fmt::Debug for Flight<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Flight")
            .field("generation", &self.generation)
            .field("detached", &self.detached)
            .field("waiters", &inner.waiters.len())
            .field("completed", &inner.completed)
            .finish()
    }
}
