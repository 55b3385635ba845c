use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use super::{Sink, Timer};

struct ThrottleState<A> {
    last_fired: Option<Instant>,
    trailing: Option<Timer>,
    pending: Option<A>,
    disposed: bool,
}

/// Fires at most once per `interval`.
///
/// A trigger in a quiet window fires right away. Triggers inside the window
/// collapse into one trailing call at the end of it, with the latest arguments.
pub struct Throttler<A> {
    interval: Duration,
    sink: Sink<A>,
    state: Arc<Mutex<ThrottleState<A>>>,
}

impl<A: Send + 'static> Throttler<A> {
    /// Create a throttler calling `sink` at most once per `interval`
    pub fn new(interval: Duration, sink: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self::with_sink(interval, Arc::new(sink))
    }

    pub(crate) fn with_sink(interval: Duration, sink: Sink<A>) -> Self {
        Self {
            interval,
            sink,
            state: Arc::new(Mutex::new(ThrottleState {
                last_fired: None,
                trailing: None,
                pending: None,
                disposed: false,
            })),
        }
    }

    /// Feed one call
    pub fn trigger(&self, args: A) {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }

        let window_open = state.trailing.is_none()
            && state
                .last_fired
                .is_none_or(|last| now.duration_since(last) >= self.interval);
        if window_open {
            state.last_fired = Some(now);
            drop(state);
            trace!(target: "skp_fetch", "throttle fired (leading)");
            (self.sink)(args);
            return;
        }

        state.pending = Some(args);
        if state.trailing.is_none() {
            let deadline = state.last_fired.map_or(now, |last| last + self.interval);
            let shared = Arc::downgrade(&self.state);
            let sink = self.sink.clone();
            state.trailing = Some(Timer::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                fire_trailing(shared, sink);
            }));
        }
    }
}

fn fire_trailing<A>(shared: Weak<Mutex<ThrottleState<A>>>, sink: Sink<A>) {
    let Some(state) = shared.upgrade() else {
        return;
    };
    let args = {
        let mut state = state.lock();
        if state.disposed {
            return;
        }
        if let Some(timer) = state.trailing.take() {
            timer.disarm();
        }
        let args = state.pending.take();
        if args.is_some() {
            state.last_fired = Some(Instant::now());
        }
        args
    };
    if let Some(args) = args {
        trace!(target: "skp_fetch", "throttle fired (trailing)");
        sink(args);
    }
}

impl<A> Throttler<A> {
    /// Minimum spacing between calls
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if a trailing call is scheduled
    pub fn is_pending(&self) -> bool {
        self.state.lock().trailing.is_some()
    }

    /// Abort the trailing call; later triggers are ignored.
    pub fn dispose(&self) {
        let (timer, pending) = {
            let mut state = self.state.lock();
            state.disposed = true;
            (state.trailing.take(), state.pending.take())
        };
        drop(timer);
        drop(pending);
    }
}

impl<A> Drop for Throttler<A> {
    fn drop(&mut self) {
        self.dispose();
    }
}
