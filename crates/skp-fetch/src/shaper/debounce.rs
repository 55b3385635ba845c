use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use super::{Sink, Timer};

struct DebounceState {
    timer: Option<Timer>,
    seq: u64,
    disposed: bool,
}

/// Fires once a burst of triggers has been quiet for `delay`.
///
/// Every trigger restarts the wait and replaces the arguments, so the sink
/// receives only the latest ones.
pub struct Debouncer<A> {
    delay: Duration,
    sink: Sink<A>,
    state: Arc<Mutex<DebounceState>>,
}

impl<A: Send + 'static> Debouncer<A> {
    /// Create a debouncer calling `sink` after `delay` of quiet
    pub fn new(delay: Duration, sink: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self::with_sink(delay, Arc::new(sink))
    }

    pub(crate) fn with_sink(delay: Duration, sink: Sink<A>) -> Self {
        Self {
            delay,
            sink,
            state: Arc::new(Mutex::new(DebounceState {
                timer: None,
                seq: 0,
                disposed: false,
            })),
        }
    }

    /// Restart the wait with new arguments
    pub fn trigger(&self, args: A) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.seq += 1;
        let seq = state.seq;
        let deadline = Instant::now() + self.delay;
        let shared = Arc::downgrade(&self.state);
        let sink = self.sink.clone();

        // Replacing the timer aborts the previous one
        state.timer = Some(Timer::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fire(shared, seq, sink, args);
        }));
    }
}

fn fire<A>(shared: Weak<Mutex<DebounceState>>, seq: u64, sink: Sink<A>, args: A) {
    let Some(state) = shared.upgrade() else {
        return;
    };
    {
        let mut state = state.lock();
        if state.disposed || state.seq != seq {
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.disarm();
        }
    }
    trace!(target: "skp_fetch", seq, "debounce fired");
    sink(args);
}

impl<A> Debouncer<A> {
    /// Quiet period before firing
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Check if a call is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.state.lock().timer.is_some()
    }

    /// Abort the pending call; later triggers are ignored.
    pub fn dispose(&self) {
        let timer = {
            let mut state = self.state.lock();
            state.disposed = true;
            state.timer.take()
        };
        drop(timer);
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_trailing_edge_with_latest_args() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let debouncer = {
            let fired = fired.clone();
            Debouncer::new(Duration::from_millis(100), move |args: &'static str| {
                fired.lock().push((Instant::now(), args));
            })
        };
        let start = Instant::now();

        debouncer.trigger("a");
        sleep(Duration::from_millis(50)).await;
        debouncer.trigger("b");
        sleep(Duration::from_millis(40)).await;
        debouncer.trigger("c");
        sleep(Duration::from_millis(50)).await;
        debouncer.trigger("d");
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(300)).await;

        let fired = fired.lock();
        assert_eq!(fired.len(), 1);
        let (at, args) = fired[0];
        assert_eq!(args, "d");
        assert!(at - start >= Duration::from_millis(240));
        assert!(at - start < Duration::from_millis(245));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let count = Arc::new(Mutex::new(0));
        let debouncer = {
            let count = count.clone();
            Debouncer::new(Duration::from_millis(20), move |_: ()| *count.lock() += 1)
        };

        debouncer.trigger(());
        sleep(Duration::from_millis(30)).await;
        debouncer.trigger(());
        sleep(Duration::from_millis(30)).await;

        assert_eq!(*count.lock(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_and_ignores_triggers() {
        let count = Arc::new(Mutex::new(0));
        let debouncer = {
            let count = count.clone();
            Debouncer::new(Duration::from_millis(100), move |_: u8| *count.lock() += 1)
        };

        debouncer.trigger(1);
        debouncer.dispose();
        debouncer.trigger(2);
        sleep(Duration::from_millis(500)).await;

        assert_eq!(*count.lock(), 0);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let count = Arc::new(Mutex::new(0));
        {
            let count = count.clone();
            let debouncer =
                Debouncer::new(Duration::from_millis(100), move |_: u8| *count.lock() += 1);
            debouncer.trigger(1);
        }
        sleep(Duration::from_millis(500)).await;
        assert_eq!(*count.lock(), 0);
    }
}
