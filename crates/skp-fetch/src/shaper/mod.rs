//! Rate shaping for request call sites
//!
//! [`Debouncer`] waits for a quiet period before firing, [`Throttler`] fires at
//! most once per interval. [`Shaper`] chains them the way a call site asks for
//! through [`RequestOptions`]. All timers are owned by their shaper and are
//! aborted when it is disposed or dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use skp_fetch_core::RequestOptions;

mod debounce;
mod throttle;

pub use debounce::Debouncer;
pub use throttle::Throttler;

/// Callback invoked when a shaper fires
pub type Sink<A> = Arc<dyn Fn(A) + Send + Sync>;

/// A spawned timer task, aborted on drop
pub(crate) struct Timer {
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    pub(crate) fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(task)),
        }
    }

    /// Let the task run to completion; used by the task on itself.
    pub(crate) fn disarm(mut self) {
        self.handle.take();
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Debounce, then throttle, then deliver to the sink.
///
/// With neither configured, every trigger reaches the sink immediately.
pub struct Shaper<A> {
    debouncer: Option<Debouncer<A>>,
    throttler: Option<Arc<Throttler<A>>>,
    sink: Sink<A>,
}

impl<A: Send + 'static> Shaper<A> {
    /// Build a shaper from explicit delays
    pub fn new(
        debounce: Option<Duration>,
        throttle: Option<Duration>,
        sink: impl Fn(A) + Send + Sync + 'static,
    ) -> Self {
        let sink: Sink<A> = Arc::new(sink);

        let throttler = throttle.map(|interval| Arc::new(Throttler::with_sink(interval, sink.clone())));
        let downstream: Sink<A> = match &throttler {
            Some(throttler) => {
                let throttler = throttler.clone();
                Arc::new(move |args| throttler.trigger(args))
            }
            None => sink.clone(),
        };
        let debouncer = debounce.map(|delay| Debouncer::with_sink(delay, downstream));

        Self {
            debouncer,
            throttler,
            sink,
        }
    }

    /// Build a shaper from the debounce/throttle fields of request options
    pub fn from_options(
        options: &RequestOptions,
        sink: impl Fn(A) + Send + Sync + 'static,
    ) -> Self {
        Self::new(options.debounce, options.throttle, sink)
    }

    /// Check if this shaper delays or drops anything
    pub fn is_passthrough(&self) -> bool {
        self.debouncer.is_none() && self.throttler.is_none()
    }

    /// Feed one call
    pub fn trigger(&self, args: A) {
        if let Some(debouncer) = &self.debouncer {
            debouncer.trigger(args);
        } else if let Some(throttler) = &self.throttler {
            throttler.trigger(args);
        } else {
            (self.sink)(args);
        }
    }

}

impl<A> Shaper<A> {
    /// Abort pending timers; nothing reaches the sink afterwards.
    pub fn dispose(&self) {
        if let Some(debouncer) = &self.debouncer {
            debouncer.dispose();
        }
        if let Some(throttler) = &self.throttler {
            throttler.dispose();
        }
    }
}

impl<A> Drop for Shaper<A> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<A> std::fmt::Debug for Shaper<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shaper")
            .field("debounce", &self.debouncer.as_ref().map(|d| d.delay()))
            .field("throttle", &self.throttler.as_ref().map(|t| t.interval()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use skp_fetch_core::RequestOpts;
    use tokio::time::{sleep, Instant};

    fn recorder<A: Send + 'static>() -> (Arc<Mutex<Vec<(Instant, A)>>>, impl Fn(A) + Send + Sync + 'static) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let fired = fired.clone();
            move |args| fired.lock().push((Instant::now(), args))
        };
        (fired, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_passthrough_fires_inline() {
        let (fired, sink) = recorder();
        let shaper = Shaper::from_options(&RequestOptions::default(), sink);
        assert!(shaper.is_passthrough());

        shaper.trigger(1);
        shaper.trigger(2);
        let args: Vec<i32> = fired.lock().iter().map(|(_, a)| *a).collect();
        assert_eq!(args, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_then_throttle() {
        let (fired, sink) = recorder();
        let opts = RequestOpts::new().debounce_ms(50).throttle_ms(200).build();
        let shaper = Shaper::from_options(&opts, sink);
        let start = Instant::now();

        // Burst settles at 50ms and goes straight through the idle throttle
        shaper.trigger(1);
        shaper.trigger(2);
        sleep(Duration::from_millis(60)).await;

        // Second burst settles at 110ms, inside the throttle window
        shaper.trigger(3);
        sleep(Duration::from_millis(300)).await;

        let fired = fired.lock();
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].1, 2);
        assert_eq!(fired[0].0 - start, Duration::from_millis(50));
        assert_eq!(fired[1].1, 3);
        assert_eq!(fired[1].0 - start, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_timers() {
        let (fired, sink) = recorder();
        let opts = RequestOpts::new().debounce_ms(100).build();
        let shaper = Shaper::from_options(&opts, sink);

        shaper.trigger("late");
        drop(shaper);
        sleep(Duration::from_millis(500)).await;

        assert!(fired.lock().is_empty());
    }
}
