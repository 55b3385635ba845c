use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

use skp_fetch_core::{
    CacheMetrics, CancelReason, RequestDescriptor, RequestOptions, Result, Transport,
};

use super::{CancelHandle, FetchCache, Response};
use crate::shaper::Shaper;

/// A response delivered by a [`ShapedFetcher`]
#[derive(Debug)]
pub struct ShapedResponse<V> {
    /// The request that produced it
    pub descriptor: RequestDescriptor,
    /// Its outcome
    pub result: Result<Response<V>>,
}

/// A debounced/throttled call site bound to a [`FetchCache`].
///
/// Each time the shaper fires, the previous request of this call site is
/// cancelled and the new one is issued. Responses of requests that were not
/// superseded arrive through [`next`](ShapedFetcher::next). Dropping the
/// fetcher aborts its timers and cancels the request in progress.
pub struct ShapedFetcher<V> {
    shaper: Shaper<RequestDescriptor>,
    current: Arc<Mutex<Option<CancelHandle<V>>>>,
    responses: mpsc::UnboundedReceiver<ShapedResponse<V>>,
}

impl<V: Send + Sync + 'static> ShapedFetcher<V> {
    pub(crate) fn new<T, M>(cache: FetchCache<T, M>, options: RequestOptions) -> Self
    where
        T: Transport<Value = V>,
        M: CacheMetrics,
    {
        let (tx, responses) = mpsc::unbounded_channel();
        let current: Arc<Mutex<Option<CancelHandle<V>>>> = Arc::new(Mutex::new(None));

        let sink = {
            let current = current.clone();
            let options = options.clone();
            move |descriptor: RequestDescriptor| {
                // Issue first so a request for the same key joins the running call
                let request = cache.request(descriptor.clone(), options.clone());
                let handle = request.cancel_handle();
                if let Some(previous) = current.lock().replace(handle.clone()) {
                    previous.cancel();
                }
                trace!(target: "skp_fetch", key = %request.key(), "shaped request issued");

                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = request.response().await;
                    if handle.reason() == Some(CancelReason::Caller) {
                        return;
                    }
                    let _ = tx.send(ShapedResponse { descriptor, result });
                });
            }
        };

        Self {
            shaper: Shaper::from_options(&options, sink),
            current,
            responses,
        }
    }

    /// Feed a call into the shaper
    pub fn trigger(&self, descriptor: impl Into<RequestDescriptor>) {
        self.shaper.trigger(descriptor.into());
    }

    /// Wait for the next delivered response
    pub async fn next(&mut self) -> Option<ShapedResponse<V>> {
        self.responses.recv().await
    }

    /// Take a delivered response without waiting
    pub fn try_next(&mut self) -> Option<ShapedResponse<V>> {
        self.responses.try_recv().ok()
    }

    /// Abort pending timers and cancel the request in progress
    pub fn dispose(&self) {
        self.shaper.dispose();
        if let Some(handle) = self.current.lock().take() {
            handle.cancel();
        }
    }
}

impl<V> Drop for ShapedFetcher<V> {
    fn drop(&mut self) {
        self.shaper.dispose();
        if let Some(handle) = self.current.lock().take() {
            handle.cancel();
        }
    }
}
