//! Transport collaborator trait

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

use crate::{RequestDescriptor, TransportError};

/// The component that actually performs requests.
///
/// The cache calls `fetch` at most once per key at a time and shares the
/// outcome with every waiter. Retries, authentication and the network stack
/// are the implementation's business. `cancel` fires when the last interested
/// caller goes away; implementations should stop work promptly when it does.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Payload type produced by a successful call
    type Value: Send + Sync + 'static;

    /// Perform the request
    async fn fetch(
        &self,
        descriptor: &RequestDescriptor,
        cancel: CancellationToken,
    ) -> Result<Self::Value, TransportError>;
}

/// [`Transport`] backed by an async closure
pub struct FnTransport<F, V> {
    f: F,
    _value: PhantomData<fn() -> V>,
}

/// Wrap a closure as a [`Transport`]
///
/// # Example
/// ```
/// use skp_fetch_core::{transport_fn, RequestDescriptor, TransportError};
///
/// let transport = transport_fn(|req: RequestDescriptor, _cancel| async move {
///     Ok::<_, TransportError>(format!("body of {}", req.url))
/// });
/// # let _ = transport;
/// ```
pub fn transport_fn<F, Fut, V>(f: F) -> FnTransport<F, V>
where
    F: Fn(RequestDescriptor, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, TransportError>> + Send + 'static,
    V: Send + Sync + 'static,
{
    FnTransport {
        f,
        _value: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, V> Transport for FnTransport<F, V>
where
    F: Fn(RequestDescriptor, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, TransportError>> + Send + 'static,
    V: Send + Sync + 'static,
{
    type Value = V;

    async fn fetch(
        &self,
        descriptor: &RequestDescriptor,
        cancel: CancellationToken,
    ) -> Result<V, TransportError> {
        (self.f)(descriptor.clone(), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_transport() {
        let transport = transport_fn(|req: RequestDescriptor, _cancel| async move {
            if req.url == "/missing" {
                Err(TransportError::new("not found").with_status(404))
            } else {
                Ok(req.url.len())
            }
        });

        let ok = transport
            .fetch(&RequestDescriptor::get("/abc"), CancellationToken::new())
            .await;
        assert_eq!(ok, Ok(4));

        let err = transport
            .fetch(&RequestDescriptor::get("/missing"), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_sees_cancellation() {
        let transport = transport_fn(|_req: RequestDescriptor, cancel: CancellationToken| async move {
            cancel.cancelled().await;
            Err::<(), _>(TransportError::new("aborted"))
        });

        let token = CancellationToken::new();
        token.cancel();
        let res = transport.fetch(&RequestDescriptor::get("/slow"), token).await;
        assert_eq!(res.unwrap_err().message(), "aborted");
    }
}
