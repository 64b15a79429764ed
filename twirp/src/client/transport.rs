use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::{server::TwirpServer, TransportError};

/// Delivers one HTTP request and yields its response.
///
/// Any response, including an error status, is a successful delivery. Only failing to get
/// a response at all is a `TransportError`.
pub trait Transport: Send + Sync + 'static {
    /// Post `request`. Never fails for a response that arrived.
    fn post(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, TransportError>>;
}

impl<T> Transport for Arc<T>
where
    T: Transport,
{
    fn post(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, TransportError>> {
        self.as_ref().post(request)
    }
}

/// Hands requests straight to an in-process [`TwirpServer`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    server: Arc<TwirpServer>,
}

impl LoopbackTransport {
    /// Serve requests with `server`.
    pub fn new(server: Arc<TwirpServer>) -> Self {
        Self { server }
    }
}

impl Transport for LoopbackTransport {
    fn post(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, TransportError>> {
        log::trace!("loopback {}", request.uri());
        let response = self.server.handle(request);
        Box::pin(futures::future::ready(Ok(response)))
    }
}
