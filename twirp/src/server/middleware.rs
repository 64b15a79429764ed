use bytes::Bytes;

use crate::{Arena, Encoding, MiddlewareChain, RequestContext};

/// An inbound request as seen by server middleware.
///
/// Middleware runs after routing and content type negotiation, before the body is decoded.
/// It may populate the request context and add response headers.
pub struct InboundCall<'a> {
    arena: Option<&'a Arena>,
    context: &'a mut RequestContext,
    encoding: Encoding,
    request: &'a http::Request<Bytes>,
    response: &'a mut http::Response<Bytes>,
}

impl<'a> InboundCall<'a> {
    pub(crate) fn new(
        arena: Option<&'a Arena>,
        context: &'a mut RequestContext,
        encoding: Encoding,
        request: &'a http::Request<Bytes>,
        response: &'a mut http::Response<Bytes>,
    ) -> Self {
        Self {
            arena,
            context,
            encoding,
            request,
            response,
        }
    }

    /// The request's arena, when the server is configured with one.
    pub fn arena(&self) -> Option<&'a Arena> {
        self.arena
    }

    /// The request context, as the service method will see it.
    pub fn context(&self) -> &RequestContext {
        &*self.context
    }

    /// Mutable access to the request context, for populating it.
    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut *self.context
    }

    /// The negotiated body encoding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The request as received. The body is not decoded yet.
    pub fn request(&self) -> &http::Request<Bytes> {
        self.request
    }

    /// The response being built. Its status and body are replaced once the method runs, but
    /// headers set here are sent either way.
    pub fn response_mut(&mut self) -> &mut http::Response<Bytes> {
        &mut *self.response
    }
}

/// A server interceptor, run for every routed request.
pub trait ServerMiddleware: Send + Sync + 'static {
    /// Failing with a status stops the request. The status is sent as the response.
    fn handle(&self, call: &mut InboundCall<'_>) -> crate::Result<()>;
}

/// The server's ordered middleware.
pub type ServerMiddlewares = MiddlewareChain<dyn ServerMiddleware>;
