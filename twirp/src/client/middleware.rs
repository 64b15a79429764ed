use http::{HeaderMap, HeaderName, HeaderValue};

use crate::{Arena, Encoding, MiddlewareChain, RequestContext};

/// An outbound request as seen by client middleware: everything about the call, and the
/// headers that will be sent with it.
pub struct OutboundCall<'a> {
    arena: Option<&'a Arena>,
    context: &'a RequestContext,
    encoding: Encoding,
    service: &'a str,
    method: &'a str,
    body: &'a [u8],
    headers: &'a mut HeaderMap,
}

impl<'a> OutboundCall<'a> {
    pub(crate) fn new(
        arena: Option<&'a Arena>,
        context: &'a RequestContext,
        encoding: Encoding,
        service: &'a str,
        method: &'a str,
        body: &'a [u8],
        headers: &'a mut HeaderMap,
    ) -> Self {
        Self {
            arena,
            context,
            encoding,
            service,
            method,
            body,
            headers,
        }
    }

    /// The caller's arena, where the response will be decoded. `None` when there is none.
    pub fn arena(&self) -> Option<&'a Arena> {
        self.arena
    }

    /// The caller's context for this call.
    pub fn context(&self) -> &'a RequestContext {
        self.context
    }

    /// The encoding the request body is in.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Fully qualified service name.
    pub fn service(&self) -> &'a str {
        self.service
    }

    /// The method being called.
    pub fn method(&self) -> &'a str {
        self.method
    }

    /// The serialized request.
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// `Content-Type` is set after middleware runs, so it can't be changed here.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut *self.headers
    }
}

/// A client interceptor, run before every request is sent.
pub trait ClientMiddleware: Send + Sync + 'static {
    /// Failing with a status stops the call before anything is sent.
    fn handle(&self, call: &mut OutboundCall<'_>) -> crate::Result<()>;
}

/// The client's ordered middleware.
pub type ClientMiddlewares = MiddlewareChain<dyn ClientMiddleware>;

/// Adds a fixed header to every request.
#[derive(Debug, Clone)]
pub struct SetHeaderMiddleware {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeaderMiddleware {
    /// Always set `name: value`.
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    /// Fails with `InvalidArgument` when `name` or `value` is not a legal header.
    pub fn try_new(name: &str, value: &str) -> crate::Result<Self> {
        let name = HeaderName::try_from(name)
            .map_err(|e| crate::Status::invalid_argument(format!("bad header name: {e}")))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| crate::Status::invalid_argument(format!("bad header value: {e}")))?;
        Ok(Self::new(name, value))
    }
}

impl ClientMiddleware for SetHeaderMiddleware {
    fn handle(&self, call: &mut OutboundCall<'_>) -> crate::Result<()> {
        call.headers_mut().append(self.name.clone(), self.value.clone());
        Ok(())
    }
}
