use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method};

use crate::{envelope::decode_error, Arena, Encoding, RequestContext, Status, TransportError};

use super::{ClientMiddleware, ClientMiddlewares, Configuration, OutboundCall, Transport};

/// One unary call, already serialized.
#[derive(Debug)]
pub struct RpcCall<'a> {
    /// Where the caller wants the response allocated.
    pub arena: Option<&'a Arena>,
    /// The caller's context, visible to client middleware.
    pub context: &'a RequestContext,
    /// Encoding of `body`, and of the expected response.
    pub encoding: Encoding,
    /// Fully qualified service name.
    pub service: &'a str,
    /// Method name within the service.
    pub method: &'a str,
    /// The serialized input.
    pub body: Bytes,
}

/// What generated clients send their calls through.
///
/// On success the result is the serialized response, in the call's encoding.
pub trait Requester: Send + Sync + 'static {
    /// Send `call` and yield the serialized response, or the status the call failed with.
    fn make_request<'a>(&'a self, call: RpcCall<'a>) -> BoxFuture<'a, crate::Result<Bytes>>;
}

/// A [`Requester`] that speaks Twirp over HTTP through a [`Transport`].
pub struct HttpRequester<T> {
    base_url: String,
    configuration: Configuration,
    transport: T,
    middleware: ClientMiddlewares,
}

impl<T> HttpRequester<T>
where
    T: Transport,
{
    /// `base_url` is scheme and authority, like `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>, transport: T) -> Self {
        Self::with_configuration(base_url, Configuration::default(), transport)
    }

    /// Like [`HttpRequester::new`], with a non-default [`Configuration`].
    pub fn with_configuration(
        base_url: impl Into<String>,
        configuration: Configuration,
        transport: T,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            configuration,
            transport,
            middleware: ClientMiddlewares::new(),
        }
    }

    /// Middleware runs in the order it was added.
    pub fn add_middleware(&mut self, middleware: impl ClientMiddleware) {
        self.middleware.push(Arc::new(middleware));
    }

    /// The full url of `service`'s `method`.
    pub fn url(&self, service: &str, method: &str) -> String {
        format!(
            "{}{}/{service}/{method}",
            self.base_url,
            self.configuration.get_path_prefix()
        )
    }

    fn build_request(&self, call: &RpcCall<'_>) -> crate::Result<http::Request<Bytes>> {
        let mut headers = HeaderMap::new();
        let mut outbound = OutboundCall::new(
            call.arena,
            call.context,
            call.encoding,
            call.service,
            call.method,
            &call.body,
            &mut headers,
        );
        self.middleware.execute(|unit| unit.handle(&mut outbound))?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(call.encoding.content_type()),
        );

        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri(self.url(call.service, call.method))
            .body(call.body.clone())
            .map_err(TransportError::from)?;
        *request.headers_mut() = headers;
        Ok(request)
    }
}

impl<T> Requester for HttpRequester<T>
where
    T: Transport,
{
    fn make_request<'a>(&'a self, call: RpcCall<'a>) -> BoxFuture<'a, crate::Result<Bytes>> {
        Box::pin(async move {
            let request = self.build_request(&call)?;
            log::debug!("posting {} {} bytes", request.uri(), call.body.len());

            let response = self.transport.post(request).await.map_err(|e| {
                log::warn!("{}/{} transport failure: {e:?}", call.service, call.method);
                Status::from(e)
            })?;
            if response.status().is_success() {
                Ok(response.into_body())
            } else {
                let status = decode_error(&response);
                log::debug!("{}/{} failed: {status}", call.service, call.method);
                Err(status)
            }
        })
    }
}

impl<T> std::fmt::Debug for HttpRequester<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequester")
            .field("base_url", &self.base_url)
            .field("configuration", &self.configuration)
            .field("middleware", &self.middleware)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use futures::future::BoxFuture;
    use http::{header::CONTENT_TYPE, StatusCode};

    use super::{HttpRequester, Requester, RpcCall};
    use crate::{
        client::{ClientMiddleware, Configuration, OutboundCall, SetHeaderMiddleware, Transport},
        Code, Encoding, RequestContext, Status, TransportError,
    };

    /// Answers every request with a fixed response and remembers what it was sent.
    struct Canned {
        status: StatusCode,
        content_type: &'static str,
        body: &'static str,
        seen: std::sync::Arc<k_lock::Mutex<Vec<http::Request<Bytes>>>>,
    }

    impl Canned {
        fn new(status: StatusCode, content_type: &'static str, body: &'static str) -> Self {
            Self {
                status,
                content_type,
                body,
                seen: std::sync::Arc::new(k_lock::Mutex::new(Vec::new())),
            }
        }
    }

    impl Transport for Canned {
        fn post(
            &self,
            request: http::Request<Bytes>,
        ) -> BoxFuture<'_, Result<http::Response<Bytes>, TransportError>> {
            self.seen
                .lock()
                .expect("brief internal mutex must work")
                .push(request);
            let response = http::Response::builder()
                .status(self.status)
                .header(CONTENT_TYPE, self.content_type)
                .body(Bytes::from_static(self.body.as_bytes()))
                .map_err(TransportError::from);
            Box::pin(async move { response })
        }
    }

    struct Refuse;
    impl ClientMiddleware for Refuse {
        fn handle(&self, _call: &mut OutboundCall<'_>) -> crate::Result<()> {
            Err(Status::permission_denied("not from this client"))
        }
    }

    fn call<'a>(context: &'a RequestContext, body: &'static [u8]) -> RpcCall<'a> {
        RpcCall {
            arena: None,
            context,
            encoding: Encoding::Json,
            service: "test.Notes",
            method: "Shout",
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn posts_to_the_route() {
        let transport = Canned::new(StatusCode::OK, "application/json", r#"{"text":"HI"}"#);
        let seen = transport.seen.clone();
        let mut configuration = Configuration::default();
        configuration.path_prefix("/api/");
        let mut requester =
            HttpRequester::with_configuration("http://notes.local/", configuration, transport);
        requester.add_middleware(SetHeaderMiddleware::try_new("x-team", "red").expect("legal"));

        let context = RequestContext::new();
        let body = requester
            .make_request(call(&context, br#"{"text":"hi"}"#))
            .await
            .expect("success");
        assert_eq!(&br#"{"text":"HI"}"#[..], &body[..]);

        let seen = seen.lock().expect("brief internal mutex must work");
        assert_eq!(1, seen.len());
        let request = &seen[0];
        assert_eq!(http::Method::POST, *request.method());
        assert_eq!("http://notes.local/api/test.Notes/Shout", *request.uri());
        assert_eq!("application/json", request.headers()[CONTENT_TYPE]);
        assert_eq!("red", request.headers()["x-team"]);
        assert_eq!(&br#"{"text":"hi"}"#[..], &request.body()[..]);
    }

    #[tokio::test]
    async fn error_responses_are_decoded() {
        let requester = HttpRequester::new(
            "http://notes.local",
            Canned::new(
                StatusCode::NOT_FOUND,
                "application/json",
                r#"{"code":"not_found","msg":"no such note","meta":{"id":"7"}}"#,
            ),
        );
        let context = RequestContext::new();
        let status = requester
            .make_request(call(&context, b"{}"))
            .await
            .expect_err("not found");
        assert_eq!(
            Status::not_found("no such note").with_metadata("id", "7"),
            status
        );
    }

    #[tokio::test]
    async fn non_twirp_errors_are_unavailable() {
        let requester = HttpRequester::new(
            "http://notes.local",
            Canned::new(StatusCode::BAD_GATEWAY, "text/html", "<h1>bad gateway</h1>"),
        );
        let context = RequestContext::new();
        let status = requester
            .make_request(call(&context, b"{}"))
            .await
            .expect_err("proxy failure");
        assert_eq!(Code::Unavailable, status.code());
    }

    #[tokio::test]
    async fn unbuildable_requests_are_unavailable() {
        let transport = Canned::new(StatusCode::OK, "application/json", "{}");
        let seen = transport.seen.clone();
        let requester = HttpRequester::new("http://notes local", transport);

        let context = RequestContext::new();
        let status = requester
            .make_request(call(&context, b"{}"))
            .await
            .expect_err("no such uri");
        assert_eq!(Code::Unavailable, status.code());
        assert!(status.message().starts_with("Bad request"), "{status}");
        assert!(seen.lock().expect("brief internal mutex must work").is_empty());
    }

    #[tokio::test]
    async fn middleware_failure_sends_nothing() {
        let transport = Canned::new(StatusCode::OK, "application/json", "{}");
        let seen = transport.seen.clone();
        let mut requester = HttpRequester::new("http://notes.local", transport);
        requester.add_middleware(Refuse);

        let context = RequestContext::new();
        let status = requester
            .make_request(call(&context, b"{}"))
            .await
            .expect_err("refused");
        assert_eq!(Status::permission_denied("not from this client"), status);
        assert!(seen.lock().expect("brief internal mutex must work").is_empty());
    }
}
