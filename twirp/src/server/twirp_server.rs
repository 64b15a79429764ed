use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode};

use crate::{
    envelope::write_error, Arena, Encoding, RequestContext, RequestScope, Service, Status,
};

use super::{Configuration, InboundCall, ServerMiddleware, ServerMiddlewares};

struct Route {
    service: Arc<dyn Service>,
    method: String,
}

/// Serves registered [`Service`]s over any HTTP stack.
///
/// Hand each request to [`TwirpServer::handle`] and send back what it returns. Every
/// failure, including routing and negotiation failures, comes back as a Twirp error
/// response; `handle` itself never fails.
pub struct TwirpServer {
    configuration: Configuration,
    routes: HashMap<String, Route>,
    middleware: ServerMiddlewares,
}

impl TwirpServer {
    /// A server with no services and no middleware.
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            routes: HashMap::new(),
            middleware: ServerMiddlewares::new(),
        }
    }

    /// Serve every method of `service`. A service registered under a name that is already
    /// taken replaces the earlier one.
    pub fn register_service(&mut self, service: impl Service) {
        let service: Arc<dyn Service> = Arc::new(service);
        let name = service.service_name().to_string();
        let before = self.routes.len();
        self.routes.retain(|_, route| route.service.service_name() != name);
        if self.routes.len() != before {
            log::warn!("replacing service {name}");
        }

        for method in service.methods() {
            let path = format!("{}/{name}/{method}", self.configuration.get_path_prefix());
            log::debug!("route {path}");
            self.routes.insert(
                path,
                Route {
                    service: service.clone(),
                    method: method.to_string(),
                },
            );
        }
    }

    /// Middleware runs in the order it was added.
    pub fn add_middleware(&mut self, middleware: impl ServerMiddleware) {
        self.middleware.push(Arc::new(middleware));
    }

    /// The served paths, sorted.
    pub fn routes(&self) -> Vec<&str> {
        let mut routes: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes
    }

    /// The configuration the server was built with.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Serve one request. Always produces a response: failures are Twirp error responses.
    pub fn handle(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        let mut response = http::Response::new(Bytes::new());

        let (route, encoding) = match self.negotiate(&request) {
            Ok(negotiated) => negotiated,
            Err(status) => {
                log::warn!("rejecting {} {}: {status}", request.method(), request.uri().path());
                write_error(&status, &mut response);
                return response;
            }
        };

        let arena = self.configuration.get_request_arena().then(Arena::new);
        match self.dispatch(route, encoding, arena.as_ref(), &request, &mut response) {
            Ok(body) => {
                *response.status_mut() = StatusCode::OK;
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(encoding.content_type()),
                );
                *response.body_mut() = body;
            }
            Err(status) => {
                log::debug!("{}/{} failed: {status}", route.service.service_name(), route.method);
                write_error(&status, &mut response);
            }
        }
        if let Some(arena) = arena {
            arena.release();
        }
        response
    }

    fn negotiate(&self, request: &http::Request<Bytes>) -> crate::Result<(&Route, Encoding)> {
        if request.method() != Method::POST {
            return Err(Status::bad_route(format!("Unsupported method {}", request.method())));
        }
        let route = self
            .routes
            .get(request.uri().path())
            .ok_or_else(|| Status::bad_route("Method not found"))?;

        let encoding = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(Encoding::from_content_type)
            .ok_or_else(|| Status::malformed("Unknown message encoding"))?;
        Ok((route, encoding))
    }

    fn dispatch(
        &self,
        route: &Route,
        encoding: Encoding,
        arena: Option<&Arena>,
        request: &http::Request<Bytes>,
        response: &mut http::Response<Bytes>,
    ) -> crate::Result<Bytes> {
        let mut context = RequestContext::new();
        let mut call = InboundCall::new(arena, &mut context, encoding, request, response);
        self.middleware.execute(|unit| unit.handle(&mut call))?;

        let body = request.body();
        let max_request_length = self.configuration.get_max_request_length();
        if max_request_length < body.len() {
            return Err(Status::out_of_range(format!(
                "Request body of {} bytes is larger than {max_request_length}",
                body.len()
            )));
        }

        let mut scope = RequestScope::new(arena, &mut context);
        let output = route.service.invoke(&route.method, body, encoding, &mut scope)?;
        let encoded = output.encode_as(encoding)?;
        output.release();
        Ok(encoded)
    }
}

impl Default for TwirpServer {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl std::fmt::Debug for TwirpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwirpServer")
            .field("configuration", &self.configuration)
            .field("routes", &self.routes())
            .field("middleware", &self.middleware)
            .finish()
    }
}
