//! Calling Twirp services: requesters, transports and client middleware.

mod configuration;
mod middleware;
mod requester;
mod service_client;
mod transport;

pub use configuration::Configuration;
pub use middleware::{ClientMiddleware, ClientMiddlewares, OutboundCall, SetHeaderMiddleware};
pub use requester::{HttpRequester, Requester, RpcCall};
pub use service_client::ServiceClient;
pub use transport::{LoopbackTransport, Transport};
