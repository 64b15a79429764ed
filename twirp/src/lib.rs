//! Twirp
//!
//! This crate is the protocol runtime for Twirp: unary rpc carried in HTTP POST bodies,
//! encoded as binary protobuf or JSON, with a small closed set of error codes. Generated
//! clients and servers use it for routing, encoding negotiation, error mapping and
//! request-scoped data, so none of that is re-implemented per service.
//!
//! * `server` routes `POST {prefix}/{service}/{method}` to a [`Service`], running the
//!   server middleware chain first. Failures become the JSON error envelope.
//! * `client` sends requests through a [`client::Transport`], running the client
//!   middleware chain first, and decodes error envelopes back into a [`Status`].
//! * [`RequestContext`] carries typed data, like an authenticated principal, from
//!   middleware to service methods.
//! * [`Arena`] and [`Owned`] make message lifetime explicit: bulk-released with the
//!   request, or owned by its handle.
//!
//! The HTTP transport is not part of this crate. Anything that can hand over an
//! `http::Request<Bytes>` and send back an `http::Response<Bytes>` can host a server, and
//! anything that can post one can back a client. `client::LoopbackTransport` connects a
//! client directly to a server in-process.

#![deny(missing_docs)]

mod context;
mod error;
mod middleware;
mod ownership;
mod service;
mod status;

pub mod client;
pub mod envelope;
pub mod error_codes;
pub mod serializer;
pub mod server;

pub use context::{ContextKey, RequestContext};
pub use error::{Result, TransportError};
pub use middleware::MiddlewareChain;
pub use ownership::{Arena, Owned, Ownership};
pub use serializer::{Encoding, Message, OutboundMessage};
pub use service::{RequestScope, Service, ServiceDescriptor};
pub use status::{Code, Status, TWIRP_STATUS_KEY};
