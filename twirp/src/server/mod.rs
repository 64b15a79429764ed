//! Serving Twirp services from any HTTP stack.

mod configuration;
mod middleware;
mod twirp_server;

pub use configuration::Configuration;
pub use middleware::{InboundCall, ServerMiddleware, ServerMiddlewares};
pub use twirp_server::TwirpServer;
