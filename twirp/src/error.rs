use crate::Status;

/// Result type for twirp. Protocol failures are always a [`Status`].
pub type Result<T> = std::result::Result<T, Status>;

/// Failure to deliver a request or receive its response.
///
/// Transport errors never reach the server, so the client reports them as `Unavailable`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport's connection failed.
    #[error("IO failure: {0}")]
    IoFailure(#[from] std::io::Error),
    /// The request could not be built, e.g. from an invalid base url.
    #[error("Bad request: {0}")]
    Request(#[from] http::Error),
}

impl From<TransportError> for Status {
    fn from(e: TransportError) -> Self {
        Status::unavailable(e.to_string())
    }
}
