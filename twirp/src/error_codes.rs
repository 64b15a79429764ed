//! The Twirp error code table.
//!
//! Twirp errors carry a textual code on the wire. Each code has a fixed HTTP status, and
//! maps onto an abstract [`Code`]. The mapping is one-to-one except for `malformed` and
//! `bad_route`, which the router itself produces and which alias abstract codes already
//! taken by public entries.

use http::StatusCode;

use crate::Code;

/// One row of the error code table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorCodeEntry {
    /// The wire code, e.g. `not_found`.
    pub code: &'static str,
    /// The HTTP status sent with the code.
    pub http_status: StatusCode,
    /// The abstract code this wire code decodes to.
    pub status: Code,
    /// Only produced by the framework, never chosen by application code.
    pub internal: bool,
}

const fn entry(code: &'static str, http_status: StatusCode, status: Code) -> ErrorCodeEntry {
    ErrorCodeEntry {
        code,
        http_status,
        status,
        internal: false,
    }
}

const fn internal(code: &'static str, http_status: StatusCode, status: Code) -> ErrorCodeEntry {
    ErrorCodeEntry {
        code,
        http_status,
        status,
        internal: true,
    }
}

/// See https://twitchtv.github.io/twirp/docs/spec_v7.html#error-codes
pub const CODE_MAP: [ErrorCodeEntry; 18] = [
    entry("canceled", StatusCode::REQUEST_TIMEOUT, Code::Cancelled),
    entry("unknown", StatusCode::INTERNAL_SERVER_ERROR, Code::Unknown),
    entry("invalid_argument", StatusCode::BAD_REQUEST, Code::InvalidArgument),
    // The message could not be decoded
    internal("malformed", StatusCode::BAD_REQUEST, Code::InvalidArgument),
    entry("deadline_exceeded", StatusCode::REQUEST_TIMEOUT, Code::DeadlineExceeded),
    entry("not_found", StatusCode::NOT_FOUND, Code::NotFound),
    // The url path is not routable to a service method
    internal("bad_route", StatusCode::NOT_FOUND, Code::Unimplemented),
    entry("already_exists", StatusCode::CONFLICT, Code::AlreadyExists),
    entry("permission_denied", StatusCode::FORBIDDEN, Code::PermissionDenied),
    entry("unauthenticated", StatusCode::UNAUTHORIZED, Code::Unauthenticated),
    entry("resource_exhausted", StatusCode::TOO_MANY_REQUESTS, Code::ResourceExhausted),
    entry("failed_precondition", StatusCode::PRECONDITION_FAILED, Code::FailedPrecondition),
    entry("aborted", StatusCode::CONFLICT, Code::Aborted),
    entry("out_of_range", StatusCode::BAD_REQUEST, Code::OutOfRange),
    entry("unimplemented", StatusCode::NOT_IMPLEMENTED, Code::Unimplemented),
    entry("internal", StatusCode::INTERNAL_SERVER_ERROR, Code::Internal),
    entry("unavailable", StatusCode::SERVICE_UNAVAILABLE, Code::Unavailable),
    entry("dataloss", StatusCode::INTERNAL_SERVER_ERROR, Code::DataLoss),
];

fn find(code: &str) -> Option<&'static ErrorCodeEntry> {
    CODE_MAP.iter().find(|entry| entry.code == code)
}

/// Convert a wire error code (e.g. `"unavailable"`) into its abstract status.
/// Unrecognized codes are `Code::Unknown`.
pub fn code_to_status(code: &str) -> Code {
    find(code).map(|entry| entry.status).unwrap_or(Code::Unknown)
}

/// Convert an abstract status into the wire error code and HTTP status.
/// Codes with no public entry map to `("unknown", 500)`.
pub fn status_to_code(status: Code) -> (&'static str, StatusCode) {
    CODE_MAP
        .iter()
        .find(|entry| !entry.internal && entry.status == status)
        .map(|entry| (entry.code, entry.http_status))
        .unwrap_or(("unknown", StatusCode::INTERNAL_SERVER_ERROR))
}

/// Convert a wire error code into its HTTP status. Unrecognized codes are 500.
pub fn code_to_http_status(code: &str) -> StatusCode {
    find(code)
        .map(|entry| entry.http_status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
