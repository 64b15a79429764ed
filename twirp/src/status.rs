use std::collections::HashMap;

/// Metadata key that lets a handler force the outgoing Twirp error code,
/// independent of the status' abstract [`Code`].
pub const TWIRP_STATUS_KEY: &str = "twirp_status";

/// Abstract status codes. The numeric values are the canonical rpc status numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Code {
    /// Not an error. It has no Twirp error code.
    Ok = 0,
    /// The operation was cancelled.
    Cancelled = 1,
    /// Unknown error.
    Unknown = 2,
    /// The client specified an invalid argument.
    InvalidArgument = 3,
    /// The deadline expired before the operation could complete.
    DeadlineExceeded = 4,
    /// Some requested entity was not found.
    NotFound = 5,
    /// The entity that a client attempted to create already exists.
    AlreadyExists = 6,
    /// The caller does not have permission to execute the operation.
    PermissionDenied = 7,
    /// Some resource has been exhausted.
    ResourceExhausted = 8,
    /// The system is not in a state required for the operation.
    FailedPrecondition = 9,
    /// The operation was aborted.
    Aborted = 10,
    /// The operation was attempted past the valid range.
    OutOfRange = 11,
    /// The operation is not implemented or not supported.
    Unimplemented = 12,
    /// Internal invariants were broken.
    Internal = 13,
    /// The service is currently unavailable.
    Unavailable = 14,
    /// Unrecoverable data loss or corruption.
    DataLoss = 15,
    /// The request does not have valid authentication credentials.
    Unauthenticated = 16,
}

impl Code {
    /// Map a numeric status code onto a `Code`. Unrecognized numbers are `Unknown`.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// The canonical rpc status number.
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// An rpc failure: a coarse status code, a message and string metadata.
///
/// Handlers and middleware return a `Status` to fail a request. The server turns it
/// into the Twirp JSON error envelope; the client turns the envelope back into a `Status`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
    metadata: HashMap<String, String>,
}

impl Status {
    /// A status with `code`, `message` and no metadata.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    /// The client sent a message that could not be decoded.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message).with_twirp_code("malformed")
    }

    /// The request path does not name a method of a registered service.
    pub fn bad_route(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message).with_twirp_code("bad_route")
    }

    /// A `InvalidArgument` status.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// A `NotFound` status.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    /// A `Unauthenticated` status.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(Code::Unauthenticated, message)
    }

    /// A `PermissionDenied` status.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(Code::PermissionDenied, message)
    }

    /// A `OutOfRange` status.
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(Code::OutOfRange, message)
    }

    /// A `Unimplemented` status.
    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    /// A `Internal` status.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    /// A `Unavailable` status.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    /// A `DataLoss` status.
    pub fn data_loss(message: impl Into<String>) -> Self {
        Self::new(Code::DataLoss, message)
    }

    /// Add a metadata entry, replacing any previous value for `key`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_metadata(key, value);
        self
    }

    /// Force the outgoing wire `code`, e.g. `"malformed"`.
    pub fn with_twirp_code(self, code: impl Into<String>) -> Self {
        self.with_metadata(TWIRP_STATUS_KEY, code)
    }

    /// Set a metadata entry in place. Later values for `key` replace earlier ones.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// The abstract code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All metadata, including the reserved `twirp_status` override if it is set.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// The metadata value for `key`, if any.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// The overriding wire code, if a handler or the framework set one.
    pub fn twirp_code(&self) -> Option<&str> {
        self.metadata_value(TWIRP_STATUS_KEY)
    }
}

#[cfg(test)]
mod test {
    use super::{Code, Status, TWIRP_STATUS_KEY};

    #[test]
    fn numeric_codes() {
        for value in 0..=16 {
            assert_eq!(value, Code::from_i32(value).as_i32());
        }
        assert_eq!(Code::Unknown, Code::from_i32(17));
        assert_eq!(Code::Unknown, Code::from_i32(-1));
    }

    #[test]
    fn framework_statuses_override_the_wire_code() {
        let malformed = Status::malformed("bad body");
        assert_eq!(Code::InvalidArgument, malformed.code());
        assert_eq!(Some("malformed"), malformed.twirp_code());

        let bad_route = Status::bad_route("no such method");
        assert_eq!(Code::Unimplemented, bad_route.code());
        assert_eq!(Some("bad_route"), bad_route.metadata_value(TWIRP_STATUS_KEY));
    }

    #[test]
    fn metadata_is_last_write_wins() {
        let status = Status::not_found("gone")
            .with_metadata("details", "first")
            .with_metadata("details", "second");
        assert_eq!(Some("second"), status.metadata_value("details"));
        assert_eq!(1, status.metadata().len());
        assert_eq!(None, status.twirp_code());
        assert_eq!("NotFound: gone", status.to_string());
    }
}
