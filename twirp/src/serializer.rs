//! Message bodies: binary protobuf or JSON, negotiated by content type.

use std::any::Any;

use bytes::Bytes;

use crate::{Arena, Owned, Status};

/// Content type of binary protobuf bodies.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/protobuf";
/// Content type of JSON bodies, and of every error envelope.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Body encoding of a Twirp request and its response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// `application/protobuf`: binary protobuf.
    Protobuf,
    /// `application/json`: protobuf JSON mapping.
    Json,
}

impl Encoding {
    /// The `Content-Type` header value for this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Protobuf => CONTENT_TYPE_PROTOBUF,
            Self::Json => CONTENT_TYPE_JSON,
        }
    }

    /// Only the two exact content types are accepted; parameters like `charset` are not.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            CONTENT_TYPE_PROTOBUF => Some(Self::Protobuf),
            CONTENT_TYPE_JSON => Some(Self::Json),
            _ => None,
        }
    }

    /// Whether this is the JSON encoding.
    pub fn is_json(&self) -> bool {
        *self == Self::Json
    }
}

/// A Twirp message: binary encoding comes from `prost`, JSON encoding from `serde`.
///
/// Generated message types derive both. The generator is responsible for the protobuf JSON
/// field mapping (e.g. `#[serde(rename_all = "camelCase")]`).
pub trait Message:
    prost::Message + Default + serde::Serialize + serde::de::DeserializeOwned + 'static
{
}

impl<T> Message for T where
    T: prost::Message + Default + serde::Serialize + serde::de::DeserializeOwned + 'static
{
}

/// A type-erased message that can still be encoded. Service dispatch hands these back to
/// the server, which encodes them in the request's encoding.
pub trait OutboundMessage: Any + Send + Sync + std::fmt::Debug {
    /// Encode the message as `encoding`.
    fn encode_as(&self, encoding: Encoding) -> crate::Result<Bytes>;

    /// For downcasting to the concrete message type.
    fn as_any(&self) -> &dyn Any;
}

impl<T> OutboundMessage for T
where
    T: Message,
{
    fn encode_as(&self, encoding: Encoding) -> crate::Result<Bytes> {
        serialize_message(self, encoding)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Serialize `message` as binary protobuf or as JSON.
pub fn serialize_message<M: Message>(message: &M, encoding: Encoding) -> crate::Result<Bytes> {
    let encoded = match encoding {
        Encoding::Protobuf => message.encode_to_vec(),
        Encoding::Json => serde_json::to_vec(message).map_err(|e| {
            log::error!("json encoding error: {e:?}");
            Status::invalid_argument(format!("Failed to serialize the message: {e}"))
        })?,
    };
    log::trace!("encoded {encoding:?} {} bytes: {message:?}", encoded.len());
    Ok(Bytes::from(encoded))
}

/// Deserialize an `M` from `data`. The message is allocated in `arena` when there is one.
///
/// Undecodable input fails with `InvalidArgument`, marked with the `malformed` wire code.
pub fn deserialize_message<M: Message>(
    arena: Option<&Arena>,
    data: &[u8],
    encoding: Encoding,
) -> crate::Result<Owned<M>> {
    if data.len() >= i32::MAX as usize {
        return Err(Status::out_of_range("Argument size is too large"));
    }

    let message = match encoding {
        Encoding::Protobuf => M::decode(data).map_err(|e| {
            log::warn!("could not decode binary message: {e:?}");
            Status::malformed("Can't deserialize binary request")
        })?,
        Encoding::Json => serde_json::from_slice::<M>(data).map_err(|e| {
            log::warn!("could not decode json message: {e:?}");
            Status::malformed("Can't deserialize JSON request")
        })?,
    };
    log::trace!("decoded {encoding:?} {} bytes: {message:?}", data.len());
    Ok(Owned::new_in(arena, message))
}
