use std::sync::Arc;

use crate::{
    serializer::{deserialize_message, serialize_message},
    Arena, Encoding, Message, Owned, RequestContext,
};

use super::{Requester, RpcCall};

/// The common half of a generated client: one service, one encoding.
///
/// Generated stubs call [`ServiceClient::call`] with their method name and message types.
#[derive(Clone)]
pub struct ServiceClient {
    requester: Arc<dyn Requester>,
    service: String,
    encoding: Encoding,
}

impl ServiceClient {
    /// `service` is the fully qualified name, e.g. `weather.WSProvider`.
    pub fn new(
        requester: Arc<dyn Requester>,
        service: impl Into<String>,
        encoding: Encoding,
    ) -> Self {
        Self {
            requester,
            service: service.into(),
            encoding,
        }
    }

    /// Fully qualified service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The encoding every call uses.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Call `method`. The output is allocated in `arena` when there is one.
    pub async fn call<Input, Output>(
        &self,
        arena: Option<&Arena>,
        context: &RequestContext,
        method: &str,
        input: &Input,
    ) -> crate::Result<Owned<Output>>
    where
        Input: Message,
        Output: Message,
    {
        let body = serialize_message(input, self.encoding)?;
        let response = self
            .requester
            .make_request(RpcCall {
                arena,
                context,
                encoding: self.encoding,
                service: &self.service,
                method,
                body,
            })
            .await?;
        deserialize_message(arena, &response, self.encoding)
    }
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service", &self.service)
            .field("encoding", &self.encoding)
            .finish()
    }
}
