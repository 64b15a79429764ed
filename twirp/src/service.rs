use std::collections::HashMap;

use crate::{
    serializer::deserialize_message, Arena, Encoding, Message, OutboundMessage, Owned,
    RequestContext, Status,
};

/// What a service method gets to work with besides its input: the request's arena, if
/// there is one, and the request's context.
pub struct RequestScope<'a> {
    arena: Option<&'a Arena>,
    context: &'a mut RequestContext,
}

impl<'a> RequestScope<'a> {
    /// A scope over `arena` and `context` for one invocation.
    pub fn new(arena: Option<&'a Arena>, context: &'a mut RequestContext) -> Self {
        Self { arena, context }
    }

    /// The request's arena, if the server allocates messages in one.
    pub fn arena(&self) -> Option<&'a Arena> {
        self.arena
    }

    /// The request context, as populated by middleware.
    pub fn context(&self) -> &RequestContext {
        &*self.context
    }

    /// Mutable access to the request context.
    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut *self.context
    }

    /// Allocate a message in the request's arena, or independently when there is none.
    pub fn alloc<T>(&self, value: T) -> Owned<T>
    where
        T: Send + Sync + 'static,
    {
        Owned::new_in(self.arena, value)
    }
}

impl std::fmt::Debug for RequestScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("arena", &self.arena)
            .field("context", &self.context)
            .finish()
    }
}

/// A Twirp service: a name, a set of methods, and a way to invoke them.
///
/// Implementations are usually generated from a protobuf service definition, or built with
/// [`ServiceDescriptor`]. A service is immutable once it is registered with a server.
pub trait Service: Send + Sync + 'static {
    /// Fully qualified name, e.g. `weather.WSProvider`.
    fn service_name(&self) -> &str;

    /// The methods this service serves. Each is routable as `{service}/{method}`.
    fn methods(&self) -> Vec<&str>;

    /// Decode `body` as the method's input, call the method and return its output.
    ///
    /// `method` is one of [`Service::methods`]; the router rejects anything else before
    /// it gets here.
    fn invoke(
        &self,
        method: &str,
        body: &[u8],
        encoding: Encoding,
        scope: &mut RequestScope<'_>,
    ) -> crate::Result<Owned<dyn OutboundMessage>>;
}

type MethodInvoker<H> = Box<
    dyn Fn(&H, &[u8], Encoding, &mut RequestScope<'_>) -> crate::Result<Owned<dyn OutboundMessage>>
        + Send
        + Sync,
>;

/// A table-driven [`Service`]: one registered function per method, all sharing a handler.
///
/// ```
/// # #[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
/// # struct Ping { #[prost(string, tag = "1")] text: String }
/// use twirp::{Owned, RequestScope, ServiceDescriptor};
///
/// struct Echo;
/// impl Echo {
///     fn ping(&self, input: &Ping, scope: &mut RequestScope<'_>) -> twirp::Result<Owned<Ping>> {
///         Ok(scope.alloc(Ping { text: input.text.clone() }))
///     }
/// }
///
/// let service = ServiceDescriptor::new("demo.Echo", Echo).unary("Ping", Echo::ping);
/// assert_eq!(vec!["Ping"], twirp::Service::methods(&service));
/// ```
pub struct ServiceDescriptor<H> {
    name: String,
    handler: H,
    methods: Vec<&'static str>,
    invokers: HashMap<&'static str, MethodInvoker<H>>,
}

impl<H> ServiceDescriptor<H>
where
    H: Send + Sync + 'static,
{
    /// A descriptor with no methods yet. `name` is the fully qualified service name.
    pub fn new(name: impl Into<String>, handler: H) -> Self {
        Self {
            name: name.into(),
            handler,
            methods: Vec::new(),
            invokers: HashMap::new(),
        }
    }

    /// Register a unary method. Registering the same name twice replaces the first one.
    pub fn unary<Input, Output, F>(mut self, method: &'static str, function: F) -> Self
    where
        Input: Message,
        Output: Message,
        F: Fn(&H, &Input, &mut RequestScope<'_>) -> crate::Result<Owned<Output>>
            + Send
            + Sync
            + 'static,
    {
        let invoker: MethodInvoker<H> = Box::new(move |handler, body, encoding, scope| {
            let input = deserialize_message::<Input>(scope.arena(), body, encoding)?;
            let output = function(handler, &*input, scope)?;
            input.release();
            Ok(output.into_dyn())
        });
        if self.invokers.insert(method, invoker).is_none() {
            self.methods.push(method);
        } else {
            log::warn!("{} method {method} registered twice", self.name);
        }
        self
    }

    /// The handler every method is called on.
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H> Service for ServiceDescriptor<H>
where
    H: Send + Sync + 'static,
{
    fn service_name(&self) -> &str {
        &self.name
    }

    fn methods(&self) -> Vec<&str> {
        self.methods.clone()
    }

    fn invoke(
        &self,
        method: &str,
        body: &[u8],
        encoding: Encoding,
        scope: &mut RequestScope<'_>,
    ) -> crate::Result<Owned<dyn OutboundMessage>> {
        match self.invokers.get(method) {
            Some(invoker) => invoker(&self.handler, body, encoding, scope),
            None => Err(Status::bad_route(format!(
                "{} has no method {method}",
                self.name
            ))),
        }
    }
}

impl<H> std::fmt::Debug for ServiceDescriptor<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::OnceLock;

    use super::{RequestScope, Service, ServiceDescriptor};
    use crate::{
        serializer::{deserialize_message, serialize_message},
        Arena, Code, ContextKey, Encoding, Ownership, Owned, RequestContext, Status,
    };

    #[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
    struct Greeting {
        #[prost(string, tag = "1")]
        pub text: String,
    }

    struct Caller;
    impl ContextKey for Caller {
        type Value = String;
        const NAME: &'static str = "caller";

        fn default_value() -> &'static String {
            static DEFAULT: OnceLock<String> = OnceLock::new();
            DEFAULT.get_or_init(|| "stranger".to_string())
        }
    }

    struct Greeter {
        punctuation: &'static str,
    }

    impl Greeter {
        fn hello(
            &self,
            input: &Greeting,
            scope: &mut RequestScope<'_>,
        ) -> crate::Result<Owned<Greeting>> {
            let caller = scope.context().get::<Caller>().clone();
            Ok(scope.alloc(Greeting {
                text: format!("{} {caller}{}", input.text, self.punctuation),
            }))
        }

        fn refuse(
            &self,
            _input: &Greeting,
            _scope: &mut RequestScope<'_>,
        ) -> crate::Result<Owned<Greeting>> {
            Err(Status::permission_denied("not today").with_metadata("retry", "tomorrow"))
        }
    }

    fn greeter() -> ServiceDescriptor<Greeter> {
        ServiceDescriptor::new("test.Greeter", Greeter { punctuation: "!" })
            .unary("Hello", Greeter::hello)
            .unary("Refuse", Greeter::refuse)
    }

    fn greeting(text: &str, encoding: Encoding) -> bytes::Bytes {
        serialize_message(
            &Greeting {
                text: text.to_string(),
            },
            encoding,
        )
        .expect("encodable")
    }

    #[test]
    fn declared_methods() {
        let service = greeter();
        assert_eq!("test.Greeter", service.service_name());
        assert_eq!(vec!["Hello", "Refuse"], service.methods());
    }

    #[test]
    fn invoke_uses_context_and_arena() {
        let service = greeter();
        for encoding in [Encoding::Json, Encoding::Protobuf] {
            let arena = Arena::new();
            let mut context = RequestContext::new();
            context.set::<Caller>("Ada".to_string());
            let mut scope = RequestScope::new(Some(&arena), &mut context);

            let output = service
                .invoke("Hello", &greeting("hello", encoding), encoding, &mut scope)
                .expect("invocation succeeds");
            assert_eq!(Ownership::Scoped, output.ownership());
            let encoded = output.encode_as(encoding).expect("encodable");
            let reply =
                deserialize_message::<Greeting>(None, &encoded, encoding).expect("decodable");
            assert_eq!("hello Ada!", reply.text);
            // the decoded input and the reply
            assert_eq!(2, arena.len());
        }
    }

    #[test]
    fn invoke_without_arena() {
        let service = greeter();
        let mut context = RequestContext::new();
        let mut scope = RequestScope::new(None, &mut context);
        let output = service
            .invoke(
                "Hello",
                &greeting("hi", Encoding::Protobuf),
                Encoding::Protobuf,
                &mut scope,
            )
            .expect("invocation succeeds");
        assert_eq!(Ownership::Independent, output.ownership());
        let reply = output.as_any().downcast_ref::<Greeting>().expect("a greeting");
        assert_eq!("hi stranger!", reply.text);
    }

    #[test]
    fn handler_status_is_unchanged() {
        let service = greeter();
        let mut context = RequestContext::new();
        let mut scope = RequestScope::new(None, &mut context);
        let status = service
            .invoke(
                "Refuse",
                &greeting("hi", Encoding::Json),
                Encoding::Json,
                &mut scope,
            )
            .expect_err("refused");
        assert_eq!(
            Status::permission_denied("not today").with_metadata("retry", "tomorrow"),
            status
        );
    }

    #[test]
    fn undecodable_input_is_malformed() {
        let service = greeter();
        let mut context = RequestContext::new();
        let mut scope = RequestScope::new(None, &mut context);
        let status = service
            .invoke("Hello", b"[1, 2]", Encoding::Json, &mut scope)
            .expect_err("not a greeting");
        assert_eq!(Code::InvalidArgument, status.code());
        assert_eq!(Some("malformed"), status.twirp_code());
    }

    #[test]
    fn undeclared_method_is_a_bad_route() {
        let service = greeter();
        let mut context = RequestContext::new();
        let mut scope = RequestScope::new(None, &mut context);
        let status = service
            .invoke("Goodbye", b"", Encoding::Protobuf, &mut scope)
            .expect_err("no such method");
        assert_eq!(Some("bad_route"), status.twirp_code());
    }
}
