//! Per-request typed storage.
//!
//! Middleware uses the [`RequestContext`] to hand cross-cutting data, like an authenticated
//! principal, to the service method that handles the request.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    ops::ControlFlow,
};

/// A typed key for [`RequestContext`] storage.
///
/// Keys are zero-sized marker types. The key type itself is the identity, so two keys
/// never observe each other's values even when their `Value` types match.
///
/// ```
/// use std::sync::OnceLock;
///
/// struct Principal;
/// impl twirp::ContextKey for Principal {
///     type Value = String;
///     const NAME: &'static str = "principal";
///
///     fn default_value() -> &'static String {
///         static DEFAULT: OnceLock<String> = OnceLock::new();
///         DEFAULT.get_or_init(|| "anonymous".to_string())
///     }
/// }
///
/// let mut context = twirp::RequestContext::new();
/// assert_eq!("anonymous", context.get::<Principal>());
/// context.set::<Principal>("alice".to_string());
/// assert_eq!("alice", context.get::<Principal>());
/// ```
pub trait ContextKey: 'static {
    /// What is stored under this key.
    type Value: Send + Sync + 'static;

    /// Human-readable name, reported by [`RequestContext::for_each`].
    const NAME: &'static str;

    /// The value `get` returns when nothing was set. It is initialized once per process
    /// and never changes.
    fn default_value() -> &'static Self::Value;
}

struct Entry {
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// Storage for request-specific data. One is created per inbound request and dropped when
/// the request completes; it is never shared between requests.
#[derive(Default)]
pub struct RequestContext {
    entries: HashMap<TypeId, Entry>,
}

impl RequestContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for `K`, replacing anything stored for `K` before.
    pub fn set<K: ContextKey>(&mut self, value: K::Value) {
        self.entries.insert(
            TypeId::of::<K>(),
            Entry {
                name: K::NAME,
                value: Box::new(value),
            },
        );
    }

    /// The value stored for `K`, or `K`'s default.
    pub fn get<K: ContextKey>(&self) -> &K::Value {
        self.get_optional::<K>().unwrap_or_else(|| K::default_value())
    }

    /// The value stored for `K`, if any. There is no default substitution.
    pub fn get_optional<K: ContextKey>(&self) -> Option<&K::Value> {
        self.entries
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.value.downcast_ref::<K::Value>())
    }

    /// Whether anything was set for `K`.
    pub fn contains<K: ContextKey>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<K>())
    }

    /// Number of keys with a stored value.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visit the stored entries in no particular order. Break from the visitor to stop early.
    pub fn for_each(&self, mut visitor: impl FnMut(&str, &dyn Any) -> ControlFlow<()>) {
        for entry in self.entries.values() {
            if visitor(entry.name, entry.value.as_ref()).is_break() {
                break;
            }
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.entries.values().map(|entry| entry.name))
            .finish()
    }
}
