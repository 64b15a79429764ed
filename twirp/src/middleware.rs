use std::sync::Arc;

/// An ordered list of interceptors.
///
/// Both the client and the server run their units through [`MiddlewareChain::execute`]:
/// units run one at a time in registration order, and the first failure stops the chain.
/// Whatever a unit changed before failing stays changed.
pub struct MiddlewareChain<U: ?Sized> {
    units: Vec<Arc<U>>,
}

impl<U: ?Sized> MiddlewareChain<U> {
    /// An empty chain.
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Append a unit. It runs after every unit already in the chain.
    pub fn push(&mut self, unit: Arc<U>) {
        self.units.push(unit);
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the chain has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Run `handle` for each unit until one fails. That failure is returned unchanged.
    pub fn execute(&self, mut handle: impl FnMut(&U) -> crate::Result<()>) -> crate::Result<()> {
        for (position, unit) in self.units.iter().enumerate() {
            if let Err(status) = handle(&**unit) {
                log::debug!("middleware {position} failed the request: {status}");
                return Err(status);
            }
        }
        Ok(())
    }
}

impl<U: ?Sized> Default for MiddlewareChain<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: ?Sized> Clone for MiddlewareChain<U> {
    fn clone(&self) -> Self {
        Self {
            units: self.units.clone(),
        }
    }
}

impl<U: ?Sized> FromIterator<Arc<U>> for MiddlewareChain<U> {
    fn from_iter<T: IntoIterator<Item = Arc<U>>>(iter: T) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

impl<U: ?Sized> std::fmt::Debug for MiddlewareChain<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("units", &self.units.len())
            .finish()
    }
}
