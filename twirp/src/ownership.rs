//! Message lifetime: arena-scoped or independently owned.
//!
//! A request may run with an [`Arena`]. Messages allocated in it live until the arena is
//! released at the end of the request, and releasing one of their handles does nothing.
//! Messages created without an arena are dropped as soon as their handle is released.
//! The mode is recorded on every [`Owned`] handle rather than left to drop order.

use std::{any::Any, ops::Deref, sync::Arc};

use k_lock::Mutex;

/// Which lifetime mode a handle uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Reclaimed in bulk when the arena is released.
    Scoped,
    /// Reclaimed when the handle is released.
    Independent,
}

/// A request-scoped bulk allocation scope.
///
/// The server creates one per request (when configured to) and releases it exactly once,
/// after the response body has been produced.
pub struct Arena {
    allocations: Mutex<Vec<Arc<dyn Any + Send + Sync>>>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    /// An empty arena.
    pub fn new() -> Self {
        Self {
            allocations: Mutex::new(Vec::new()),
        }
    }

    /// Move `value` into the arena. The returned handle is `Ownership::Scoped`.
    #[allow(clippy::expect_used)]
    pub fn alloc<T>(&self, value: T) -> Owned<T>
    where
        T: Send + Sync + 'static,
    {
        let value = Arc::new(value);
        self.allocations
            .lock()
            .expect("brief internal mutex must work")
            .push(value.clone());
        Owned::Scoped(value)
    }

    /// How many objects the arena is keeping alive.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.allocations
            .lock()
            .expect("brief internal mutex must work")
            .len()
    }

    /// Whether the arena holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release everything allocated in this arena. Returns how many objects were held.
    ///
    /// Handles that are still alive keep their own object alive until they are dropped.
    #[allow(clippy::expect_used)]
    pub fn release(self) -> usize {
        let allocations = std::mem::take(
            &mut *self
                .allocations
                .lock()
                .expect("brief internal mutex must work"),
        );
        let released = allocations.len();
        drop(allocations);
        log::trace!("releasing arena with {released} allocations");
        released
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("allocations", &self.len())
            .finish()
    }
}

/// An ownership handle for a message: either bound to an [`Arena`] or owned outright.
pub enum Owned<T: ?Sized> {
    /// Shared with an arena; released with it.
    Scoped(Arc<T>),
    /// Owned by this handle alone.
    Independent(Box<T>),
}

impl<T> Owned<T>
where
    T: Send + Sync + 'static,
{
    /// Allocate in `arena` when there is one, otherwise own the value independently.
    pub fn new_in(arena: Option<&Arena>, value: T) -> Self {
        match arena {
            Some(arena) => arena.alloc(value),
            None => Self::independent(value),
        }
    }

    /// Own `value` without an arena.
    pub fn independent(value: T) -> Self {
        Self::Independent(Box::new(value))
    }
}

impl<T: ?Sized> Owned<T> {
    /// Which lifetime mode this handle uses.
    pub fn ownership(&self) -> Ownership {
        match self {
            Self::Scoped(_) => Ownership::Scoped,
            Self::Independent(_) => Ownership::Independent,
        }
    }

    /// Whether this handle is arena-scoped.
    pub fn is_scoped(&self) -> bool {
        self.ownership() == Ownership::Scoped
    }

    /// Mutable access. Arena-scoped objects are shared with their arena and are read-only.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Scoped(_) => None,
            Self::Independent(value) => Some(&mut **value),
        }
    }

    /// Give up this handle. An independent object is dropped now; an arena-scoped one
    /// stays alive until its arena is released.
    pub fn release(self) {
        match self {
            Self::Scoped(_) => (),
            Self::Independent(value) => drop(value),
        }
    }
}

impl<T> Owned<T>
where
    T: crate::OutboundMessage,
{
    /// Erase the message type, keeping the ownership mode.
    pub fn into_dyn(self) -> Owned<dyn crate::OutboundMessage> {
        match self {
            Self::Scoped(value) => Owned::Scoped(value as Arc<dyn crate::OutboundMessage>),
            Self::Independent(value) => {
                Owned::Independent(value as Box<dyn crate::OutboundMessage>)
            }
        }
    }
}

impl<T: ?Sized> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Scoped(value) => &**value,
            Self::Independent(value) => &**value,
        }
    }
}

impl<T: ?Sized + std::fmt::Debug> std::fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owned")
            .field("ownership", &self.ownership())
            .field("value", &&**self)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::{Arena, Owned, Ownership};

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn independent_release_drops_immediately() {
        let drops = Arc::new(AtomicUsize::new(0));
        let owned = Owned::new_in(None, DropCounter(drops.clone()));
        assert_eq!(Ownership::Independent, owned.ownership());

        owned.release();
        assert_eq!(1, drops.load(Ordering::Relaxed));
    }

    #[test]
    fn scoped_release_waits_for_the_arena() {
        let drops = Arc::new(AtomicUsize::new(0));
        let arena = Arena::new();
        let first = Owned::new_in(Some(&arena), DropCounter(drops.clone()));
        let second = arena.alloc(DropCounter(drops.clone()));
        assert!(first.is_scoped());
        assert_eq!(2, arena.len());

        first.release();
        second.release();
        assert_eq!(0, drops.load(Ordering::Relaxed), "the arena still owns them");

        assert_eq!(2, arena.release());
        assert_eq!(2, drops.load(Ordering::Relaxed));
    }

    #[test]
    fn only_independent_handles_are_mutable() {
        let arena = Arena::new();
        let mut scoped = arena.alloc(String::from("scoped"));
        assert!(scoped.get_mut().is_none());

        let mut independent = Owned::independent(String::from("mine"));
        if let Some(value) = independent.get_mut() {
            value.push_str(" and changed");
        }
        assert_eq!("mine and changed", &*independent);
        assert_eq!("scoped", &*scoped);
    }
}
