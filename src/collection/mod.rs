//! Ordered, identity-preserving collections.
//!
//! Entities live in slots addressed by a stable [`Handle`]; the visible order is
//! a separate list of handles. "The same instance" therefore means "the same
//! handle": reconciliation mutates slot contents in place and only reorders
//! handles, so selection and any other per-handle state survive a refresh.

mod reconciliation;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub use reconciliation::Reconciliation;

/// An entity that can be merged into a live collection.
pub trait Reconcilable: Clone {
    /// Identity used to match snapshot entries against live entries
    type Key: Eq + Hash + Clone + Debug;

    fn identity(&self) -> Self::Key;

    /// Copy the mutable state of `source` onto `self`.
    ///
    /// Returns `true` if anything observable changed.
    fn absorb(&mut self, source: &Self) -> bool;
}

/// Stable reference to one live entity inside a [`Collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One observable mutation of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Inserted { index: usize, handle: Handle },
    Removed { index: usize, handle: Handle },
    Moved { from: usize, to: usize, handle: Handle },
    Updated { index: usize, handle: Handle },
    Cleared,
}

/// Changes produced by one logical operation, published to observers as a unit.
pub type ChangeSet = Vec<Change>;

/// Notification published to collection observers.
///
/// One event per logical operation; never published for a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    Changed { changes: ChangeSet },
}

/// Arena-backed ordered collection.
#[derive(Debug, Clone)]
pub struct Collection<T: Reconcilable> {
    pub(crate) slots: HashMap<Handle, T>,
    pub(crate) order: Vec<Handle>,
    next_handle: u64,
}

impl<T: Reconcilable> Default for Collection<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            order: Vec::new(),
            next_handle: 1,
        }
    }
}

impl<T: Reconcilable> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Handles in display order.
    pub fn handles(&self) -> &[Handle] {
        &self.order
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slots.contains_key(&handle)
    }

    pub fn position(&self, handle: Handle) -> Option<usize> {
        self.order.iter().position(|h| *h == handle)
    }

    /// Find the live handle carrying `key`.
    pub fn find(&self, key: &T::Key) -> Option<Handle> {
        self.order
            .iter()
            .copied()
            .find(|h| self.slots.get(h).is_some_and(|item| &item.identity() == key))
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.order
            .iter()
            .filter_map(move |h| self.slots.get(h).map(|item| (*h, item)))
    }

    /// Owned copy of the entries in display order.
    pub fn snapshot(&self) -> Vec<(Handle, T)> {
        self.iter().map(|(h, item)| (h, item.clone())).collect()
    }

    /// Append an entity at the end.
    pub fn push(&mut self, item: T) -> (Handle, Change) {
        let index = self.order.len();
        self.insert(index, item)
    }

    /// Insert an entity at `index` (clamped to the current length).
    pub fn insert(&mut self, index: usize, item: T) -> (Handle, Change) {
        let handle = self.allocate();
        let index = index.min(self.order.len());
        self.slots.insert(handle, item);
        self.order.insert(index, handle);
        (handle, Change::Inserted { index, handle })
    }

    /// Remove an entity, returning its last value.
    pub fn remove(&mut self, handle: Handle) -> Option<(T, Change)> {
        let index = self.position(handle)?;
        self.order.remove(index);
        let item = self.slots.remove(&handle)?;
        Some((item, Change::Removed { index, handle }))
    }

    /// Merge `source` into the entity at `handle` in place.
    pub fn absorb(&mut self, handle: Handle, source: &T) -> Option<Change> {
        let index = self.position(handle)?;
        let item = self.slots.get_mut(&handle)?;
        item.absorb(source)
            .then_some(Change::Updated { index, handle })
    }

    /// Run an arbitrary in-place mutation on one entity.
    ///
    /// Always reports an `Updated` change when the handle is live.
    pub fn update<R>(&mut self, handle: Handle, f: impl FnOnce(&mut T) -> R) -> Option<(R, Change)> {
        let index = self.position(handle)?;
        let item = self.slots.get_mut(&handle)?;
        let result = f(item);
        Some((result, Change::Updated { index, handle }))
    }

    /// Drop every entity; returns what was removed in display order.
    pub fn clear(&mut self) -> Vec<(Handle, T)> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|h| self.slots.remove(&h).map(|item| (h, item)))
            .collect()
    }

    fn allocate(&mut self) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        handle
    }
}
