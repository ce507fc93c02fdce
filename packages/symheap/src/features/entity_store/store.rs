//! Append-only id allocator with per-entity copy-on-write
//!
//! ```text
//! EntStore = [ Option<Arc<E>> ; last_id + 1 ]
//! ```
//!
//! Cloning a store copies the slot vector (one refcount bump per entity).
//! Writes go through `Arc::make_mut`, so an entity shared with a forked
//! store is copied on its first mutation and never earlier.

use crate::shared::models::RawId;
use std::sync::Arc;

/// Id-indexed storage of heap entities
#[derive(Debug, Clone)]
pub struct EntStore<E> {
    ents: Vec<Option<Arc<E>>>,
}

impl<E: Clone> Default for EntStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> EntStore<E> {
    pub fn new() -> Self {
        Self { ents: Vec::new() }
    }

    /// Reserve `count` leading ids without entities (for sentinels)
    pub fn with_reserved(count: usize) -> Self {
        Self {
            ents: vec![None; count],
        }
    }

    /// Allocate a fresh id for `ent`
    pub fn assign_id(&mut self, ent: E) -> RawId {
        let id = RawId::try_from(self.ents.len()).expect("entity id space exhausted");
        self.ents.push(Some(Arc::new(ent)));
        id
    }

    /// Install an entity at an already reserved id
    pub fn assign_reserved(&mut self, id: RawId, ent: E) {
        let slot = self.slot_mut(id);
        assert!(slot.is_none(), "reserved id {} assigned twice", id);
        *slot = Some(Arc::new(ent));
    }

    /// Highest id ever handed out
    #[inline]
    pub fn last_id(&self) -> RawId {
        self.ents.len() as RawId - 1
    }

    /// Number of slots (live and released)
    #[inline]
    pub fn len(&self) -> usize {
        self.ents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ents.is_empty()
    }

    /// True if `id` was handed out and has not been released
    #[inline]
    pub fn is_valid(&self, id: RawId) -> bool {
        self.get(id).is_some()
    }

    /// Read-only access; `None` for out-of-range or released ids
    #[inline]
    pub fn get(&self, id: RawId) -> Option<&E> {
        if id < 0 {
            return None;
        }
        self.ents.get(id as usize)?.as_deref()
    }

    /// Exclusive access; copies the entity if a fork still shares it
    ///
    /// # Panics
    /// On out-of-range or released ids.
    pub fn get_mut(&mut self, id: RawId) -> &mut E {
        match self.slot_mut(id) {
            Some(ent) => Arc::make_mut(ent),
            None => panic!("write access to released entity #{}", id),
        }
    }

    /// Physically release an entity; the id is never handed out again
    ///
    /// # Panics
    /// On out-of-range or already released ids.
    pub fn release(&mut self, id: RawId) -> Arc<E> {
        match self.slot_mut(id).take() {
            Some(ent) => ent,
            None => panic!("double release of entity #{}", id),
        }
    }

    /// Ids of all entities that have not been released
    pub fn ids(&self) -> impl Iterator<Item = RawId> + '_ {
        self.ents
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(id, _)| id as RawId)
    }

    /// Number of entities shared with at least one other store
    pub fn shared_count(&self) -> usize {
        self.ents
            .iter()
            .flatten()
            .filter(|ent| Arc::strong_count(ent) > 1)
            .count()
    }

    fn slot_mut(&mut self, id: RawId) -> &mut Option<Arc<E>> {
        assert!(id >= 0, "negative entity id {}", id);
        let len = self.ents.len();
        self.ents
            .get_mut(id as usize)
            .unwrap_or_else(|| panic!("entity id {} out of range (len {})", id, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut store = EntStore::with_reserved(3);
        assert_eq!(store.assign_id("a"), 3);
        assert_eq!(store.assign_id("b"), 4);
        assert_eq!(store.last_id(), 4);
        assert!(store.get(0).is_none());
        assert_eq!(store.get(4), Some(&"b"));
    }

    #[test]
    fn test_release_keeps_ids_unique() {
        let mut store = EntStore::new();
        let a = store.assign_id(1u32);
        store.release(a);
        let b = store.assign_id(2u32);
        assert_ne!(a, b);
        assert!(!store.is_valid(a));
        assert_eq!(store.ids().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_fork_isolation() {
        let mut store = EntStore::new();
        let id = store.assign_id(vec![1, 2, 3]);

        let mut fork = store.clone();
        assert_eq!(store.shared_count(), 1);

        fork.get_mut(id).push(4);
        assert_eq!(store.get(id), Some(&vec![1, 2, 3]));
        assert_eq!(fork.get(id), Some(&vec![1, 2, 3, 4]));
        assert_eq!(store.shared_count(), 0);
    }

    #[test]
    fn test_reserved_slots() {
        let mut store = EntStore::with_reserved(2);
        store.assign_reserved(1, 'x');
        assert_eq!(store.get(1), Some(&'x'));
        assert!(store.get(-1).is_none());
        assert!(store.get(100).is_none());
    }

    #[test]
    #[should_panic(expected = "double release")]
    fn test_double_release_panics() {
        let mut store = EntStore::new();
        let id = store.assign_id(0u8);
        store.release(id);
        store.release(id);
    }

    #[test]
    #[should_panic(expected = "released entity")]
    fn test_write_after_release_panics() {
        let mut store = EntStore::new();
        let id = store.assign_id(0u8);
        store.release(id);
        store.get_mut(id);
    }
}
