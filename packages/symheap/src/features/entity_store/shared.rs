//! Copy-on-write handle for heap satellites
//!
//! Heap states share their satellites (live-root set, program-variable map,
//! predicate stores, ...) after a fork. Every mutating accessor goes through
//! [`Shared::make_mut`], which deep-copies the payload when another state
//! still holds it.

use serde::{Serialize, Serializer};
use std::ops::Deref;
use std::sync::Arc;

/// Shared handle wrapping an owned value, cloned on first mutation
#[derive(Debug, Default)]
pub struct Shared<T>(Arc<T>);

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Clone> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Ensure exclusivity, then hand out the payload for writing
    #[inline]
    pub fn make_mut(&mut self) -> &mut T {
        Arc::make_mut(&mut self.0)
    }

    /// True if no other heap state shares the payload
    #[inline]
    pub fn is_exclusive(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    /// True if both handles point to the same payload
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Serialize> Serialize for Shared<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
