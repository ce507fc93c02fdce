//! Hash-consing of custom constants
//!
//! The mapper only remembers which value id stands for which constant; the
//! heap mints the values. Integers `0` and `1` are pinned to `NULL` and
//! `TRUE` and never enter the map.

use super::domain::{CustomKey, CustomValue};
use crate::shared::models::ValId;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct CustomValueMapper {
    map: FxHashMap<CustomKey, ValId>,
}

impl CustomValueMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Existing canonical value for `cv`, if any
    ///
    /// Intervals wider than one point always miss.
    pub fn lookup(&self, cv: &CustomValue) -> Option<ValId> {
        match cv.key()? {
            CustomKey::Int(0) => Some(ValId::NULL),
            CustomKey::Int(1) => Some(ValId::TRUE),
            key => self.map.get(&key).copied(),
        }
    }

    /// Remember `val` as the canonical value for `cv`
    ///
    /// # Panics
    /// If `cv` is already mapped, or is a pinned or non-deduplicated constant.
    pub fn register(&mut self, cv: &CustomValue, val: ValId) {
        let key = match cv.key() {
            Some(CustomKey::Int(0 | 1)) | None => {
                panic!("custom value {} is not subject to hash-consing", cv)
            }
            Some(key) => key,
        };
        let prev = self.map.insert(key, val);
        assert!(prev.is_none(), "custom value {} mapped twice", cv);
    }
}
