//! Disequality store
//!
//! Symmetric, irreflexive set of value pairs known to differ. Pairs are kept
//! sorted `(lt, gt)`; a per-value index answers "who is related to v"
//! without scanning the whole set.

use crate::shared::models::ValId;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::trace;

#[derive(Debug, Clone, Default, Serialize)]
pub struct NeqDb {
    pairs: BTreeSet<(ValId, ValId)>,
    #[serde(skip)]
    index: FxHashMap<ValId, BTreeSet<ValId>>,
}

#[inline]
fn sorted(a: ValId, b: ValId) -> (ValId, ValId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl NeqDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Record `a != b`
    ///
    /// # Panics
    /// If `a == b` (a value is never unequal to itself).
    pub fn add(&mut self, a: ValId, b: ValId) -> bool {
        assert_ne!(a, b, "Neq predicate over a single value {}", a);
        let added = self.pairs.insert(sorted(a, b));
        if added {
            self.index.entry(a).or_default().insert(b);
            self.index.entry(b).or_default().insert(a);
        }
        added
    }

    /// Retract `a != b`; returns false if it was not recorded
    pub fn del(&mut self, a: ValId, b: ValId) -> bool {
        assert_ne!(a, b, "Neq predicate over a single value {}", a);
        let removed = self.pairs.remove(&sorted(a, b));
        if removed {
            self.unindex(a, b);
            self.unindex(b, a);
        }
        removed
    }

    pub fn are_neq(&self, a: ValId, b: ValId) -> bool {
        a != b && self.pairs.contains(&sorted(a, b))
    }

    /// Values `v` is known to differ from, ascending
    pub fn gather_related_values(&self, v: ValId) -> Vec<ValId> {
        self.index
            .get(&v)
            .map(|rel| rel.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn mentions(&self, v: ValId) -> bool {
        self.index.contains_key(&v)
    }

    /// Drop every predicate over `v`; returns how many were removed
    pub fn kill_by_value(&mut self, v: ValId) -> usize {
        let Some(related) = self.index.remove(&v) else {
            return 0;
        };
        for &other in &related {
            self.pairs.remove(&sorted(v, other));
            self.unindex(other, v);
        }
        trace!(val = %v, removed = related.len(), "NeqDb: killed predicates");
        related.len()
    }

    /// Rewrite every predicate over `old` to `new`
    ///
    /// A predicate `old != new` turns into `new != new`, which cannot hold;
    /// it is dropped.
    pub fn replace_value(&mut self, old: ValId, new: ValId) {
        if old == new {
            return;
        }
        let Some(related) = self.index.remove(&old) else {
            return;
        };
        for other in related {
            self.pairs.remove(&sorted(old, other));
            self.unindex(other, old);
            if other == new {
                trace!(val = %new, "NeqDb: dropped self-referential predicate");
                continue;
            }
            self.add(new, other);
        }
    }

    /// All recorded pairs, sorted
    pub fn iter(&self) -> impl Iterator<Item = (ValId, ValId)> + '_ {
        self.pairs.iter().copied()
    }

    fn unindex(&mut self, key: ValId, other: ValId) {
        if let Some(rel) = self.index.get_mut(&key) {
            rel.remove(&other);
            if rel.is_empty() {
                self.index.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(id: i32) -> ValId {
        ValId(id)
    }

    #[test]
    fn test_symmetric() {
        let mut db = NeqDb::new();
        assert!(db.add(v(5), v(3)));
        assert!(db.are_neq(v(3), v(5)));
        assert!(db.are_neq(v(5), v(3)));
        assert!(!db.add(v(3), v(5)));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_del() {
        let mut db = NeqDb::new();
        db.add(v(3), v(4));
        assert!(db.del(v(4), v(3)));
        assert!(!db.are_neq(v(3), v(4)));
        assert!(!db.mentions(v(3)));
        assert!(!db.del(v(3), v(4)));
    }

    #[test]
    fn test_kill_by_value() {
        let mut db = NeqDb::new();
        db.add(v(3), v(4));
        db.add(v(3), v(5));
        db.add(v(4), v(5));

        assert_eq!(db.kill_by_value(v(3)), 2);
        assert!(!db.mentions(v(3)));
        assert_eq!(db.gather_related_values(v(4)), vec![v(5)]);
        assert_eq!(db.iter().collect::<Vec<_>>(), vec![(v(4), v(5))]);
    }

    #[test]
    fn test_replace_value() {
        let mut db = NeqDb::new();
        db.add(v(3), v(7));
        db.add(v(3), v(9));
        db.replace_value(v(3), v(9));

        // 3 != 9 collapses and is dropped, 3 != 7 becomes 9 != 7
        assert!(db.are_neq(v(9), v(7)));
        assert!(!db.mentions(v(3)));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_gather_related_values_sorted() {
        let mut db = NeqDb::new();
        db.add(v(10), v(8));
        db.add(v(10), v(4));
        db.add(v(10), v(0));
        assert_eq!(db.gather_related_values(v(10)), vec![v(0), v(4), v(8)]);
        assert!(db.gather_related_values(v(99)).is_empty());
    }

    #[test]
    #[should_panic(expected = "single value")]
    fn test_irreflexive() {
        NeqDb::new().add(v(3), v(3));
    }
}
