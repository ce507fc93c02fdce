//! Invariant checks
//!
//! ```text
//! (a) arena coverage == ranges of live objects, per root
//! (b) live data objects of a root are pairwise disjoint
//! (c) used_by / used_by_gl == inverse of the object -> value map
//! (d) predicates only mention values of roots that still exist
//! ```
//!
//! `check_consistency` walks the whole heap and is meant for tests and
//! debugging. Writes re-check the touched root in debug builds, or when
//! `HeapConfig::check_arena_invariants` is set.

use super::core::SymHeapCore;
use super::domain::Entity;
use crate::errors::{Result, SymHeapError};
use crate::shared::models::{ObjId, ValId};
use std::collections::{BTreeMap, BTreeSet};

impl SymHeapCore {
    /// Verify every heap invariant
    pub fn check_consistency(&self) -> Result<()> {
        for &root in self.live_roots.iter() {
            self.check_root_arena(root)?;
        }
        self.check_back_refs()?;
        self.check_predicates()
    }

    /// Invariants (a) and (b) for one root
    pub fn check_root_arena(&self, root: ValId) -> Result<()> {
        let rd = self
            .root_data(root)
            .ok_or_else(|| SymHeapError::arena(root, "not a root"))?;
        let spans = rd.arena.spans();

        let mut data = Vec::new();
        for (&obj, &kind) in &rd.live_objs {
            let b = self
                .blk_data(obj)
                .ok_or_else(|| SymHeapError::arena(root, format!("live {} was released", obj)))?;
            if b.root != root || b.kind != kind {
                return Err(SymHeapError::arena(
                    root,
                    format!("{} is registered as {:?} of {}", obj, kind, b.root),
                ));
            }

            let expected = if b.size > 0 { vec![b.range()] } else { Vec::new() };
            let got = spans.get(&obj).cloned().unwrap_or_default();
            if got != expected {
                return Err(SymHeapError::arena(
                    root,
                    format!("{} covers {:?}, expected {:?}", obj, got, expected),
                ));
            }
            if kind.is_data() && b.size > 0 {
                data.push((b.range(), obj));
            }
        }
        if let Some(stray) = spans.keys().find(|obj| !rd.live_objs.contains_key(obj)) {
            return Err(SymHeapError::arena(root, format!("{} is in the arena but dead", stray)));
        }

        data.sort_by_key(|(range, _)| (range.start, range.end));
        let mut reach: Option<(i64, ObjId)> = None;
        for (range, obj) in data {
            if let Some((end, owner)) = reach {
                if range.start < end {
                    return Err(SymHeapError::OverlappingLiveObjects {
                        root,
                        first: owner,
                        second: obj,
                    });
                }
            }
            if reach.map_or(true, |(end, _)| range.end > end) {
                reach = Some((range.end, obj));
            }
        }
        Ok(())
    }

    /// Invariant (c)
    fn check_back_refs(&self) -> Result<()> {
        let mut used_by: BTreeMap<ValId, BTreeSet<ObjId>> = BTreeMap::new();
        let mut used_by_gl: BTreeMap<ValId, BTreeSet<ObjId>> = BTreeMap::new();
        let mut values = Vec::new();

        for id in self.ents.ids() {
            match self.ents.get(id) {
                Some(Entity::Block(b)) => {
                    let val = b.value;
                    if !val.is_valid() || val.is_reserved_scalar() || self.val_data(val).is_none() {
                        continue;
                    }
                    used_by.entry(val).or_default().insert(ObjId(id));
                    if let Some(root) = self.mem_root(val) {
                        used_by_gl.entry(root).or_default().insert(ObjId(id));
                    }
                }
                Some(Entity::Value(_)) => values.push(ValId(id)),
                None => {}
            }
        }

        let empty = BTreeSet::new();
        for val in values {
            let v = self.val_ref(val);
            let expected = used_by.get(&val).unwrap_or(&empty);
            if !val.is_reserved_scalar() && &v.used_by != expected {
                let obj = v
                    .used_by
                    .symmetric_difference(expected)
                    .next()
                    .copied()
                    .unwrap_or(ObjId::INVALID);
                return Err(SymHeapError::back_ref(obj, val, "used_by out of sync"));
            }

            if let Some(rd) = v.root_data() {
                let expected = used_by_gl.get(&val).unwrap_or(&empty);
                if &rd.used_by_gl != expected {
                    let obj = rd
                        .used_by_gl
                        .symmetric_difference(expected)
                        .next()
                        .copied()
                        .unwrap_or(ObjId::INVALID);
                    return Err(SymHeapError::back_ref(obj, val, "used_by_gl out of sync"));
                }
            }
        }
        Ok(())
    }

    /// Invariant (d)
    fn check_predicates(&self) -> Result<()> {
        let check = |val: ValId, what: &str| -> Result<()> {
            if self.val_data(val).is_none() {
                return Err(SymHeapError::dangling(val, format!("{} over a missing value", what)));
            }
            if self.val_target(val).is_gone() {
                return Err(SymHeapError::dangling(val, format!("{} over a destroyed target", what)));
            }
            Ok(())
        };

        for (a, b) in self.neq.iter() {
            check(a, "Neq")?;
            check(b, "Neq")?;
        }
        for ((a, b), _) in self.coin.iter() {
            check(a, "coincidence")?;
            check(b, "coincidence")?;
        }
        Ok(())
    }

    /// Re-check one root after a write when checks are enabled
    pub(crate) fn debug_check_root(&self, root: ValId) {
        if !cfg!(debug_assertions) && !self.ctx.config().check_arena_invariants {
            return;
        }
        if let Err(err) = self.check_root_arena(root) {
            panic!("heap {} is inconsistent: {}", self.heap_id, err);
        }
    }
}
