//! Heap-level predicate operations
//!
//! The stores in `features::predicates` only hold pairs; this module decides
//! what goes in, what can be proven without them and how they follow value
//! replacement and heap joins.

use super::core::SymHeapCore;
use super::domain::ValueTarget;
use crate::features::predicates::{Coincidence, NeqOp};
use crate::shared::models::ValId;
use std::collections::BTreeMap;
use tracing::{debug, trace};

impl SymHeapCore {
    /// Add or remove `a != b`
    ///
    /// Adding over an address of a destroyed root is a no-op.
    ///
    /// # Panics
    /// On sentinel ids, or when adding `a != a`.
    pub fn neq_op(&mut self, op: NeqOp, a: ValId, b: ValId) {
        assert!(
            a.is_valid() && b.is_valid(),
            "neq_op over sentinel {} / {}",
            a,
            b
        );
        match op {
            NeqOp::Add => {
                if self.val_target(a).is_gone() || self.val_target(b).is_gone() {
                    trace!(heap = self.heap_id, %a, %b, "ignored Neq over destroyed target");
                    return;
                }
                if !self.neq.are_neq(a, b) {
                    self.neq.make_mut().add(a, b);
                }
            }
            NeqOp::Del => {
                if a != b && self.neq.are_neq(a, b) {
                    self.neq.make_mut().del(a, b);
                }
            }
        }
    }

    /// True if `a != b` holds in every configuration of this heap
    pub fn prove_neq(&self, a: ValId, b: ValId) -> bool {
        self.prove_neq_by(a, b, &|v| self.val_target(v))
    }

    /// Core of [`prove_neq`](Self::prove_neq) with the target kind supplied
    /// by the caller (the segment layer reports `Abstract` for segments)
    pub(crate) fn prove_neq_by(
        &self,
        a: ValId,
        b: ValId,
        target_of: &dyn Fn(ValId) -> ValueTarget,
    ) -> bool {
        if !a.is_valid() || !b.is_valid() || a == b {
            return false;
        }
        if self.neq.are_neq(a, b) {
            return true;
        }

        let (ra, rb) = (self.val_root(a), self.val_root(b));
        if ra.is_valid() && ra == rb {
            return self
                .val_offset_range(a)
                .is_disjoint_with(&self.val_offset_range(b));
        }

        if let (Some(x), Some(y)) = (self.val_int_range(a), self.val_int_range(b)) {
            return x.is_disjoint_with(&y);
        }

        let known = |v: ValId| {
            v == ValId::NULL
                || matches!(
                    target_of(v),
                    ValueTarget::Static | ValueTarget::OnStack | ValueTarget::OnHeap
                )
        };
        known(a) && known(b) && self.mem_root(a) != self.mem_root(b)
    }

    /// Values with an explicit `!=` against `val`
    pub fn gather_related_values(&self, val: ValId) -> Vec<ValId> {
        self.neq.gather_related_values(val)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Replacement and cleanup
    // ═══════════════════════════════════════════════════════════════════════

    /// Substitute `new` for `old` in every object and predicate
    pub fn val_replace(&mut self, old: ValId, new: ValId) {
        if old == new {
            return;
        }
        let holders = self.used_by(old, false);
        for &obj in &holders {
            self.set_block_value_raw(obj, new);
        }
        if self.neq.mentions(old) {
            self.neq.make_mut().replace_value(old, new);
        }
        if self.coin.mentions(old) {
            self.coin.make_mut().replace_value(old, new);
        }
        trace!(heap = self.heap_id, %old, %new, holders = holders.len(), "replaced value");
    }

    /// Drop `!=` facts over unknown values nothing refers to any more
    pub fn pack(&mut self) -> usize {
        let dead: Vec<(ValId, ValId)> = self
            .neq
            .iter()
            .filter(|&(a, b)| self.is_unreferenced_unknown(a) || self.is_unreferenced_unknown(b))
            .collect();
        if dead.is_empty() {
            return 0;
        }

        let neq = self.neq.make_mut();
        for &(a, b) in &dead {
            neq.del(a, b);
        }
        debug!(heap = self.heap_id, dropped = dead.len(), "packed predicates");
        dead.len()
    }

    fn is_unreferenced_unknown(&self, val: ValId) -> bool {
        let Some(v) = self.val_data(val) else {
            return true;
        };
        v.code == ValueTarget::Unknown
            && v.val_root == val
            && v.used_by.is_empty()
            && v.anchor_data().map_or(true, |d| d.off_map.is_empty())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transfer between heaps
    // ═══════════════════════════════════════════════════════════════════════

    /// Copy the predicates whose values all have an image in `map` into
    /// `dst`; `NULL` and `TRUE` map to themselves
    pub fn copy_relevant_preds(&self, dst: &mut SymHeapCore, map: &BTreeMap<ValId, ValId>) {
        let image = |v: ValId| image_of(map, v);

        for (a, b) in self.neq.iter() {
            if let (Some(ma), Some(mb)) = (image(a), image(b)) {
                if ma != mb {
                    dst.neq_op(NeqOp::Add, ma, mb);
                }
            }
        }
        for ((a, b), coin) in self.coin.iter() {
            if let (Some(ma), Some(mb), Some(diff)) = (image(a), image(b), image(coin.diff)) {
                if ma == mb {
                    continue;
                }
                dst.coin.make_mut().insert_directed(
                    ma,
                    mb,
                    Coincidence {
                        diff,
                        negated: coin.negated,
                    },
                );
            }
        }
    }

    /// True if every `!=` fact of this heap holds in `other` under `map`
    pub fn match_preds(&self, other: &SymHeapCore, map: &BTreeMap<ValId, ValId>) -> bool {
        self.neq.iter().all(|(a, b)| {
            match (image_of(map, a), image_of(map, b)) {
                (Some(ma), Some(mb)) => other.neq.are_neq(ma, mb) || other.prove_neq(ma, mb),
                _ => false,
            }
        })
    }
}

fn image_of(map: &BTreeMap<ValId, ValId>, val: ValId) -> Option<ValId> {
    if val.is_reserved_scalar() {
        return Some(val);
    }
    map.get(&val).copied()
}
