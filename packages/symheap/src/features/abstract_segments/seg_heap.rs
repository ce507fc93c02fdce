//! Heap state with list-segment metadata
//!
//! ```text
//! SymHeap ::= SymHeapCore × (root -> SegMeta)
//! ```
//!
//! Segments are ordinary heap roots carrying metadata; the core never looks
//! at it. This layer reports their addresses as `Abstract`, turns `!=`
//! between a segment and its successor into a minimum length, and lets
//! `prove_neq` walk chains of possibly-empty segments.

use super::domain::{AbstractKind, BindingOff, SegMeta, SegmentSnapshot};
use super::ports::SegmentSplicer;
use crate::errors::Result;
use crate::features::entity_store::Shared;
use crate::features::predicates::NeqOp;
use crate::features::symbolic_heap::domain::BlockKind;
use crate::features::symbolic_heap::{HeapContext, HeapSnapshot, SymHeapCore, ValueTarget};
use crate::shared::models::ValId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, trace};

/// Heap state handed to the symbolic executor
///
/// Dereferences to [`SymHeapCore`] for everything segments do not change.
/// `Clone` forks the state like the core does.
#[derive(Debug, Clone)]
pub struct SymHeap {
    core: SymHeapCore,
    pub(crate) segs: Shared<BTreeMap<ValId, SegMeta>>,
}

impl Deref for SymHeap {
    type Target = SymHeapCore;

    fn deref(&self) -> &SymHeapCore {
        &self.core
    }
}

impl DerefMut for SymHeap {
    fn deref_mut(&mut self) -> &mut SymHeapCore {
        &mut self.core
    }
}

impl SymHeap {
    pub fn new(ctx: Arc<HeapContext>) -> Self {
        Self {
            core: SymHeapCore::new(ctx),
            segs: Shared::new(BTreeMap::new()),
        }
    }

    pub fn core(&self) -> &SymHeapCore {
        &self.core
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Abstraction kind
    // ═══════════════════════════════════════════════════════════════════════

    /// Target kind; addresses of live segments report `Abstract`
    pub fn val_target(&self, val: ValId) -> ValueTarget {
        let code = self.core.val_target(val);
        if code != ValueTarget::OnHeap {
            return code;
        }
        match self.mem_root(val) {
            Some(root) if self.segs.contains_key(&root) => ValueTarget::Abstract,
            _ => code,
        }
    }

    /// True if `val` points into a segment
    pub fn val_target_is_abstract(&self, val: ValId) -> bool {
        self.seg_of(val).is_some()
    }

    /// Mark the heap root `root` as abstract
    ///
    /// An existing see-through root may only become a singly-linked segment
    /// with the same binding.
    ///
    /// # Panics
    /// If `root` is not a live heap root, or on any other kind transition.
    pub fn val_target_set_abstract(&mut self, root: ValId, kind: AbstractKind, binding: BindingOff) {
        assert!(
            self.mem_root(root) == Some(root) && self.core.val_target(root) == ValueTarget::OnHeap,
            "only live heap roots can be abstract, got {}",
            root
        );

        if let Some(meta) = self.segs.get(&root).copied() {
            assert!(
                meta.kind == AbstractKind::SeeThrough
                    && kind == AbstractKind::Sls
                    && meta.binding == binding,
                "illegal abstraction of {}: {:?} -> {:?}",
                root,
                meta.kind,
                kind
            );
            if let Some(meta) = self.segs.make_mut().get_mut(&root) {
                meta.kind = kind;
            }
            debug!(heap = self.heap_id(), %root, "see-through root became a list segment");
            return;
        }

        self.segs.make_mut().insert(
            root,
            SegMeta {
                kind,
                binding,
                min_length: 0,
            },
        );
        debug!(heap = self.heap_id(), %root, ?kind, ?binding, "root became abstract");
    }

    /// Turn an abstract root back into a concrete one
    ///
    /// # Panics
    /// If `root` is not abstract.
    pub fn val_target_set_concrete(&mut self, root: ValId) {
        let removed = self.segs.make_mut().remove(&root);
        assert!(removed.is_some(), "{} is not abstract", root);
        debug!(heap = self.heap_id(), %root, "root became concrete");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Segment metadata
    // ═══════════════════════════════════════════════════════════════════════

    pub fn seg_kind(&self, val: ValId) -> Option<AbstractKind> {
        self.seg_of(val).map(|(_, meta)| meta.kind)
    }

    pub fn seg_binding(&self, val: ValId) -> Option<BindingOff> {
        self.seg_of(val).map(|(_, meta)| meta.binding)
    }

    /// Minimum number of nodes behind `val`
    ///
    /// Concrete objects count as one node, see-through and obj-or-null
    /// roots as possibly none.
    pub fn seg_min_length(&self, val: ValId) -> u32 {
        match self.seg_of(val) {
            None => 1,
            Some((_, meta)) if meta.kind.may_be_empty() => 0,
            Some((_, meta)) => meta.min_length,
        }
    }

    /// # Panics
    /// If `val` does not point into a list segment.
    pub fn seg_set_min_length(&mut self, val: ValId, len: u32) {
        let (root, meta) = self
            .seg_of(val)
            .unwrap_or_else(|| panic!("{} is not abstract", val));
        assert!(
            meta.kind.is_list_segment(),
            "{:?} at {} has no length",
            meta.kind,
            root
        );

        let peer = self.dls_peer_of(root);
        let segs = self.segs.make_mut();
        for r in std::iter::once(root).chain(peer) {
            if let Some(meta) = segs.get_mut(&r) {
                meta.min_length = len;
            }
        }
        trace!(heap = self.heap_id(), %root, len, "segment length bound");
    }

    /// Other end of the doubly-linked segment at `val`; `INVALID` if its
    /// `prev` field does not lead to one
    ///
    /// # Panics
    /// If `val` does not point into a DLS.
    pub fn dl_seg_peer(&self, val: ValId) -> ValId {
        let root = match self.seg_of(val) {
            Some((root, meta)) if meta.kind == AbstractKind::Dls => root,
            _ => panic!("{} is not a doubly-linked segment", val),
        };
        self.dls_peer_of(root).unwrap_or(ValId::INVALID)
    }

    pub(crate) fn seg_of(&self, val: ValId) -> Option<(ValId, SegMeta)> {
        let root = self.mem_root(val)?;
        if self.core.val_target(root).is_gone() {
            return None;
        }
        self.segs.get(&root).map(|meta| (root, *meta))
    }

    pub(crate) fn dls_peer_of(&self, root: ValId) -> Option<ValId> {
        let meta = self.segs.get(&root)?;
        if meta.kind != AbstractKind::Dls {
            return None;
        }
        let prev = self.peek_ptr(root, meta.binding.prev)?;
        let peer = self.mem_root(prev)?;
        match self.segs.get(&peer) {
            Some(m) if m.kind == AbstractKind::Dls && peer != root => Some(peer),
            _ => None,
        }
    }

    /// Value the segment at `root` leads to; for a DLS the value behind the
    /// far end
    pub(crate) fn seg_next_value(&self, root: ValId) -> Option<ValId> {
        let meta = self.segs.get(&root)?;
        let end = self.dls_peer_of(root).unwrap_or(root);
        self.peek_ptr(end, meta.binding.next)
    }

    /// Value of the live pointer at `off` in `root`, without creating
    /// anything; zero-filled bytes read as `NULL`
    pub(crate) fn peek_ptr(&self, root: ValId, off: i64) -> Option<ValId> {
        let rd = self.root_data(root)?;
        let mut zero_filled = false;
        for obj in rd.arena.ids_at(off) {
            let b = self.blk(obj);
            match b.kind {
                BlockKind::DataPtr if b.off == off && b.value.is_valid() => return Some(b.value),
                BlockKind::Uniform if b.value == ValId::NULL => zero_filled = true,
                _ => {}
            }
        }
        zero_filled.then_some(ValId::NULL)
    }

    /// Segment root whose head address is `addr` and whose successor is
    /// `next`
    fn seg_with_successor(&self, addr: ValId, next: ValId) -> Option<ValId> {
        let (root, meta) = self.seg_of(addr)?;
        if !meta.kind.is_list_segment() || self.val_root(addr) != root {
            return None;
        }
        if self.val_offset_range(addr).is_singular() && self.val_offset(addr) != meta.binding.head {
            return None;
        }
        (self.seg_next_value(root)? == next).then_some(root)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Predicates
    // ═══════════════════════════════════════════════════════════════════════

    /// Add or remove `a != b`
    ///
    /// Between a list segment and its successor the fact is kept as the
    /// segment's minimum length instead: adding makes the segment non-empty,
    /// removing weakens the bound by one node.
    pub fn neq_op(&mut self, op: NeqOp, a: ValId, b: ValId) {
        let seg = self
            .seg_with_successor(a, b)
            .or_else(|| self.seg_with_successor(b, a));
        let Some(seg) = seg else {
            self.core.neq_op(op, a, b);
            return;
        };

        let len = self.seg_min_length(seg);
        let len = match op {
            NeqOp::Add => len.max(1),
            NeqOp::Del => len.saturating_sub(1),
        };
        self.seg_set_min_length(seg, len);
    }

    /// True if `a != b` holds in every configuration
    ///
    /// Beyond what the core proves, a known address differs from a value
    /// that reaches, through possibly-empty segments, either a different
    /// known address or a non-empty segment.
    pub fn prove_neq(&self, a: ValId, b: ValId) -> bool {
        let target = |v: ValId| self.val_target(v);
        if self.core.prove_neq_by(a, b, &target) {
            return true;
        }

        let known = |v: ValId| {
            v == ValId::NULL
                || matches!(
                    target(v),
                    ValueTarget::Static | ValueTarget::OnStack | ValueTarget::OnHeap
                )
        };
        let (fixed, mut val) = match (known(a), known(b)) {
            (true, _) => (a, b),
            (false, true) => (b, a),
            _ => return false,
        };

        let limit = self.context().config().max_prove_neq_steps;
        let mut seen = BTreeSet::new();
        while val.is_valid() && seen.len() < limit && seen.insert(val) {
            if known(val) {
                return val != fixed;
            }
            if target(val) != ValueTarget::Abstract {
                return false;
            }
            if self.core.prove_neq_by(fixed, val, &target) {
                return true;
            }

            let Some(root) = self.mem_root(val) else {
                return false;
            };
            if self.seg_min_length(root) > 0 {
                return true;
            }
            match self.seg_next_value(root) {
                Some(next) => val = next,
                None => return false,
            }
        }
        false
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Merge, destruction, cloning
    // ═══════════════════════════════════════════════════════════════════════

    /// Unify `val` with `replace_by`
    ///
    /// An unknown value is simply replaced. A segment address is replaced
    /// only after `splicer` took the segment out of its list; the segment
    /// (and its DLS peer) is then destroyed. Two different known values
    /// cannot be merged.
    pub fn val_merge(
        &mut self,
        val: ValId,
        replace_by: ValId,
        splicer: &mut dyn SegmentSplicer,
    ) -> bool {
        if val == replace_by {
            return true;
        }
        let (val, replace_by) = if self.is_known_value(val) {
            (replace_by, val)
        } else {
            (val, replace_by)
        };
        if self.is_known_value(val) {
            trace!(heap = self.heap_id(), %val, %replace_by, "refused to merge known values");
            return false;
        }

        if self.val_target(val) != ValueTarget::Abstract {
            self.core.val_replace(val, replace_by);
            return true;
        }

        let Some((seg, _)) = self.seg_of(val) else {
            return false;
        };
        if !splicer.splice_out(self, val, replace_by) {
            debug!(heap = self.heap_id(), %seg, "segment splice-out refused");
            return false;
        }

        let peer = self.dls_peer_of(seg);
        self.core.val_replace(val, replace_by);
        for root in std::iter::once(seg).chain(peer) {
            if !self.core.val_target(root).is_gone() {
                self.val_destroy_target(root);
            }
        }
        debug!(heap = self.heap_id(), %seg, %replace_by, "merged segment");
        true
    }

    fn is_known_value(&self, val: ValId) -> bool {
        val == ValId::NULL
            || matches!(
                self.val_target(val),
                ValueTarget::Static | ValueTarget::OnStack | ValueTarget::OnHeap | ValueTarget::Custom
            )
    }

    /// Invalidate a root and forget its segment metadata
    pub fn val_destroy_target(&mut self, root: ValId) {
        self.core.val_destroy_target(root);
        if self.segs.contains_key(&root) {
            self.segs.make_mut().remove(&root);
        }
    }

    /// Copy of a heap root together with its prototypes
    ///
    /// A DLS end is cloned with its peer. Pointers between the cloned roots
    /// are redirected to the copies; everything else keeps pointing where it
    /// pointed. Segment metadata is copied.
    pub fn val_clone(&mut self, root: ValId) -> ValId {
        let mut order = vec![root];
        order.extend(self.dls_peer_of(root));
        let mut pending = order.clone();
        while let Some(r) = pending.pop() {
            for proto in self.collect_prototypes_of(r, false).unwrap_or_default() {
                if !order.contains(&proto) {
                    order.push(proto);
                    pending.push(proto);
                }
            }
        }

        let mut images = BTreeMap::new();
        for &old in &order {
            let new = self.core.val_clone(old);
            if let Some(meta) = self.segs.get(&old).copied() {
                self.segs.make_mut().insert(new, meta);
            }
            images.insert(old, new);
        }

        for &new in images.values() {
            for obj in self.gather_live_pointers(new) {
                let val = self.blk(obj).value;
                if self.val_target(val) == ValueTarget::Range {
                    continue;
                }
                let Some(image) = self.mem_root(val).and_then(|r| images.get(&r).copied()) else {
                    continue;
                };
                let off = self.val_offset(val);
                let redirected = self.core.val_by_offset(image, off);
                self.core.set_block_value_raw(obj, redirected);
            }
        }

        debug!(heap = self.heap_id(), %root, copies = images.len(), "cloned abstract root");
        images[&root]
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Snapshot
    // ═══════════════════════════════════════════════════════════════════════

    pub fn snapshot(&self) -> SymHeapSnapshot {
        SymHeapSnapshot {
            heap: self.core.snapshot(),
            segments: self
                .segs
                .iter()
                .map(|(&root, &meta)| SegmentSnapshot { root, meta })
                .collect(),
        }
    }
}

/// Core snapshot plus segment metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymHeapSnapshot {
    #[serde(flatten)]
    pub heap: HeapSnapshot,
    pub segments: Vec<SegmentSnapshot>,
}

impl SymHeapSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::abstract_segments::ports::TrustingSplicer;
    use crate::features::abstract_segments::test_support::{seg_heap, sls_chain, NEXT};
    use crate::features::symbolic_heap::ValueOrigin;

    #[test]
    fn test_set_abstract_and_concrete() {
        let mut sh = seg_heap();
        let root = sh.heap_alloc(16);
        let at8 = sh.val_by_offset(root, 8);
        assert_eq!(sh.val_target(root), ValueTarget::OnHeap);

        sh.val_target_set_abstract(root, AbstractKind::SeeThrough, BindingOff::singly(0, NEXT));
        assert_eq!(sh.val_target(at8), ValueTarget::Abstract);
        assert!(sh.val_target_is_abstract(root));
        assert_eq!(sh.seg_min_length(root), 0);

        sh.val_target_set_abstract(root, AbstractKind::Sls, BindingOff::singly(0, NEXT));
        assert_eq!(sh.seg_kind(root), Some(AbstractKind::Sls));

        sh.val_target_set_concrete(root);
        assert_eq!(sh.val_target(root), ValueTarget::OnHeap);
        assert_eq!(sh.seg_min_length(root), 1);
        assert!(sh.seg_binding(root).is_none());
    }

    #[test]
    #[should_panic(expected = "illegal abstraction")]
    fn test_sls_is_terminal() {
        let mut sh = seg_heap();
        let root = sh.heap_alloc(16);
        sh.val_target_set_abstract(root, AbstractKind::Sls, BindingOff::singly(0, NEXT));
        sh.val_target_set_abstract(root, AbstractKind::Dls, BindingOff::new(0, NEXT, 0));
    }

    #[test]
    #[should_panic(expected = "illegal abstraction")]
    fn test_obj_or_null_cannot_become_segment() {
        let mut sh = seg_heap();
        let root = sh.heap_alloc(16);
        sh.val_target_set_abstract(root, AbstractKind::ObjOrNull, BindingOff::singly(0, NEXT));
        sh.val_target_set_abstract(root, AbstractKind::Sls, BindingOff::singly(0, NEXT));
    }

    #[test]
    #[should_panic(expected = "only live heap roots")]
    fn test_stack_root_cannot_be_abstract() {
        let mut sh = seg_heap();
        sh.val_target_set_abstract(ValId::ADDR_OF_RET, AbstractKind::Sls, BindingOff::default());
    }

    #[test]
    fn test_neq_with_successor_sets_min_length() {
        let mut sh = seg_heap();
        let (seg, next) = sls_chain(&mut sh);

        assert_eq!(sh.seg_min_length(seg), 0);
        sh.neq_op(NeqOp::Add, seg, next);
        assert_eq!(sh.seg_min_length(seg), 1);
        assert!(sh.gather_related_values(seg).is_empty());

        sh.seg_set_min_length(seg, 3);
        sh.neq_op(NeqOp::Add, next, seg);
        assert_eq!(sh.seg_min_length(seg), 3);
        sh.neq_op(NeqOp::Del, seg, next);
        assert_eq!(sh.seg_min_length(seg), 2);
    }

    #[test]
    fn test_prove_neq_walks_possibly_empty_segments() {
        let mut sh = seg_heap();
        let (seg, next) = sls_chain(&mut sh);
        let other = sh.heap_alloc(8);

        // seg may be empty and then equals next, a concrete block
        assert!(sh.prove_neq(other, seg));
        assert!(!sh.prove_neq(next, seg));

        sh.neq_op(NeqOp::Add, seg, next);
        assert!(sh.prove_neq(next, seg));
        assert!(sh.prove_neq(seg, ValId::NULL));
    }

    #[test]
    fn test_prove_neq_with_unknown_successor() {
        let mut sh = seg_heap();
        let seg = sh.heap_alloc(16);
        let unknown = sh.val_create(ValueTarget::Unknown, ValueOrigin::Unknown);
        let at_next = sh.val_by_offset(seg, NEXT);
        let ptr = sh.ptr_at(at_next);
        sh.obj_set_value(ptr, unknown);
        sh.val_target_set_abstract(seg, AbstractKind::Sls, BindingOff::singly(0, NEXT));

        assert!(!sh.prove_neq(ValId::NULL, seg));
    }

    #[test]
    fn test_merge_unknown_value() {
        let mut sh = seg_heap();
        let root = sh.heap_alloc(8);
        let ptr = sh.ptr_at(root);
        let unknown = sh.val_create(ValueTarget::Unknown, ValueOrigin::Unknown);
        sh.obj_set_value(ptr, unknown);

        assert!(sh.val_merge(ValId::NULL, unknown, &mut TrustingSplicer));
        assert_eq!(sh.value_of(ptr), ValId::NULL);
        assert!(!sh.val_merge(ValId::NULL, root, &mut TrustingSplicer));
    }

    #[test]
    fn test_merge_segment_after_splice() {
        struct Refuse;
        impl SegmentSplicer for Refuse {
            fn splice_out(&mut self, _: &mut SymHeap, _: ValId, _: ValId) -> bool {
                false
            }
        }

        let mut sh = seg_heap();
        let (seg, next) = sls_chain(&mut sh);
        let head = sh.heap_alloc(8);
        let holder = sh.ptr_at(head);
        sh.obj_set_value(holder, seg);

        assert!(!sh.val_merge(seg, next, &mut Refuse));
        assert!(sh.val_target_is_abstract(seg));

        assert!(sh.val_merge(seg, next, &mut TrustingSplicer));
        assert_eq!(sh.value_of(holder), next);
        assert_eq!(sh.core().val_target(seg), ValueTarget::Deleted);
        assert!(sh.seg_binding(seg).is_none());
        assert!(sh.check_consistency().is_ok());
    }

    #[test]
    fn test_destroy_forgets_metadata() {
        let mut sh = seg_heap();
        let (seg, _) = sls_chain(&mut sh);
        sh.val_destroy_target(seg);
        assert!(sh.segs.is_empty());
        assert_eq!(sh.val_target(seg), ValueTarget::Deleted);
    }

    #[test]
    fn test_fork_isolates_metadata() {
        let mut sh = seg_heap();
        let (seg, next) = sls_chain(&mut sh);
        let fork = sh.clone();

        sh.neq_op(NeqOp::Add, seg, next);
        assert_eq!(sh.seg_min_length(seg), 1);
        assert_eq!(fork.seg_min_length(seg), 0);
    }

    #[test]
    fn test_snapshot_lists_segments() {
        let mut sh = seg_heap();
        let (seg, _) = sls_chain(&mut sh);
        let snap = sh.snapshot();
        assert_eq!(snap.segments.len(), 1);
        assert_eq!(snap.segments[0].root, seg);

        let json = snap.to_json().unwrap();
        assert!(json.contains("\"Sls\""));
        assert!(json.contains("\"roots\""));
    }

    #[test]
    fn test_heap_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SymHeap>();
    }
}
