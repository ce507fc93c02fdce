//! Typed objects and block writes
//!
//! Objects come into existence on the first typed lookup and receive a value
//! lazily, on the first read or write. Writes go through the
//! reinterpretation engine in `reinterpret`.

use super::core::SymHeapCore;
use super::domain::{BaseValue, BlockEntity, BlockKind, PrecisionLossKind, ValueKind, ValueOrigin, ValueTarget};
use crate::shared::models::{same_type, ObjId, TypeRef, ValId};
use tracing::trace;

impl SymHeapCore {
    // ═══════════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════════

    /// Object of type `clt` at `addr`, created on first access
    ///
    /// Returns `INVALID` if `addr` cannot be dereferenced or the object would
    /// not fit into its root. The return slot grows on demand.
    pub fn obj_at(&mut self, addr: ValId, clt: &TypeRef) -> ObjId {
        if !self.val_target(addr).is_possible_to_deref() {
            return ObjId::INVALID;
        }
        let Some(root) = self.mem_root(addr) else {
            return ObjId::INVALID;
        };
        let off = self.val_offset(addr);
        self.obj_at_root(root, off, clt)
    }

    /// Object of the generic data pointer type at `addr`
    pub fn ptr_at(&mut self, addr: ValId) -> ObjId {
        let clt = self.ctx.storage().generic_data_ptr();
        self.obj_at(addr, &clt)
    }

    pub(crate) fn obj_at_root(&mut self, root: ValId, off: i64, clt: &TypeRef) -> ObjId {
        let size = clt.size as i64;
        if off < 0 {
            return ObjId::INVALID;
        }
        if off + size > self.root_ref(root).size {
            if root != ValId::ADDR_OF_RET {
                return ObjId::INVALID;
            }
            self.root_mut(root).size = off + size;
        }
        if off == 0 {
            self.root_mut(root).last_known_clt = Some(clt.clone());
        }

        if let Some(obj) = self.find_typed_obj(root, off, clt) {
            return obj;
        }
        self.create_typed_obj(root, off, clt)
    }

    /// Existing object with matching placement and type; live ones first
    fn find_typed_obj(&self, root: ValId, off: i64, clt: &TypeRef) -> Option<ObjId> {
        let rd = self.root_ref(root);
        let size = clt.size as i64;
        let matches = |obj: &ObjId| {
            let b = self.blk(*obj);
            b.off == off
                && b.size == size
                && b.kind != BlockKind::Uniform
                && b.clt.as_ref().is_some_and(|t| same_type(t, clt))
        };

        if size > 0 {
            if let Some(obj) = rd.arena.exact_match(off..off + size).into_iter().find(&matches) {
                return Some(obj);
            }
        }
        rd.all_objs.get(&off)?.iter().copied().find(matches)
    }

    pub(crate) fn create_typed_obj(&mut self, root: ValId, off: i64, clt: &TypeRef) -> ObjId {
        let kind = BlockKind::for_type(clt);
        let obj = self.assign_block(BlockEntity::new(
            kind,
            root,
            off,
            clt.size as i64,
            Some(clt.clone()),
        ));
        self.root_mut(root).register_obj(off, obj);

        if kind == BlockKind::Composite {
            let cv = self.assign_value(|id| {
                BaseValue::new_self_rooted(
                    id,
                    ValueTarget::Composite,
                    ValueOrigin::Assigned,
                    ValueKind::Composite(obj),
                )
            });
            self.set_block_value_raw(obj, cv);
            self.make_live(obj);
        }
        trace!(heap = self.heap_id, %root, off, %obj, ?kind, "created object");
        obj
    }

    /// Address of `obj`
    pub fn placed_at(&mut self, obj: ObjId) -> ValId {
        let Some(b) = self.blk_data(obj) else {
            return ValId::INVALID;
        };
        let (root, off) = (b.root, b.off);
        self.val_by_offset(root, off)
    }

    pub fn obj_type(&self, obj: ObjId) -> Option<TypeRef> {
        self.blk_data(obj)?.clt.clone()
    }

    pub fn obj_block_kind(&self, obj: ObjId) -> Option<BlockKind> {
        self.blk_data(obj).map(|b| b.kind)
    }

    /// Root the object belongs to
    pub fn obj_root(&self, obj: ObjId) -> ValId {
        self.blk_data(obj).map(|b| b.root).unwrap_or(ValId::INVALID)
    }

    /// True if `obj` exists and its root has not been destroyed
    pub fn obj_is_valid(&self, obj: ObjId) -> bool {
        self.blk_data(obj)
            .is_some_and(|b| !self.val_target(b.root).is_gone())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Read
    // ═══════════════════════════════════════════════════════════════════════

    /// Current value of `obj`, initialized on first read
    ///
    /// Bytes covered by zero-filled blocks read as `NULL`. Bytes covered by
    /// differently placed live data read as a fresh reinterpreted unknown
    /// and the object stays dead. Untouched memory reads as a fresh
    /// uninitialized unknown and the object becomes live.
    pub fn value_of(&mut self, obj: ObjId) -> ValId {
        let Some(b) = self.blk_data(obj) else {
            return ValId::INVALID;
        };
        let (root, value) = (b.root, b.value);
        if self.val_target(root).is_gone() {
            return ValId::DEREF_FAILED;
        }
        if value != ValId::INVALID {
            return value;
        }
        self.init_lazily(obj)
    }

    fn init_lazily(&mut self, obj: ObjId) -> ValId {
        let b = self.blk(obj);
        let (root, range) = (b.root, b.range());
        let rd = self.root_ref(root);

        let mut data_hit = None;
        let mut uniforms = Vec::new();
        for other in rd.arena.overlaps(range.clone(), Some(obj)) {
            let ob = self.blk(other);
            match ob.kind {
                BlockKind::DataPtr | BlockKind::DataObj => data_hit = Some(other),
                BlockKind::Uniform => uniforms.push((ob.range(), ob.value)),
                BlockKind::Composite => {}
            }
        }

        if let Some(other) = data_hit {
            let val = self.mint_unknown(ValueOrigin::Reinterpret);
            self.set_block_value_raw(obj, val);
            self.report(
                PrecisionLossKind::ReinterpretedRead,
                format!("{} at {:?} of {} overlaps live {}", obj, range, root, other),
            );
            return val;
        }

        if !uniforms.is_empty() {
            let zero_filled = uniforms.iter().all(|(_, tpl)| *tpl == ValId::NULL)
                && covers(&mut uniforms.iter().map(|(r, _)| r.clone()).collect(), &range);
            let val = if zero_filled {
                ValId::NULL
            } else {
                self.mint_unknown(ValueOrigin::Reinterpret)
            };
            self.set_value_core(obj, val);
            return val;
        }

        let origin = if root == ValId::ADDR_OF_RET {
            ValueOrigin::Unknown
        } else if rd.cvar.is_some() {
            ValueOrigin::StackUninit
        } else {
            ValueOrigin::HeapUninit
        };
        let val = self.mint_unknown(origin);
        self.set_block_value_raw(obj, val);
        self.make_live(obj);
        val
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Write
    // ═══════════════════════════════════════════════════════════════════════

    /// Store `val` into `obj`
    ///
    /// Writing a composite value into a composite object copies the bytes of
    /// the source object.
    ///
    /// # Panics
    /// If `obj` is a uniform block, belongs to a destroyed root, or is
    /// composite while `val` is not.
    pub fn obj_set_value(&mut self, obj: ObjId, val: ValId) {
        let b = self.blk(obj);
        let (root, kind, size) = (b.root, b.kind, b.size);
        assert!(kind != BlockKind::Uniform, "direct write to uniform block {}", obj);
        assert!(
            !self.val_target(root).is_gone(),
            "write to {} of destroyed root {}",
            obj,
            root
        );

        if kind == BlockKind::Composite {
            let src = self.val_get_composite_obj(val);
            assert!(src.is_valid(), "non-composite {} written to composite {}", val, obj);
            if src == obj {
                return;
            }
            let dst_addr = self.placed_at(obj);
            let src_addr = self.placed_at(src);
            self.copy_block_of_raw_memory(dst_addr, src_addr, size);
            return;
        }

        self.set_value_core(obj, val);
    }

    /// Fill `size` bytes at `addr` with `tpl`
    ///
    /// # Panics
    /// If `addr` cannot be dereferenced or the block does not fit.
    pub fn write_uniform_block(&mut self, addr: ValId, tpl: ValId, size: i64) {
        let (root, off) = self.deref_parts(addr);
        self.write_uniform_at(root, off, size, tpl);
    }

    pub(crate) fn write_uniform_at(&mut self, root: ValId, off: i64, size: i64, tpl: ValId) {
        if size <= 0 {
            return;
        }
        self.ensure_fits(root, off, size);
        let ub = self.assign_block(BlockEntity::new(BlockKind::Uniform, root, off, size, None));
        self.set_value_core(ub, tpl);
    }

    /// Copy `size` bytes from `src` to `dst`
    ///
    /// The destination window is overwritten by unknown bytes first. Between
    /// different roots, the live content of the source window is then
    /// re-created at the destination: typed objects lying fully inside the
    /// window and uniform blocks clipped to it.
    ///
    /// # Panics
    /// If either address cannot be dereferenced or a window does not fit.
    pub fn copy_block_of_raw_memory(&mut self, dst: ValId, src: ValId, size: i64) {
        let (dst_root, dst_off) = self.deref_parts(dst);
        let (src_root, src_off) = self.deref_parts(src);
        if size <= 0 {
            return;
        }
        self.ensure_fits(dst_root, dst_off, size);
        self.ensure_fits(src_root, src_off, size);

        let mut blocks = Vec::new();
        let mut partial = false;
        if dst_root != src_root {
            let window = src_off..src_off + size;
            let rd = self.root_ref(src_root);
            for (&obj, &kind) in &rd.live_objs {
                let b = self.blk(obj);
                let (lo, hi) = (b.off.max(window.start), (b.off + b.size).min(window.end));
                if lo >= hi {
                    continue;
                }
                match kind {
                    BlockKind::Composite => {}
                    BlockKind::Uniform => blocks.push((kind, lo - src_off, hi - lo, b.value, None)),
                    _ if lo == b.off && hi == b.off + b.size => {
                        blocks.push((kind, lo - src_off, b.size, b.value, b.clt.clone()))
                    }
                    _ => partial = true,
                }
            }
        }

        let tpl = self.mint_unknown(ValueOrigin::Unknown);
        self.write_uniform_at(dst_root, dst_off, size, tpl);

        if dst_root == src_root {
            self.report(
                PrecisionLossKind::SameRootBlockCopy,
                format!("{} bytes copied within {}", size, dst_root),
            );
            return;
        }
        if partial {
            self.report(
                PrecisionLossKind::PartialBlockCopy,
                format!("objects of {} cross the copied window", src_root),
            );
        }

        for (kind, rel, len, value, clt) in blocks {
            match (kind, clt) {
                (BlockKind::Uniform, _) => self.write_uniform_at(dst_root, dst_off + rel, len, value),
                (_, Some(clt)) => {
                    let obj = self.obj_at_root(dst_root, dst_off + rel, &clt);
                    self.set_value_core(obj, value);
                }
                (_, None) => unreachable!("typed object without a type"),
            }
        }
        trace!(heap = self.heap_id, %dst, %src, size, "copied block");
    }

    /// Root and offset of an address that may be dereferenced
    fn deref_parts(&self, addr: ValId) -> (ValId, i64) {
        assert!(
            self.val_target(addr).is_possible_to_deref(),
            "{} cannot be dereferenced",
            addr
        );
        let root = self.val_root(addr);
        (root, self.val_offset(addr))
    }

    fn ensure_fits(&mut self, root: ValId, off: i64, size: i64) {
        let limit = self.root_ref(root).size;
        if off + size > limit && root == ValId::ADDR_OF_RET {
            self.root_mut(root).size = off + size;
            return;
        }
        assert!(
            off >= 0 && off + size <= limit,
            "block [{}, {}) does not fit into {} of size {}",
            off,
            off + size,
            root,
            limit
        );
    }

    // ═══════════════════════════════════════════════════════════════════════
    // External references
    // ═══════════════════════════════════════════════════════════════════════

    /// The executor starts holding `obj`; it survives being overwritten
    pub fn obj_enter(&mut self, obj: ObjId) {
        self.blk_mut(obj).ext_ref_cnt += 1;
    }

    /// The executor drops `obj`; a dead object is released with its last
    /// reference
    ///
    /// # Panics
    /// If `obj` is not referenced.
    pub fn obj_leave(&mut self, obj: ObjId) {
        let b = self.blk_mut(obj);
        assert!(b.ext_ref_cnt > 0, "unbalanced obj_leave on {}", obj);
        b.ext_ref_cnt -= 1;
        if b.ext_ref_cnt == 0 && !self.obj_is_live(obj) {
            self.release_block(obj);
        }
    }
}

/// True if the union of `parts` covers `range`
fn covers(parts: &mut Vec<std::ops::Range<i64>>, range: &std::ops::Range<i64>) -> bool {
    parts.sort_by_key(|r| r.start);
    let mut reached = range.start;
    for part in parts.iter() {
        if part.start > reached {
            break;
        }
        reached = reached.max(part.end);
        if reached >= range.end {
            return true;
        }
    }
    reached >= range.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::symbolic_heap::test_support::{
        heap, heap_with_sink, int_type, long_type, node_type,
    };

    #[test]
    fn test_obj_at_is_stable() {
        let mut sh = heap();
        let root = sh.heap_alloc(16);
        let int = int_type();

        let a = sh.obj_at(root, &int);
        assert_eq!(sh.obj_at(root, &int), a);
        assert!(!sh.obj_is_live(a));

        let at4 = sh.val_by_offset(root, 4);
        let b = sh.obj_at(at4, &int);
        assert_ne!(a, b);
        assert_eq!(sh.placed_at(b), at4);
        assert_eq!(sh.obj_root(b), root);
        assert_eq!(sh.obj_type(b).map(|t| t.uid), Some(int.uid));
    }

    #[test]
    fn test_obj_at_out_of_bounds() {
        let mut sh = heap();
        let root = sh.heap_alloc(4);
        let at = sh.val_by_offset(root, 2);
        assert_eq!(sh.obj_at(at, &int_type()), ObjId::INVALID);
        let before = sh.val_by_offset(root, -4);
        assert_eq!(sh.obj_at(before, &int_type()), ObjId::INVALID);
        assert_eq!(sh.obj_at(ValId::NULL, &int_type()), ObjId::INVALID);
    }

    #[test]
    fn test_return_slot_grows() {
        let mut sh = heap();
        let obj = sh.obj_at(ValId::ADDR_OF_RET, &long_type());
        assert!(obj.is_valid());
        assert_eq!(sh.val_size_of_target(ValId::ADDR_OF_RET), 8);
        let val = sh.value_of(obj);
        assert_eq!(sh.val_origin(val), ValueOrigin::Unknown);
    }

    #[test]
    fn test_uninitialized_reads() {
        let mut sh = heap();
        let root = sh.heap_alloc(8);
        let obj = sh.obj_at(root, &int_type());
        let val = sh.value_of(obj);

        assert_eq!(sh.val_origin(val), ValueOrigin::HeapUninit);
        assert_eq!(sh.value_of(obj), val);
        assert!(sh.obj_is_live(obj));
    }

    #[test]
    fn test_zero_filled_read() {
        let mut sh = heap();
        let root = sh.heap_alloc(16);
        sh.write_uniform_block(root, ValId::NULL, 16);

        let at8 = sh.val_by_offset(root, 8);
        let obj = sh.ptr_at(at8);
        assert_eq!(sh.value_of(obj), ValId::NULL);
        // the zero fill stays in place below the NULL pointer
        assert_eq!(sh.gather_live_objects(root).len(), 2);
    }

    #[test]
    fn test_composite_object() {
        let mut sh = heap();
        let node = node_type();
        let root = sh.heap_alloc(node.size as i64);
        let obj = sh.obj_at(root, &node);

        assert_eq!(sh.obj_block_kind(obj), Some(BlockKind::Composite));
        assert!(sh.obj_is_live(obj));
        let cv = sh.value_of(obj);
        assert_eq!(sh.val_target(cv), ValueTarget::Composite);
        assert_eq!(sh.val_get_composite_obj(cv), obj);
        assert_eq!(sh.val_last_known_type_of_target(root).map(|t| t.uid), Some(node.uid));
    }

    #[test]
    fn test_composite_assignment_copies_fields() {
        let mut sh = heap();
        let node = node_type();
        let src_root = sh.heap_alloc(node.size as i64);
        let dst_root = sh.heap_alloc(node.size as i64);
        let target = sh.heap_alloc(8);

        let next = sh.ptr_at(src_root);
        sh.obj_set_value(next, target);

        let src = sh.obj_at(src_root, &node);
        let dst = sh.obj_at(dst_root, &node);
        let cv = sh.value_of(src);
        sh.obj_set_value(dst, cv);

        let copied = sh.ptr_at(dst_root);
        assert_eq!(sh.value_of(copied), target);
        assert_eq!(sh.value_of(dst), sh.value_of(dst));
        assert!(sh.pointed_by(target).contains(&copied));
    }

    #[test]
    fn test_copy_within_root_only_clobbers() {
        let mut sh = heap();
        let root = sh.heap_alloc(16);
        let obj = sh.ptr_at(root);
        sh.obj_set_value(obj, ValId::NULL);

        let at8 = sh.val_by_offset(root, 8);
        sh.copy_block_of_raw_memory(at8, root, 8);

        let copy = sh.ptr_at(at8);
        let val = sh.value_of(copy);
        assert_eq!(sh.val_target(val), ValueTarget::Unknown);
        assert_eq!(sh.value_of(obj), ValId::NULL);
    }

    #[test]
    fn test_copy_clips_uniform_blocks() {
        let mut sh = heap();
        let src = sh.heap_alloc(32);
        let dst = sh.heap_alloc(8);
        sh.write_uniform_block(src, ValId::NULL, 32);

        let at4 = sh.val_by_offset(src, 4);
        sh.copy_block_of_raw_memory(dst, at4, 8);

        let obj = sh.ptr_at(dst);
        assert_eq!(sh.value_of(obj), ValId::NULL);
    }

    #[test]
    fn test_external_reference_keeps_object() {
        let mut sh = heap();
        let root = sh.heap_alloc(8);
        let int = int_type();
        let obj = sh.obj_at(root, &int);
        sh.obj_enter(obj);
        sh.obj_set_value(obj, ValId::TRUE);

        // overwritten by a wider object, but still referenced
        let wide = sh.obj_at(root, &long_type());
        sh.obj_set_value(wide, ValId::NULL);
        assert!(!sh.obj_is_live(obj));
        let val = sh.value_of(obj);
        assert_eq!(sh.val_origin(val), ValueOrigin::Reinterpret);

        sh.obj_leave(obj);
        assert!(sh.blk_data(obj).is_none());
    }

    #[test]
    fn test_precision_loss_is_reported() {
        let (mut sh, sink) = heap_with_sink();
        let root = sh.heap_alloc(16);
        let int = int_type();
        let lo = sh.obj_at(root, &int);
        sh.obj_set_value(lo, ValId::TRUE);

        let wide = sh.obj_at(root, &long_type());
        sh.value_of(wide);
        assert_eq!(sink.count_of(PrecisionLossKind::ReinterpretedRead), 1);

        let at8 = sh.val_by_offset(root, 8);
        sh.copy_block_of_raw_memory(at8, root, 8);
        assert_eq!(sink.count_of(PrecisionLossKind::SameRootBlockCopy), 1);
        assert!(sink.reports().iter().all(|r| r.heap_id == sh.heap_id()));
    }

    #[test]
    #[should_panic(expected = "unbalanced")]
    fn test_unbalanced_leave_panics() {
        let mut sh = heap();
        let root = sh.heap_alloc(8);
        let obj = sh.obj_at(root, &int_type());
        sh.obj_leave(obj);
    }

    #[test]
    fn test_covers() {
        assert!(covers(&mut vec![4..8, 0..4], &(0..8)));
        assert!(!covers(&mut vec![0..3, 4..8], &(0..8)));
        assert!(covers(&mut vec![0..16], &(4..8)));
    }
}
