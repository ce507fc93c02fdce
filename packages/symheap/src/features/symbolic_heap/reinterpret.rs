//! Reinterpretation engine
//!
//! Every write makes the written block live and then settles the blocks it
//! overlaps:
//!
//! ```text
//!   existing E vs written O           outcome
//!   ───────────────────────────────   ───────────────────────────────
//!   composite placeholder             untouched
//!   same reading (equal fills, NULL)  untouched
//!   fully covered by O                killed
//!   uniform, O strictly inside        split into [e, o) and [o', e')
//!   uniform, partial overlap          shrunk to the uncovered side
//!   data, partial overlap             killed
//! ```
//!
//! Killed blocks leave the arena. Uniform blocks and unreferenced data
//! objects are released; data objects the executor still holds keep a fresh
//! reinterpreted unknown.

use super::core::SymHeapCore;
use super::domain::{BlockEntity, BlockKind, ValueOrigin};
use crate::features::arena::ByteRange;
use crate::shared::models::{ObjId, ValId};
use tracing::trace;

impl SymHeapCore {
    /// Store `val` into `obj` and settle everything it overlaps
    pub(crate) fn set_value_core(&mut self, obj: ObjId, val: ValId) {
        let b = self.blk(obj);
        let (root, range) = (b.root, b.range());

        self.invalidate_dead_cache(root, range, obj);
        self.set_block_value_raw(obj, val);
        self.make_live(obj);
        self.resolve_overlaps(obj);
        self.debug_check_root(root);
    }

    /// Forget values cached by dead objects under `range`
    fn invalidate_dead_cache(&mut self, root: ValId, range: ByteRange, except: ObjId) {
        let rd = self.root_ref(root);
        let stale: Vec<ObjId> = rd
            .all_objs
            .range(..range.end)
            .flat_map(|(_, objs)| objs.iter().copied())
            .filter(|&obj| obj != except && !rd.live_objs.contains_key(&obj))
            .filter(|&obj| {
                let b = self.blk(obj);
                b.value != ValId::INVALID && b.off + b.size > range.start
            })
            .collect();

        for obj in stale {
            self.set_block_value_raw(obj, ValId::INVALID);
        }
    }

    fn resolve_overlaps(&mut self, obj: ObjId) {
        let b = self.blk(obj);
        let (root, o_range, o_kind, o_val) = (b.root, b.range(), b.kind, b.value);

        let others = self.root_ref(root).arena.overlaps(o_range.clone(), Some(obj));
        for other in others {
            let e = self.blk(other);
            let (e_kind, e_range, e_val) = (e.kind, e.range(), e.value);
            if e_kind == BlockKind::Composite || o_kind == BlockKind::Composite {
                continue;
            }
            if same_reading((o_kind, o_val), (e_kind, e_val)) {
                continue;
            }

            let covered = o_range.start <= e_range.start && e_range.end <= o_range.end;
            if covered || e_kind != BlockKind::Uniform {
                self.kill_block(other);
                continue;
            }

            if e_range.start < o_range.start && o_range.end < e_range.end {
                self.split_uniform(other, &o_range);
            } else if e_range.start < o_range.start {
                self.shrink_uniform(other, e_range.start..o_range.start);
            } else {
                self.shrink_uniform(other, o_range.end..e_range.end);
            }
        }
    }

    /// Drop `obj` from the live set and the arena
    fn kill_block(&mut self, obj: ObjId) {
        let b = self.blk(obj);
        let (root, kind, range, referenced) = (b.root, b.kind, b.range(), b.ext_ref_cnt > 0);

        let rd = self.root_mut(root);
        rd.live_objs.remove(&obj);
        rd.arena.remove(range, obj);
        trace!(heap = self.heap_id, %root, %obj, ?kind, "killed block");

        if kind == BlockKind::Uniform || !referenced {
            self.release_block(obj);
            return;
        }
        let fresh = self.mint_unknown(ValueOrigin::Reinterpret);
        self.set_block_value_raw(obj, fresh);
    }

    /// Keep only `keep` of the uniform block `ub`
    fn shrink_uniform(&mut self, ub: ObjId, keep: ByteRange) {
        let b = self.blk(ub);
        let (root, range) = (b.root, b.range());

        let arena = &mut self.root_mut(root).arena;
        arena.remove(range.start..keep.start, ub);
        arena.remove(keep.end..range.end, ub);

        let b = self.blk_mut(ub);
        b.off = keep.start;
        b.size = keep.end - keep.start;
        trace!(heap = self.heap_id, %root, obj = %ub, ?keep, "shrunk uniform block");
    }

    /// Cut `hole` out of the uniform block `ub`; the tail becomes a new block
    fn split_uniform(&mut self, ub: ObjId, hole: &ByteRange) {
        let b = self.blk(ub);
        let (root, start, end, tpl) = (b.root, b.off, b.off + b.size, b.value);
        self.shrink_uniform(ub, start..hole.start);

        // the tail keeps the bytes it already had, no overlap resolution
        let tail = self.assign_block(BlockEntity::new(
            BlockKind::Uniform,
            root,
            hole.end,
            end - hole.end,
            None,
        ));
        self.set_block_value_raw(tail, tpl);
        self.make_live(tail);
        trace!(heap = self.heap_id, %root, head = %ub, %tail, "split uniform block");
    }
}

/// True if two overlapping blocks agree on the bytes they share
fn same_reading(o: (BlockKind, ValId), e: (BlockKind, ValId)) -> bool {
    let (o_kind, o_val) = o;
    let (e_kind, e_val) = e;
    let o_uniform = o_kind == BlockKind::Uniform;
    let e_uniform = e_kind == BlockKind::Uniform;

    if o_val == ValId::NULL && e_val == ValId::NULL {
        return o_uniform || e_uniform;
    }
    o_uniform && e_uniform && o_val == e_val
}
