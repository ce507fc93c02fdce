//! Fixtures for the segment tests

use super::domain::{AbstractKind, BindingOff};
use super::seg_heap::SymHeap;
use crate::config::HeapConfig;
use crate::features::symbolic_heap::{HeapContext, StaticCodeStorage};
use crate::shared::models::ValId;
use std::sync::Arc;

/// Offset of the `next` field in test nodes
pub(crate) const NEXT: i64 = 0;
/// Offset of the `prev` field in test nodes
pub(crate) const PREV: i64 = 8;

pub(crate) fn seg_heap() -> SymHeap {
    let ctx = HeapContext::new(
        HeapConfig::default().check_arena_invariants(true),
        Arc::new(StaticCodeStorage::default()),
    )
    .shared();
    SymHeap::new(ctx)
}

/// Possibly-empty SLS whose `next` points to a concrete block
///
/// Returns `(segment, successor)`.
pub(crate) fn sls_chain(sh: &mut SymHeap) -> (ValId, ValId) {
    let seg = sh.heap_alloc(16);
    let next = sh.heap_alloc(16);
    let at_next = sh.val_by_offset(seg, NEXT);
    let ptr = sh.ptr_at(at_next);
    sh.obj_set_value(ptr, next);
    sh.val_target_set_abstract(seg, AbstractKind::Sls, BindingOff::singly(0, NEXT));
    (seg, next)
}

/// Two DLS ends linked through their `prev` fields, both ending in `NULL`
pub(crate) fn dls_pair(sh: &mut SymHeap) -> (ValId, ValId) {
    let a = sh.heap_alloc(16);
    let b = sh.heap_alloc(16);
    for (from, to) in [(a, b), (b, a)] {
        let at_next = sh.val_by_offset(from, NEXT);
        let next = sh.ptr_at(at_next);
        sh.obj_set_value(next, ValId::NULL);
        let at_prev = sh.val_by_offset(from, PREV);
        let prev = sh.ptr_at(at_prev);
        sh.obj_set_value(prev, to);
    }
    for root in [a, b] {
        sh.val_target_set_abstract(root, AbstractKind::Dls, BindingOff::new(0, NEXT, PREV));
    }
    (a, b)
}
