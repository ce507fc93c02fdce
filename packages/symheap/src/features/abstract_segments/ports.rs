//! Abstract Segment Ports

use super::seg_heap::SymHeap;
use crate::shared::models::ValId;

// ═══════════════════════════════════════════════════════════════════════════
// Secondary Ports (Driven/Output)
// ═══════════════════════════════════════════════════════════════════════════

/// List surgery performed on behalf of [`SymHeap::val_merge`]
///
/// The implementation reconnects whatever points to the segment at `seg` so
/// that it points to `next`, and reports whether that was possible. It must
/// not destroy the segment or touch its metadata; the heap does both once
/// the splice succeeded.
pub trait SegmentSplicer {
    fn splice_out(&mut self, sh: &mut SymHeap, seg: ValId, next: ValId) -> bool;
}

/// Splicer that accepts every splice without touching the heap
///
/// Enough when the caller has already rewired the list itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustingSplicer;

impl SegmentSplicer for TrustingSplicer {
    fn splice_out(&mut self, _sh: &mut SymHeap, _seg: ValId, _next: ValId) -> bool {
        true
    }
}
