//! Abstract Segments - list segments layered over the symbolic heap
//!
//! ```text
//! abstract_segments/
//! ├── domain.rs       # AbstractKind, BindingOff, SegMeta
//! ├── ports.rs        # SegmentSplicer (list surgery during merges)
//! ├── seg_heap.rs     # SymHeap: metadata, Neq/min-length, merge, clone
//! └── prototypes.rs   # prototype collection and levels
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut sh = SymHeap::new(ctx);
//! let seg = sh.heap_alloc(16);
//! sh.val_target_set_abstract(seg, AbstractKind::Sls, BindingOff::singly(0, 0));
//!
//! sh.neq_op(NeqOp::Add, seg, ValId::NULL); // seg is non-empty now
//! assert!(sh.prove_neq(seg, ValId::NULL));
//! ```

pub mod domain;
pub mod ports;

mod prototypes;
mod seg_heap;

#[cfg(test)]
pub(crate) mod test_support;

pub use domain::{AbstractKind, BindingOff, SegMeta, SegmentSnapshot};
pub use ports::{SegmentSplicer, TrustingSplicer};
pub use seg_heap::{SymHeap, SymHeapSnapshot};
