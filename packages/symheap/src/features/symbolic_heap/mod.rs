//! Symbolic Heap - value, object and root model
//!
//! ```text
//! symbolic_heap/
//! ├── domain/          # BaseValue, BlockEntity, RootData, Entity
//! ├── ports/           # CodeStorage, DiagnosticsSink
//! ├── infrastructure/  # StaticCodeStorage, TracingDiagnostics, CollectingDiagnostics
//! ├── context.rs       # HeapContext shared by all forks
//! ├── core.rs          # SymHeapCore state + entity primitives
//! ├── values.rs        # offsets, ranges, custom values, pointer difference
//! ├── objects.rs       # typed lookup, lazy reads, writes, block copies
//! ├── reinterpret.rs   # overlap resolution after writes
//! ├── roots.rs         # variables, heap blocks, destruction, cloning
//! ├── predicates.rs    # Neq ops, proofs, replacement, predicate transfer
//! ├── consistency.rs   # invariant checks
//! └── snapshot.rs      # serializable dump
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let ctx = HeapContext::new(HeapConfig::default(), Arc::new(storage)).shared();
//! let mut sh = SymHeapCore::new(ctx);
//!
//! let root = sh.heap_alloc(16);
//! let next = sh.ptr_at(root);
//! sh.obj_set_value(next, ValId::NULL);
//!
//! let fork = sh.clone(); // O(1), copy-on-write
//! ```

pub mod domain;
pub mod infrastructure;
pub mod ports;

mod consistency;
mod context;
mod core;
mod objects;
mod predicates;
mod reinterpret;
mod roots;
mod snapshot;
mod values;

#[cfg(test)]
pub(crate) mod test_support;

pub use self::core::SymHeapCore;
pub use context::HeapContext;
pub use domain::{
    BlockKind, PrecisionLoss, PrecisionLossKind, ValueOrigin, ValueTarget,
};
pub use infrastructure::{CollectingDiagnostics, StaticCodeStorage, TracingDiagnostics};
pub use ports::{CodeStorage, DiagnosticsSink};
pub use snapshot::{CoinSnapshot, HeapSnapshot, ObjectSnapshot, RootSnapshot};
