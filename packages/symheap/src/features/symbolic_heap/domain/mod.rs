//! Heap entities
//!
//! Values and blocks share one id space, so the entity store holds them as
//! one enum.

mod block;
mod root;
mod value;

pub use block::{BlockEntity, BlockKind};
pub use root::RootData;
pub use value::{AnchorData, BaseValue, RangeData, ValueKind, ValueOrigin, ValueTarget};

use serde::Serialize;

/// Entry of the entity store
#[derive(Debug, Clone, Serialize)]
pub enum Entity {
    Value(BaseValue),
    Block(BlockEntity),
}

/// Reason reported with a precision loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrecisionLossKind {
    /// Read of bytes covered by differently typed live data
    ReinterpretedRead,
    /// Offset applied to a value that is not an address
    OffsetOfNonAddress,
    /// Block copy within one root
    SameRootBlockCopy,
    /// Live object only partially inside a copied window
    PartialBlockCopy,
    /// Pointer difference without a known relation
    UnboundPointerDiff,
}

/// Report handed to the diagnostics sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecisionLoss {
    /// Heap state that lost precision
    pub heap_id: u64,
    pub kind: PrecisionLossKind,
    pub detail: String,
}
