//! Symbolic Heap Ports
//!
//! Collaborators the heap consults but does not implement:
//! - [`CodeStorage`]: types and program-variable facts from the front-end
//! - [`DiagnosticsSink`]: where precision-loss reports go
//!
//! Adapters live in `infrastructure`.

use super::domain::PrecisionLoss;
use crate::shared::models::{TypeRef, VarUid};

// ═══════════════════════════════════════════════════════════════════════════
// Secondary Ports (Driven/Output)
// ═══════════════════════════════════════════════════════════════════════════

/// Front-end facts about the analyzed program
pub trait CodeStorage: Send + Sync {
    /// Declared type of a program variable
    fn var_type(&self, uid: VarUid) -> Option<TypeRef>;

    /// True if the variable has static storage
    fn var_is_global(&self, uid: VarUid) -> bool;

    /// Type used for untyped pointer reads (`void *`)
    fn generic_data_ptr(&self) -> TypeRef;
}

/// Receiver of precision-loss reports
pub trait DiagnosticsSink: Send + Sync {
    fn precision_loss(&self, report: &PrecisionLoss);

    /// Sink name for debugging and logging
    fn name(&self) -> &'static str;
}
