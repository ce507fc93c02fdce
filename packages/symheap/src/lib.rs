/*
 * symheap - Abstract heap for shape and pointer analysis
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (ids, type descriptors, program variables, ranges)
 * - features/    : Vertical slices (entity store → arena → predicates → heap → segments)
 * - config/      : Presets and overrides
 *
 * Heap states fork in O(1); every satellite is copy-on-write.
 */

#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration (presets, overrides, validation)
pub mod config;

/// Error types
pub mod errors;

/// Vertical slices
pub mod features;

/// Shared models
pub mod shared;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{HeapConfig, Preset};
pub use errors::{Result, SymHeapError};
pub use features::abstract_segments::{
    AbstractKind, BindingOff, SegmentSplicer, SymHeap, SymHeapSnapshot, TrustingSplicer,
};
pub use features::custom_values::CustomValue;
pub use features::predicates::NeqOp;
pub use features::symbolic_heap::{
    BlockKind, CodeStorage, CollectingDiagnostics, DiagnosticsSink, HeapContext, HeapSnapshot,
    PrecisionLoss, PrecisionLossKind, StaticCodeStorage, SymHeapCore, TracingDiagnostics,
    ValueOrigin, ValueTarget,
};
pub use shared::models::{CVar, IntRange, ObjId, TypeCode, TypeDesc, TypeItem, TypeRef, ValId};
