//! Shared module - Common types used by every feature
//!
//! Identifiers, type descriptors handed in by the front-end, program-variable
//! identities and integer intervals.

pub mod models;

// Re-exports for convenience
pub use models::*;
