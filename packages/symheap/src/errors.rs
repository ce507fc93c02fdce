//! Error types for symheap
//!
//! Heap operations do not return errors: contract breaches panic and precision
//! limits degrade to fresh unknown values. Errors exist for configuration and
//! for the explicit consistency check, whose report tests can inspect.

use crate::config::ConfigError;
use crate::shared::models::{ObjId, ValId};
use thiserror::Error;

/// Main error type for symheap
#[derive(Debug, Error)]
pub enum SymHeapError {
    /// Arena of a root disagrees with its live objects
    #[error("Arena mismatch in root {root}: {detail}")]
    ArenaMismatch { root: ValId, detail: String },

    /// Two live data objects of one root overlap
    #[error("Overlapping live data objects {first} and {second} in root {root}")]
    OverlappingLiveObjects {
        root: ValId,
        first: ObjId,
        second: ObjId,
    },

    /// `used_by` / `used_by_gl` out of sync with object values
    #[error("Broken back-reference between {obj} and {val}: {detail}")]
    BackReference {
        obj: ObjId,
        val: ValId,
        detail: String,
    },

    /// Predicate over a value that is no longer meaningful
    #[error("Dangling predicate over {val}: {detail}")]
    DanglingPredicate { val: ValId, detail: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SymHeapError {
    /// Create an arena mismatch error
    pub fn arena(root: ValId, detail: impl Into<String>) -> Self {
        SymHeapError::ArenaMismatch {
            root,
            detail: detail.into(),
        }
    }

    /// Create a back-reference error
    pub fn back_ref(obj: ObjId, val: ValId, detail: impl Into<String>) -> Self {
        SymHeapError::BackReference {
            obj,
            val,
            detail: detail.into(),
        }
    }

    /// Create a dangling predicate error
    pub fn dangling(val: ValId, detail: impl Into<String>) -> Self {
        SymHeapError::DanglingPredicate {
            val,
            detail: detail.into(),
        }
    }
}

/// Result type alias for symheap operations
pub type Result<T> = std::result::Result<T, SymHeapError>;
