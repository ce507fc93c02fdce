//! Segment metadata

use crate::shared::models::ValId;
use serde::{Deserialize, Serialize};

/// Abstraction kind of a root
///
/// ```text
/// SeeThrough ──► Sls
///     │
///     └────────► concrete ◄── ObjOrNull
/// Sls, Dls ───► concrete (only through val_target_set_concrete)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbstractKind {
    /// Object that may or may not be there, looked through by joins
    SeeThrough,
    /// Object that exists or is replaced by `NULL`
    ObjOrNull,
    /// Singly-linked list segment
    Sls,
    /// One end of a doubly-linked list segment
    Dls,
}

impl AbstractKind {
    /// Kinds that stand for a run of nodes with a minimum length
    #[inline]
    pub fn is_list_segment(self) -> bool {
        matches!(self, AbstractKind::Sls | AbstractKind::Dls)
    }

    /// Kinds whose minimum length is always zero
    #[inline]
    pub fn may_be_empty(self) -> bool {
        matches!(self, AbstractKind::SeeThrough | AbstractKind::ObjOrNull)
    }
}

/// Field offsets that link the nodes of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BindingOff {
    /// Offset of the list head within a node
    pub head: i64,
    /// Offset of the pointer to the next node
    pub next: i64,
    /// Offset of the pointer to the previous node (DLS) or peer
    pub prev: i64,
}

impl BindingOff {
    pub fn new(head: i64, next: i64, prev: i64) -> Self {
        Self { head, next, prev }
    }

    /// Binding of a singly-linked list; `prev` mirrors `next`
    pub fn singly(head: i64, next: i64) -> Self {
        Self::new(head, next, next)
    }
}

/// Metadata of an abstract root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegMeta {
    pub kind: AbstractKind,
    pub binding: BindingOff,
    /// Lower bound on the number of concrete nodes
    pub min_length: u32,
}

/// Segment entry of a heap snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSnapshot {
    pub root: ValId,
    #[serde(flatten)]
    pub meta: SegMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert!(AbstractKind::Sls.is_list_segment());
        assert!(AbstractKind::Dls.is_list_segment());
        assert!(!AbstractKind::SeeThrough.is_list_segment());
        assert!(AbstractKind::ObjOrNull.may_be_empty());
        assert!(!AbstractKind::Dls.may_be_empty());
    }

    #[test]
    fn test_singly_binding() {
        let off = BindingOff::singly(0, 8);
        assert_eq!(off.prev, off.next);
        assert_eq!(BindingOff::default(), BindingOff::new(0, 0, 0));
    }
}
