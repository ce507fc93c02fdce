//! Abstract values
//!
//! One record type for every kind of value; the fields relevant to a kind
//! live in [`ValueKind`].

use super::root::RootData;
use crate::features::custom_values::CustomValue;
use crate::shared::models::{IntRange, ObjId, ValId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What a value points to (or that it is not an address at all)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueTarget {
    Invalid,
    /// Not known to be an address
    Unknown,
    Composite,
    Custom,
    /// Address of a global variable
    Static,
    /// Address of a local variable
    OnStack,
    /// Address of a heap block
    OnHeap,
    /// Address of a variable whose frame is gone
    Lost,
    /// Address of a freed heap block
    Deleted,
    /// Address of an abstract segment
    Abstract,
    /// Address with an offset known only as an interval
    Range,
}

impl ValueTarget {
    /// Addresses of regions that may be read and written
    #[inline]
    pub fn is_possible_to_deref(self) -> bool {
        matches!(
            self,
            ValueTarget::Static | ValueTarget::OnStack | ValueTarget::OnHeap | ValueTarget::Abstract
        )
    }

    /// Any address into a memory region, including range addresses
    #[inline]
    pub fn is_any_data_area(self) -> bool {
        self.is_possible_to_deref() || self == ValueTarget::Range
    }

    #[inline]
    pub fn is_program_var(self) -> bool {
        matches!(self, ValueTarget::Static | ValueTarget::OnStack)
    }

    /// Addresses of regions that no longer exist
    #[inline]
    pub fn is_gone(self) -> bool {
        matches!(self, ValueTarget::Lost | ValueTarget::Deleted)
    }
}

/// Why a value is what it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueOrigin {
    Invalid,
    /// Result of an explicit assignment
    Assigned,
    /// Produced by an unknown computation (external input, lost precision)
    Unknown,
    /// Read of memory whose previous typed layout did not match
    Reinterpret,
    /// Read through an address whose target is gone
    DerefFailed,
    /// Uninitialized stack memory
    StackUninit,
    /// Uninitialized heap memory
    HeapUninit,
}

/// Offset cache carried by anchors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorData {
    /// Relative offset -> canonical derived value
    pub off_map: BTreeMap<i64, ValId>,
    /// Values to revisit when the anchor is narrowed or destroyed
    pub dependents: Vec<ValId>,
}

/// Anchor whose offset is known only as an interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeData {
    pub anchor: AnchorData,
    /// Closed interval of absolute offsets within the memory root
    pub range: IntRange,
}

/// Kind-specific part of a value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValueKind {
    /// Leaf value without derived offsets
    Plain,
    /// Unknown value with offset-derived values
    Anchor(AnchorData),
    Range(RangeData),
    Root(Box<RootData>),
    /// Value of the composite object it wraps
    Composite(ObjId),
    Custom(CustomValue),
}

/// Abstract value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseValue {
    /// Target kind as recorded at creation; address values consult their root
    pub code: ValueTarget,
    pub origin: ValueOrigin,
    /// Root (or unknown base value) this value is an offset of
    pub val_root: ValId,
    /// Offset relative to `anchor`
    pub off_root: i64,
    /// Value whose offset cache canonicalizes this one
    pub anchor: ValId,
    /// Objects holding this value
    pub used_by: BTreeSet<ObjId>,
    pub kind: ValueKind,
}

impl BaseValue {
    /// Value that is its own root and anchor
    pub fn new_self_rooted(id: ValId, code: ValueTarget, origin: ValueOrigin, kind: ValueKind) -> Self {
        Self {
            code,
            origin,
            val_root: id,
            off_root: 0,
            anchor: id,
            used_by: BTreeSet::new(),
            kind,
        }
    }

    /// Value derived from `anchor` at relative offset `off`
    pub fn new_derived(
        code: ValueTarget,
        origin: ValueOrigin,
        val_root: ValId,
        anchor: ValId,
        off: i64,
    ) -> Self {
        Self {
            code,
            origin,
            val_root,
            off_root: off,
            anchor,
            used_by: BTreeSet::new(),
            kind: ValueKind::Plain,
        }
    }

    /// Offset cache, if this value is an anchor of any kind
    pub fn anchor_data(&self) -> Option<&AnchorData> {
        match &self.kind {
            ValueKind::Anchor(data) => Some(data),
            ValueKind::Range(rng) => Some(&rng.anchor),
            ValueKind::Root(root) => Some(&root.anchor),
            _ => None,
        }
    }

    /// Offset cache for writing; a plain value is promoted to an anchor
    ///
    /// # Panics
    /// For composite and custom values, which carry no offsets.
    pub fn anchor_data_mut(&mut self) -> &mut AnchorData {
        if matches!(self.kind, ValueKind::Plain) {
            self.kind = ValueKind::Anchor(AnchorData::default());
        }
        match &mut self.kind {
            ValueKind::Anchor(data) => data,
            ValueKind::Range(rng) => &mut rng.anchor,
            ValueKind::Root(root) => &mut root.anchor,
            ValueKind::Plain | ValueKind::Composite(_) | ValueKind::Custom(_) => {
                panic!("value of kind {:?} cannot anchor offsets", self.code)
            }
        }
    }

    pub fn root_data(&self) -> Option<&RootData> {
        match &self.kind {
            ValueKind::Root(root) => Some(root),
            _ => None,
        }
    }

    pub fn root_data_mut(&mut self) -> Option<&mut RootData> {
        match &mut self.kind {
            ValueKind::Root(root) => Some(root),
            _ => None,
        }
    }

    pub fn range_data(&self) -> Option<&RangeData> {
        match &self.kind {
            ValueKind::Range(rng) => Some(rng),
            _ => None,
        }
    }

    pub fn custom(&self) -> Option<&CustomValue> {
        match &self.kind {
            ValueKind::Custom(cv) => Some(cv),
            _ => None,
        }
    }
}
