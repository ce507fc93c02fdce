//! Objects and uniform blocks

use crate::shared::models::{TypeRef, ValId};
use serde::{Deserialize, Serialize};

/// Classification of a block living in a root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlockKind {
    /// Typed object holding a pointer
    DataPtr,
    /// Typed object holding a non-pointer
    DataObj,
    /// Placeholder for an object of composite type
    Composite,
    /// Byte range filled with one repeated template value
    Uniform,
}

impl BlockKind {
    /// Typed objects that take part in the overlap invariant
    #[inline]
    pub fn is_data(self) -> bool {
        matches!(self, BlockKind::DataPtr | BlockKind::DataObj)
    }

    pub fn for_type(clt: &TypeRef) -> Self {
        if clt.is_composite() {
            BlockKind::Composite
        } else if clt.is_ptr() {
            BlockKind::DataPtr
        } else {
            BlockKind::DataObj
        }
    }
}

/// Object or uniform block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEntity {
    pub kind: BlockKind,
    /// Root value owning the block
    pub root: ValId,
    /// Byte offset within the root
    pub off: i64,
    pub size: i64,
    /// Current value (the template for uniform blocks); `INVALID` if not
    /// yet initialized
    pub value: ValId,
    /// Type of typed objects
    pub clt: Option<TypeRef>,
    /// References held by the executor
    pub ext_ref_cnt: u32,
}

impl BlockEntity {
    pub fn new(kind: BlockKind, root: ValId, off: i64, size: i64, clt: Option<TypeRef>) -> Self {
        Self {
            kind,
            root,
            off,
            size,
            value: ValId::INVALID,
            clt,
            ext_ref_cnt: 0,
        }
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<i64> {
        self.off..self.off + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{TypeCode, TypeDesc};
    use std::sync::Arc;

    #[test]
    fn test_kind_for_type() {
        let ptr: TypeRef = Arc::new(TypeDesc::pointer(1, 8));
        let int: TypeRef = Arc::new(TypeDesc::scalar(2, TypeCode::Int, 4));
        assert_eq!(BlockKind::for_type(&ptr), BlockKind::DataPtr);
        assert_eq!(BlockKind::for_type(&int), BlockKind::DataObj);
        assert!(!BlockKind::Uniform.is_data());
    }

    #[test]
    fn test_range() {
        let blk = BlockEntity::new(BlockKind::Uniform, ValId(3), 4, 12, None);
        assert_eq!(blk.range(), 4..16);
        assert_eq!(blk.value, ValId::INVALID);
    }
}
