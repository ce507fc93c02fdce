//! Entity identifiers
//!
//! Objects and values share one id allocator (see `features::entity_store`),
//! but are kept apart at the type level. Negative ids are sentinels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw id as handed out by the entity store
pub type RawId = i32;

/// Identifier of an abstract value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValId(pub RawId);

/// Identifier of an object (typed memory cell or uniform block)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjId(pub RawId);

impl ValId {
    /// Returned by queries on out-of-range or inapplicable input
    pub const INVALID: Self = Self(-1);

    /// Read through an object whose root no longer exists
    pub const DEREF_FAILED: Self = Self(-2);

    /// Null pointer, also the canonical integer `0` (and `false`)
    pub const NULL: Self = Self(0);

    /// Canonical integer `1` (and `true`)
    pub const TRUE: Self = Self(1);

    /// Root of the return slot of the current function
    pub const ADDR_OF_RET: Self = Self(2);

    /// First id available for ordinary entities
    pub(crate) const FIRST_FREE: RawId = 3;

    /// True for ids that may denote an entity (including reserved ones)
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// True for `NULL` and `TRUE`, whose holders are not tracked
    #[inline]
    pub fn is_reserved_scalar(self) -> bool {
        self == Self::NULL || self == Self::TRUE
    }
}

impl ObjId {
    /// Returned by queries on out-of-range or inapplicable input
    pub const INVALID: Self = Self(-1);

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for ValId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => write!(f, "#INVALID"),
            Self::DEREF_FAILED => write!(f, "#DEREF_FAILED"),
            Self::NULL => write!(f, "#NULL"),
            Self::TRUE => write!(f, "#TRUE"),
            Self::ADDR_OF_RET => write!(f, "#ADDR_OF_RET"),
            Self(id) => write!(f, "#{}", id),
        }
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "obj#INVALID")
        } else {
            write!(f, "obj#{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(!ValId::INVALID.is_valid());
        assert!(!ValId::DEREF_FAILED.is_valid());
        assert!(ValId::NULL.is_valid());
        assert!(ValId::NULL.is_reserved_scalar());
        assert!(ValId::TRUE.is_reserved_scalar());
        assert!(!ValId::ADDR_OF_RET.is_reserved_scalar());
        assert!(!ObjId::INVALID.is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(ValId::NULL.to_string(), "#NULL");
        assert_eq!(ValId(42).to_string(), "#42");
        assert_eq!(ObjId(7).to_string(), "obj#7");
    }
}
