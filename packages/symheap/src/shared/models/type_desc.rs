//! Type descriptors supplied by the front-end
//!
//! The heap never inspects source code; it only needs the byte size of a
//! type, whether it is a pointer or a composite, and the field layout of
//! composites (used by the segment layer to locate `next`/`prev` fields).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to a type descriptor
pub type TypeRef = Arc<TypeDesc>;

/// Coarse classification of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    Void,
    Int,
    Bool,
    Char,
    Enum,
    Real,
    Ptr,
    Fnc,
    Struct,
    Union,
    Array,
    String,
    Unknown,
}

/// One field of a composite type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeItem {
    pub name: Option<String>,
    /// Byte offset of the field within its parent
    pub offset: i64,
    pub ty: TypeRef,
}

/// Type descriptor
///
/// Two descriptors denote the same type iff their `uid` matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDesc {
    pub uid: i32,
    pub code: TypeCode,
    /// Size in bytes
    pub size: usize,
    pub name: Option<String>,
    /// Fields of composite types (empty otherwise)
    pub items: Vec<TypeItem>,
}

impl TypeDesc {
    pub fn scalar(uid: i32, code: TypeCode, size: usize) -> Self {
        Self {
            uid,
            code,
            size,
            name: None,
            items: Vec::new(),
        }
    }

    pub fn pointer(uid: i32, size: usize) -> Self {
        Self::scalar(uid, TypeCode::Ptr, size)
    }

    pub fn composite(uid: i32, code: TypeCode, size: usize, items: Vec<TypeItem>) -> Self {
        debug_assert!(matches!(
            code,
            TypeCode::Struct | TypeCode::Union | TypeCode::Array
        ));
        Self {
            uid,
            code,
            size,
            name: None,
            items,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn is_ptr(&self) -> bool {
        self.code == TypeCode::Ptr
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        matches!(self.code, TypeCode::Struct | TypeCode::Union | TypeCode::Array)
    }

    /// Field whose offset equals `offset`, if any
    pub fn item_at(&self, offset: i64) -> Option<&TypeItem> {
        self.items.iter().find(|item| item.offset == offset)
    }
}

/// Type equality as understood by the front-end
#[inline]
pub fn same_type(a: &TypeDesc, b: &TypeDesc) -> bool {
    std::ptr::eq(a, b) || a.uid == b.uid
}

impl TypeItem {
    pub fn new(name: impl Into<String>, offset: i64, ty: TypeRef) -> Self {
        Self {
            name: Some(name.into()),
            offset,
            ty,
        }
    }
}
