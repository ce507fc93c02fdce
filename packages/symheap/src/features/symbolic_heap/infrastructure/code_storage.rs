//! In-memory code storage
//!
//! Front-ends that already hold their type tables behind other structures
//! implement [`CodeStorage`] directly; this adapter serves embedders that
//! just register variables up front, and the test-suite.

use super::super::ports::CodeStorage;
use crate::shared::models::{TypeDesc, TypeRef, VarUid};
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct VarInfo {
    ty: TypeRef,
    is_global: bool,
}

/// Table-backed [`CodeStorage`]
#[derive(Debug, Clone)]
pub struct StaticCodeStorage {
    vars: FxHashMap<VarUid, VarInfo>,
    generic_ptr: TypeRef,
}

impl StaticCodeStorage {
    /// Storage whose generic data pointer has `ptr_size` bytes
    pub fn new(ptr_size: usize) -> Self {
        Self {
            vars: FxHashMap::default(),
            generic_ptr: Arc::new(TypeDesc::pointer(0, ptr_size).with_name("void *")),
        }
    }

    pub fn with_local(mut self, uid: VarUid, ty: TypeRef) -> Self {
        self.vars.insert(uid, VarInfo { ty, is_global: false });
        self
    }

    pub fn with_global(mut self, uid: VarUid, ty: TypeRef) -> Self {
        self.vars.insert(uid, VarInfo { ty, is_global: true });
        self
    }
}

impl Default for StaticCodeStorage {
    fn default() -> Self {
        Self::new(8)
    }
}

impl CodeStorage for StaticCodeStorage {
    fn var_type(&self, uid: VarUid) -> Option<TypeRef> {
        self.vars.get(&uid).map(|var| Arc::clone(&var.ty))
    }

    fn var_is_global(&self, uid: VarUid) -> bool {
        self.vars.get(&uid).is_some_and(|var| var.is_global)
    }

    fn generic_data_ptr(&self) -> TypeRef {
        Arc::clone(&self.generic_ptr)
    }
}
