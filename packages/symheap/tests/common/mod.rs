//! Common test utilities for symheap
//!
//! Type descriptors and heap builders shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use symheap::{
    HeapConfig, HeapContext, StaticCodeStorage, SymHeap, SymHeapCore, TypeCode, TypeDesc, TypeRef,
};

pub const LOCAL_X: i32 = 100;
pub const GLOBAL_G: i32 = 101;

pub fn int_type() -> TypeRef {
    Arc::new(TypeDesc::scalar(1, TypeCode::Int, 4).with_name("int"))
}

pub fn long_type() -> TypeRef {
    Arc::new(TypeDesc::scalar(2, TypeCode::Int, 8).with_name("long"))
}

/// Code storage knowing one local and one global `int`
pub fn storage() -> StaticCodeStorage {
    StaticCodeStorage::default()
        .with_local(LOCAL_X, int_type())
        .with_global(GLOBAL_G, int_type())
}

pub fn context() -> Arc<HeapContext> {
    HeapContext::new(
        HeapConfig::default().check_arena_invariants(true),
        Arc::new(storage()),
    )
    .shared()
}

pub fn core_heap() -> SymHeapCore {
    SymHeapCore::new(context())
}

pub fn seg_heap() -> SymHeap {
    SymHeap::new(context())
}
