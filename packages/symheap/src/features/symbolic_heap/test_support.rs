//! Fixtures shared by the unit tests of the heap modules

use super::context::HeapContext;
use super::core::SymHeapCore;
use super::infrastructure::{CollectingDiagnostics, StaticCodeStorage};
use crate::config::HeapConfig;
use crate::shared::models::{TypeCode, TypeDesc, TypeItem, TypeRef, VarUid};
use std::sync::Arc;

pub(crate) const LOCAL_VAR: VarUid = 10;
pub(crate) const GLOBAL_VAR: VarUid = 11;

pub(crate) fn int_type() -> TypeRef {
    Arc::new(TypeDesc::scalar(1, TypeCode::Int, 4).with_name("int"))
}

pub(crate) fn long_type() -> TypeRef {
    Arc::new(TypeDesc::scalar(2, TypeCode::Int, 8).with_name("long"))
}

/// `struct node { struct node *next; struct node *prev; long data; }`
pub(crate) fn node_type() -> TypeRef {
    let ptr: TypeRef = Arc::new(TypeDesc::pointer(0, 8));
    Arc::new(
        TypeDesc::composite(
            3,
            TypeCode::Struct,
            24,
            vec![
                TypeItem::new("next", 0, Arc::clone(&ptr)),
                TypeItem::new("prev", 8, ptr),
                TypeItem::new("data", 16, long_type()),
            ],
        )
        .with_name("struct node"),
    )
}

fn context(storage: StaticCodeStorage) -> Arc<HeapContext> {
    HeapContext::new(
        HeapConfig::default().check_arena_invariants(true),
        Arc::new(storage),
    )
    .shared()
}

pub(crate) fn heap() -> SymHeapCore {
    SymHeapCore::new(context(StaticCodeStorage::default()))
}

/// Heap whose code storage knows one local and one global `int`
pub(crate) fn heap_with_vars() -> SymHeapCore {
    let storage = StaticCodeStorage::default()
        .with_local(LOCAL_VAR, int_type())
        .with_global(GLOBAL_VAR, int_type());
    SymHeapCore::new(context(storage))
}

/// Heap reporting precision loss into the returned sink
pub(crate) fn heap_with_sink() -> (SymHeapCore, Arc<CollectingDiagnostics>) {
    let sink = Arc::new(CollectingDiagnostics::new());
    let ctx = HeapContext::new(
        HeapConfig::default().report_precision_loss(true),
        Arc::new(StaticCodeStorage::default()),
    )
    .with_diagnostics(sink.clone())
    .shared();
    (SymHeapCore::new(ctx), sink)
}
