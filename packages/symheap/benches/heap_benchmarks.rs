//! Performance benchmarks for the heap
//!
//! Targets:
//! - Fork: O(1), independent of heap size
//! - First write after a fork: one satellite copy
//! - Typed writes: dominated by arena updates

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use symheap::{
    CustomValue, HeapConfig, HeapContext, StaticCodeStorage, SymHeapCore, TypeCode, TypeDesc,
    TypeRef, ValId,
};

fn heap() -> SymHeapCore {
    let ctx = HeapContext::new(
        HeapConfig::default().check_arena_invariants(false),
        Arc::new(StaticCodeStorage::default()),
    )
    .shared();
    SymHeapCore::new(ctx)
}

fn int_type() -> TypeRef {
    Arc::new(TypeDesc::scalar(1, TypeCode::Int, 4))
}

/// Heap with `roots` blocks of 64 bytes, each holding one pointer
fn populated(roots: usize) -> SymHeapCore {
    let mut sh = heap();
    let mut prev = ValId::NULL;
    for _ in 0..roots {
        let root = sh.heap_alloc(64);
        let ptr = sh.ptr_at(root);
        sh.obj_set_value(ptr, prev);
        prev = root;
    }
    sh
}

// ============================================================================
// Forking
// ============================================================================

fn bench_fork(c: &mut Criterion) {
    let mut group = c.benchmark_group("fork");

    for roots in [10usize, 100, 1000] {
        let sh = populated(roots);
        group.bench_with_input(BenchmarkId::from_parameter(roots), &sh, |b, sh| {
            b.iter(|| black_box(sh.clone()));
        });
    }

    group.finish();
}

fn bench_write_after_fork(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_after_fork");

    for roots in [10usize, 100, 1000] {
        let sh = populated(roots);
        group.bench_with_input(BenchmarkId::from_parameter(roots), &sh, |b, sh| {
            b.iter(|| {
                let mut fork = sh.clone();
                let root = fork.heap_alloc(8);
                black_box(root)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Writes
// ============================================================================

fn bench_typed_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("typed_writes");
    let int = int_type();

    for count in [16i64, 256] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut sh = heap();
                let root = sh.heap_alloc(count * 4);
                for i in 0..count {
                    let addr = sh.val_by_offset(root, i * 4);
                    let obj = sh.obj_at(addr, &int);
                    let val = sh.val_wrap_custom(CustomValue::Int(i));
                    sh.obj_set_value(obj, val);
                }
                black_box(sh)
            });
        });
    }

    group.finish();
}

fn bench_overlapping_writes(c: &mut Criterion) {
    let int = int_type();
    let long: TypeRef = Arc::new(TypeDesc::scalar(2, TypeCode::Int, 8));

    c.bench_function("overlapping_writes", |b| {
        b.iter(|| {
            let mut sh = heap();
            let root = sh.heap_alloc(64);
            for i in 0..14 {
                let narrow = sh.val_by_offset(root, i * 4);
                let obj = sh.obj_at(narrow, &int);
                sh.obj_set_value(obj, ValId::TRUE);
                let wide = sh.obj_at(narrow, &long);
                sh.obj_set_value(wide, ValId::NULL);
            }
            black_box(sh)
        });
    });
}

criterion_group!(
    benches,
    bench_fork,
    bench_write_after_fork,
    bench_typed_writes,
    bench_overlapping_writes
);
criterion_main!(benches);
