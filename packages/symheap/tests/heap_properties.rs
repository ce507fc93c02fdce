//! Property-based tests for the heap
//!
//! Invariants that should hold for ALL operation sequences:
//! - Hash-consing: offsets compose and land on the same id
//! - Arena: live objects match a last-writer-wins model, arenas stay exact
//! - Forks: nothing done in a fork is visible in the original

mod common;

use common::{core_heap, int_type, long_type};
use proptest::prelude::*;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use std::collections::BTreeMap;
use symheap::{CustomValue, NeqOp, ObjId, ValId, ValueOrigin, ValueTarget};

// ============================================================================
// QuickCheck Tests (simpler, faster)
// ============================================================================

#[quickcheck]
fn qc_fork_isolation(sizes: Vec<u8>, extra: u8) -> TestResult {
    if sizes.len() > 32 {
        return TestResult::discard();
    }

    let mut s1 = core_heap();
    for &size in &sizes {
        s1.heap_alloc(i64::from(size) + 1);
    }
    let before = s1.gather_root_objects();

    let mut s2 = s1.clone();
    let fresh = s2.heap_alloc(i64::from(extra) + 8);
    let ptr = s2.ptr_at(fresh);
    s2.obj_set_value(ptr, ValId::NULL);
    if let Some(&victim) = before.iter().find(|&&r| r != ValId::ADDR_OF_RET) {
        s2.val_destroy_target(victim);
    }

    TestResult::from_bool(
        s1.gather_root_objects() == before
            && s1.val_target(fresh) == ValueTarget::Invalid
            && s1.check_consistency().is_ok()
            && s2.check_consistency().is_ok(),
    )
}

#[quickcheck]
fn qc_neq_is_symmetric(swap: bool, delete: bool) -> bool {
    let mut sh = core_heap();
    let a = sh.val_create(ValueTarget::Unknown, ValueOrigin::Unknown);
    let b = sh.val_create(ValueTarget::Unknown, ValueOrigin::Unknown);
    let (x, y) = if swap { (b, a) } else { (a, b) };

    sh.neq_op(NeqOp::Add, x, y);
    if delete {
        sh.neq_op(NeqOp::Del, y, x);
    }
    sh.prove_neq(a, b) == !delete && sh.prove_neq(b, a) == !delete
}

#[quickcheck]
fn qc_custom_ints_are_hash_consed(n: i64) -> bool {
    let mut sh = core_heap();
    let a = sh.val_wrap_custom(CustomValue::Int(n));
    let b = sh.val_wrap_custom(CustomValue::Int(n));
    a == b && sh.val_unwrap_custom(a) == Some(CustomValue::Int(n))
}

// ============================================================================
// Proptest Tests (more control over generation)
// ============================================================================

/// One typed write: offset (multiple of 4), wide or narrow, constant
#[derive(Debug, Clone)]
struct Write {
    off: i64,
    wide: bool,
    value: i64,
}

fn write_strategy() -> impl Strategy<Value = Write> {
    (0i64..6, any::<bool>(), 0i64..4).prop_map(|(slot, wide, value)| {
        let off = if wide { (slot % 5) * 4 } else { slot * 4 };
        Write { off, wide, value }
    })
}

proptest! {
    #[test]
    fn prop_offsets_compose(a in 0i64..32, b in 0i64..32) {
        let mut sh = core_heap();
        let root = sh.heap_alloc(64);

        let step = sh.val_by_offset(root, a);
        let composed = sh.val_by_offset(step, b);
        let direct = sh.val_by_offset(root, a + b);
        prop_assert_eq!(composed, direct);
        prop_assert_eq!(sh.val_offset(direct), a + b);
        prop_assert_eq!(sh.val_root(direct), root);
    }

    #[test]
    fn prop_writes_match_last_writer_model(writes in prop::collection::vec(write_strategy(), 1..24)) {
        let mut sh = core_heap();
        let root = sh.heap_alloc(24);
        let (int, long) = (int_type(), long_type());

        // (off, size) -> object currently standing at that slot
        let mut model: BTreeMap<(i64, i64), (ObjId, bool)> = BTreeMap::new();

        for w in &writes {
            let (clt, size) = if w.wide { (&long, 8) } else { (&int, 4) };
            let addr = sh.val_by_offset(root, w.off);
            let obj = sh.obj_at(addr, clt);
            let value = sh.val_wrap_custom(CustomValue::Int(w.value));
            sh.obj_set_value(obj, value);

            for (&(off, len), slot) in model.iter_mut() {
                let overlaps = off < w.off + size && w.off < off + len;
                if overlaps && (off, len) != (w.off, size) {
                    slot.1 = false;
                }
            }
            model.insert((w.off, size), (obj, true));

            prop_assert_eq!(sh.value_of(obj), value);
            prop_assert!(sh.check_consistency().is_ok());
        }

        for (&(off, len), &(obj, live)) in &model {
            prop_assert_eq!(
                sh.obj_is_live(obj),
                live,
                "object at [{}, {}) disagrees with the model",
                off,
                off + len
            );
        }
    }
}
