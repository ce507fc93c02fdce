//! Value and offset model
//!
//! Values derived from one anchor are hash-consed through the anchor's
//! offset cache: `(anchor, relative offset)` always maps to the same id.
//! Root addresses anchor at the root itself, range addresses at their range
//! anchor, unknown values at themselves.

use super::core::SymHeapCore;
use super::domain::{BaseValue, PrecisionLossKind, RangeData, ValueKind, ValueOrigin, ValueTarget};
use crate::features::custom_values::CustomValue;
use crate::features::predicates::Coincidence;
use crate::shared::models::{IntRange, ObjId, TypeRef, ValId};
use tracing::trace;

impl SymHeapCore {
    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Target kind; addresses report the state of the root they point into
    pub fn val_target(&self, val: ValId) -> ValueTarget {
        if val == ValId::NULL {
            return ValueTarget::Invalid;
        }
        let Some(v) = self.val_data(val) else {
            return ValueTarget::Invalid;
        };
        let Some(root) = self.mem_root(val) else {
            return v.code;
        };

        let root_code = self.val_ref(root).code;
        if v.code == ValueTarget::Range && !root_code.is_gone() {
            ValueTarget::Range
        } else {
            root_code
        }
    }

    pub fn val_origin(&self, val: ValId) -> ValueOrigin {
        if val == ValId::DEREF_FAILED {
            return ValueOrigin::DerefFailed;
        }
        self.val_data(val)
            .map(|v| v.origin)
            .unwrap_or(ValueOrigin::Invalid)
    }

    /// Root (or unknown base value) `val` is an offset of
    ///
    /// `INVALID` for custom and composite values, which have no offsets.
    pub fn val_root(&self, val: ValId) -> ValId {
        match self.val_data(val) {
            Some(v) if !matches!(v.kind, ValueKind::Custom(_) | ValueKind::Composite(_)) => v.val_root,
            _ => ValId::INVALID,
        }
    }

    /// Offset from the root; range addresses report their lower bound
    pub fn val_offset(&self, val: ValId) -> i64 {
        self.val_offset_range(val).lo
    }

    /// Offsets from the root `val` may stand for
    pub fn val_offset_range(&self, val: ValId) -> IntRange {
        let Some(v) = self.val_data(val) else {
            return IntRange::singular(0);
        };
        match self.val_data(v.anchor).and_then(BaseValue::range_data) {
            Some(rd) => rd.range.shifted(v.off_root),
            None => IntRange::singular(v.off_root),
        }
    }

    /// Bytes between `val` and the end of its root (0 for non-addresses)
    pub fn val_size_of_target(&self, val: ValId) -> i64 {
        let Some(root) = self.mem_root(val) else {
            return 0;
        };
        self.root_ref(root).size - self.val_offset_range(val).hi
    }

    /// Most recent type seen at offset 0 of the root `val` points into
    pub fn val_last_known_type_of_target(&self, val: ValId) -> Option<TypeRef> {
        let root = self.mem_root(val)?;
        self.root_ref(root).last_known_clt.clone()
    }

    /// Composite object wrapped by a composite value
    pub fn val_get_composite_obj(&self, val: ValId) -> ObjId {
        match self.val_data(val).map(|v| &v.kind) {
            Some(ValueKind::Composite(obj)) => *obj,
            _ => ObjId::INVALID,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Derived values
    // ═══════════════════════════════════════════════════════════════════════

    /// Canonical value at `delta` bytes from `val`
    pub fn val_by_offset(&mut self, val: ValId, delta: i64) -> ValId {
        if delta == 0 {
            return val;
        }
        let Some(v) = self.val_data(val) else {
            return ValId::INVALID;
        };
        if matches!(v.kind, ValueKind::Custom(_) | ValueKind::Composite(_)) {
            self.report(
                PrecisionLossKind::OffsetOfNonAddress,
                format!("offset {} applied to non-address {}", delta, val),
            );
            return ValId::INVALID;
        }

        let (anchor, rel) = (v.anchor, v.off_root + delta);
        self.derive_at(anchor, rel)
    }

    fn derive_at(&mut self, anchor: ValId, rel: i64) -> ValId {
        if rel == 0 {
            return anchor;
        }
        let a = self.val_ref(anchor);
        if let Some(&cached) = a.anchor_data().and_then(|d| d.off_map.get(&rel)) {
            return cached;
        }

        let origin = match a.kind {
            ValueKind::Root(_) | ValueKind::Range(_) => ValueOrigin::Assigned,
            _ => a.origin,
        };
        let (code, val_root) = (a.code, a.val_root);
        let id = self.assign_value(|_| BaseValue::new_derived(code, origin, val_root, anchor, rel));
        self.val_mut(anchor).anchor_data_mut().off_map.insert(rel, id);
        trace!(heap = self.heap_id, %anchor, rel, val = %id, "minted offset value");
        id
    }

    /// Address whose offset from `at` lies anywhere in `range`
    pub fn val_by_range(&mut self, at: ValId, range: IntRange) -> ValId {
        if range.is_singular() {
            return self.val_by_offset(at, range.lo);
        }
        let Some(root) = self.mem_root(at) else {
            self.report(
                PrecisionLossKind::OffsetOfNonAddress,
                format!("range {} applied to non-address {}", range, at),
            );
            return ValId::INVALID;
        };

        let base = self.val_offset_range(at);
        let abs = IntRange::new(base.lo + range.lo, base.hi + range.hi);
        let id = self.assign_value(|id| BaseValue {
            val_root: root,
            ..BaseValue::new_self_rooted(
                id,
                ValueTarget::Range,
                ValueOrigin::Assigned,
                ValueKind::Range(RangeData {
                    anchor: Default::default(),
                    range: abs,
                }),
            )
        });
        self.root_mut(root).anchor.dependents.push(id);
        trace!(heap = self.heap_id, %root, range = %abs, val = %id, "minted range value");
        id
    }

    /// Narrow the interval of a range address to `window`
    ///
    /// When the window is a single point, the range anchor and every value
    /// derived from it are replaced by the corresponding plain offsets and
    /// the anchor is detached from its root.
    ///
    /// # Panics
    /// If `val` is not a range address or `window` is not within its current
    /// interval.
    pub fn val_restrict_range(&mut self, val: ValId, window: IntRange) -> ValId {
        let v = self.val_ref(val);
        let (anchor, shift, root) = (v.anchor, v.off_root, v.val_root);
        let current = match self.val_ref(anchor).range_data() {
            Some(rd) => rd.range.shifted(shift),
            None => panic!("{} is not a range value", val),
        };
        assert!(
            window.is_subset_of(&current),
            "window {} is not within {} of {}",
            window,
            current,
            val
        );

        let narrowed = window.shifted(-shift);
        if !narrowed.is_singular() {
            if let ValueKind::Range(rd) = &mut self.val_mut(anchor).kind {
                rd.range = narrowed;
            }
            return val;
        }

        let point = narrowed.lo;
        let derived: Vec<(i64, ValId)> = self
            .val_ref(anchor)
            .anchor_data()
            .map(|d| d.off_map.iter().map(|(&k, &v)| (k, v)).collect())
            .unwrap_or_default();
        for &(rel, dv) in &derived {
            let image = self.val_by_offset(root, point + rel);
            self.val_replace(dv, image);
        }
        let image = self.val_by_offset(root, point);
        self.val_replace(anchor, image);

        // stale ids become plain aliases of the addresses they collapsed to
        let code = self.val_ref(root).code;
        for (rel, alias) in std::iter::once((0, anchor)).chain(derived) {
            let stale = self.val_mut(alias);
            stale.kind = ValueKind::Plain;
            stale.code = code;
            stale.anchor = root;
            stale.off_root = point + rel;
        }
        self.root_mut(root).anchor.dependents.retain(|&d| d != anchor);
        trace!(heap = self.heap_id, range = %anchor, point, "range collapsed");

        self.val_by_offset(root, window.lo)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Unknown values
    // ═══════════════════════════════════════════════════════════════════════

    /// Fresh value of the given (non-address) kind
    ///
    /// # Panics
    /// For address, custom and composite kinds, which have dedicated
    /// constructors.
    pub fn val_create(&mut self, target: ValueTarget, origin: ValueOrigin) -> ValId {
        assert!(
            matches!(target, ValueTarget::Unknown | ValueTarget::Invalid),
            "val_create cannot mint {:?} values",
            target
        );
        self.assign_value(|id| BaseValue::new_self_rooted(id, target, origin, ValueKind::Plain))
    }

    /// Fresh value with the same kind and origin as the unknown `val`
    ///
    /// # Panics
    /// If `val` is not an unknown value.
    pub fn val_clone_unknown(&mut self, val: ValId) -> ValId {
        let target = self.val_target(val);
        assert_eq!(target, ValueTarget::Unknown, "{} is not an unknown value", val);
        let origin = self.val_origin(val);
        self.val_create(target, origin)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Custom values
    // ═══════════════════════════════════════════════════════════════════════

    /// Canonical value of a constant
    pub fn val_wrap_custom(&mut self, cv: CustomValue) -> ValId {
        let cv = cv.normalized();
        if let Some(val) = self.custom.lookup(&cv) {
            return val;
        }

        let dedup = !matches!(cv, CustomValue::Range(_));
        let kind = ValueKind::Custom(cv.clone());
        let val = self.assign_value(|id| {
            BaseValue::new_self_rooted(id, ValueTarget::Custom, ValueOrigin::Assigned, kind)
        });
        if dedup {
            self.custom.make_mut().register(&cv, val);
        }
        val
    }

    /// Constant behind `val`; `NULL` reads as integer 0
    pub fn val_unwrap_custom(&self, val: ValId) -> Option<CustomValue> {
        if val == ValId::NULL {
            return Some(CustomValue::Int(0));
        }
        self.val_data(val)?.custom().cloned()
    }

    /// Integer interval behind `val`, if it is an integer constant
    pub fn val_int_range(&self, val: ValId) -> Option<IntRange> {
        self.val_unwrap_custom(val)?.int_range()
    }

    /// Narrow an interval constant; a single point turns into the integer
    /// and every holder migrates to it
    ///
    /// # Panics
    /// If `val` is not an interval constant or `window` is not within it.
    pub fn val_narrow_custom_range(&mut self, val: ValId, window: IntRange) -> ValId {
        let current = match self.val_data(val).and_then(BaseValue::custom) {
            Some(CustomValue::Range(rng)) => *rng,
            _ => panic!("{} is not an interval constant", val),
        };
        assert!(
            window.is_subset_of(&current),
            "window {} is not within {} of {}",
            window,
            current,
            val
        );

        if !window.is_singular() {
            self.val_mut(val).kind = ValueKind::Custom(CustomValue::Range(window));
            return val;
        }
        let image = self.val_wrap_custom(CustomValue::Int(window.lo));
        self.val_replace(val, image);
        image
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Pointer arithmetic across roots
    // ═══════════════════════════════════════════════════════════════════════

    /// Value of `a - b` for two addresses
    ///
    /// Addresses of one root give an integer constant. Addresses of
    /// different roots are answered from the coincidence store; a first
    /// query mints the difference of the two roots and records it. The
    /// reverse query keeps the negated entry and answers with the value
    /// registered as its negation.
    pub fn diff_pointers(&mut self, a: ValId, b: ValId) -> ValId {
        let (Some(ra), Some(rb)) = (self.mem_root(a), self.mem_root(b)) else {
            return ValId::INVALID;
        };
        let off = self.val_offset_range(a).minus(&self.val_offset_range(b));
        if ra == rb {
            return self.val_wrap_custom(CustomValue::Range(off));
        }

        let base = match self.coin.lookup(ra, rb) {
            Some(Coincidence {
                diff,
                negated: false,
            }) => diff,
            Some(Coincidence {
                diff,
                negated: true,
            }) => match self.val_int_range(diff) {
                Some(r) => self.val_wrap_custom(CustomValue::Range(IntRange::new(-r.hi, -r.lo))),
                None => match self.coin.negation_of(diff) {
                    Some(neg) => neg,
                    None => {
                        let neg = self.mint_unknown(ValueOrigin::Unknown);
                        self.coin.make_mut().set_negation(diff, neg);
                        neg
                    }
                },
            },
            None => {
                let fresh = self.mint_unknown(ValueOrigin::Unknown);
                self.coin.make_mut().add(ra, rb, fresh);
                fresh
            }
        };

        if off == IntRange::singular(0) {
            return base;
        }
        match self.val_int_range(base) {
            Some(r) => self.val_wrap_custom(CustomValue::Range(IntRange::new(
                r.lo + off.lo,
                r.hi + off.hi,
            ))),
            None => {
                self.report(
                    PrecisionLossKind::UnboundPointerDiff,
                    format!("difference of {} and {} at offset {}", a, b, off),
                );
                self.mint_unknown(ValueOrigin::Unknown)
            }
        }
    }

    /// True if the distance between `a` and `b` is tracked
    pub fn are_bound(&self, a: ValId, b: ValId) -> bool {
        match (self.mem_root(a), self.mem_root(b)) {
            (Some(ra), Some(rb)) => ra == rb || self.coin.lookup(ra, rb).is_some(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::symbolic_heap::test_support::heap;

    #[test]
    fn test_offsets_are_hash_consed() {
        let mut sh = heap();
        let root = sh.heap_alloc(32);

        let a = sh.val_by_offset(root, 8);
        let b = sh.val_by_offset(a, 8);
        assert_eq!(b, sh.val_by_offset(root, 16));
        assert_eq!(sh.val_by_offset(b, -16), root);
        assert_eq!(sh.val_by_offset(a, 0), a);
        assert_eq!(sh.val_root(b), root);
        assert_eq!(sh.val_offset(b), 16);
        assert_eq!(sh.val_target(b), ValueTarget::OnHeap);
    }

    #[test]
    fn test_offset_of_unknown_value() {
        let mut sh = heap();
        let u = sh.val_create(ValueTarget::Unknown, ValueOrigin::Unknown);
        let d = sh.val_by_offset(u, 4);
        assert_eq!(sh.val_root(d), u);
        assert_eq!(sh.val_offset(d), 4);
        assert_eq!(sh.val_target(d), ValueTarget::Unknown);
        assert_eq!(sh.val_by_offset(d, -4), u);
    }

    #[test]
    fn test_offset_of_custom_is_invalid() {
        let mut sh = heap();
        let five = sh.val_wrap_custom(CustomValue::Int(5));
        assert_eq!(sh.val_by_offset(five, 1), ValId::INVALID);
        assert_eq!(sh.val_by_offset(ValId::TRUE, 1), ValId::INVALID);
        assert_eq!(sh.val_by_offset(ValId::INVALID, 1), ValId::INVALID);
    }

    #[test]
    fn test_null_offsets() {
        let mut sh = heap();
        let n8 = sh.val_by_offset(ValId::NULL, 8);
        assert_eq!(sh.val_root(n8), ValId::NULL);
        assert_eq!(sh.val_target(n8), ValueTarget::Invalid);
        assert_eq!(sh.val_by_offset(n8, -8), ValId::NULL);
    }

    #[test]
    fn test_range_value() {
        let mut sh = heap();
        let root = sh.heap_alloc(64);
        let at = sh.val_by_offset(root, 8);
        let rng = sh.val_by_range(at, IntRange::new(0, 16));

        assert_eq!(sh.val_target(rng), ValueTarget::Range);
        assert_eq!(sh.val_root(rng), root);
        assert_eq!(sh.val_offset_range(rng), IntRange::new(8, 24));

        let derived = sh.val_by_offset(rng, 4);
        assert_eq!(sh.val_offset_range(derived), IntRange::new(12, 28));
        assert_eq!(sh.val_by_range(at, IntRange::singular(4)), sh.val_by_offset(root, 12));
    }

    #[test]
    fn test_range_narrowing_without_collapse() {
        let mut sh = heap();
        let root = sh.heap_alloc(64);
        let rng = sh.val_by_range(root, IntRange::new(0, 10));
        assert_eq!(sh.val_restrict_range(rng, IntRange::new(2, 5)), rng);
        assert_eq!(sh.val_offset_range(rng), IntRange::new(2, 5));
    }

    #[test]
    fn test_range_collapse_replaces_derived_values() {
        let mut sh = heap();
        let root = sh.heap_alloc(64);
        let rng = sh.val_by_range(root, IntRange::new(0, 10));
        let derived = sh.val_by_offset(rng, 8);

        let at32 = sh.val_by_offset(root, 32);
        let holder = sh.ptr_at(at32);
        sh.obj_set_value(holder, derived);

        let result = sh.val_restrict_range(derived, IntRange::singular(11));
        assert_eq!(result, sh.val_by_offset(root, 11));
        assert_eq!(sh.value_of(holder), result);
        assert_eq!(sh.used_by_count(derived), 0);
        assert!(!sh.root_ref(root).anchor.dependents.contains(&rng));
    }

    #[test]
    fn test_collapsed_range_stays_hash_consed() {
        let mut sh = heap();
        let root = sh.heap_alloc(64);
        let rng = sh.val_by_range(root, IntRange::new(0, 10));
        let at4 = sh.val_by_offset(rng, 4);
        let at8 = sh.val_by_offset(rng, 8);
        let at32 = sh.val_by_offset(root, 32);
        let h4 = sh.ptr_at(at32);
        let at40 = sh.val_by_offset(root, 40);
        let h8 = sh.ptr_at(at40);
        sh.obj_set_value(h4, at4);
        sh.obj_set_value(h8, at8);

        sh.val_restrict_range(rng, IntRange::singular(3));

        let stale = sh.val_by_offset(rng, 4);
        assert_eq!(stale, sh.val_by_offset(root, 7));
        assert_eq!(sh.val_by_offset(at8, 1), sh.val_by_offset(root, 12));
        assert_eq!(sh.val_offset_range(at8), IntRange::singular(11));
        assert_eq!(sh.value_of(h4), stale);
        assert_eq!(sh.val_by_offset(rng, -3), root);
        assert_eq!(sh.val_target(rng), ValueTarget::OnHeap);
        assert_eq!(sh.val_offset_range(rng), IntRange::singular(3));

        let obj = sh.obj_at(rng, &crate::features::symbolic_heap::test_support::int_type());
        assert!(obj.is_valid());
        assert_eq!(sh.placed_at(obj), sh.val_by_offset(root, 3));
        assert!(sh.check_consistency().is_ok());
    }

    #[test]
    #[should_panic(expected = "is not within")]
    fn test_range_widening_panics() {
        let mut sh = heap();
        let root = sh.heap_alloc(64);
        let rng = sh.val_by_range(root, IntRange::new(0, 10));
        sh.val_restrict_range(rng, IntRange::new(5, 20));
    }

    #[test]
    fn test_custom_hash_consing() {
        let mut sh = heap();
        let a = sh.val_wrap_custom(CustomValue::Str("hello".into()));
        let b = sh.val_wrap_custom(CustomValue::Str("hello".into()));
        assert_eq!(a, b);
        assert_eq!(sh.val_wrap_custom(CustomValue::Int(0)), ValId::NULL);
        assert_eq!(sh.val_wrap_custom(CustomValue::Int(1)), ValId::TRUE);
        assert_eq!(sh.val_target(a), ValueTarget::Custom);

        let r1 = sh.val_wrap_custom(CustomValue::Range(IntRange::new(0, 3)));
        let r2 = sh.val_wrap_custom(CustomValue::Range(IntRange::new(0, 3)));
        assert_ne!(r1, r2);
    }

    #[test]
    fn test_narrow_custom_range_to_point() {
        let mut sh = heap();
        let rng = sh.val_wrap_custom(CustomValue::Range(IntRange::new(0, 9)));
        let root = sh.heap_alloc(8);
        let int = crate::features::symbolic_heap::test_support::int_type();
        let obj = sh.obj_at(root, &int);
        sh.obj_set_value(obj, rng);

        assert_eq!(sh.val_narrow_custom_range(rng, IntRange::new(2, 9)), rng);
        let seven = sh.val_narrow_custom_range(rng, IntRange::singular(7));
        assert_eq!(seven, sh.val_wrap_custom(CustomValue::Int(7)));
        assert_eq!(sh.value_of(obj), seven);
        assert_eq!(sh.used_by_count(rng), 0);
    }

    #[test]
    fn test_diff_pointers_same_root() {
        let mut sh = heap();
        let root = sh.heap_alloc(32);
        let a = sh.val_by_offset(root, 24);
        let b = sh.val_by_offset(root, 8);
        let diff = sh.diff_pointers(a, b);
        assert_eq!(sh.val_unwrap_custom(diff), Some(CustomValue::Int(16)));
        assert!(sh.are_bound(a, b));
    }

    #[test]
    fn test_diff_pointers_across_roots() {
        let mut sh = heap();
        let r1 = sh.heap_alloc(8);
        let r2 = sh.heap_alloc(8);
        assert!(!sh.are_bound(r1, r2));

        let d = sh.diff_pointers(r1, r2);
        assert_eq!(sh.val_target(d), ValueTarget::Unknown);
        assert_eq!(sh.diff_pointers(r1, r2), d);
        assert!(sh.are_bound(r2, r1));
        assert_eq!(sh.diff_pointers(ValId::TRUE, r1), ValId::INVALID);
    }

    #[test]
    fn test_reverse_diff_keeps_negated_coincidence() {
        let mut sh = heap();
        let r1 = sh.heap_alloc(8);
        let r2 = sh.heap_alloc(8);

        let d = sh.diff_pointers(r1, r2);
        let neg = sh.diff_pointers(r2, r1);
        assert_ne!(neg, d);
        assert_eq!(sh.diff_pointers(r2, r1), neg);
        assert_eq!(sh.diff_pointers(r1, r2), d);
        assert_eq!(
            sh.coin.lookup(r2, r1),
            Some(Coincidence {
                diff: d,
                negated: true
            })
        );
        assert_eq!(sh.coin.negation_of(neg), Some(d));

        sh.val_destroy_target(r1);
        assert!(sh.coin.is_empty());
        assert_eq!(sh.coin.negation_of(d), None);
    }

    #[test]
    fn test_size_and_type_of_target() {
        let mut sh = heap();
        let root = sh.heap_alloc(32);
        let at = sh.val_by_offset(root, 8);
        assert_eq!(sh.val_size_of_target(at), 24);
        assert_eq!(sh.val_size_of_target(ValId::TRUE), 0);
        assert!(sh.val_last_known_type_of_target(at).is_none());
    }

    #[test]
    fn test_clone_unknown() {
        let mut sh = heap();
        let u = sh.val_create(ValueTarget::Unknown, ValueOrigin::HeapUninit);
        let c = sh.val_clone_unknown(u);
        assert_ne!(u, c);
        assert_eq!(sh.val_origin(c), ValueOrigin::HeapUninit);
        assert_eq!(sh.val_origin(ValId::DEREF_FAILED), ValueOrigin::DerefFailed);
    }
}
