//! Heap state and entity bookkeeping
//!
//! ```text
//! SymHeapCore ::= EntStore × LiveRoots × CVarMap × CustomMap × NeqDb × CoinDb
//! ```
//!
//! Every component sits behind its own [`Shared`] handle. Cloning a heap
//! state is the fork: it bumps reference counts and nothing else. The first
//! write to a component after a fork copies that component; the entity store
//! then copies individual entities on their first write.
//!
//! The public operations are spread over sibling modules by concern
//! (`values`, `objects`, `roots`, `predicates`, ...); this module holds the
//! state and the primitives they share.

use super::context::HeapContext;
use super::domain::{
    BaseValue, BlockEntity, BlockKind, Entity, PrecisionLossKind, RootData, ValueKind,
    ValueOrigin, ValueTarget,
};
use crate::features::custom_values::{CustomValue, CustomValueMapper};
use crate::features::entity_store::{EntStore, Shared};
use crate::features::predicates::{CoinDb, NeqDb};
use crate::shared::models::{CVar, ObjId, RawId, ValId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Value/object/root facade of one heap state
pub struct SymHeapCore {
    pub(crate) ctx: Arc<HeapContext>,
    pub(crate) heap_id: u64,
    pub(crate) ents: Shared<EntStore<Entity>>,
    pub(crate) live_roots: Shared<BTreeSet<ValId>>,
    pub(crate) cvar_map: Shared<BTreeMap<CVar, ValId>>,
    pub(crate) custom: Shared<CustomValueMapper>,
    pub(crate) neq: Shared<NeqDb>,
    pub(crate) coin: Shared<CoinDb>,
}

impl SymHeapCore {
    /// Empty heap: only `NULL`, `TRUE` and the return slot exist
    pub fn new(ctx: Arc<HeapContext>) -> Self {
        let heap_id = ctx.next_heap_id();
        let mut ents = EntStore::with_reserved(ValId::FIRST_FREE as usize);

        ents.assign_reserved(
            ValId::NULL.0,
            Entity::Value(BaseValue::new_self_rooted(
                ValId::NULL,
                ValueTarget::Invalid,
                ValueOrigin::Assigned,
                ValueKind::Plain,
            )),
        );
        ents.assign_reserved(
            ValId::TRUE.0,
            Entity::Value(BaseValue::new_self_rooted(
                ValId::TRUE,
                ValueTarget::Custom,
                ValueOrigin::Assigned,
                ValueKind::Custom(CustomValue::Int(1)),
            )),
        );
        ents.assign_reserved(
            ValId::ADDR_OF_RET.0,
            Entity::Value(BaseValue::new_self_rooted(
                ValId::ADDR_OF_RET,
                ValueTarget::OnStack,
                ValueOrigin::Assigned,
                ValueKind::Root(Box::new(RootData::new(0, None))),
            )),
        );

        debug!(heap = heap_id, "created heap state");
        Self {
            ctx,
            heap_id,
            ents: Shared::new(ents),
            live_roots: Shared::new(BTreeSet::from([ValId::ADDR_OF_RET])),
            cvar_map: Shared::new(BTreeMap::new()),
            custom: Shared::new(CustomValueMapper::new()),
            neq: Shared::new(NeqDb::new()),
            coin: Shared::new(CoinDb::new()),
        }
    }

    /// Id used for this state in logs and reports
    #[inline]
    pub fn heap_id(&self) -> u64 {
        self.heap_id
    }

    #[inline]
    pub fn context(&self) -> &Arc<HeapContext> {
        &self.ctx
    }

    /// Highest id handed out so far (objects and values alike)
    #[inline]
    pub fn last_id(&self) -> RawId {
        self.ents.last_id()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Entity access
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn val_data(&self, val: ValId) -> Option<&BaseValue> {
        match self.ents.get(val.0)? {
            Entity::Value(v) => Some(v),
            Entity::Block(_) => None,
        }
    }

    pub(crate) fn val_ref(&self, val: ValId) -> &BaseValue {
        self.val_data(val)
            .unwrap_or_else(|| panic!("{} does not denote a value", val))
    }

    pub(crate) fn val_mut(&mut self, val: ValId) -> &mut BaseValue {
        match self.ents.make_mut().get_mut(val.0) {
            Entity::Value(v) => v,
            Entity::Block(_) => panic!("{} does not denote a value", val),
        }
    }

    pub(crate) fn blk_data(&self, obj: ObjId) -> Option<&BlockEntity> {
        match self.ents.get(obj.0)? {
            Entity::Block(b) => Some(b),
            Entity::Value(_) => None,
        }
    }

    pub(crate) fn blk(&self, obj: ObjId) -> &BlockEntity {
        self.blk_data(obj)
            .unwrap_or_else(|| panic!("{} does not denote an object", obj))
    }

    pub(crate) fn blk_mut(&mut self, obj: ObjId) -> &mut BlockEntity {
        match self.ents.make_mut().get_mut(obj.0) {
            Entity::Block(b) => b,
            Entity::Value(_) => panic!("{} does not denote an object", obj),
        }
    }

    pub(crate) fn root_data(&self, root: ValId) -> Option<&RootData> {
        self.val_data(root)?.root_data()
    }

    pub(crate) fn root_ref(&self, root: ValId) -> &RootData {
        self.root_data(root)
            .unwrap_or_else(|| panic!("{} is not a root", root))
    }

    pub(crate) fn root_mut(&mut self, root: ValId) -> &mut RootData {
        self.val_mut(root)
            .root_data_mut()
            .unwrap_or_else(|| panic!("{} is not a root", root))
    }

    /// Memory root an address value points into
    pub(crate) fn mem_root(&self, val: ValId) -> Option<ValId> {
        let root = self.val_data(val)?.val_root;
        self.root_data(root).map(|_| root)
    }

    /// True if `obj` is among the live blocks of its root
    pub fn obj_is_live(&self, obj: ObjId) -> bool {
        self.blk_data(obj).is_some_and(|b| {
            self.root_data(b.root)
                .is_some_and(|rd| rd.live_objs.contains_key(&obj))
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Entity creation
    // ═══════════════════════════════════════════════════════════════════════

    fn assign(&mut self, ent: Entity) -> RawId {
        let id = self.ents.make_mut().assign_id(ent);
        if id as usize == self.ctx.config().entity_soft_limit {
            warn!(
                heap = self.heap_id,
                limit = self.ctx.config().entity_soft_limit,
                "entity store exceeded its soft limit"
            );
        }
        id
    }

    /// Mint a value that may need to know its own id
    pub(crate) fn assign_value(&mut self, build: impl FnOnce(ValId) -> BaseValue) -> ValId {
        let id = ValId(self.ents.len() as RawId);
        let got = self.assign(Entity::Value(build(id)));
        debug_assert_eq!(got, id.0);
        id
    }

    pub(crate) fn assign_block(&mut self, blk: BlockEntity) -> ObjId {
        ObjId(self.assign(Entity::Block(blk)))
    }

    /// Fresh unknown value
    pub(crate) fn mint_unknown(&mut self, origin: ValueOrigin) -> ValId {
        self.assign_value(|id| {
            BaseValue::new_self_rooted(id, ValueTarget::Unknown, origin, ValueKind::Plain)
        })
    }

    /// Fresh root value, registered as live
    pub(crate) fn mint_root(&mut self, code: ValueTarget, size: i64, cvar: Option<CVar>) -> ValId {
        let root = self.assign_value(|id| {
            BaseValue::new_self_rooted(
                id,
                code,
                ValueOrigin::Assigned,
                ValueKind::Root(Box::new(RootData::new(size, cvar))),
            )
        });
        self.live_roots.make_mut().insert(root);
        root
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Holders
    // ═══════════════════════════════════════════════════════════════════════

    /// `NULL`, `TRUE` and sentinels are not tracked
    fn is_tracked(&self, val: ValId) -> bool {
        val.is_valid() && !val.is_reserved_scalar() && self.val_data(val).is_some()
    }

    fn holder_add(&mut self, obj: ObjId, val: ValId) {
        if !self.is_tracked(val) {
            return;
        }
        self.val_mut(val).used_by.insert(obj);
        if let Some(root) = self.mem_root(val) {
            self.root_mut(root).used_by_gl.insert(obj);
        }
    }

    fn holder_del(&mut self, obj: ObjId, val: ValId) {
        if !self.is_tracked(val) {
            return;
        }
        self.val_mut(val).used_by.remove(&obj);
        if let Some(root) = self.mem_root(val) {
            self.root_mut(root).used_by_gl.remove(&obj);
        }
    }

    /// Replace the value held by `obj` and keep back-references in sync
    pub(crate) fn set_block_value_raw(&mut self, obj: ObjId, val: ValId) {
        let old = self.blk(obj).value;
        if old == val {
            return;
        }
        self.holder_del(obj, old);
        self.blk_mut(obj).value = val;
        self.holder_add(obj, val);
    }

    /// Insert `obj` into the live set and the arena of its root
    pub(crate) fn make_live(&mut self, obj: ObjId) {
        let b = self.blk(obj);
        let (root, kind, range) = (b.root, b.kind, b.range());
        let rd = self.root_mut(root);
        if rd.live_objs.insert(obj, kind).is_none() {
            rd.arena.insert(range, obj);
        }
    }

    /// Physically release a block that is no longer live
    ///
    /// # Panics
    /// If the block is still live or referenced by the executor.
    pub(crate) fn release_block(&mut self, obj: ObjId) {
        let b = self.blk(obj);
        assert_eq!(b.ext_ref_cnt, 0, "releasing referenced object {}", obj);
        let (root, off, kind, value) = (b.root, b.off, b.kind, b.value);
        assert!(
            !self.root_ref(root).live_objs.contains_key(&obj),
            "releasing live object {}",
            obj
        );

        self.holder_del(obj, value);
        if kind != BlockKind::Uniform {
            self.root_mut(root).unregister_obj(off, obj);
        }
        self.ents.make_mut().release(obj.0);
    }

    /// Report a precision loss through the context's sink
    pub(crate) fn report(&self, kind: PrecisionLossKind, detail: impl Into<String>) {
        self.ctx.report(self.heap_id, kind, detail);
    }
}

impl Clone for SymHeapCore {
    /// Fork the heap state; both states evolve independently afterwards
    fn clone(&self) -> Self {
        let heap_id = self.ctx.next_heap_id();
        debug!(from = self.heap_id, to = heap_id, "forked heap state");
        Self {
            ctx: Arc::clone(&self.ctx),
            heap_id,
            ents: self.ents.clone(),
            live_roots: self.live_roots.clone(),
            cvar_map: self.cvar_map.clone(),
            custom: self.custom.clone(),
            neq: self.neq.clone(),
            coin: self.coin.clone(),
        }
    }
}

impl fmt::Debug for SymHeapCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymHeapCore")
            .field("heap_id", &self.heap_id)
            .field("entities", &self.ents.len())
            .field("live_roots", &self.live_roots.len())
            .field("neq", &self.neq.len())
            .field("coin", &self.coin.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::symbolic_heap::test_support::heap;

    #[test]
    fn test_reserved_entities() {
        let sh = heap();
        assert!(sh.val_data(ValId::NULL).is_some());
        assert!(sh.val_data(ValId::TRUE).is_some());
        assert!(sh.root_data(ValId::ADDR_OF_RET).is_some());
        assert_eq!(sh.last_id(), ValId::FIRST_FREE - 1);
    }

    #[test]
    fn test_fork_shares_until_write() {
        let mut sh = heap();
        let root = sh.heap_alloc(16);

        let fork = sh.clone();
        assert!(sh.ents.ptr_eq(&fork.ents));
        assert_ne!(sh.heap_id(), fork.heap_id());

        sh.heap_alloc(8);
        assert!(!sh.ents.ptr_eq(&fork.ents));
        assert!(fork.root_data(root).is_some());
        assert_eq!(fork.live_roots.len() + 1, sh.live_roots.len());
    }

    #[test]
    fn test_holders_skip_reserved_scalars() {
        let mut sh = heap();
        let root = sh.heap_alloc(8);
        let obj = sh.ptr_at(root);
        sh.obj_set_value(obj, ValId::NULL);
        assert!(sh.val_ref(ValId::NULL).used_by.is_empty());
    }
}
