//! Root lifecycle and inspection

use super::core::SymHeapCore;
use super::domain::{BlockEntity, BlockKind, ValueTarget};
use crate::shared::models::{CVar, ObjId, TypeRef, ValId};
use std::collections::BTreeSet;
use tracing::debug;

impl SymHeapCore {
    // ═══════════════════════════════════════════════════════════════════════
    // Creation
    // ═══════════════════════════════════════════════════════════════════════

    /// Address of a program variable
    ///
    /// A local instance that is not known falls back to the global variable
    /// of the same uid. Without `create`, an unknown variable yields
    /// `INVALID`.
    ///
    /// # Panics
    /// If the variable has to be created but the code storage does not know
    /// its type.
    pub fn addr_of_var(&mut self, cvar: CVar, create: bool) -> ValId {
        if let Some(&root) = self.cvar_map.get(&cvar) {
            return root;
        }
        if !cvar.is_global() {
            if let Some(&root) = self.cvar_map.get(&cvar.as_global()) {
                return root;
            }
        }
        if !create {
            return ValId::INVALID;
        }

        let storage = self.ctx.storage();
        let clt = storage
            .var_type(cvar.uid)
            .unwrap_or_else(|| panic!("unknown program variable {}", cvar));
        let is_global = storage.var_is_global(cvar.uid);

        let (key, code) = if is_global {
            (cvar.as_global(), ValueTarget::Static)
        } else {
            (cvar, ValueTarget::OnStack)
        };
        let root = self.mint_root(code, clt.size as i64, Some(key));
        self.root_mut(root).last_known_clt = Some(clt);
        self.cvar_map.make_mut().insert(key, root);
        debug!(heap = self.heap_id, %key, %root, ?code, "created program variable");
        root
    }

    /// Fresh heap block of `size` bytes
    pub fn heap_alloc(&mut self, size: i64) -> ValId {
        let root = self.mint_root(ValueTarget::OnHeap, size, None);
        debug!(heap = self.heap_id, %root, size, "allocated heap block");
        root
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Destruction and cloning
    // ═══════════════════════════════════════════════════════════════════════

    /// Invalidate a root
    ///
    /// Its objects are released unless the executor still holds them, in
    /// which case they survive without a value. Addresses of the root stay
    /// valid ids and report `Deleted` (heap) or `Lost` (variables and the
    /// return slot). Every predicate over the root's addresses is dropped.
    ///
    /// # Panics
    /// If `root` is not a root or has been destroyed already.
    pub fn val_destroy_target(&mut self, root: ValId) {
        let v = self.val_ref(root);
        assert!(!v.code.is_gone(), "{} destroyed twice", root);
        let rd = self
            .root_data(root)
            .unwrap_or_else(|| panic!("{} is not a root", root));

        let gone = if rd.cvar.is_some() || root == ValId::ADDR_OF_RET {
            ValueTarget::Lost
        } else {
            ValueTarget::Deleted
        };
        let cvar = rd.cvar;
        let objs: BTreeSet<ObjId> = rd.live_objs.keys().copied().chain(rd.typed_objs()).collect();
        let mut addrs = vec![root];
        addrs.extend(rd.anchor.off_map.values().copied());
        for &dep in &rd.anchor.dependents {
            addrs.push(dep);
            if let Some(data) = self.val_data(dep).and_then(|d| d.anchor_data()) {
                addrs.extend(data.off_map.values().copied());
            }
        }

        let rd = self.root_mut(root);
        rd.live_objs.clear();
        rd.arena.clear();
        for obj in objs {
            if self.blk(obj).ext_ref_cnt == 0 {
                self.release_block(obj);
            } else {
                self.set_block_value_raw(obj, ValId::INVALID);
            }
        }

        self.val_mut(root).code = gone;
        self.root_mut(root).size = 0;
        self.live_roots.make_mut().remove(&root);
        if let Some(cvar) = cvar {
            self.cvar_map.make_mut().remove(&cvar);
        }

        let mut killed = 0;
        for addr in addrs {
            if self.neq.mentions(addr) {
                killed += self.neq.make_mut().kill_by_value(addr);
            }
            if self.coin.mentions(addr) {
                killed += self.coin.make_mut().kill_by_value(addr);
            }
        }
        debug!(heap = self.heap_id, %root, ?gone, killed, "destroyed root");
    }

    /// Copy of a heap root with the same live content
    ///
    /// Pointers inside the copy keep pointing where the originals point.
    ///
    /// # Panics
    /// If `root` is not a live heap root.
    pub fn val_clone(&mut self, root: ValId) -> ValId {
        let rd = self.root_ref(root);
        assert!(
            rd.cvar.is_none() && root != ValId::ADDR_OF_RET,
            "only heap roots can be cloned, got {}",
            root
        );
        assert!(!self.val_ref(root).code.is_gone(), "cloning destroyed root {}", root);

        let (size, proto_level, clt) = (rd.size, rd.proto_level, rd.last_known_clt.clone());
        let blocks: Vec<(BlockKind, i64, i64, ValId, Option<TypeRef>)> = rd
            .live_objs
            .keys()
            .map(|&obj| {
                let b = self.blk(obj);
                (b.kind, b.off, b.size, b.value, b.clt.clone())
            })
            .collect();

        let dup = self.mint_root(ValueTarget::OnHeap, size, None);
        for (kind, off, len, value, obj_clt) in blocks {
            match (kind, obj_clt) {
                (BlockKind::Uniform, _) => {
                    let ub = self.assign_block(BlockEntity::new(kind, dup, off, len, None));
                    self.set_block_value_raw(ub, value);
                    self.make_live(ub);
                }
                (BlockKind::Composite, Some(obj_clt)) => {
                    self.create_typed_obj(dup, off, &obj_clt);
                }
                (_, Some(obj_clt)) => {
                    let obj = self.create_typed_obj(dup, off, &obj_clt);
                    self.set_block_value_raw(obj, value);
                    self.make_live(obj);
                }
                (_, None) => unreachable!("typed object without a type"),
            }
        }

        let dup_rd = self.root_mut(dup);
        dup_rd.proto_level = proto_level;
        dup_rd.last_known_clt = clt;
        debug!(heap = self.heap_id, from = %root, to = %dup, "cloned root");
        dup
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Prototype level
    // ═══════════════════════════════════════════════════════════════════════

    /// Prototype level of the root `val` points into (0 for non-addresses)
    pub fn val_target_proto_level(&self, val: ValId) -> u32 {
        self.mem_root(val)
            .map(|root| self.root_ref(root).proto_level)
            .unwrap_or(0)
    }

    /// # Panics
    /// If `val` is not an address.
    pub fn val_target_set_proto_level(&mut self, val: ValId, level: u32) {
        let root = self
            .mem_root(val)
            .unwrap_or_else(|| panic!("{} is not an address", val));
        self.root_mut(root).proto_level = level;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════════

    /// Objects holding `val`, optionally only the live ones
    pub fn used_by(&self, val: ValId, live_only: bool) -> Vec<ObjId> {
        let Some(v) = self.val_data(val) else {
            return Vec::new();
        };
        v.used_by
            .iter()
            .copied()
            .filter(|&obj| !live_only || self.obj_is_live(obj))
            .collect()
    }

    pub fn used_by_count(&self, val: ValId) -> usize {
        self.val_data(val).map_or(0, |v| v.used_by.len())
    }

    /// Objects holding any address into `root`
    pub fn pointed_by(&self, root: ValId) -> Vec<ObjId> {
        self.root_data(root)
            .map(|rd| rd.used_by_gl.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Live blocks of `root`, ascending by id
    pub fn gather_live_objects(&self, root: ValId) -> Vec<ObjId> {
        self.root_data(root)
            .map(|rd| rd.live_objs.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Live pointer objects of `root`
    pub fn gather_live_pointers(&self, root: ValId) -> Vec<ObjId> {
        self.root_data(root)
            .map(|rd| {
                rd.live_objs
                    .iter()
                    .filter(|(_, &kind)| kind == BlockKind::DataPtr)
                    .map(|(&obj, _)| obj)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Roots that have not been destroyed, including the return slot
    pub fn gather_root_objects(&self) -> Vec<ValId> {
        self.live_roots.iter().copied().collect()
    }

    pub fn gather_cvars(&self) -> Vec<CVar> {
        self.cvar_map.keys().copied().collect()
    }

    /// Program variable behind `root`, if any
    pub fn cvar_by_root(&self, root: ValId) -> Option<CVar> {
        self.root_data(root)?.cvar
    }
}
