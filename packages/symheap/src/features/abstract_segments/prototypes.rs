//! Prototypes of abstract roots
//!
//! A prototype is a root owned by a segment: every node the segment stands
//! for has its own instance of it. Prototypes carry a level greater than
//! zero; data shared by all nodes stays at level zero.

use super::domain::AbstractKind;
use super::seg_heap::SymHeap;
use crate::shared::models::ValId;
use std::collections::{BTreeSet, VecDeque};
use tracing::warn;

impl SymHeap {
    /// Prototype roots reachable from the abstract root `root`
    ///
    /// The binding pointers of `root` (`next`, and `prev` of a DLS) are not
    /// followed. With `skip_dls_peers`, only one end of each DLS is
    /// reported. `None` if `root` is not abstract.
    pub fn collect_prototypes_of(&self, root: ValId, skip_dls_peers: bool) -> Option<Vec<ValId>> {
        let meta = self.segs.get(&root).copied()?;
        let mut ignored = BTreeSet::from([meta.binding.next]);
        if meta.kind == AbstractKind::Dls {
            ignored.insert(meta.binding.prev);
        }

        let mut protos = Vec::new();
        let mut seen = BTreeSet::from([root]);
        let mut todo = VecDeque::from([root]);
        while let Some(cur) = todo.pop_front() {
            for obj in self.gather_live_pointers(cur) {
                let b = self.blk(obj);
                if cur == root && ignored.contains(&b.off) {
                    continue;
                }
                let val = b.value;
                let Some(target) = self.mem_root(val) else {
                    continue;
                };
                if !self.val_target(val).is_any_data_area()
                    || self.val_target_proto_level(target) == 0
                    || !seen.insert(target)
                {
                    continue;
                }
                if skip_dls_peers && self.is_dls_peer_end(target) {
                    continue;
                }
                protos.push(target);
                todo.push_back(target);
            }
        }
        Some(protos)
    }

    /// True for the end of a DLS whose peer has the smaller id
    fn is_dls_peer_end(&self, root: ValId) -> bool {
        self.dls_peer_of(root).is_some_and(|peer| peer < root)
    }

    /// Raise the prototype level of the root `val` points into
    ///
    /// A DLS peer follows.
    pub fn obj_increment_proto_level(&mut self, val: ValId) {
        self.shift_proto_level(val, true);
    }

    /// # Panics
    /// If the level is already zero.
    pub fn obj_decrement_proto_level(&mut self, val: ValId) {
        self.shift_proto_level(val, false);
    }

    fn shift_proto_level(&mut self, val: ValId, up: bool) {
        let root = self
            .mem_root(val)
            .unwrap_or_else(|| panic!("{} is not an address", val));
        let level = self.val_target_proto_level(root);
        let level = if up {
            level + 1
        } else {
            level
                .checked_sub(1)
                .unwrap_or_else(|| panic!("prototype level of {} underflows", root))
        };

        let peer = self.dls_peer_of(root);
        if let Some(peer) = peer {
            assert_eq!(
                self.val_target_proto_level(peer),
                self.val_target_proto_level(root),
                "DLS ends {} and {} disagree on the prototype level",
                root,
                peer
            );
        }
        for r in std::iter::once(root).chain(peer) {
            self.val_target_set_proto_level(r, level);
        }
    }

    /// Lower the prototype level of `root` and every prototype it owns
    pub fn decrement_proto_level(&mut self, root: ValId) {
        let protos = self.collect_prototypes_of(root, true).unwrap_or_default();
        for proto in protos {
            self.obj_decrement_proto_level(proto);
        }
    }

    /// True if no concrete root points to a prototype of a deeper level
    pub fn proto_check_consistency(&self) -> bool {
        for root in self.gather_root_objects() {
            if self.val_target_is_abstract(root) || self.val_target(root).is_gone() {
                continue;
            }
            let level = self.val_target_proto_level(root);
            for obj in self.gather_live_pointers(root) {
                let val = self.blk(obj).value;
                if !self.val_target(val).is_any_data_area() {
                    continue;
                }
                let target_level = self.val_target_proto_level(val);
                if target_level > level {
                    warn!(
                        heap = self.heap_id(),
                        %root,
                        level,
                        target = %val,
                        target_level,
                        "concrete root points to a deeper prototype"
                    );
                    return false;
                }
            }
        }
        true
    }
}
