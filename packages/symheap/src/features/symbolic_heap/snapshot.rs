//! Serializable dump of a heap state
//!
//! Meant for debugging and regression fixtures; the dump is not read back.

use super::core::SymHeapCore;
use super::domain::{BlockKind, ValueTarget};
use crate::errors::Result;
use crate::shared::models::{CVar, ObjId, ValId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeapSnapshot {
    pub heap_id: u64,
    pub roots: Vec<RootSnapshot>,
    pub neq: Vec<(ValId, ValId)>,
    pub coincidences: Vec<CoinSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootSnapshot {
    pub root: ValId,
    pub target: ValueTarget,
    pub cvar: Option<CVar>,
    pub size: i64,
    pub proto_level: u32,
    pub objects: Vec<ObjectSnapshot>,
}

/// Live block of a root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    pub obj: ObjId,
    pub kind: BlockKind,
    pub off: i64,
    pub size: i64,
    pub value: ValId,
    pub type_uid: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinSnapshot {
    pub a: ValId,
    pub b: ValId,
    pub diff: ValId,
    pub negated: bool,
}

impl HeapSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl SymHeapCore {
    /// Live roots with their live blocks, plus all predicates
    pub fn snapshot(&self) -> HeapSnapshot {
        let roots = self
            .live_roots
            .iter()
            .map(|&root| {
                let rd = self.root_ref(root);
                let mut objects: Vec<ObjectSnapshot> = rd
                    .live_objs
                    .iter()
                    .map(|(&obj, &kind)| {
                        let b = self.blk(obj);
                        ObjectSnapshot {
                            obj,
                            kind,
                            off: b.off,
                            size: b.size,
                            value: b.value,
                            type_uid: b.clt.as_ref().map(|t| t.uid),
                        }
                    })
                    .collect();
                objects.sort_by_key(|o| (o.off, o.obj));

                RootSnapshot {
                    root,
                    target: self.val_target(root),
                    cvar: rd.cvar,
                    size: rd.size,
                    proto_level: rd.proto_level,
                    objects,
                }
            })
            .collect();

        HeapSnapshot {
            heap_id: self.heap_id,
            roots,
            neq: self.neq.iter().collect(),
            coincidences: self
                .coin
                .iter()
                .map(|((a, b), c)| CoinSnapshot {
                    a,
                    b,
                    diff: c.diff,
                    negated: c.negated,
                })
                .collect(),
        }
    }
}
