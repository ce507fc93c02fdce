//! Memory roots

use super::block::BlockKind;
use super::value::AnchorData;
use crate::features::arena::IntervalArena;
use crate::shared::models::{CVar, ObjId, TypeRef};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Root-specific part of a root value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootData {
    pub anchor: AnchorData,
    /// Byte extent; 0 once destroyed
    pub size: i64,
    /// Program variable, `None` for heap blocks and the return slot
    pub cvar: Option<CVar>,
    /// Live blocks of the root
    pub live_objs: BTreeMap<ObjId, BlockKind>,
    /// Every typed object of the root (live or not), by offset
    pub all_objs: BTreeMap<i64, BTreeSet<ObjId>>,
    #[serde(skip, default)]
    pub arena: IntervalArena<ObjId>,
    /// Objects anywhere in the heap holding a pointer into this root
    pub used_by_gl: BTreeSet<ObjId>,
    /// Nesting level of prototypes; 0 for shared data
    pub proto_level: u32,
    #[serde(serialize_with = "serialize_clt_name", skip_deserializing)]
    pub last_known_clt: Option<TypeRef>,
}

fn serialize_clt_name<S: Serializer>(clt: &Option<TypeRef>, s: S) -> Result<S::Ok, S::Error> {
    match clt {
        Some(ty) => s.serialize_some(&ty.uid),
        None => s.serialize_none(),
    }
}

impl RootData {
    pub fn new(size: i64, cvar: Option<CVar>) -> Self {
        Self {
            anchor: AnchorData::default(),
            size,
            cvar,
            live_objs: BTreeMap::new(),
            all_objs: BTreeMap::new(),
            arena: IntervalArena::new(),
            used_by_gl: BTreeSet::new(),
            proto_level: 0,
            last_known_clt: None,
        }
    }

    #[inline]
    pub fn is_proto(&self) -> bool {
        self.proto_level > 0
    }

    pub fn register_obj(&mut self, off: i64, obj: ObjId) {
        self.all_objs.entry(off).or_default().insert(obj);
    }

    pub fn unregister_obj(&mut self, off: i64, obj: ObjId) {
        if let Some(objs) = self.all_objs.get_mut(&off) {
            objs.remove(&obj);
            if objs.is_empty() {
                self.all_objs.remove(&off);
            }
        }
    }

    /// Typed objects of the root, ascending by offset
    pub fn typed_objs(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.all_objs.values().flatten().copied()
    }
}
