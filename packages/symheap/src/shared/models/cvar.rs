//! Program-variable identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Front-end identifier of a program variable
pub type VarUid = i32;

/// Program variable instance
///
/// `inst` discriminates frames of recursive calls; `inst == 0` denotes a
/// global (static) variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CVar {
    pub uid: VarUid,
    pub inst: i32,
}

impl CVar {
    pub fn new(uid: VarUid, inst: i32) -> Self {
        Self { uid, inst }
    }

    pub fn global(uid: VarUid) -> Self {
        Self { uid, inst: 0 }
    }

    #[inline]
    pub fn is_global(&self) -> bool {
        self.inst == 0
    }

    /// The global variable sharing this uid
    #[inline]
    pub fn as_global(&self) -> Self {
        Self::global(self.uid)
    }
}

impl fmt::Display for CVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            write!(f, "gl#{}", self.uid)
        } else {
            write!(f, "#{}:{}", self.uid, self.inst)
        }
    }
}
