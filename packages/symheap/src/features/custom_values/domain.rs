//! Custom constants carried by values

use crate::shared::models::IntRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of a function as assigned by the front-end
pub type FncUid = i32;

/// Constant wrapped by a custom value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomValue {
    /// Address of a function
    Fnc(FncUid),
    Int(i64),
    Real(f64),
    Str(String),
    /// Closed integer interval; never shared between values
    Range(IntRange),
}

impl CustomValue {
    /// Interval view of integer constants
    pub fn int_range(&self) -> Option<IntRange> {
        match self {
            CustomValue::Int(n) => Some(IntRange::singular(*n)),
            CustomValue::Range(rng) => Some(*rng),
            _ => None,
        }
    }

    /// Key under which the mapper deduplicates this constant
    pub(crate) fn key(&self) -> Option<CustomKey> {
        match self {
            CustomValue::Fnc(uid) => Some(CustomKey::Fnc(*uid)),
            CustomValue::Int(n) => Some(CustomKey::Int(*n)),
            CustomValue::Real(r) => Some(CustomKey::Real(r.to_bits())),
            CustomValue::Str(s) => Some(CustomKey::Str(s.clone())),
            CustomValue::Range(rng) if rng.is_singular() => Some(CustomKey::Int(rng.lo)),
            CustomValue::Range(_) => None,
        }
    }

    /// Canonical form: singular intervals become integers
    pub fn normalized(self) -> Self {
        match self {
            CustomValue::Range(rng) if rng.is_singular() => CustomValue::Int(rng.lo),
            other => other,
        }
    }
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomValue::Fnc(uid) => write!(f, "fnc#{}", uid),
            CustomValue::Int(n) => write!(f, "{}", n),
            CustomValue::Real(r) => write!(f, "{}", r),
            CustomValue::Str(s) => write!(f, "{:?}", s),
            CustomValue::Range(rng) => write!(f, "{}", rng),
        }
    }
}

/// Hashable identity of a deduplicated constant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CustomKey {
    Fnc(FncUid),
    Int(i64),
    /// Bit pattern, so that `NaN` keys are stable
    Real(u64),
    Str(String),
}
