//! Shared models

mod cvar;
mod ids;
mod int_range;
mod type_desc;

pub use cvar::{CVar, VarUid};
pub use ids::{ObjId, RawId, ValId};
pub use int_range::IntRange;
pub use type_desc::{same_type, TypeCode, TypeDesc, TypeItem, TypeRef};
