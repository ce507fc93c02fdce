//! Predicate Stores
//!
//! - [`NeqDb`]: disequalities between values
//! - [`CoinDb`]: known distances between anchors of different roots
//!
//! Both must be cleaned whenever a value is destroyed or replaced; the heap
//! facade does this in `val_destroy_target` and `val_replace`.

mod coin_db;
mod neq_db;

pub use coin_db::{CoinDb, Coincidence};
pub use neq_db::NeqDb;

/// Direction of a disequality update
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NeqOp {
    Add,
    Del,
}
