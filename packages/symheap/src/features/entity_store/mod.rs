//! Entity Store - id-indexed copy-on-write storage
//!
//! - [`EntStore`]: append-only allocator for objects and values, one shared
//!   id space, per-entity copy-on-write
//! - [`Shared`]: reference-counted handle used for every heap satellite

mod shared;
mod store;

pub use shared::Shared;
pub use store::EntStore;
