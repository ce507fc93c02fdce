//! Feature modules (vertical slices)
//!
//! ```text
//! entity_store ──► symbolic_heap ──► abstract_segments
//! arena ─────────┘      ▲
//! predicates ───────────┤
//! custom_values ────────┘
//! ```

pub mod abstract_segments;
pub mod arena;
pub mod custom_values;
pub mod entity_store;
pub mod predicates;
pub mod symbolic_heap;
