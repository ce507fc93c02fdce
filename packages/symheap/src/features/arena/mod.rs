//! Interval Arena - per-root byte-range index of objects

mod interval_arena;

pub use interval_arena::{ByteRange, IntervalArena};
