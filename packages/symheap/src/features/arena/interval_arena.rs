//! Run-length interval map
//!
//! ```text
//! offsets:  0     4     8        16
//! runs:     |{a}  |{a,b}|{b}     |{}
//! ```
//!
//! Each key opens a run that lasts until the next key. The last run is
//! always empty and adjacent runs never carry equal sets, so the map stays
//! canonical: two arenas with the same coverage compare equal.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

/// Half-open byte range `[start, end)` within a root
pub type ByteRange = Range<i64>;

/// Map of half-open byte ranges to the ids occupying them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalArena<T: Ord + Copy> {
    runs: BTreeMap<i64, BTreeSet<T>>,
}

impl<T: Ord + Copy> Default for IntervalArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Copy> IntervalArena<T> {
    pub fn new() -> Self {
        Self {
            runs: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Number of runs (diagnostics only)
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Cover `range` by `id` (no-op for empty ranges)
    pub fn insert(&mut self, range: ByteRange, id: T) {
        if range.start >= range.end {
            return;
        }

        self.split_at(range.start);
        self.split_at(range.end);
        for (_, ids) in self.runs.range_mut(range.start..range.end) {
            ids.insert(id);
        }
        self.coalesce(range.start, range.end);

        #[cfg(feature = "trace")]
        tracing::trace!(start = range.start, end = range.end, runs = self.runs.len(), "arena insert");
    }

    /// Drop `id` from `range`; the id keeps whatever coverage lies outside
    pub fn remove(&mut self, range: ByteRange, id: T) {
        if range.start >= range.end || self.runs.is_empty() {
            return;
        }

        self.split_at(range.start);
        self.split_at(range.end);
        for (_, ids) in self.runs.range_mut(range.start..range.end) {
            ids.remove(&id);
        }
        self.coalesce(range.start, range.end);
    }

    /// All ids intersecting `range`, except `exclude`
    pub fn overlaps(&self, range: ByteRange, exclude: Option<T>) -> BTreeSet<T> {
        let mut result = BTreeSet::new();
        if range.start >= range.end {
            return result;
        }

        if let Some((_, ids)) = self.runs.range(..=range.start).next_back() {
            result.extend(ids.iter().copied());
        }
        for (_, ids) in self.runs.range(range.start + 1..range.end) {
            result.extend(ids.iter().copied());
        }

        if let Some(ex) = exclude {
            result.remove(&ex);
        }
        result
    }

    /// Ids whose coverage starts at `range.start` and ends at `range.end`
    pub fn exact_match(&self, range: ByteRange) -> BTreeSet<T> {
        if range.start >= range.end {
            return BTreeSet::new();
        }

        let before = self.ids_at(range.start - 1);
        let after = self.ids_at(range.end);
        let mut candidates: BTreeSet<T> = self
            .ids_at(range.start)
            .difference(&before)
            .copied()
            .filter(|id| !after.contains(id))
            .collect();

        for (_, ids) in self.runs.range(range.start + 1..range.end) {
            candidates.retain(|id| ids.contains(id));
            if candidates.is_empty() {
                break;
            }
        }
        candidates
    }

    /// Ids covering the single byte at `off`
    pub fn ids_at(&self, off: i64) -> BTreeSet<T> {
        self.runs
            .range(..=off)
            .next_back()
            .map(|(_, ids)| ids.clone())
            .unwrap_or_default()
    }

    /// Coverage of every id as a list of maximal ranges, ascending
    pub fn spans(&self) -> BTreeMap<T, Vec<ByteRange>> {
        let mut spans: BTreeMap<T, Vec<ByteRange>> = BTreeMap::new();
        let mut iter = self.runs.iter().peekable();

        while let Some((&start, ids)) = iter.next() {
            let Some((&end, _)) = iter.peek() else {
                break;
            };
            for &id in ids {
                let list = spans.entry(id).or_default();
                match list.last_mut() {
                    Some(last) if last.end == start => last.end = end,
                    _ => list.push(start..end),
                }
            }
        }
        spans
    }

    fn split_at(&mut self, off: i64) {
        if self.runs.contains_key(&off) {
            return;
        }
        let ids = self.ids_at(off);
        self.runs.insert(off, ids);
    }

    /// Restore canonical form for keys in `[start, end]` and their predecessor
    fn coalesce(&mut self, start: i64, end: i64) {
        let first = self
            .runs
            .range(..start)
            .next_back()
            .map(|(&k, _)| k)
            .unwrap_or(start);
        let keys: Vec<i64> = self.runs.range(first..=end).map(|(&k, _)| k).collect();

        let mut prev: Option<BTreeSet<T>> = self
            .runs
            .range(..first)
            .next_back()
            .map(|(_, ids)| ids.clone());

        for key in keys {
            let Some(ids) = self.runs.get(&key) else {
                continue;
            };
            let redundant = match &prev {
                Some(p) => p == ids,
                None => ids.is_empty(),
            };
            if redundant {
                self.runs.remove(&key);
            } else {
                prev = Some(ids.clone());
            }
        }
    }
}
