//! Coincidence store
//!
//! Directed entries `(a, b) -> (diff, negated)` state that the byte distance
//! `a - b` between two anchors equals `diff` (or `-diff` when `negated`).
//! Pointer subtraction across roots is answered from here instead of
//! building symbolic expressions.

use crate::shared::models::ValId;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Right-hand side of a coincidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coincidence {
    pub diff: ValId,
    pub negated: bool,
}

type Key = (ValId, ValId);

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoinDb {
    entries: BTreeMap<Key, Coincidence>,
    /// Pairs `d <-> -d` for difference values that are not integers; stored
    /// in both directions
    negations: BTreeMap<ValId, ValId>,
    /// Value -> entries mentioning it as an anchor or as the difference
    #[serde(skip)]
    index: FxHashMap<ValId, BTreeSet<Key>>,
}

impl CoinDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `a - b == diff` in both directions
    ///
    /// # Panics
    /// If `a == b`.
    pub fn add(&mut self, a: ValId, b: ValId, diff: ValId) {
        assert_ne!(a, b, "coincidence over a single anchor {}", a);
        self.link(
            (a, b),
            Coincidence {
                diff,
                negated: false,
            },
        );
        if !self.entries.contains_key(&(b, a)) {
            self.link((b, a), Coincidence { diff, negated: true });
        }
    }

    /// Insert one directed entry verbatim (predicate transfer)
    pub fn insert_directed(&mut self, a: ValId, b: ValId, coin: Coincidence) {
        assert_ne!(a, b, "coincidence over a single anchor {}", a);
        self.link((a, b), coin);
    }

    pub fn lookup(&self, a: ValId, b: ValId) -> Option<Coincidence> {
        self.entries.get(&(a, b)).copied()
    }

    /// Value standing for `-diff`, if one was registered
    pub fn negation_of(&self, diff: ValId) -> Option<ValId> {
        self.negations.get(&diff).copied()
    }

    /// Register `neg` as the value of `-diff`
    ///
    /// # Panics
    /// If `diff == neg`.
    pub fn set_negation(&mut self, diff: ValId, neg: ValId) {
        assert_ne!(diff, neg, "{} cannot be its own negation", diff);
        self.negations.insert(diff, neg);
        self.negations.insert(neg, diff);
    }

    pub fn mentions(&self, v: ValId) -> bool {
        self.index.contains_key(&v) || self.negations.contains_key(&v)
    }

    /// Drop every entry with `v` as an anchor or as the difference value
    pub fn kill_by_value(&mut self, v: ValId) -> usize {
        let keys: Vec<Key> = self
            .index
            .get(&v)
            .map(|keys| keys.iter().copied().collect())
            .unwrap_or_default();
        for &key in &keys {
            self.unlink(key);
        }
        if let Some(neg) = self.negations.remove(&v) {
            self.negations.remove(&neg);
        }
        if !keys.is_empty() {
            trace!(val = %v, removed = keys.len(), "CoinDb: killed entries");
        }
        keys.len()
    }

    /// Rewrite every occurrence of `old` to `new`
    pub fn replace_value(&mut self, old: ValId, new: ValId) {
        if old == new || !self.mentions(old) {
            return;
        }
        let subst = |v: ValId| if v == old { new } else { v };
        let keys: Vec<Key> = self
            .index
            .get(&old)
            .map(|keys| keys.iter().copied().collect())
            .unwrap_or_default();
        for key in keys {
            let Some(coin) = self.unlink(key) else {
                continue;
            };
            let (a, b) = (subst(key.0), subst(key.1));
            if a == b || self.entries.contains_key(&(a, b)) {
                continue;
            }
            let coin = Coincidence {
                diff: subst(coin.diff),
                ..coin
            };
            self.link((a, b), coin);
        }

        if let Some(neg) = self.negations.remove(&old) {
            self.negations.remove(&neg);
            if neg != new && !self.negations.contains_key(&new) && !self.negations.contains_key(&neg) {
                self.set_negation(new, neg);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ((ValId, ValId), Coincidence)> + '_ {
        self.entries.iter().map(|(&k, &c)| (k, c))
    }

    fn link(&mut self, key: Key, coin: Coincidence) {
        if let Some(old) = self.entries.insert(key, coin) {
            self.unindex(old.diff, key);
        }
        for v in [key.0, key.1, coin.diff] {
            self.index.entry(v).or_default().insert(key);
        }
    }

    fn unlink(&mut self, key: Key) -> Option<Coincidence> {
        let coin = self.entries.remove(&key)?;
        for v in [key.0, key.1, coin.diff] {
            self.unindex(v, key);
        }
        Some(coin)
    }

    fn unindex(&mut self, v: ValId, key: Key) {
        // an anchor of the key stays indexed
        if v == key.0 || v == key.1 {
            if self.entries.contains_key(&key) {
                return;
            }
        }
        if let Some(keys) = self.index.get_mut(&v) {
            keys.remove(&key);
            if keys.is_empty() {
                self.index.remove(&v);
            }
        }
    }
}
