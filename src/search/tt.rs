//! The transposition table: a fixed-size associative cache from
//! position key to the best move, search depth, score, and bound kind
//! found for it.
//!
//! Replacement policy is deliberately simple: a new entry always
//! overwrites whatever currently occupies its bucket unless the
//! incumbent was searched at least as deep and carries the same key,
//! in which case the incumbent (a same-position probe from a prior,
//! equally or more thorough search) is kept.

use crate::moves::{Move, NO_MOVE};

pub const MATE_VALUE: i32 = 0x7fff;
pub const DRAW_VALUE: i32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    LowerBound,
    UpperBound,
}

#[derive(Clone, Copy)]
struct Entry {
    key: u64,
    depth: i32,
    score: i32,
    bound: Bound,
    best_move: Move,
    occupied: bool,
}

impl Default for Entry {
    fn default() -> Entry {
        Entry { key: 0, depth: 0, score: 0, bound: Bound::Exact, best_move: NO_MOVE, occupied: false }
    }
}

pub struct ProbeResult {
    pub bound: Bound,
    pub score: i32,
    pub best_move: Move,
    pub depth: i32,
}

/// A fixed-capacity hash table, sized in megabytes via `resize`.
pub struct TranspositionTable {
    table: Vec<Entry>,
    mask: usize,
    filled: usize,
}

const DEFAULT_HASH_MB: usize = 32;

impl TranspositionTable {
    pub fn new() -> TranspositionTable {
        let mut tt = TranspositionTable { table: Vec::new(), mask: 0, filled: 0 };
        tt.resize_mb(DEFAULT_HASH_MB);
        tt
    }

    /// Reinitialises the table to roughly `mb` megabytes of entries,
    /// discarding all prior content. Rounds down to the nearest power
    /// of two number of entries, as is conventional for Zobrist-keyed
    /// tables so that `key & mask` is a uniform bucket index.
    pub fn resize_mb(&mut self, mb: usize) {
        let bytes = mb.max(1) * 1024 * 1024;
        let entry_size = std::mem::size_of::<Entry>().max(1);
        let mut capacity = (bytes / entry_size).max(1024);
        capacity = capacity.next_power_of_two() >> 1;
        capacity = capacity.max(1024);
        self.table = vec![Entry::default(); capacity];
        self.mask = capacity - 1;
        self.filled = 0;
    }

    pub fn clear(&mut self) {
        for entry in self.table.iter_mut() {
            *entry = Entry::default();
        }
        self.filled = 0;
    }

    /// Fraction of buckets currently holding an entry, reported to the
    /// protocol layer as a `hashfull`-style diagnostic (per mille, as
    /// UCI's own `hashfull` info field does).
    pub fn load_factor(&self) -> f64 {
        self.filled as f64 / self.table.len() as f64
    }

    fn index(&self, key: u64) -> usize {
        (key as usize) & self.mask
    }

    /// Adjusts a mate score stored relative to the root so that it is
    /// ply-independent before it's written to the table.
    fn score_to_tt(score: i32, ply: i32) -> i32 {
        if score >= MATE_VALUE - 1000 {
            score + ply
        } else if score <= -(MATE_VALUE - 1000) {
            score - ply
        } else {
            score
        }
    }

    /// Inverse of `score_to_tt`: re-expresses a stored mate score
    /// relative to the current ply.
    fn score_from_tt(score: i32, ply: i32) -> i32 {
        if score >= MATE_VALUE - 1000 {
            score - ply
        } else if score <= -(MATE_VALUE - 1000) {
            score + ply
        } else {
            score
        }
    }

    pub fn probe(&self, key: u64, ply: i32) -> Option<ProbeResult> {
        let entry = &self.table[self.index(key)];
        if !entry.occupied || entry.key != key {
            return None;
        }
        Some(ProbeResult {
            bound: entry.bound,
            score: Self::score_from_tt(entry.score, ply),
            best_move: entry.best_move,
            depth: entry.depth,
        })
    }

    pub fn store(&mut self, key: u64, best_move: Move, depth: i32, score: i32, bound: Bound, ply: i32) {
        let idx = self.index(key);
        let incumbent = self.table[idx];
        if incumbent.occupied && incumbent.key == key && incumbent.depth > depth {
            return;
        }
        if !incumbent.occupied {
            self.filled += 1;
        }
        self.table[idx] = Entry {
            key,
            depth,
            score: Self::score_to_tt(score, ply),
            bound,
            best_move,
            occupied: true,
        };
    }
}

impl Default for TranspositionTable {
    fn default() -> TranspositionTable {
        TranspositionTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_probe_roundtrip() {
        let mut tt = TranspositionTable::new();
        tt.store(12345, NO_MOVE, 6, 150, Bound::Exact, 2);
        let r = tt.probe(12345, 2).unwrap();
        assert_eq!(r.score, 150);
        assert_eq!(r.bound, Bound::Exact);
    }

    #[test]
    fn test_mate_score_ply_adjustment() {
        let mut tt = TranspositionTable::new();
        // A mate in 2 found at ply 4 (root-relative score MATE_VALUE-6)...
        tt.store(1, NO_MOVE, 4, MATE_VALUE - 6, Bound::Exact, 4);
        // ...probed again from ply 4 should come back exactly the same.
        let r = tt.probe(1, 4).unwrap();
        assert_eq!(r.score, MATE_VALUE - 6);
    }

    #[test]
    fn test_shallower_search_does_not_overwrite_deeper() {
        let mut tt = TranspositionTable::new();
        tt.store(7, NO_MOVE, 10, 50, Bound::Exact, 0);
        tt.store(7, NO_MOVE, 2, 999, Bound::Exact, 0);
        let r = tt.probe(7, 0).unwrap();
        assert_eq!(r.score, 50);
    }
}
