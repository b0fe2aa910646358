//! Row store
//!
//! Rows are immutable value rows. Match flags live in a parallel `MatchState`
//! array indexed by row position, so removing rows removes their flags with
//! them and flags can never outlive the row they describe.

use serde::Serialize;
use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3;

/// One decoded source row, one cell per source column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// Cell at a source column index (empty if out of range)
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Search result for one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchState {
    /// Row-level flag: OR of all cell flags (or true for an empty query)
    pub matched: bool,
    /// Source column indices whose cell matched, ascending
    pub cells: Vec<usize>,
}

impl MatchState {
    pub fn all() -> Self {
        Self {
            matched: true,
            cells: Vec::new(),
        }
    }

    pub fn cell_matched(&self, index: usize) -> bool {
        self.cells.binary_search(&index).is_ok()
    }
}

/// Observable counters, recomputed after every mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub total_rows: usize,
    pub unique_rows: usize,
    pub matched_rows: usize,
    pub total_columns: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<Row>,
    matches: Vec<MatchState>,
}

impl RowStore {
    /// New store with every row matched
    pub fn new(rows: Vec<Row>) -> Self {
        let matches = vec![MatchState::all(); rows.len()];
        Self { rows, matches }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn match_state(&self, index: usize) -> Option<&MatchState> {
        self.matches.get(index)
    }

    pub fn is_matched(&self, index: usize) -> bool {
        self.matches.get(index).map(|m| m.matched).unwrap_or(false)
    }

    /// Replace all match flags; must be one state per row
    pub(crate) fn set_matches(&mut self, matches: Vec<MatchState>) {
        debug_assert_eq!(matches.len(), self.rows.len());
        self.matches = matches;
    }

    pub fn matched_count(&self) -> usize {
        self.matches.iter().filter(|m| m.matched).count()
    }

    /// Keep rows whose mask entry is true, preserving order; returns removed count
    pub(crate) fn retain_mask(&mut self, keep: &[bool]) -> usize {
        let before = self.rows.len();
        let mut mask = keep.iter();
        self.rows.retain(|_| *mask.next().unwrap_or(&false));
        let mut mask = keep.iter();
        self.matches.retain(|_| *mask.next().unwrap_or(&false));
        before - self.rows.len()
    }

    /// Drop later rows whose cells at `key` equal an earlier row's; returns removed count
    pub(crate) fn dedup_by(&mut self, key: &[usize]) -> usize {
        let keep = first_occurrences(&self.rows, key);
        self.retain_mask(&keep)
    }
}

/// Mask marking the first row of each distinct key tuple
pub fn first_occurrences(rows: &[Row], key: &[usize]) -> Vec<bool> {
    // Buckets hold the indices of kept rows sharing a hash
    let mut seen: HashMap<u64, Vec<usize>> = HashMap::with_capacity(rows.len());
    let mut keep = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let hash = key_hash(row, key);
        let bucket = seen.entry(hash).or_default();
        let duplicate = bucket
            .iter()
            .any(|&j| key.iter().all(|&c| rows[j].cell(c) == row.cell(c)));
        if !duplicate {
            bucket.push(i);
        }
        keep.push(!duplicate);
    }

    keep
}

fn key_hash(row: &Row, key: &[usize]) -> u64 {
    let mut hasher = Xxh3::new();
    for &c in key {
        let cell = row.cell(c);
        hasher.update(&(cell.len() as u64).to_le_bytes());
        hasher.update(cell.as_bytes());
    }
    hasher.digest()
}
