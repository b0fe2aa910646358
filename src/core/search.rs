//! Search/match engine
//!
//! Case-insensitive substring match of a query against the active cells of
//! every row. This pass is O(rows x active columns); ASCII queries are matched
//! on bytes without allocating per cell.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::rows::{MatchState, Row};

/// Compiled query
#[derive(Debug, Clone)]
pub struct Matcher {
    needle: String,
    ascii: bool,
}

impl Matcher {
    /// Compile a query; `None` for an empty query (matches everything)
    pub fn new(query: &str) -> Option<Self> {
        if query.is_empty() {
            return None;
        }
        let ascii = query.is_ascii();
        let needle = if ascii {
            query.to_ascii_lowercase()
        } else {
            query.chars().flat_map(char::to_lowercase).collect()
        };
        Some(Self { needle, ascii })
    }

    pub fn is_match(&self, cell: &str) -> bool {
        if self.ascii {
            contains_ascii_ci(cell.as_bytes(), self.needle.as_bytes())
        } else {
            contains_lowercase(cell, &self.needle)
        }
    }

    /// Match one row against the given source column indices
    pub fn match_row(&self, row: &Row, columns: &[usize]) -> MatchState {
        let mut cells: Vec<usize> = columns
            .iter()
            .copied()
            .filter(|&c| self.is_match(row.cell(c)))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        MatchState {
            matched: !cells.is_empty(),
            cells,
        }
    }
}

/// `needle` must already be ASCII-lowercased
fn contains_ascii_ci(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|w| w.iter().zip(needle).all(|(a, b)| a.to_ascii_lowercase() == *b))
}

/// Substring test over the lowercased chars of `haystack`, without allocating;
/// `needle` must already be lowercased
fn contains_lowercase(haystack: &str, needle: &str) -> bool {
    let mut rest = haystack.chars().flat_map(char::to_lowercase);
    loop {
        let mut window = rest.clone();
        if needle.chars().all(|n| window.next() == Some(n)) {
            return true;
        }
        if rest.next().is_none() {
            return false;
        }
    }
}

/// Compute fresh match state for every row
pub fn match_rows(rows: &[Row], columns: &[usize], query: &str) -> Vec<MatchState> {
    let Some(matcher) = Matcher::new(query) else {
        return vec![MatchState::all(); rows.len()];
    };

    #[cfg(feature = "parallel")]
    {
        rows.par_iter()
            .map(|row| matcher.match_row(row, columns))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        rows.iter()
            .map(|row| matcher.match_row(row, columns))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        Row::new(cells.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_ascii_case_insensitive() {
        let m = Matcher::new("HeLLo").unwrap();
        assert!(m.is_match("say hello world"));
        assert!(m.is_match("HELLO"));
        assert!(!m.is_match("hell"));
        assert!(!m.is_match(""));
    }

    #[test]
    fn test_unicode_case_insensitive() {
        let m = Matcher::new("ÄPFEL").unwrap();
        assert!(m.is_match("grüne äpfel"));
        assert!(!m.is_match("apfel"));
    }

    #[test]
    fn test_unicode_match_agrees_with_lowercased_cell() {
        let cells = ["Straße", "ÉCOLE élève", "İstanbul", "ΣΟΦΊΑ", "ab", "", "xÄÄy"];
        let queries = ["ÉLÈ", "sse", "i̇st", "σοφ", "äy", "ßx", "ÄÄÄ", "ä"];
        for q in queries {
            let m = Matcher::new(q).unwrap();
            let needle = q.to_lowercase();
            for cell in cells {
                assert_eq!(
                    m.is_match(cell),
                    cell.to_lowercase().contains(&needle),
                    "{q:?} in {cell:?}"
                );
            }
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(Matcher::new("").is_none());
        let states = match_rows(&[row(&["a"]), row(&["b"])], &[0], "");
        assert!(states.iter().all(|s| s.matched && s.cells.is_empty()));
    }

    #[test]
    fn test_only_listed_columns_match() {
        let rows = vec![row(&["42", "x"]), row(&["1", "420"]), row(&["7", "8"])];
        let states = match_rows(&rows, &[1], "42");
        assert!(!states[0].matched);
        assert!(states[1].matched);
        assert_eq!(states[1].cells, vec![1]);
        assert!(!states[2].matched);
    }

    #[test]
    fn test_duplicate_projection_columns_flag_once() {
        let states = match_rows(&[row(&["abc"])], &[0, 0], "b");
        assert_eq!(states[0].cells, vec![0]);
    }
}
