//! Table model
//!
//! Owns the column catalog and row store and coordinates the view state:
//!
//! ```text
//! load -> set_columns -> search -> unique/filter -> truncate -> export
//! ```
//!
//! The visible sequence is always derived as: store, deduplicated by the
//! active columns when unique mode is on, then restricted to matched rows when
//! filter mode is on. Counters are recomputed at the end of every mutation.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::backends::delimited::CsvWriter;
use crate::backends::{self, LoadOptions, TableData};
use crate::core::catalog::{ActiveColumn, Column, ColumnCatalog, ColumnType};
use crate::core::error::{TableError, TableResult};
use crate::core::projection;
use crate::core::rows::{Counters, MatchState, Row, RowStore};
use crate::core::search;

/// Highlight state of one visible cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMatch {
    /// The cell itself matched the query
    Cell,
    /// Another cell in the row matched
    Row,
    None,
}

#[derive(Debug, Default)]
pub struct TableModel {
    source: Option<String>,
    catalog: ColumnCatalog,
    store: RowStore,
    query: String,
    filter: bool,
    unique: bool,
    /// Store indices of the visible rows, in order
    view: Vec<usize>,
    counters: Counters,
}

impl TableModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from already-decoded data
    pub fn from_data(source: impl Into<String>, data: TableData) -> Self {
        let mut model = Self::new();
        model.install(Some(source.into()), data);
        model
    }

    // Load / Export

    /// Load a file, replacing the current table only on success
    pub fn load(&mut self, path: &Path, options: &LoadOptions) -> TableResult<()> {
        let started = Instant::now();
        let reader = backends::reader_for(path, options)?;
        let data = reader.read(path, options)?;
        let source = backends::source_name(path);

        info!(
            source = %source,
            format = reader.format(),
            rows = data.rows.len(),
            columns = data.columns.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "table loaded"
        );

        self.install(Some(source), data);
        Ok(())
    }

    fn install(&mut self, source: Option<String>, data: TableData) {
        let width = data.columns.len();
        let rows = data
            .rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, String::new());
                Row::new(cells)
            })
            .collect();

        self.source = source;
        self.catalog = ColumnCatalog::new(data.columns);
        self.store = RowStore::new(rows);
        self.query.clear();
        self.filter = false;
        self.unique = false;
        self.refresh_view();
    }

    /// Write visible rows, active columns only, with display names as headers
    pub fn export(&self, destination: &Path) -> TableResult<()> {
        let headers = self.headers();
        CsvWriter.write_file(destination, &headers, self.visible_cells())?;
        info!(
            destination = %destination.display(),
            rows = self.view.len(),
            "table exported"
        );
        Ok(())
    }

    /// Same as `export` but to any writer
    pub fn export_to<W: Write>(&self, writer: W) -> TableResult<()> {
        let headers = self.headers();
        CsvWriter
            .write_to(writer, &headers, self.visible_cells())
            .map_err(|e| TableError::write("<stream>", e))
    }

    fn visible_cells(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        let columns = self.catalog.active_indices();
        self.view.iter().map(move |&i| {
            let row = &self.store.rows()[i];
            columns.iter().map(|&c| row.cell(c)).collect()
        })
    }

    // Catalog

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn all_columns(&self) -> &[Column] {
        self.catalog.all_columns()
    }

    pub fn active_columns(&self) -> &[ActiveColumn] {
        self.catalog.active_columns()
    }

    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.catalog.column_type(index)
    }

    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    /// Display headers of the active columns
    pub fn headers(&self) -> Vec<&str> {
        self.catalog
            .active_columns()
            .iter()
            .map(ActiveColumn::display_name)
            .collect()
    }

    /// Apply a projection expression; returns true if the projection changed
    ///
    /// A change re-runs the current search and dedup against the new columns
    /// before the view is rebuilt, so no stale flags survive.
    pub fn set_columns(&mut self, expr: &str) -> bool {
        let changed = match projection::resolve(expr, &self.catalog) {
            Some(active) => self.catalog.set_active(active),
            None => self.catalog.reset_active(),
        };

        if changed {
            debug!(expr, columns = self.catalog.active_columns().len(), "projection changed");
            let query = std::mem::take(&mut self.query);
            self.search(&query, true);
        }
        changed
    }

    // Search

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Re-mark every row against `query`
    ///
    /// With `repaint == false` only flags and counters are updated; call
    /// `refresh_view` before reading visible rows.
    pub fn search(&mut self, query: &str, repaint: bool) {
        let columns = self.catalog.active_indices();
        let matches = search::match_rows(self.store.rows(), &columns, query);
        self.store.set_matches(matches);
        self.query = query.to_string();
        self.recompute_counters();

        debug!(query, matched = self.counters.matched_rows, "search applied");

        if repaint {
            self.refresh_view();
        }
    }

    pub fn match_state(&self, view_row: usize) -> Option<&MatchState> {
        self.view
            .get(view_row)
            .and_then(|&i| self.store.match_state(i))
    }

    /// Highlight state of a visible cell addressed by active column position
    pub fn cell_state(&self, view_row: usize, active_col: usize) -> CellMatch {
        let (Some(state), Some(column)) = (
            self.match_state(view_row),
            self.catalog.active_columns().get(active_col),
        ) else {
            return CellMatch::None;
        };

        if state.cell_matched(column.index) {
            CellMatch::Cell
        } else if state.matched && !self.query.is_empty() {
            CellMatch::Row
        } else {
            CellMatch::None
        }
    }

    // View state

    pub fn filter_enabled(&self) -> bool {
        self.filter
    }

    pub fn unique_enabled(&self) -> bool {
        self.unique
    }

    pub fn set_filter(&mut self, on: bool) {
        self.filter = on;
        self.refresh_view();
    }

    /// Turning unique mode on removes duplicates from the store; turning it
    /// off does not bring them back
    pub fn set_unique(&mut self, on: bool) {
        self.unique = on;
        self.refresh_view();
    }

    /// Rebuild the visible sequence and counters from the store
    pub fn refresh_view(&mut self) {
        if self.unique {
            let removed = self.store.dedup_by(&self.catalog.active_indices());
            if removed > 0 {
                debug!(removed, "duplicate rows removed");
            }
        }

        self.view = (0..self.store.len())
            .filter(|&i| !self.filter || self.store.is_matched(i))
            .collect();
        self.recompute_counters();
    }

    /// Number of visible rows
    pub fn visible_len(&self) -> usize {
        self.view.len()
    }

    pub fn visible_row(&self, view_row: usize) -> Option<&Row> {
        self.view.get(view_row).and_then(|&i| self.store.row(i))
    }

    /// Visible cells of a row, in active column order
    pub fn visible_values(&self, view_row: usize) -> Option<Vec<&str>> {
        let row = self.visible_row(view_row)?;
        Some(
            self.catalog
                .active_columns()
                .iter()
                .map(|c| row.cell(c.index))
                .collect(),
        )
    }

    /// View positions ordered by an active column, using its type's comparator
    ///
    /// Stable: equal cells keep view order. The store is not touched.
    pub fn sorted_view(&self, active_col: usize, descending: bool) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.view.len()).collect();
        let Some(column) = self.catalog.active_columns().get(active_col) else {
            return order;
        };
        let column_type = self.column_type(column.index).unwrap_or(ColumnType::Text);
        let rows = self.store.rows();

        order.sort_by(|&a, &b| {
            let x = rows[self.view[a]].cell(column.index);
            let y = rows[self.view[b]].cell(column.index);
            let ord = column_type.compare(x, y);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        order
    }

    // Truncate

    /// Discard every row not currently visible; returns removed count
    pub fn truncate(&mut self) -> usize {
        let mut keep = vec![false; self.store.len()];
        for &i in &self.view {
            keep[i] = true;
        }
        let removed = self.store.retain_mask(&keep);
        self.after_truncate(removed);
        removed
    }

    /// Discard the visible rows at the given view positions; returns removed count
    ///
    /// Out-of-range positions are ignored; an empty selection is a no-op.
    pub fn truncate_selection(&mut self, view_rows: &[usize]) -> usize {
        let targets: Vec<usize> = view_rows
            .iter()
            .filter_map(|&p| self.view.get(p).copied())
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let mut keep = vec![true; self.store.len()];
        for i in targets {
            keep[i] = false;
        }
        let removed = self.store.retain_mask(&keep);
        self.after_truncate(removed);
        removed
    }

    fn after_truncate(&mut self, removed: usize) {
        debug!(removed, remaining = self.store.len(), "rows truncated");
        self.filter = false;
        let query = std::mem::take(&mut self.query);
        self.search(&query, false);
        self.refresh_view();
    }

    // Counters

    pub fn counters(&self) -> Counters {
        self.counters
    }

    fn recompute_counters(&mut self) {
        let total = self.store.len();
        self.counters = Counters {
            total_rows: total,
            unique_rows: total,
            matched_rows: self.store.matched_count(),
            total_columns: self.catalog.len(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn data(columns: &[(&str, ColumnType)], rows: &[&[&str]]) -> TableData {
        TableData {
            columns: columns
                .iter()
                .map(|(n, t)| Column::new(*n, *t))
                .collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    /// 5 rows x 3 columns
    fn sample() -> TableModel {
        TableModel::from_data(
            "sample",
            data(
                &[
                    ("colA", ColumnType::Text),
                    ("colB", ColumnType::Numeric),
                    ("colC", ColumnType::Text),
                ],
                &[
                    &["alpha", "142", "x42"],
                    &["beta", "7", "y"],
                    &["gamma42", "8", "z"],
                    &["delta", "9", "42"],
                    &["alpha", "142", "w"],
                ],
            ),
        )
    }

    fn visible(model: &TableModel) -> Vec<Vec<String>> {
        (0..model.visible_len())
            .map(|i| {
                model
                    .visible_values(i)
                    .unwrap()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_counters_after_load() {
        let model = sample();
        let c = model.counters();
        assert_eq!(c.total_rows, 5);
        assert_eq!(c.total_columns, 3);
        assert_eq!(c.matched_rows, 5);
        assert_eq!(c.unique_rows, 5);
        assert_eq!(model.visible_len(), 5);
    }

    #[test]
    fn test_projection_then_search_scenario() {
        let mut model = sample();
        assert!(model.set_columns("colB, colA=First"));
        assert_eq!(model.headers(), vec!["colB", "First"]);

        model.search("42", true);
        // colC is hidden, so row 3 ("delta", "9", "42") must not match
        let matched: Vec<bool> = (0..5)
            .map(|i| model.match_state(i).unwrap().matched)
            .collect();
        assert_eq!(matched, vec![true, false, true, false, true]);
        assert_eq!(model.counters().matched_rows, 3);
    }

    #[test]
    fn test_set_columns_reports_changes() {
        let mut model = sample();
        assert!(!model.set_columns(""));
        assert!(model.set_columns("colA"));
        assert!(!model.set_columns(" COLA "));
        assert!(model.set_columns("colA=Name"));
        assert!(model.set_columns("   "));
        let names: Vec<&str> = model.active_columns().iter().map(|c| c.display_name()).collect();
        assert_eq!(names, vec!["colA", "colB", "colC"]);
    }

    #[test]
    fn test_search_is_idempotent_and_clears_previous() {
        let mut model = sample();
        model.search("beta", true);
        let first: Vec<MatchState> = (0..5).map(|i| model.match_state(i).unwrap().clone()).collect();
        model.search("beta", true);
        let second: Vec<MatchState> = (0..5).map(|i| model.match_state(i).unwrap().clone()).collect();
        assert_eq!(first, second);
        assert_eq!(model.counters().matched_rows, 1);

        model.search("gamma", true);
        assert!(!model.match_state(1).unwrap().matched);
        assert!(model.match_state(2).unwrap().matched);
    }

    #[test]
    fn test_filter_hides_and_restores() {
        let mut model = sample();
        model.search("alpha", true);
        model.set_filter(true);
        assert_eq!(model.visible_len(), 2);
        for i in 0..model.visible_len() {
            assert!(model.match_state(i).unwrap().matched);
        }
        model.set_filter(false);
        assert_eq!(model.visible_len(), 5);
        assert_eq!(model.counters().total_rows, 5);
    }

    #[test]
    fn test_filter_with_empty_query_excludes_nothing() {
        let mut model = sample();
        model.search("", true);
        model.set_filter(true);
        assert_eq!(model.visible_len(), 5);
    }

    /// With filter on, a store row is visible exactly when it is matched
    fn assert_filter_tracks_matches(model: &TableModel) {
        assert!(model.filter_enabled());
        for i in 0..model.store.len() {
            assert_eq!(
                model.view.contains(&i),
                model.store.is_matched(i),
                "store row {} with query {:?}",
                i,
                model.query()
            );
        }
    }

    #[test]
    fn test_filter_excludes_exactly_unmatched_rows() {
        let mut model = sample();
        model.search("42", true);
        model.set_filter(true);
        assert_filter_tracks_matches(&model);
        assert_eq!(model.visible_len(), model.counters().matched_rows);

        model.search("alpha", false);
        model.refresh_view();
        assert_filter_tracks_matches(&model);
        assert_eq!(model.visible_len(), 2);

        model.search("no such cell", false);
        model.refresh_view();
        assert_filter_tracks_matches(&model);
        assert_eq!(model.visible_len(), 0);

        model.search("", true);
        assert_filter_tracks_matches(&model);
        assert_eq!(model.visible_len(), 5);
    }

    #[test]
    fn test_unique_is_destructive_and_uses_active_columns() {
        let mut model = sample();
        model.set_columns("colA, colB");
        model.set_unique(true);
        assert_eq!(model.counters().total_rows, 4);
        assert_eq!(model.counters().unique_rows, 4);
        // First occurrence kept
        assert_eq!(model.visible_row(0).unwrap().cell(2), "x42");

        model.set_unique(false);
        assert_eq!(model.counters().total_rows, 4);
    }

    #[test]
    fn test_projection_change_reapplies_unique() {
        let mut model = sample();
        model.set_unique(true);
        assert_eq!(model.counters().total_rows, 5);
        model.set_columns("colB");
        // 142 appears twice
        assert_eq!(model.counters().total_rows, 4);
    }

    #[test]
    fn test_truncate_commits_filtered_view() {
        let mut model = sample();
        model.search("l", true);
        model.set_filter(true);
        let visible_before = model.visible_len();
        assert_eq!(visible_before, 3);
        let removed = model.truncate();
        assert_eq!(removed, 5 - visible_before);
        assert_eq!(model.counters().total_rows, visible_before);
        assert!(!model.filter_enabled());
        assert_eq!(model.query(), "l");
        assert_eq!(model.visible_len(), visible_before);
    }

    #[test]
    fn test_truncate_selection_by_view_position() {
        let mut model = sample();
        model.search("42", true);
        model.set_filter(true);
        // Visible: rows 0, 2, 3, 4; drop view positions 1 and 2 (gamma42, delta)
        let removed = model.truncate_selection(&[1, 2]);
        assert_eq!(removed, 2);
        assert_eq!(model.counters().total_rows, 3);
        let first: Vec<String> = visible(&model).into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(first, vec!["alpha", "beta", "alpha"]);
        assert_eq!(model.counters().matched_rows, 2);
    }

    #[test]
    fn test_truncate_empty_selection_is_noop() {
        let mut model = sample();
        model.search("beta", true);
        model.set_filter(true);
        assert_eq!(model.truncate_selection(&[]), 0);
        assert_eq!(model.truncate_selection(&[99]), 0);
        assert!(model.filter_enabled());
        assert_eq!(model.counters().total_rows, 5);
    }

    #[test]
    fn test_deferred_repaint() {
        let mut model = sample();
        model.set_filter(true);
        model.search("beta", false);
        assert_eq!(model.counters().matched_rows, 1);
        assert_eq!(model.visible_len(), 5);
        model.refresh_view();
        assert_eq!(model.visible_len(), 1);
    }

    #[test]
    fn test_cell_state() {
        let mut model = sample();
        model.set_columns("colA, colC");
        model.search("42", true);
        assert_eq!(model.cell_state(0, 1), CellMatch::Cell);
        assert_eq!(model.cell_state(0, 0), CellMatch::Row);
        assert_eq!(model.cell_state(1, 0), CellMatch::None);
        assert_eq!(model.cell_state(9, 0), CellMatch::None);
    }

    #[test]
    fn test_sorted_view_numeric() {
        let model = sample();
        let order = model.sorted_view(1, false);
        let values: Vec<&str> = order
            .iter()
            .map(|&i| model.visible_row(i).unwrap().cell(1))
            .collect();
        assert_eq!(values, vec!["7", "8", "9", "142", "142"]);
        assert_eq!(model.sorted_view(1, true)[0], 0);
    }

    fn mixed_numeric() -> TableModel {
        TableModel::from_data(
            "mixed",
            data(
                &[("n", ColumnType::Numeric), ("id", ColumnType::Text)],
                &[
                    &["9", "a"],
                    &["10", "b"],
                    &["1a", "c"],
                    &["", "d"],
                    &["abc", "e"],
                    &["-3", "f"],
                    &["2x", "g"],
                    &["10", "h"],
                ],
            ),
        )
    }

    fn ids(model: &TableModel, order: &[usize]) -> Vec<String> {
        order
            .iter()
            .map(|&i| model.visible_row(i).unwrap().cell(1).to_string())
            .collect()
    }

    #[test]
    fn test_sorted_view_mixed_numeric_column() {
        let model = mixed_numeric();
        // Empty first, then numbers, then unparseable cells; ties keep view order
        let asc = model.sorted_view(0, false);
        assert_eq!(ids(&model, &asc), vec!["d", "f", "a", "b", "h", "c", "g", "e"]);
        let desc = model.sorted_view(0, true);
        assert_eq!(ids(&model, &desc), vec!["e", "g", "c", "b", "h", "a", "f", "d"]);
    }

    #[test]
    fn test_sorted_view_mixed_numeric_any_row_order() {
        let base = mixed_numeric();
        let rows: Vec<Vec<String>> = (0..base.visible_len())
            .map(|i| {
                let row = base.visible_row(i).unwrap();
                vec![row.cell(0).to_string(), row.cell(1).to_string()]
            })
            .collect();
        let column_type = ColumnType::Numeric;

        for shift in 0..rows.len() {
            let mut rotated = rows.clone();
            rotated.rotate_left(shift);
            rotated.swap(0, shift / 2);
            let model = TableModel::from_data(
                "rotated",
                TableData {
                    columns: base.all_columns().to_vec(),
                    rows: rotated,
                },
            );
            let order = model.sorted_view(0, false);
            let keys: Vec<&str> = order
                .iter()
                .map(|&i| model.visible_row(i).unwrap().cell(0))
                .collect();
            assert!(keys
                .windows(2)
                .all(|w| column_type.compare(w[0], w[1]).is_le()));
        }
    }

    #[test]
    fn test_export_visible_projection() {
        let mut model = TableModel::from_data(
            "t",
            data(
                &[("A", ColumnType::Numeric), ("B", ColumnType::Text)],
                &[&["1", "x"], &["2", "y"]],
            ),
        );
        let mut out = Vec::new();
        model.export_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A,B\n1,x\n2,y\n");

        model.set_columns("B=Letter");
        model.search("y", true);
        model.set_filter(true);
        let mut out = Vec::new();
        model.export_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Letter\ny\n");
    }

    #[test]
    fn test_failed_load_keeps_previous_table() {
        let temp = tempdir().unwrap();
        let bad = temp.path().join("bad.stdf");
        std::fs::write(&bad, "A;B;\n").unwrap();

        let mut model = sample();
        model.search("beta", true);
        let err = model.load(&bad, &LoadOptions::default()).unwrap_err();
        assert_eq!(err.identifier(), "bad.stdf");
        assert_eq!(model.counters().total_rows, 5);
        assert_eq!(model.query(), "beta");
        assert_eq!(model.source(), Some("sample"));
    }

    #[test]
    fn test_load_resets_view_state() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("t.csv");
        std::fs::write(&path, "a,b\n1,2\n1,2\n").unwrap();

        let mut model = sample();
        model.set_columns("colA");
        model.search("alpha", true);
        model.set_filter(true);
        model.set_unique(true);
        model.load(&path, &LoadOptions::default()).unwrap();

        assert_eq!(model.source(), Some("t.csv"));
        assert_eq!(model.counters().total_rows, 2);
        assert_eq!(model.counters().total_columns, 2);
        assert_eq!(model.active_columns().len(), 2);
        assert!(!model.filter_enabled() && !model.unique_enabled());
        assert_eq!(model.query(), "");
    }
}
