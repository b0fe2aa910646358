//! One-shot view pipeline
//!
//! Applies projection, search, unique, filter and truncate to a freshly
//! loaded table in that order, then picks the rows to print.

use anyhow::{Context, Result};
use std::path::Path;

use crate::backends::LoadOptions;
use crate::core::model::TableModel;
use crate::core::render::{RenderConfig, Renderer};

/// Sort key: column name (display or source) plus direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub descending: bool,
}

impl std::str::FromStr for SortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, direction) = match s.rsplit_once(':') {
            Some((c, d)) => (c.trim(), d.trim().to_lowercase()),
            None => (s.trim(), "asc".to_string()),
        };
        if column.is_empty() {
            return Err("empty sort column".to_string());
        }
        let descending = match direction.as_str() {
            "asc" => false,
            "desc" => true,
            other => return Err(format!("Unknown sort direction: {}", other)),
        };
        Ok(Self {
            column: column.to_string(),
            descending,
        })
    }
}

/// View options shared by `view`, `stats` and `export`
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub columns: Option<String>,
    pub search: Option<String>,
    pub filter: bool,
    pub unique: bool,
    pub truncate: bool,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
}

impl ViewOptions {
    /// Apply the state changes to a loaded model
    pub fn apply(&self, model: &mut TableModel) {
        if let Some(expr) = &self.columns {
            model.set_columns(expr);
        }
        if let Some(query) = &self.search {
            model.search(query, false);
        }
        // Search above skipped the rebuild; these toggles do it
        model.set_unique(self.unique);
        model.set_filter(self.filter);
        if self.truncate {
            model.truncate();
        }
    }

    /// View positions to print, sorted and limited
    pub fn rows(&self, model: &TableModel) -> Vec<usize> {
        let mut order = match self.sort.as_ref().and_then(|s| resolve_sort(model, s)) {
            Some((column, descending)) => model.sorted_view(column, descending),
            None => (0..model.visible_len()).collect(),
        };
        if let Some(limit) = self.limit {
            order.truncate(limit);
        }
        order
    }
}

/// Active column position for a sort key, by display or source name
fn resolve_sort(model: &TableModel, sort: &SortSpec) -> Option<(usize, bool)> {
    let wanted = sort.column.to_lowercase();
    model
        .active_columns()
        .iter()
        .position(|c| {
            c.display_name().to_lowercase() == wanted || c.name.to_lowercase() == wanted
        })
        .map(|p| (p, sort.descending))
}

/// Load a file and apply view options
pub fn open(path: &Path, load: &LoadOptions, view: &ViewOptions) -> Result<TableModel> {
    let mut model = TableModel::new();
    model
        .load(path, load)
        .with_context(|| format!("Can't open file {}", path.display()))?;
    view.apply(&mut model);
    Ok(model)
}

/// Run the view command
pub fn run_view(
    path: &Path,
    load: &LoadOptions,
    view: &ViewOptions,
    config: RenderConfig,
) -> Result<()> {
    let model = open(path, load, view)?;
    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_rows(&model, &view.rows(&model)));
    Ok(())
}

/// Run the stats command
pub fn run_stats(
    path: &Path,
    load: &LoadOptions,
    view: &ViewOptions,
    config: RenderConfig,
) -> Result<()> {
    let model = open(path, load, view)?;
    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_counters(&model.counters()));
    Ok(())
}

/// Run the export command
pub fn run_export(
    path: &Path,
    output: &Path,
    load: &LoadOptions,
    view: &ViewOptions,
) -> Result<()> {
    let model = open(path, load, view)?;
    if output == Path::new("-") {
        let stdout = std::io::stdout();
        model.export_to(stdout.lock())?;
        return Ok(());
    }
    model
        .export(output)
        .with_context(|| format!("Can't export to {}", output.display()))?;
    Ok(())
}

/// Run the columns command
pub fn run_columns(
    path: &Path,
    load: &LoadOptions,
    prefix: Option<&str>,
    config: RenderConfig,
) -> Result<()> {
    let model = open(path, load, &ViewOptions::default())?;
    let names = model.catalog().complete(prefix.unwrap_or(""));
    let columns: Vec<_> = model
        .all_columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| names.contains(&c.name.as_str()))
        .collect();

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_columns(&columns));
    Ok(())
}
