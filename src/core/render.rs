//! Renderer module
//!
//! Renders the visible view, the column catalog and the counters to
//! different output formats: table, jsonl, json, md, csv

use colored::Colorize;
use serde::Serialize;

use crate::backends::delimited::CsvWriter;
use crate::core::catalog::Column;
use crate::core::model::{CellMatch, TableModel};
use crate::core::rows::Counters;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Jsonl,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
    pub color: bool,
}

impl RenderConfig {
    #[allow(dead_code)]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pretty: false,
            color: false,
        }
    }
}

/// One visible row in machine-readable output
#[derive(Debug, Serialize)]
struct RowRecord<'a> {
    /// 1-based view position
    row: usize,
    matched: bool,
    values: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    matched_columns: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct ColumnRecord<'a> {
    index: usize,
    #[serde(flatten)]
    column: &'a Column,
}

#[derive(Debug, Serialize)]
struct ViewDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    query: &'a str,
    filter: bool,
    unique: bool,
    columns: Vec<&'a str>,
    rows: Vec<RowRecord<'a>>,
}

/// Renderer for table views
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render the visible rows at the given view positions
    pub fn render_rows(&self, model: &TableModel, order: &[usize]) -> String {
        match self.config.format {
            OutputFormat::Table => self.render_grid(model, order),
            OutputFormat::Jsonl => self.to_jsonl(records(model, order)),
            OutputFormat::Json => self.to_json(&ViewDocument {
                source: model.source(),
                query: model.query(),
                filter: model.filter_enabled(),
                unique: model.unique_enabled(),
                columns: model.headers(),
                rows: records(model, order),
            }),
            OutputFormat::Markdown => render_markdown(model, order),
            OutputFormat::Csv => render_csv(model, order),
        }
    }

    /// Render the source catalog
    pub fn render_columns(&self, columns: &[(usize, &Column)]) -> String {
        let records: Vec<ColumnRecord> = columns
            .iter()
            .map(|&(index, column)| ColumnRecord { index, column })
            .collect();

        match self.config.format {
            OutputFormat::Jsonl => self.to_jsonl(records),
            OutputFormat::Json => self.to_json(&records),
            OutputFormat::Csv => {
                let rows = records.iter().map(|r| {
                    vec![
                        r.index.to_string(),
                        r.column.name.clone(),
                        type_label(r.column).to_string(),
                    ]
                });
                csv_string(&["index", "name", "type"], rows)
            }
            OutputFormat::Markdown => {
                let mut output = String::from("| # | Column | Type |\n|---|---|---|\n");
                for r in &records {
                    output.push_str(&format!(
                        "| {} | {} | {} |\n",
                        r.index,
                        escape_md(&r.column.name),
                        type_label(r.column)
                    ));
                }
                output
            }
            OutputFormat::Table => {
                let width = records
                    .iter()
                    .map(|r| r.column.name.chars().count())
                    .max()
                    .unwrap_or(0);
                records
                    .iter()
                    .map(|r| {
                        format!(
                            "{:>3}  {}  {}",
                            r.index,
                            pad(&r.column.name, width),
                            type_label(r.column)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }

    /// Render the observable counters
    pub fn render_counters(&self, counters: &Counters) -> String {
        match self.config.format {
            OutputFormat::Jsonl | OutputFormat::Json => self.to_json(counters),
            OutputFormat::Csv => csv_string(
                &["total_rows", "unique_rows", "matched_rows", "total_columns"],
                std::iter::once(vec![
                    counters.total_rows.to_string(),
                    counters.unique_rows.to_string(),
                    counters.matched_rows.to_string(),
                    counters.total_columns.to_string(),
                ]),
            ),
            OutputFormat::Markdown | OutputFormat::Table => format!(
                "Total rows: {}\nUnique rows: {}\nMatched rows: {}\nColumns: {}",
                counters.total_rows,
                counters.unique_rows,
                counters.matched_rows,
                counters.total_columns
            ),
        }
    }

    fn to_jsonl<T: Serialize>(&self, items: Vec<T>) -> String {
        items
            .iter()
            .filter_map(|item| {
                if self.config.pretty {
                    serde_json::to_string_pretty(item).ok()
                } else {
                    serde_json::to_string(item).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if self.config.pretty { "\n\n" } else { "\n" })
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        if self.config.pretty {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
        }
    }

    /// Aligned text grid with a row-number column
    fn render_grid(&self, model: &TableModel, order: &[usize]) -> String {
        let headers = model.headers();
        let rows: Vec<(usize, Vec<&str>)> = order
            .iter()
            .filter_map(|&i| model.visible_values(i).map(|values| (i, values)))
            .collect();

        let number_width = rows
            .iter()
            .map(|(i, _)| (i + 1).to_string().len())
            .max()
            .unwrap_or(1)
            .max(1);
        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(c, h)| {
                rows.iter()
                    .map(|(_, values)| display_width(values[c]))
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut output = String::new();
        let header_line: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, &w)| pad(h, w))
            .collect();
        let header = format!("{}  {}", pad("#", number_width), header_line.join("  "));
        output.push_str(header.trim_end());
        output.push('\n');
        let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
        output.push_str(&format!(
            "{}  {}\n",
            "-".repeat(number_width),
            rule.join("  ")
        ));

        for (view_row, values) in &rows {
            let view_row = *view_row;
            let cells: Vec<String> = values
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(c, (value, &w))| {
                    let text = pad(&single_line(value), w);
                    if !self.config.color {
                        return text;
                    }
                    match model.cell_state(view_row, c) {
                        CellMatch::Cell => text.black().on_yellow().to_string(),
                        CellMatch::Row => text.yellow().to_string(),
                        CellMatch::None => text,
                    }
                })
                .collect();
            let line = format!(
                "{:>width$}  {}",
                view_row + 1,
                cells.join("  "),
                width = number_width
            );
            output.push_str(line.trim_end());
            output.push('\n');
        }

        output.trim_end().to_string()
    }
}

fn records<'a>(model: &'a TableModel, order: &[usize]) -> Vec<RowRecord<'a>> {
    let headers = model.headers();
    order
        .iter()
        .filter_map(|&view_row| {
            let values = model.visible_values(view_row)?;
            let matched = model.match_state(view_row).map(|m| m.matched).unwrap_or(false);
            let matched_columns = (0..headers.len())
                .filter(|&c| model.cell_state(view_row, c) == CellMatch::Cell)
                .map(|c| headers[c])
                .collect();
            Some(RowRecord {
                row: view_row + 1,
                matched,
                values,
                matched_columns,
            })
        })
        .collect()
}

fn render_markdown(model: &TableModel, order: &[usize]) -> String {
    let headers = model.headers();
    let mut output = String::new();

    output.push_str("| # |");
    for h in &headers {
        output.push_str(&format!(" {} |", escape_md(h)));
    }
    output.push_str("\n|---|");
    output.push_str(&"---|".repeat(headers.len()));
    output.push('\n');

    for &view_row in order {
        let Some(values) = model.visible_values(view_row) else {
            continue;
        };
        output.push_str(&format!("| {} |", view_row + 1));
        for (c, value) in values.iter().enumerate() {
            let value = escape_md(value);
            if model.cell_state(view_row, c) == CellMatch::Cell {
                output.push_str(&format!(" **{}** |", value));
            } else {
                output.push_str(&format!(" {} |", value));
            }
        }
        output.push('\n');
    }

    output
}

fn render_csv(model: &TableModel, order: &[usize]) -> String {
    let headers = model.headers();
    let rows = order.iter().filter_map(|&i| model.visible_values(i));
    csv_string(&headers, rows)
}

fn csv_string<R, C>(headers: &[&str], rows: R) -> String
where
    R: IntoIterator<Item = C>,
    C: IntoIterator,
    C::Item: AsRef<[u8]>,
{
    let mut out = Vec::new();
    match CsvWriter.write_to(&mut out, headers, rows) {
        Ok(()) => String::from_utf8_lossy(&out).trim_end().to_string(),
        Err(_) => String::new(),
    }
}

fn type_label(column: &Column) -> &'static str {
    match column.column_type {
        crate::core::catalog::ColumnType::Numeric => "numeric",
        crate::core::catalog::ColumnType::Text => "text",
    }
}

fn escape_md(s: &str) -> String {
    single_line(s).replace('|', "\\|")
}

fn single_line(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

fn display_width(s: &str) -> usize {
    s.chars().filter(|c| *c != '\n' && *c != '\r').count()
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - len))
    }
}
