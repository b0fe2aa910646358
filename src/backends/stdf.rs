//! Text data format (STDF) reader
//!
//! Layout:
//! ```text
//! \! filetype=Spotfire.DataFormat.Text; version=1.0;
//! \* comment
//! Name;Age;Born;
//! String;Int;Date;
//! ann;31;2015-01-31;
//! ```
//! Fields end with `;`, backslash escapes `\;`, `\\`, `\n`, `\r`, `\t`, and
//! `\?` is a null cell.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backends::{LoadOptions, TableData, TableReader};
use crate::core::catalog::{Column, ColumnType};
use crate::core::error::{TableError, TableResult};

/// Preamble line declaring the format version
pub static PREAMBLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\\!\s*filetype\s*=\s*Spotfire\.DataFormat\.Text\s*;\s*version\s*=\s*(\d+)\.(\d+)")
        .expect("Invalid PREAMBLE_RE regex")
});

const SUPPORTED_MAJOR: u32 = 1;

/// Declared type of an STDF column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Number,
    Date,
    Text,
}

impl FieldKind {
    fn parse(type_name: &str) -> Self {
        match type_name.trim().to_lowercase().as_str() {
            "int" | "integer" | "longinteger" | "real" | "singlereal" | "currency"
            | "decimal" => FieldKind::Number,
            "date" | "datetime" => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }

    fn column_type(self) -> ColumnType {
        match self {
            FieldKind::Number => ColumnType::Numeric,
            FieldKind::Date | FieldKind::Text => ColumnType::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdfReader;

impl TableReader for StdfReader {
    fn format(&self) -> &'static str {
        "stdf"
    }

    fn decode(
        &self,
        source_name: &str,
        bytes: &[u8],
        options: &LoadOptions,
    ) -> TableResult<TableData> {
        let text = options.encoding.decode(source_name, bytes)?;

        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim_end_matches('\r')));

        let mut header: Option<(usize, Vec<String>)> = None;
        let mut kinds: Vec<FieldKind> = Vec::new();

        for (no, line) in lines.by_ref() {
            if let Some(caps) = PREAMBLE_RE.captures(line) {
                let major: u32 = caps[1].parse().unwrap_or(0);
                if major != SUPPORTED_MAJOR {
                    return Err(TableError::decode(
                        source_name,
                        format!("unsupported format version {}.{}", &caps[1], &caps[2]),
                    ));
                }
                continue;
            }
            if line.starts_with("\\!") || line.starts_with("\\*") || line.trim().is_empty() {
                continue;
            }
            let Some((_, names)) = header.as_ref() else {
                header = Some((no, split_fields(line)));
                continue;
            };
            let types = split_fields(line);
            if types.len() != names.len() {
                return Err(TableError::decode(
                    source_name,
                    format!(
                        "line {}: {} column names but {} types",
                        no,
                        names.len(),
                        types.len()
                    ),
                ));
            }
            kinds = types.iter().map(|t| FieldKind::parse(t)).collect();
            break;
        }

        let names = match header {
            Some((_, names)) if !kinds.is_empty() => names,
            Some((no, _)) => {
                return Err(TableError::decode(
                    source_name,
                    format!("line {}: missing column type line", no),
                ))
            }
            None => return Err(TableError::decode(source_name, "missing column header")),
        };

        let mut rows = Vec::new();
        for (no, line) in lines {
            if line.starts_with("\\*") || line.trim().is_empty() {
                continue;
            }
            let mut cells = split_fields(line);
            if cells.len() != kinds.len() {
                return Err(TableError::decode(
                    source_name,
                    format!(
                        "line {}: expected {} fields, found {}",
                        no,
                        kinds.len(),
                        cells.len()
                    ),
                ));
            }
            for ((cell, kind), name) in cells.iter_mut().zip(&kinds).zip(&names) {
                match kind {
                    FieldKind::Date => *cell = options.date_format.format_cell(cell),
                    FieldKind::Number => {
                        let value = cell.trim();
                        if !value.is_empty() && value.parse::<f64>().is_err() {
                            return Err(TableError::decode(
                                source_name,
                                format!(
                                    "line {}: column '{}' expects a number, found '{}'",
                                    no, name, value
                                ),
                            ));
                        }
                    }
                    FieldKind::Text => {}
                }
            }
            rows.push(cells);
        }

        let columns = names
            .into_iter()
            .zip(&kinds)
            .map(|(name, kind)| Column::new(name, kind.column_type()))
            .collect();

        Ok(TableData { columns, rows })
    }
}

/// Split one line into unescaped fields; a trailing separator ends the last field
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    let mut pending = false;

    while let Some(ch) = chars.next() {
        pending = true;
        match ch {
            '\\' => match chars.next() {
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some('t') => current.push('\t'),
                Some('?') => {}
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            ';' => {
                fields.push(std::mem::take(&mut current));
                pending = false;
            }
            _ => current.push(ch),
        }
    }
    if pending {
        fields.push(current);
    }
    fields
}
