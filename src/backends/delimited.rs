//! Delimited text backend
//!
//! Reading and writing via the csv crate (RFC 4180 quoting). Export goes to a
//! temporary file next to the destination, which is persisted only once the
//! whole table has been written.

use std::io::{Cursor, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::backends::{LoadOptions, TableData, TableReader};
use crate::core::catalog::{Column, ColumnType};
use crate::core::error::{TableError, TableResult};

const CANDIDATE_DELIMITERS: &[u8] = b",;\t|";

/// Reader for CSV/TSV-like files; first record is the header
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedReader {
    delimiter: Option<u8>,
}

impl DelimitedReader {
    /// Reader with the delimiter implied by an extension (auto-detect otherwise)
    pub fn for_extension(ext: &str, explicit: Option<u8>) -> Self {
        let delimiter = explicit.or(match ext {
            "tsv" => Some(b'\t'),
            "psv" => Some(b'|'),
            _ => None,
        });
        Self { delimiter }
    }
}

impl TableReader for DelimitedReader {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn decode(
        &self,
        source_name: &str,
        bytes: &[u8],
        options: &LoadOptions,
    ) -> TableResult<TableData> {
        let text = options.encoding.decode(source_name, bytes)?;
        let delimiter = self.delimiter.unwrap_or_else(|| detect_delimiter(&text));

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(Cursor::new(text.as_bytes()));

        let mut records = reader.records();
        let header = match records.next() {
            Some(Ok(record)) => record,
            Some(Err(e)) => return Err(TableError::decode(source_name, e.to_string())),
            None => return Err(TableError::decode(source_name, "empty file: no header line")),
        };
        let names = unique_names(header.iter());
        let width = names.len();

        let mut rows = Vec::new();
        for (line, record) in records.enumerate() {
            let record = record.map_err(|e| {
                TableError::decode(source_name, format!("record {}: {}", line + 2, e))
            })?;
            let mut cells: Vec<String> = record.iter().take(width).map(str::to_string).collect();
            cells.resize(width, String::new());
            rows.push(cells);
        }

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column::new(name, infer_type(rows.iter().map(|r| r[i].as_str()))))
            .collect();

        Ok(TableData { columns, rows })
    }
}

/// Pick the candidate delimiter occurring most often in the header line
pub fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let mut best = (b',', 0);
    for &d in CANDIDATE_DELIMITERS {
        let count = header.bytes().filter(|&b| b == d).count();
        if count > best.1 {
            best = (d, count);
        }
    }
    best.0
}

/// Make header names non-empty and distinct
fn unique_names<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (i, name) in raw.enumerate() {
        let base = match name.trim() {
            "" => format!("column_{}", i + 1),
            n => n.to_string(),
        };
        let taken = |candidate: &str, names: &[String]| {
            names.iter().any(|n| n.eq_ignore_ascii_case(candidate))
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while taken(&candidate, &names) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}

/// Numeric when every non-empty cell parses as a number and one exists
pub fn infer_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut seen = false;
    for cell in cells {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        if cell.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
        seen = true;
    }
    if seen {
        ColumnType::Numeric
    } else {
        ColumnType::Text
    }
}

/// Writer for comma-separated export
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvWriter;

impl CsvWriter {
    /// Write header and rows to any writer
    pub fn write_to<W, R, C>(&self, writer: W, headers: &[&str], rows: R) -> csv::Result<()>
    where
        W: Write,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<[u8]>,
    {
        let mut out = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(writer);
        out.write_record(headers)?;
        for row in rows {
            out.write_record(row)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write to `destination` atomically (temp file + persist)
    pub fn write_file<R, C>(&self, destination: &Path, headers: &[&str], rows: R) -> TableResult<()>
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<[u8]>,
    {
        let dest_name = destination.to_string_lossy().to_string();
        let dir = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let temp = NamedTempFile::new_in(dir).map_err(|e| TableError::write(&dest_name, e))?;
        self.write_to(temp.as_file(), headers, rows)
            .map_err(|e| TableError::write(&dest_name, e))?;
        temp.persist(destination)
            .map_err(|e| TableError::write(&dest_name, e.error))?;
        Ok(())
    }
}
