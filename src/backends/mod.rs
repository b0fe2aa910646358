//! Backends module - Table readers and writers
//!
//! Provides:
//! - delimited: CSV/TSV reading and CSV export (csv crate)
//! - stdf: text data format reader
//! - options: load options (encoding, date format hint)
//!
//! Every reader yields the same `TableData` shape; the table model never sees
//! format details.

pub mod delimited;
pub mod options;
pub mod stdf;

use std::path::Path;

use crate::core::catalog::Column;
use crate::core::error::{TableError, TableResult};

pub use options::{DateFormatHint, LoadOptions, TextEncoding};

/// Decoded table: columns plus rows of pre-formatted cell text
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

/// Reader contract every source format implements
pub trait TableReader {
    /// Short format name used in logs and errors
    fn format(&self) -> &'static str;

    /// Decode `bytes` read from `source_name`
    fn decode(
        &self,
        source_name: &str,
        bytes: &[u8],
        options: &LoadOptions,
    ) -> TableResult<TableData>;

    /// Read and decode a file
    fn read(&self, path: &Path, options: &LoadOptions) -> TableResult<TableData> {
        let source_name = source_name(path);
        let bytes = std::fs::read(path).map_err(|source| TableError::Io {
            path: source_name.clone(),
            source,
        })?;
        self.decode(&source_name, &bytes, options)
    }
}

/// Formats that are recognised but have no decoder in this build
const UNAVAILABLE_FORMATS: &[(&str, &str)] = &[
    ("sas7bdat", "SAS7BDAT"),
    ("sbdf", "Spotfire binary data format"),
];

/// Pick a reader by file extension (case-insensitive)
pub fn reader_for(path: &Path, options: &LoadOptions) -> TableResult<Box<dyn TableReader>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "stdf" => Ok(Box::new(stdf::StdfReader)),
        "csv" | "tsv" | "txt" | "psv" | "" => Ok(Box::new(delimited::DelimitedReader::for_extension(
            &ext,
            options.delimiter,
        ))),
        other => {
            let format = UNAVAILABLE_FORMATS
                .iter()
                .find(|(e, _)| *e == other)
                .map(|(_, name)| name.to_string())
                .unwrap_or_else(|| other.to_string());
            Err(TableError::UnsupportedFormat {
                source_name: source_name(path),
                format,
            })
        }
    }
}

/// Display name of a source (file name, falling back to the full path)
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
