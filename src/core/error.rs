//! Error taxonomy for load and export
//!
//! Only the load/export bridge can fail. Projection, search, filter, unique
//! and truncate are total over valid inputs.

use thiserror::Error;

/// Failure surfaced by the load/export bridge
#[derive(Debug, Error)]
pub enum TableError {
    /// Source could not be decoded
    #[error("can't decode {source_name}: {message}")]
    Decode {
        source_name: String,
        message: String,
    },

    /// No reader is available for the source format
    #[error("can't open {source_name}: unsupported format '{format}'")]
    UnsupportedFormat { source_name: String, format: String },

    /// Requested text encoding is unknown or the bytes are invalid for it
    #[error("can't decode {source_name}: {message}")]
    Encoding {
        source_name: String,
        message: String,
    },

    /// I/O failure while reading a source
    #[error("can't read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Destination could not be written
    #[error("can't write {destination}: {message}")]
    Write {
        destination: String,
        message: String,
    },
}

impl TableError {
    pub fn decode(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        TableError::Decode {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn encoding(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        TableError::Encoding {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn write(destination: impl Into<String>, message: impl ToString) -> Self {
        TableError::Write {
            destination: destination.into(),
            message: message.to_string(),
        }
    }

    /// Stable error code
    pub fn kind(&self) -> &'static str {
        match self {
            TableError::Decode { .. } => "DECODE",
            TableError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            TableError::Encoding { .. } => "ENCODING",
            TableError::Io { .. } => "IO",
            TableError::Write { .. } => "WRITE",
        }
    }

    /// The offending source or destination
    pub fn identifier(&self) -> &str {
        match self {
            TableError::Decode { source_name, .. }
            | TableError::UnsupportedFormat { source_name, .. }
            | TableError::Encoding { source_name, .. } => source_name,
            TableError::Io { path, .. } => path,
            TableError::Write { destination, .. } => destination,
        }
    }
}

pub type TableResult<T> = std::result::Result<T, TableError>;
