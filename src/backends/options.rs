//! Load options
//!
//! Text encoding and date formatting hints handed to every reader.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::core::error::{TableError, TableResult};

/// Text encoding of the source bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    /// Strict UTF-8; invalid bytes fail the load
    #[default]
    Utf8,
    /// UTF-8 with invalid bytes replaced
    Utf8Lossy,
    /// ISO-8859-1
    Latin1,
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-8-lossy" | "utf8-lossy" | "lossy" => Ok(TextEncoding::Utf8Lossy),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(TextEncoding::Latin1),
            _ => Err(format!("Unknown encoding: {}", s)),
        }
    }
}

impl TextEncoding {
    /// Decode source bytes, dropping a UTF-8 byte-order mark
    pub fn decode<'a>(self, source_name: &str, bytes: &'a [u8]) -> TableResult<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = strip_bom(bytes);
                std::str::from_utf8(bytes).map(Cow::Borrowed).map_err(|e| {
                    TableError::encoding(
                        source_name,
                        format!("invalid UTF-8 at byte {}", e.valid_up_to()),
                    )
                })
            }
            TextEncoding::Utf8Lossy => Ok(String::from_utf8_lossy(strip_bom(bytes))),
            TextEncoding::Latin1 => Ok(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
        }
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes)
}

/// How date and datetime cells are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormatHint {
    /// 2015-01-31 / 2015-01-31 13:45:00
    #[default]
    Iso,
    /// 01/31/2015
    Us,
    /// 31.01.2015
    Eu,
    /// As decoded
    Raw,
}

impl std::str::FromStr for DateFormatHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "iso" => Ok(DateFormatHint::Iso),
            "us" => Ok(DateFormatHint::Us),
            "eu" => Ok(DateFormatHint::Eu),
            "raw" => Ok(DateFormatHint::Raw),
            _ => Err(format!("Unknown date format: {}", s)),
        }
    }
}

const DATETIME_INPUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_INPUTS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

impl DateFormatHint {
    fn date_pattern(self) -> &'static str {
        match self {
            DateFormatHint::Iso | DateFormatHint::Raw => "%Y-%m-%d",
            DateFormatHint::Us => "%m/%d/%Y",
            DateFormatHint::Eu => "%d.%m.%Y",
        }
    }

    /// Re-render a date or datetime cell; unparseable values pass through
    pub fn format_cell(self, value: &str) -> String {
        let value = value.trim();
        if self == DateFormatHint::Raw || value.is_empty() {
            return value.to_string();
        }

        for pattern in DATETIME_INPUTS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
                let pattern = format!("{} %H:%M:%S", self.date_pattern());
                return dt.format(&pattern).to_string();
            }
        }
        for pattern in DATE_INPUTS {
            if let Ok(d) = NaiveDate::parse_from_str(value, pattern) {
                return d.format(self.date_pattern()).to_string();
            }
        }
        value.to_string()
    }
}

/// Options passed to readers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadOptions {
    pub encoding: TextEncoding,
    pub date_format: DateFormatHint,
    /// Field delimiter override for delimited text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("UTF-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("iso-8859-1".parse::<TextEncoding>(), Ok(TextEncoding::Latin1));
        assert!("ebcdic".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_strict_utf8_rejects_invalid_bytes() {
        let err = TextEncoding::Utf8.decode("a.csv", b"ok\xff").unwrap_err();
        assert_eq!(err.kind(), "ENCODING");
        assert!(err.to_string().contains("byte 2"));
    }

    #[test]
    fn test_bom_stripped_and_latin1() {
        let text = TextEncoding::Utf8.decode("a.csv", b"\xEF\xBB\xBFa,b").unwrap();
        assert_eq!(text, "a,b");
        let text = TextEncoding::Latin1.decode("a.csv", b"caf\xe9").unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_date_hint_formats() {
        assert_eq!(DateFormatHint::Iso.format_cell("01/31/2015"), "2015-01-31");
        assert_eq!(DateFormatHint::Us.format_cell("2015-01-31"), "01/31/2015");
        assert_eq!(DateFormatHint::Eu.format_cell("2015-01-31"), "31.01.2015");
        assert_eq!(
            DateFormatHint::Us.format_cell("2015-01-31 13:45:00"),
            "01/31/2015 13:45:00"
        );
        assert_eq!(DateFormatHint::Raw.format_cell("2015-01-31"), "2015-01-31");
        assert_eq!(DateFormatHint::Iso.format_cell("soon"), "soon");
    }
}
