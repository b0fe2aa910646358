//! Column catalog
//!
//! Holds the columns decoded from the source (`all`) and the current
//! projection over them (`active`). Active columns only ever point back into
//! the source catalog; a projection can reorder, subset or rename, never invent.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Inferred column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
}

impl ColumnType {
    /// Compare two raw cell values the way this column type sorts
    ///
    /// Numeric columns rank empty cells first, then numbers, then anything
    /// that does not parse, so the order stays total on dirty data.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            ColumnType::Text => a.cmp(b),
            ColumnType::Numeric => match (NumericKey::of(a), NumericKey::of(b)) {
                (NumericKey::Number(x), NumericKey::Number(y)) => x.total_cmp(&y),
                (NumericKey::Other(x), NumericKey::Other(y)) => x.cmp(y),
                (x, y) => x.rank().cmp(&y.rank()),
            },
        }
    }
}

/// Sort class of a cell in a numeric column
#[derive(Debug, Clone, Copy)]
enum NumericKey<'a> {
    Empty,
    Number(f64),
    Other(&'a str),
}

impl<'a> NumericKey<'a> {
    fn of(cell: &'a str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return NumericKey::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => NumericKey::Number(n),
            Err(_) => NumericKey::Other(cell),
        }
    }

    fn rank(self) -> u8 {
        match self {
            NumericKey::Empty => 0,
            NumericKey::Number(_) => 1,
            NumericKey::Other(_) => 2,
        }
    }
}

/// A source column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A projected column: index into the source catalog plus its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveColumn {
    pub index: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ActiveColumn {
    /// Header shown to the user (alias if set)
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnCatalog {
    all: Vec<Column>,
    active: Vec<ActiveColumn>,
}

impl ColumnCatalog {
    /// Build a catalog whose projection is the identity
    pub fn new(columns: Vec<Column>) -> Self {
        let active = identity(&columns);
        Self {
            all: columns,
            active,
        }
    }

    pub fn all_columns(&self) -> &[Column] {
        &self.all
    }

    pub fn active_columns(&self) -> &[ActiveColumn] {
        &self.active
    }

    /// Source indices of the active columns, in display order
    pub fn active_indices(&self) -> Vec<usize> {
        self.active.iter().map(|c| c.index).collect()
    }

    /// Type of the source column at `index`
    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.all.get(index).map(|c| c.column_type)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Case-insensitive exact lookup of a source column
    pub fn find(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.all.iter().position(|c| c.name.to_lowercase() == wanted)
    }

    /// Replace the projection; returns true if it changed
    pub(crate) fn set_active(&mut self, active: Vec<ActiveColumn>) -> bool {
        if active == self.active {
            return false;
        }
        self.active = active;
        true
    }

    pub(crate) fn reset_active(&mut self) -> bool {
        self.set_active(identity(&self.all))
    }

    /// Column names starting with `prefix` (case-insensitive), in catalog order
    pub fn complete(&self, prefix: &str) -> Vec<&str> {
        let prefix = prefix.trim().to_uppercase();
        self.all
            .iter()
            .filter(|c| prefix.is_empty() || c.name.to_uppercase().starts_with(&prefix))
            .map(|c| c.name.as_str())
            .collect()
    }
}

fn identity(columns: &[Column]) -> Vec<ActiveColumn> {
    columns
        .iter()
        .enumerate()
        .map(|(index, c)| ActiveColumn {
            index,
            name: c.name.clone(),
            alias: None,
        })
        .collect()
}
