//! Column projection expressions
//!
//! Syntax: `col1, col2=Alias2, col3`. Names match the source catalog
//! case-insensitively; unknown names are dropped.

use crate::core::catalog::{ActiveColumn, ColumnCatalog};

/// One parsed token before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionToken<'a> {
    pub name: &'a str,
    pub alias: Option<&'a str>,
}

/// Split an expression into trimmed tokens, skipping empty ones
pub fn tokenize(expr: &str) -> Vec<ProjectionToken<'_>> {
    expr.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter_map(|token| {
            let (name, alias) = match token.split_once('=') {
                Some((name, alias)) => {
                    let alias = alias.trim();
                    (name.trim(), (!alias.is_empty()).then_some(alias))
                }
                None => (token, None),
            };
            (!name.is_empty()).then_some(ProjectionToken { name, alias })
        })
        .collect()
}

/// Resolve an expression against a catalog
///
/// Returns `None` when the expression is blank or nothing resolves, meaning
/// the identity projection.
pub fn resolve(expr: &str, catalog: &ColumnCatalog) -> Option<Vec<ActiveColumn>> {
    let active: Vec<ActiveColumn> = tokenize(expr)
        .into_iter()
        .filter_map(|token| {
            let index = catalog.find(token.name)?;
            let name = catalog.all_columns()[index].name.clone();
            Some(ActiveColumn {
                index,
                name,
                alias: token.alias.map(str::to_string),
            })
        })
        .collect();

    if active.is_empty() {
        None
    } else {
        Some(active)
    }
}
