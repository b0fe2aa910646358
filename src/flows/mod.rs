//! Flows module - Operations composed from the table model
//!
//! Provides:
//! - view: one-shot load + projection/search/filter/unique/truncate pipeline
//!   behind the `view`, `stats`, `export` and `columns` commands
//! - session: line-oriented scripted session over one table

pub mod session;
pub mod view;
