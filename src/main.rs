//! rtab - A lightweight viewer and query tool for tabular data files
//!
//! rtab provides:
//! - Loading of delimited text (CSV/TSV) and STDF text data files
//! - Column projection with aliases (`colB, colA=First`)
//! - Case-insensitive search with per-cell match tracking
//! - Filter, unique and truncate view operations
//! - Export of the current view as CSV

use anyhow::Result;
use clap::Parser;

mod backends;
mod cli;
mod core;
mod flows;
mod logging;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init(cli.verbose, cli.quiet);
    cli::run(cli)
}
