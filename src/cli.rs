//! CLI module - Command-line interface definitions and handlers

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::backends::{DateFormatHint, LoadOptions, TextEncoding};
use crate::core::render::{OutputFormat, RenderConfig};
use crate::flows::view::{SortSpec, ViewOptions};

/// rtab - view, search and reshape tabular data files from the terminal.
#[derive(Parser, Debug)]
#[command(name = "rtab")]
#[command(
    author,
    version,
    about,
    long_about = r#"rtab loads one tabular file (CSV/TSV or STDF text) and prints the rows
left after projection, search, filter, unique and truncate.

Output formats:
- table: aligned text grid with matched cells highlighted (default)
- jsonl: one JSON object per row
- json: a single JSON document
- md: Markdown table, matched cells in bold
- csv: the view as CSV

Examples:
    rtab columns data.csv --prefix pr
    rtab view data.csv --columns "price, name=Item" --search 42 --filter
    rtab view data.csv --sort price:desc --limit 10
    rtab export data.csv --search red --filter --output red.csv
    rtab session data.csv --script steps.txt
"#
)]
pub struct Cli {
    /// Output format (table/jsonl/json/md/csv).
    #[arg(
        long,
        global = true,
        default_value = "table",
        value_name = "FORMAT",
        long_help = "Select the output format.\n\n\
Supported values:\n\
- table (default)\n\
- jsonl\n\
- json\n\
- md (markdown)\n\
- csv"
    )]
    pub format: String,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output.
    #[arg(
        long,
        global = true,
        long_help = "Disable colored output. Color is only used for the table format and only\n\
when stdout is a terminal."
    )]
    pub no_color: bool,

    /// Quiet mode (errors only on stderr).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug diagnostics on stderr).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Enable debug diagnostics on stderr. RUST_LOG takes precedence when set."
    )]
    pub verbose: bool,

    /// Text encoding of the input file.
    #[arg(
        long,
        global = true,
        env = "RTAB_ENCODING",
        default_value = "utf-8",
        value_name = "ENCODING",
        long_help = "Text encoding of the input file.\n\n\
Supported values:\n\
- utf-8 (default, invalid bytes are an error)\n\
- utf-8-lossy (invalid bytes become U+FFFD)\n\
- latin1"
    )]
    pub encoding: String,

    /// How STDF date columns are rendered.
    #[arg(
        long,
        global = true,
        env = "RTAB_DATE_FORMAT",
        default_value = "iso",
        value_name = "HINT",
        long_help = "How date and date-time cells of STDF files are rendered.\n\n\
Supported values:\n\
- iso (default): 2024-03-01\n\
- us: 03/01/2024\n\
- eu: 01.03.2024\n\
- raw: keep the stored text"
    )]
    pub date_format: String,

    /// Field delimiter for delimited text (auto-detected if omitted).
    #[arg(
        long,
        global = true,
        value_name = "CHAR",
        value_parser = parse_delimiter,
        long_help = "Field delimiter for delimited text. Accepts a single ASCII character\n\
or the word 'tab'. If omitted, .tsv files use tab and other files are sniffed\n\
from the header line."
    )]
    pub delimiter: Option<u8>,

    #[command(subcommand)]
    pub command: Commands,
}

/// View pipeline flags shared by view, stats and export
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Column projection, e.g. "colB, colA=First".
    #[arg(
        long,
        value_name = "EXPR",
        long_help = "Comma-separated column projection. Each entry is a column name with an\n\
optional alias (name=Alias). Names are matched case-insensitively and unknown names\n\
are skipped. An empty or fully unresolved projection shows every column."
    )]
    pub columns: Option<String>,

    /// Case-insensitive search over the active columns.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Only show rows matching the search.
    #[arg(long)]
    pub filter: bool,

    /// Drop rows that repeat the active columns of an earlier row.
    #[arg(
        long,
        long_help = "Drop rows whose active-column values repeat an earlier row. This\n\
permanently removes the duplicates from the loaded table."
    )]
    pub unique: bool,

    /// Remove the rows hidden by the filter from the table.
    #[arg(long)]
    pub truncate: bool,

    /// Sort the printed rows by a column (COL or COL:desc).
    #[arg(long, value_name = "COL[:asc|desc]")]
    pub sort: Option<SortSpec>,

    /// Print at most N rows.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

impl From<ViewArgs> for ViewOptions {
    fn from(args: ViewArgs) -> Self {
        ViewOptions {
            columns: args.columns,
            search: args.search,
            filter: args.filter,
            unique: args.unique,
            truncate: args.truncate,
            sort: args.sort,
            limit: args.limit,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the columns of a file.
    #[command(
        long_about = "List every column of FILE with its index and inferred type.\n\n\
With --prefix, only columns whose name starts with PREFIX (case-insensitive) are\n\
listed.\n\n\
Examples:\n\
  rtab columns data.csv\n\
  rtab columns data.csv --prefix pri --format jsonl\n"
    )]
    Columns {
        file: PathBuf,

        /// Only list columns starting with this prefix.
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<String>,
    },

    /// Print the rows of a file after the view pipeline.
    #[command(
        long_about = "Load FILE, then apply --columns, --search, --unique, --filter and\n\
--truncate in that order and print the visible rows.\n\n\
Examples:\n\
  rtab view data.csv --search oslo --filter\n\
  rtab view data.csv --columns \"city, pop=Population\" --sort population:desc\n"
    )]
    View {
        file: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Print row and column counters after the view pipeline.
    Stats {
        file: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Write the visible rows and active columns to a CSV file.
    #[command(
        long_about = "Load FILE, apply the view pipeline and write the visible rows as CSV\n\
to --output. The header row uses column aliases where given.\n\n\
Example:\n\
  rtab export data.csv --columns \"b, a=First\" --output out.csv\n"
    )]
    Export {
        file: PathBuf,

        /// Destination CSV file.
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Run session commands against one loaded table.
    #[command(
        long_about = "Load FILE and execute one command per line from --script (or stdin).\n\n\
Commands:\n\
  load PATH | columns EXPR | search TEXT | filter on|off | unique on|off\n\
  truncate | truncate-rows N,M,... | show [N] | stats | complete PREFIX | export PATH\n\n\
Lines starting with '#' are comments. Relative paths in a script are resolved\n\
against the script's directory. A failing command is reported on stderr and the\n\
session continues; the exit status is non-zero if any command failed.\n"
    )]
    Session {
        file: PathBuf,

        /// Script file (defaults to stdin).
        #[arg(long, value_name = "PATH")]
        script: Option<PathBuf>,
    },
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("Delimiter must be one ASCII character: {}", s)),
        },
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;
    if cli.no_color {
        colored::control::set_override(false);
    }
    let render_config = RenderConfig {
        format,
        pretty: cli.pretty,
        color: !cli.no_color && std::io::stdout().is_terminal(),
    };

    let load = LoadOptions {
        encoding: cli
            .encoding
            .parse::<TextEncoding>()
            .map_err(anyhow::Error::msg)?,
        date_format: cli
            .date_format
            .parse::<DateFormatHint>()
            .map_err(anyhow::Error::msg)?,
        delimiter: cli.delimiter,
    };

    match cli.command {
        Commands::Columns { file, prefix } => {
            crate::flows::view::run_columns(&file, &load, prefix.as_deref(), render_config)
        }

        Commands::View { file, view } => {
            crate::flows::view::run_view(&file, &load, &view.into(), render_config)
        }

        Commands::Stats { file, view } => {
            crate::flows::view::run_stats(&file, &load, &view.into(), render_config)
        }

        Commands::Export { file, output, view } => {
            crate::flows::view::run_export(&file, &output, &load, &view.into())
        }

        Commands::Session { file, script } => {
            crate::flows::session::run_session(&file, script.as_deref(), &load, render_config)
        }
    }
}
