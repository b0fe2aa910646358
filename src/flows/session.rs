//! Scripted session
//!
//! Drives one `TableModel` through a sequence of commands, one per line:
//!
//! ```text
//! columns colB, colA=First
//! search 42
//! filter on
//! truncate-rows 1,3
//! show 20
//! export out.csv
//! ```
//!
//! A failing command is reported and the session moves on to the next line.

use anyhow::{anyhow, bail, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::backends::LoadOptions;
use crate::core::error::TableError;
use crate::core::model::TableModel;
use crate::core::render::{RenderConfig, Renderer};

/// A parsed session command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(PathBuf),
    Columns(String),
    Search(String),
    Filter(bool),
    Unique(bool),
    Truncate,
    /// 1-based view positions
    TruncateRows(Vec<usize>),
    Show(Option<usize>),
    Stats,
    Complete(String),
    Export(PathBuf),
}

impl Command {
    /// Parse one line; `Ok(None)` for blank lines and comments
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r),
            None => (trimmed, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "load" => Command::Load(PathBuf::from(required(word, rest)?)),
            "columns" => Command::Columns(rest.to_string()),
            "search" => Command::Search(rest.to_string()),
            "filter" => Command::Filter(on_off(word, rest)?),
            "unique" => Command::Unique(on_off(word, rest)?),
            "truncate" => Command::Truncate,
            "truncate-rows" => Command::TruncateRows(positions(rest)?),
            "show" => Command::Show(match rest.trim() {
                "" => None,
                n => Some(n.parse().map_err(|_| anyhow!("show: invalid row count '{}'", n))?),
            }),
            "stats" => Command::Stats,
            "complete" => Command::Complete(rest.trim().to_string()),
            "export" => Command::Export(PathBuf::from(required(word, rest)?)),
            other => bail!("unknown command '{}'", other),
        };
        Ok(Some(command))
    }
}

fn required<'a>(word: &str, rest: &'a str) -> Result<&'a str> {
    match rest.trim() {
        "" => bail!("{}: missing argument", word),
        arg => Ok(arg),
    }
}

fn on_off(word: &str, rest: &str) -> Result<bool> {
    match rest.trim().to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => bail!("{}: expected on/off, got '{}'", word, other),
    }
}

fn positions(rest: &str) -> Result<Vec<usize>> {
    rest.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| match t.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n - 1),
            _ => Err(anyhow!("truncate-rows: invalid row number '{}'", t)),
        })
        .collect()
}

/// Session state: the table plus how to load and print
pub struct Session {
    model: TableModel,
    load_options: LoadOptions,
    renderer: Renderer,
    base_dir: PathBuf,
}

impl Session {
    pub fn new(model: TableModel, load_options: LoadOptions, config: RenderConfig) -> Self {
        Self {
            model,
            load_options,
            renderer: Renderer::with_config(config),
            base_dir: PathBuf::from("."),
        }
    }

    /// Resolve relative `load`/`export` paths against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    #[allow(dead_code)]
    pub fn model(&self) -> &TableModel {
        &self.model
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Apply one command, writing any output to `out`
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Load(path) => {
                let path = self.resolve(&path);
                self.model.load(&path, &self.load_options)?;
            }
            Command::Columns(expr) => {
                self.model.set_columns(&expr);
            }
            Command::Search(query) => self.model.search(&query, true),
            Command::Filter(on) => self.model.set_filter(on),
            Command::Unique(on) => self.model.set_unique(on),
            Command::Truncate => {
                self.model.truncate();
            }
            Command::TruncateRows(rows) => {
                self.model.truncate_selection(&rows);
            }
            Command::Show(limit) => {
                let len = self.model.visible_len();
                let order: Vec<usize> = (0..limit.map_or(len, |n| n.min(len))).collect();
                writeln!(out, "{}", self.renderer.render_rows(&self.model, &order))?;
            }
            Command::Stats => {
                writeln!(out, "{}", self.renderer.render_counters(&self.model.counters()))?;
            }
            Command::Complete(prefix) => {
                for name in self.model.catalog().complete(&prefix) {
                    writeln!(out, "{}", name)?;
                }
            }
            Command::Export(path) => {
                let path = self.resolve(&path);
                self.model.export(&path)?;
            }
        }
        Ok(())
    }

    /// Run every line of `input`; returns the number of failed commands
    pub fn run<R: BufRead, W: Write, E: Write>(
        &mut self,
        input: R,
        out: &mut W,
        err: &mut E,
    ) -> Result<usize> {
        let mut failures = 0;
        for (no, line) in input.lines().enumerate() {
            let line = line?;
            let result = Command::parse(&line).and_then(|command| match command {
                Some(command) => self.execute(command, out),
                None => Ok(()),
            });
            if let Err(e) = result {
                failures += 1;
                match e.downcast_ref::<TableError>() {
                    Some(table_err) => warn!(
                        line = no + 1,
                        code = table_err.kind(),
                        identifier = table_err.identifier(),
                        "session command failed"
                    ),
                    None => warn!(line = no + 1, error = %e, "session command failed"),
                }
                writeln!(err, "line {}: {:#}", no + 1, e)?;
            }
        }
        Ok(failures)
    }
}

/// Run the session command
pub fn run_session(
    path: &Path,
    script: Option<&Path>,
    load: &LoadOptions,
    config: RenderConfig,
) -> Result<()> {
    let model = crate::flows::view::open(path, load, &Default::default())?;
    let mut session = Session::new(model, load.clone(), config);

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    let failures = match script {
        Some(script) => {
            let file = std::fs::File::open(script)
                .map_err(|e| anyhow!("Can't open script {}: {}", script.display(), e))?;
            if let Some(dir) = script.parent() {
                session = session.with_base_dir(dir);
            }
            session.run(std::io::BufReader::new(file), &mut out, &mut err)?
        }
        None => session.run(std::io::stdin().lock(), &mut out, &mut err)?,
    };

    if failures > 0 {
        bail!("{} session command(s) failed", failures);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::TableData;
    use crate::core::catalog::{Column, ColumnType};
    use crate::core::render::OutputFormat;
    use tempfile::tempdir;

    fn session() -> Session {
        let model = TableModel::from_data(
            "t",
            TableData {
                columns: vec![
                    Column::new("id", ColumnType::Numeric),
                    Column::new("tag", ColumnType::Text),
                ],
                rows: vec![
                    vec!["1".into(), "red".into()],
                    vec!["2".into(), "blue".into()],
                    vec!["3".into(), "red".into()],
                    vec!["4".into(), "green".into()],
                ],
            },
        );
        Session::new(
            model,
            LoadOptions::default(),
            RenderConfig::new(OutputFormat::Csv),
        )
    }

    fn run(session: &mut Session, script: &str) -> (String, String, usize) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let failures = session.run(script.as_bytes(), &mut out, &mut err).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
            failures,
        )
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  # note").unwrap(), None);
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(
            Command::parse("search  two words").unwrap(),
            Some(Command::Search(" two words".into()))
        );
        assert_eq!(Command::parse("search").unwrap(), Some(Command::Search("".into())));
        assert_eq!(Command::parse("FILTER on").unwrap(), Some(Command::Filter(true)));
        assert_eq!(
            Command::parse("truncate-rows 3, 1").unwrap(),
            Some(Command::TruncateRows(vec![2, 0]))
        );
        assert_eq!(Command::parse("show 5").unwrap(), Some(Command::Show(Some(5))));
        assert!(Command::parse("filter maybe").is_err());
        assert!(Command::parse("truncate-rows 0").is_err());
        assert!(Command::parse("export").is_err());
        assert!(Command::parse("launch").is_err());
    }

    #[test]
    fn test_search_filter_truncate_flow() {
        let mut s = session();
        let (out, _, failures) = run(
            &mut s,
            "search red\nfilter on\nshow\ntruncate-rows 2\nshow\nstats\n",
        );
        assert_eq!(failures, 0);
        let blocks: Vec<&str> = out.split("\n").collect();
        assert_eq!(&blocks[0..3], &["id,tag", "1,red", "3,red"]);
        // After truncating view row 2 (id 3) filter is off again
        assert_eq!(&blocks[3..7], &["id,tag", "1,red", "2,blue", "4,green"]);
        assert_eq!(blocks[7], "total_rows,unique_rows,matched_rows,total_columns");
        assert_eq!(blocks[8], "3,3,1,2");
    }

    #[test]
    fn test_errors_do_not_stop_session() {
        let mut s = session();
        let (out, err, failures) = run(&mut s, "bogus\ncolumns tag\nshow\n");
        assert_eq!(failures, 1);
        assert!(err.contains("line 1: unknown command 'bogus'"));
        assert_eq!(out.trim_end(), "tag\nred\nblue\nred\ngreen");
    }

    #[test]
    fn test_projection_reapplies_unique() {
        let mut s = session();
        let (out, _, _) = run(&mut s, "unique on\ncolumns tag\nshow\n");
        assert_eq!(out.trim_end(), "tag\nred\nblue\ngreen");
        assert_eq!(s.model().counters().total_rows, 3);
    }

    #[test]
    fn test_complete_and_export() {
        let temp = tempdir().unwrap();
        let mut s = session().with_base_dir(temp.path());
        let (out, _, failures) = run(&mut s, "complete T\ncolumns tag=Colour\nexport out.csv\n");
        assert_eq!(failures, 0);
        assert_eq!(out, "tag\n");
        let written = std::fs::read_to_string(temp.path().join("out.csv")).unwrap();
        assert_eq!(written, "Colour\nred\nblue\nred\ngreen\n");
    }

    #[test]
    fn test_failed_load_keeps_table() {
        let temp = tempdir().unwrap();
        let mut s = session().with_base_dir(temp.path());
        let (_, err, failures) = run(&mut s, "load missing.csv\n");
        assert_eq!(failures, 1);
        assert!(err.contains("missing.csv"));
        assert_eq!(s.model().counters().total_rows, 4);
    }
}
