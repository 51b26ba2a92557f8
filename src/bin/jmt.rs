//! jmt: convert and query jsontable (.jmt) files
//!
//! Usage:
//!   # Generate a small example file to play with
//!   jmt example demo.jmt
//!
//!   # Run SQL against the tables of a jsontable file
//!   jmt query demo.jmt "SELECT * FROM ages INNER JOIN wealths ON ages.name = wealths.name"
//!
//!   # Convert between formats
//!   jmt jmt2xlsx demo.jmt demo.xlsx
//!   jmt xlsx2jmt demo.xlsx back.jmt
//!   jmt jmt2sqlite demo.jmt demo.db
//!   jmt sqlite2jmt demo.db back.jmt
//!
//!   # Stream-filter tables by name, stdin to stdout
//!   cat demo.jmt | jmt grep --keep-table '^ages$'

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jsontable::codec::{sqlite, text, xlsx};
use jsontable::stream::{ClassifiedLines, TableGroups};
use jsontable::table::{Database, Table, TableHeader};
use regex::Regex;
use serde_json::json;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jmt")]
#[command(about = "Convert and query jsontable (newline-delimited JSON table) files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a SQL query against the tables of a jsontable file
    Query {
        /// The jsontable file to load
        file: PathBuf,

        /// The SQL text to execute
        sql: String,
    },

    /// Write a small example jsontable file to play with
    Example {
        /// Destination file
        #[arg(default_value = "example.jmt")]
        file: PathBuf,
    },

    /// Convert a spreadsheet workbook into a jsontable file
    Xlsx2jmt { source: PathBuf, dest: PathBuf },

    /// Convert a jsontable file into a spreadsheet workbook
    Jmt2xlsx { source: PathBuf, dest: PathBuf },

    /// Convert a SQLite database into a jsontable file
    Sqlite2jmt { source: PathBuf, dest: PathBuf },

    /// Convert a jsontable file into a SQLite database
    Jmt2sqlite { source: PathBuf, dest: PathBuf },

    /// Stream-filter the tables of a jsontable stream by name
    Grep {
        /// Keep only tables whose name matches this regex
        #[arg(long)]
        keep_table: Option<String>,

        /// Drop tables whose name matches this regex (applied after --keep-table)
        #[arg(long)]
        drop_table: Option<String>,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Input source, chosen explicitly: a file path or the live stdin stream.
enum Input {
    Path(PathBuf),
    Stdin,
}

impl Input {
    fn from_arg(arg: Option<PathBuf>) -> Self {
        match arg {
            Some(path) => Input::Path(path),
            None => Input::Stdin,
        }
    }

    fn open(&self) -> Result<Box<dyn BufRead>> {
        Ok(match self {
            Input::Path(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                Box::new(BufReader::new(file))
            }
            Input::Stdin => Box::new(BufReader::new(std::io::stdin())),
        })
    }
}

/// Output sink, chosen explicitly: a file path or stdout.
enum Output {
    Path(PathBuf),
    Stdout,
}

impl Output {
    fn from_arg(arg: Option<PathBuf>) -> Self {
        match arg {
            Some(path) => Output::Path(path),
            None => Output::Stdout,
        }
    }

    fn create(&self) -> Result<Box<dyn Write>> {
        Ok(match self {
            Output::Path(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            Output::Stdout => Box::new(std::io::stdout()),
        })
    }
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Query { file, sql } => {
            let db = text::read_path(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let rows = jsontable::query(&db, &sql)?;
            let mut stdout = std::io::stdout().lock();
            for row in rows {
                writeln!(stdout, "{}", serde_json::to_string(&row)?)?;
            }
        }
        Command::Example { file } => {
            text::write_path(&sample_database()?, &file)
                .with_context(|| format!("failed to write {}", file.display()))?;
        }
        Command::Xlsx2jmt { source, dest } => {
            let db = xlsx::read_path(&source)
                .with_context(|| format!("failed to read {}", source.display()))?;
            text::write_path(&db, &dest)
                .with_context(|| format!("failed to write {}", dest.display()))?;
        }
        Command::Jmt2xlsx { source, dest } => {
            let db = text::read_path(&source)
                .with_context(|| format!("failed to read {}", source.display()))?;
            xlsx::write_path(&db, &dest)
                .with_context(|| format!("failed to write {}", dest.display()))?;
        }
        Command::Sqlite2jmt { source, dest } => {
            let db = sqlite::read_path(&source)
                .with_context(|| format!("failed to read {}", source.display()))?;
            text::write_path(&db, &dest)
                .with_context(|| format!("failed to write {}", dest.display()))?;
        }
        Command::Jmt2sqlite { source, dest } => {
            let db = text::read_path(&source)
                .with_context(|| format!("failed to read {}", source.display()))?;
            sqlite::write_path(&db, &dest)
                .with_context(|| format!("failed to write {}", dest.display()))?;
        }
        Command::Grep {
            keep_table,
            drop_table,
            input,
            output,
        } => {
            grep(
                keep_table,
                drop_table,
                Input::from_arg(input),
                Output::from_arg(output),
            )?;
        }
    }
    Ok(())
}

/// Stream tables from input to output, filtering by name. Tables flow
/// through one at a time; the whole stream is never held in memory.
fn grep(keep: Option<String>, drop: Option<String>, input: Input, output: Output) -> Result<()> {
    let keep = keep
        .map(|pattern| Regex::new(&pattern))
        .transpose()
        .context("invalid --keep-table regex")?;
    let drop = drop
        .map(|pattern| Regex::new(&pattern))
        .transpose()
        .context("invalid --drop-table regex")?;

    let reader = input.open()?;
    let mut writer = output.create()?;

    for pair in TableGroups::new(ClassifiedLines::new(reader)) {
        let (header, rows) = pair?;
        let name = header.name().unwrap_or_default();
        if let Some(keep) = &keep {
            if !keep.is_match(name) {
                continue;
            }
        }
        if let Some(drop) = &drop {
            if drop.is_match(name) {
                continue;
            }
        }

        writeln!(writer, "{}", serde_json::to_string(header.as_object())?)?;
        for row in rows {
            writeln!(writer, "{}", serde_json::to_string(&row.value)?)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// The two-table sample dataset the `example` sub-command writes.
fn sample_database() -> Result<Database> {
    let ages = Table::new(
        TableHeader::new("ages", ["name", "age"]),
        vec![
            vec![json!("alberto"), json!(2)],
            vec![json!("barbara"), json!(4)],
            vec![json!("carlos"), json!(6)],
        ],
    );
    let wealths = Table::new(
        TableHeader::new("wealths", ["name", "wealth"]),
        vec![
            vec![json!("alberto"), json!(3)],
            vec![json!("barbara"), json!(5)],
            vec![json!("diana"), json!(7)],
        ],
    );
    Ok(Database::from_tables([ages, wealths])?)
}
