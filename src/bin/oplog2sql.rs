//! oplog2sql — translate a MongoDB oplog dump into SQL.
//!
//! # Usage
//!
//! ```bash
//! # File to stdout
//! oplog2sql oplog.json
//!
//! # Stdin to file, one statement per line
//! cat oplog.json | oplog2sql - --newline -o output.sql
//!
//! # Keep going past bad entries
//! oplog2sql oplog.json --skip-errors
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use oplog2sql::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "OPLOG2SQL_LOG";

#[derive(Parser)]
#[command(name = "oplog2sql")]
#[command(version)]
#[command(about = "Translate MongoDB oplog entries into SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    oplog2sql oplog.json
    oplog2sql oplog.json -o output.sql --newline
    cat oplog.json | oplog2sql --skip-errors")]
struct Cli {
    /// Oplog JSON file; `-` or omitted reads stdin
    input: Option<PathBuf>,

    /// Write SQL here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file; falls back to $OPLOG2SQL_CONFIG
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip entries that fail to translate instead of aborting
    #[arg(long)]
    skip_errors: bool,

    /// Terminate every statement with a newline
    #[arg(long)]
    newline: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = TranslatorConfig::discover(cli.config.as_deref()).context("failed to load config")?;
    if cli.skip_errors {
        config.error_policy = ErrorPolicy::SkipEntry;
    }

    let mut translator = Translator::with_config(config);
    let input = open_input(cli.input.as_ref())?;
    translator
        .feed_reader(BufReader::new(input))
        .context("failed to translate oplog")?;

    let translation = translator.finish();
    let sql = if cli.newline {
        translation.sql_lines()
    } else {
        translation.sql()
    };
    write_output(cli.output.as_ref(), &sql)?;

    for skipped in &translation.errors {
        eprintln!(
            "{} entry {}: {}",
            "Skipped".yellow().bold(),
            skipped.index,
            skipped.error
        );
    }
    if cli.verbose {
        let ddl = translation.statements.iter().filter(|s| s.is_ddl()).count();
        eprintln!(
            "{} {} statement(s) ({} DDL), {} skipped",
            "✓".green(),
            translation.statements.len().to_string().cyan(),
            ddl,
            translation.errors.len()
        );
    }
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path).with_context(|| format!("error while opening {}", path.display()))?;
            Ok(Box::new(file))
        }
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

fn write_output(path: Option<&PathBuf>, sql: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, sql).with_context(|| format!("error while writing {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(sql.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
