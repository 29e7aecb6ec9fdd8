#![deny(
    warnings,
    missing_debug_implementations,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
//! `tfind` - search a directory tree for a query in file names and lines.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use clap_cargo::style::CLAP_STYLING;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use turtlfind::types::{DEFAULT_MAX_RESULTS, DEFAULT_SNIPPET_LENGTH, Diagnostic, MatchKind};
use turtlfind::{Error, Result, SearchConfig, SearchEngine, SearchReport, SearchResult};

/// CLI arguments for `tfind`
#[derive(Parser, Debug)]
#[command(author, version, about, styles = CLAP_STYLING)]
struct Cli {
    /// Text to look for, matched case-insensitively
    query: String,

    /// Directory to search
    #[arg(short, long, env = "TFIND_ROOT", default_value = ".")]
    root: PathBuf,

    /// Maximum number of results to print
    #[arg(short = 'n', long, env = "TFIND_MAX_RESULTS", default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Maximum snippet length in characters
    #[arg(long, env = "TFIND_SNIPPET_LEN", default_value_t = DEFAULT_SNIPPET_LENGTH)]
    snippet_len: usize,

    /// Additional directory name or glob to skip (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,

    /// Do not skip the built-in build, VCS and system directories
    #[arg(long)]
    no_default_excludes: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Also report entries that could not be read
    #[arg(long)]
    diagnostics: bool,

    /// Increase log verbosity (-v info, -vv debug); `RUST_LOG` overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Build the engine configuration from flags and environment
    fn config(&self) -> SearchConfig {
        let mut config = SearchConfig::default()
            .with_max_results(self.max_results)
            .with_snippet_length(self.snippet_len);
        if self.no_default_excludes {
            config = config.without_default_excludes();
        }
        self.exclude.iter().fold(config, |config, name| config.exclude(name.as_str()))
    }
}

/// JSON response body
#[derive(Serialize, Debug)]
struct Response<'a> {
    results:     &'a [SearchResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a [Diagnostic]>,
}

/// Install the stderr log subscriber
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Run one query and print its results
fn search_files(cli: &Cli) -> Result<()> {
    if cli.query.is_empty() {
        return Err(Error::EmptyQuery);
    }

    let engine = SearchEngine::with_config(&cli.root, cli.config())?;
    let report = if cli.diagnostics {
        engine.search_with_diagnostics(&cli.query)?
    } else {
        SearchReport { results: engine.search(&cli.query)?, ..SearchReport::default() }
    };

    let mut out = io::stdout().lock();
    if cli.json {
        let response = Response {
            results:     &report.results,
            diagnostics: cli.diagnostics.then_some(report.diagnostics.as_slice()),
        };
        serde_json::to_writer_pretty(&mut out, &response).map_err(io::Error::from)?;
        writeln!(out)?;
    } else {
        print_table(&mut out, &cli.query, &engine, &report)?;
    }
    Ok(())
}

/// Human-readable output
fn print_table(
    out: &mut impl Write,
    query: &str,
    engine: &SearchEngine,
    report: &SearchReport,
) -> Result<()> {
    if report.results.is_empty() {
        writeln!(out, "No matches found for query: {query} in {}", engine.root().display())?;
    } else {
        writeln!(out, "Found {} matches in {}:", report.results.len(), engine.root().display())?;
        writeln!(out, " Line | Path")?;
        writeln!(out, "------|------")?;
        for result in &report.results {
            match result.kind() {
                MatchKind::Filename => writeln!(out, "  -   | {}", result.file_path)?,
                MatchKind::Content => writeln!(
                    out,
                    "{:>5} | {}: {}",
                    result.line_num, result.file_path, result.snippet
                )?,
            }
        }
    }

    if !report.diagnostics.is_empty() || report.dropped_diagnostics > 0 {
        let skipped = report.diagnostics.len() + report.dropped_diagnostics;
        writeln!(out, "\nSkipped {skipped} entries:")?;
        for diagnostic in &report.diagnostics {
            writeln!(
                out,
                "- {} ({}): {}",
                diagnostic.path.display(),
                diagnostic.phase,
                diagnostic.message
            )?;
        }
        if report.dropped_diagnostics > 0 {
            writeln!(out, "- ... and {} more", report.dropped_diagnostics)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = search_files(&cli) {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
