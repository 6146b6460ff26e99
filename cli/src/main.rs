//! flint CLI: check files with an external analyzer and print diagnostics.
//!
//! ```text
//! main() -> load config -> resolve analyzer -> CheckController
//!                                                 |
//!                          check_document() per file (concurrent runs)
//!                                                 |
//!                          wait_idle() -> print path:line:col: message
//! ```
//!
//! Exit status: 0 when no error was reported, 1 when any error-severity
//! diagnostic was, 2 when the analyzer is unavailable, 64 on bad usage.

use anyhow::{Context, Result, bail};
use clap::{Parser, error::ErrorKind};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::{Arc, Mutex},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use flint_check::CheckController;
use flint_config::FlintConfig;
use flint_types::{ColumnUnit, Diagnostic, Document, DocumentId, Severity};

const EXIT_ERRORS: u8 = 1;
const EXIT_TOOL_UNAVAILABLE: u8 = 2;
const EXIT_USAGE: u8 = 64;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    // stdout carries diagnostics only.
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[derive(Parser, Debug)]
#[command(name = "flint", version)]
#[command(about = "Check files with an external analyzer and print its diagnostics")]
struct Cli {
    /// Config file to use instead of the usual lookup
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Print one JSON object per file instead of one line per diagnostic
    #[arg(long)]
    json: bool,
    /// Files to check
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// A file submitted for checking, with the path as the user typed it.
struct Checked {
    shown: String,
    document: Document,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    errors: usize,
    warnings: usize,
}

impl Tally {
    fn add(&mut self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            if diagnostic.severity().is_error() {
                self.errors += 1;
            } else {
                self.warnings += 1;
            }
        }
    }

    /// `3 problem(s) (1 error(s), 2 warning(s))`, or `None` when clean.
    fn summary(self) -> Option<String> {
        let total = self.errors + self.warnings;
        (total > 0).then(|| {
            format!(
                "{total} problem(s) ({} {}(s), {} {}(s))",
                self.errors,
                Severity::Error.label(),
                self.warnings,
                Severity::Warning.label()
            )
        })
    }
}

fn format_diagnostic(shown: &str, document: &Document, diagnostic: &Diagnostic) -> String {
    let (line, col) = document.line_col(diagnostic.start());
    format!("{shown}:{line}:{col}: {}", diagnostic.message())
}

fn format_json(shown: &str, diagnostics: &[Diagnostic]) -> Result<String> {
    let value = serde_json::json!({
        "path": shown,
        "diagnostics": diagnostics,
    });
    serde_json::to_string(&value).context("serializing diagnostics")
}

fn load_config(path: Option<&PathBuf>) -> Result<FlintConfig> {
    let config = match path {
        Some(path) => FlintConfig::load_from(path)?,
        None => FlintConfig::load()?,
    };
    Ok(config)
}

fn read_document(path: &Path, id: DocumentId, unit: ColumnUnit) -> Result<Checked> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    // The analyzer resolves its own config from this path after we change
    // its working directory, so it must not be relative.
    let absolute =
        std::path::absolute(path).with_context(|| format!("resolving {}", path.display()))?;
    Ok(Checked {
        shown: path.display().to_string(),
        document: Document::new(id, absolute, text).with_column_unit(unit),
    })
}

/// Read every file that can be read; the rest are reported and skipped.
fn read_documents(config: &FlintConfig, files: &[PathBuf]) -> Vec<Checked> {
    files
        .iter()
        .zip(1u64..)
        .filter_map(|(path, id)| {
            match read_document(path, DocumentId::new(id), config.column_unit()) {
                Ok(checked) => Some(checked),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Skipping file: {e:#}");
                    eprintln!("flint: skipping {}: {e:#}", path.display());
                    None
                }
            }
        })
        .collect()
}

async fn run(args: Cli) -> Result<ExitCode> {
    let config = load_config(args.config.as_ref())?;
    let checker = match config.to_checker_config() {
        Ok(checker) => checker,
        Err(e) => {
            eprintln!("flint: {e}");
            return Ok(ExitCode::from(EXIT_TOOL_UNAVAILABLE));
        }
    };
    let checked = read_documents(&config, &args.files);

    let reports: Arc<Mutex<BTreeMap<DocumentId, Vec<Diagnostic>>>> = Arc::default();
    let mut controller = CheckController::new(checker);

    for entry in &checked {
        let id = entry.document.id();
        let sink = Arc::clone(&reports);
        let submitted = controller.check_document(entry.document.clone(), move |diagnostics| {
            if let Ok(mut reports) = sink.lock() {
                reports.insert(id, diagnostics);
            }
        });
        if let Err(e) = submitted {
            eprintln!("flint: {e}");
            if e.is_tool_unavailable() {
                controller.shutdown();
                return Ok(ExitCode::from(EXIT_TOOL_UNAVAILABLE));
            }
        }
    }

    controller.wait_idle().await;
    drop(controller);

    let mut reports = match reports.lock() {
        Ok(mut reports) => std::mem::take(&mut *reports),
        Err(_) => bail!("report collection poisoned"),
    };

    let mut tally = Tally::default();
    for entry in &checked {
        let Some(diagnostics) = reports.remove(&entry.document.id()) else {
            tracing::warn!(path = %entry.shown, "No report received");
            continue;
        };
        tally.add(&diagnostics);
        if args.json {
            println!("{}", format_json(&entry.shown, &diagnostics)?);
        } else {
            for diagnostic in &diagnostics {
                println!("{}", format_diagnostic(&entry.shown, &entry.document, diagnostic));
            }
        }
    }

    if let Some(summary) = tally.summary() {
        eprintln!("{summary}");
    }

    if tally.errors > 0 {
        Ok(ExitCode::from(EXIT_ERRORS))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
            e.print().context("printing usage")?;
            return Ok(code);
        }
    };

    run(cli).await
}
