//! CLI binary for mdscribe.
//!
//! A thin shim over the library: maps flags to `ConversionConfig`, resolves
//! credentials from the environment, and renders progress with indicatif.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mdscribe::{
    run_batch_with_progress, BackendKind, BatchProgress, BatchSummary, ConversionConfig,
    FileOutcome, PageSeparator,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress rendering ───────────────────────────────────────────────────

/// Terminal progress: one bar tracking files, with a live message naming
/// the current file and page.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos}/{len} files  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgress for CliProgress {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, path: &Path, _idx: usize, _total: usize, page_count: usize) {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        self.bar.set_message(format!("{name} ({page_count} pages)"));
    }

    fn on_page_done(&self, page_index: usize, total_pages: usize) {
        self.bar
            .set_message(format!("page {}/{}", page_index + 1, total_pages));
    }

    fn on_file_done(&self, path: &Path, outcome: &FileOutcome) {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        let line = match outcome {
            FileOutcome::Written { pages, duration_ms, .. } => format!(
                "  {} {}  {}",
                green("✓"),
                name,
                dim(&format!(
                    "{pages} pages, {:.1}s",
                    *duration_ms as f64 / 1000.0
                )),
            ),
            FileOutcome::Skipped { .. } => {
                format!("  {} {}  {}", yellow("→"), name, dim("output exists, skipped"))
            }
            FileOutcome::Failed { reason } => {
                let msg = if reason.len() > 100 {
                    let mut end = 99;
                    while !reason.is_char_boundary(end) {
                        end -= 1;
                    }
                    format!("{}\u{2026}", &reason[..end])
                } else {
                    reason.clone()
                };
                format!("  {} {}  {}", red("✗"), name, red(&msg))
            }
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_batch_end(&self, summary: &BatchSummary) {
        self.bar.finish_and_clear();
        print_summary(summary);
    }
}

fn print_summary(summary: &BatchSummary) {
    let mark = if summary.files_failed == 0 {
        green("✔")
    } else {
        yellow("⚠")
    };
    eprintln!(
        "{mark} {} written, {} skipped, {} failed  —  {} pages in {:.1}s",
        bold(&summary.files_written.to_string()),
        summary.files_skipped,
        if summary.files_failed == 0 {
            summary.files_failed.to_string()
        } else {
            red(&summary.files_failed.to_string())
        },
        summary.total_pages,
        summary.duration_ms as f64 / 1000.0,
    );
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in a folder with Gemini
  export GEMINI_API_KEY=...
  mdscribe ./papers

  # Use a local Ollama model instead (no key, no cloud)
  mdscribe --backend ollama --model llama3.2-vision ./papers

  # Spanish documents, 20 requests/minute, resume an interrupted run
  mdscribe --language Spanish --rpm 20 --skip-existing ./scans

  # Machine-readable report
  mdscribe --json --no-progress ./papers > report.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   API key for the Gemini backend
  OLLAMA_HOST      Base URL of the Ollama server (default http://localhost:11434)

Each <name>.pdf produces <name>.md in the same directory. Files that fail
are reported and skipped; the rest of the batch continues.
"#;

/// Convert every PDF in a directory to Markdown using a vision model.
#[derive(Parser, Debug)]
#[command(
    name = "mdscribe",
    version,
    about = "Batch-convert a directory of PDFs to Markdown using vision models",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the PDF files (searched non-recursively).
    directory: PathBuf,

    /// Transcription backend.
    #[arg(long, value_enum, default_value = "gemini")]
    backend: BackendArg,

    /// Model ID (default: gemini-2.0-flash for Gemini, llava for Ollama).
    #[arg(long, env = "MDSCRIBE_MODEL")]
    model: Option<String>,

    /// Gemini API key. Prefer the environment variable over this flag.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the Ollama server.
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Rendering DPI (72–400).
    #[arg(long, default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Page separator: hr, blank, comment, or a custom string.
    #[arg(long, default_value = "hr")]
    separator: String,

    /// Language of the documents (appended to the prompt as a hint).
    #[arg(long)]
    language: Option<String>,

    /// Path to a text file containing a custom transcription prompt.
    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// Retries per page on transient backend failure.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Cap on transcription requests per minute.
    #[arg(long)]
    rpm: Option<u32>,

    /// Per-API-call timeout in seconds.
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,

    /// Skip PDFs whose .md output already exists.
    #[arg(long)]
    skip_existing: bool,

    /// Print the batch summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Gemini,
    Ollama,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Gemini => BackendKind::Gemini,
            BackendArg::Ollama => BackendKind::Ollama,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The progress bar replaces INFO-level library logs; only show them
    // when the bar is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    let summary = if show_progress {
        run_batch_with_progress(&cli.directory, &config, CliProgress::new()).await
    } else {
        run_batch_with_progress(&cli.directory, &config, Arc::new(mdscribe::NoopProgress)).await
    }
    .context("Batch conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !show_progress && !cli.quiet {
        print_summary(&summary);
    }

    // Per-file failures are reported in the summary; they do not change
    // the exit code. Only setup errors bubble up as Err above.
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .backend(cli.backend.clone().into())
        .ollama_url(cli.ollama_url.clone())
        .dpi(cli.dpi)
        .separator(parse_separator(&cli.separator))
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .skip_existing(cli.skip_existing);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref lang) = cli.language {
        builder = builder.language(lang.clone());
    }
    if let Some(rpm) = cli.rpm {
        builder = builder.requests_per_minute(rpm);
    }
    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "hr" | "---" => PageSeparator::HorizontalRule,
        "blank" | "none" => PageSeparator::Blank,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
