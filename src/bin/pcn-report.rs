//! CLI binary for edgequake-report.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ReportConfig`, runs the batch and prints the summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_report::{
    run_batch, run_subjects, BatchSummary, CompletionClient, DocumentOutcome, PdfTextReader,
    ProgressCallback, ReportConfig, ReportProgressCallback, StructureSource,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders one progress bar per report and a log line per section.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    placeholders: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} sections  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            placeholders: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, section: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&section))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ReportProgressCallback for CliProgressCallback {
    fn on_report_start(&self, subject: &str, total_sections: usize) {
        self.bar.reset();
        self.bar.set_length(total_sections as u64);
        self.bar.set_prefix(subject.to_string());
        self.bar.set_message("structure…");
        self.placeholders.store(0, Ordering::SeqCst);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating report for \"{subject}\""))
        ));
    }

    fn on_context_ready(&self, structure: &StructureSource, units_available: bool) {
        if let StructureSource::Fallback { reason } = structure {
            self.bar.println(format!(
                "  {} Using the fallback structure: {}",
                cyan("⚠"),
                dim(reason)
            ));
        }
        if !units_available {
            self.bar.println(format!(
                "  {} Curricular units unavailable; sections use the apology text",
                cyan("⚠")
            ));
        }
    }

    fn on_section_start(&self, section: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(section, Instant::now());
        }
        self.bar.set_message(format!("section {section}"));
    }

    fn on_section_complete(&self, section: usize, total: usize, content_len: usize) {
        let secs = self.elapsed_secs(section);
        self.bar.println(format!(
            "  {} Section {:>2}/{:<2}  {:<8}  {}",
            green("✓"),
            section,
            total,
            dim(&format!("{content_len:>5} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_section_error(&self, section: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(section);
        self.placeholders.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Section {:>2}/{:<2}  {}  {}",
            red("✗"),
            section,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_report_complete(&self, total_sections: usize, generated: usize) {
        let placeholders = self.placeholders.load(Ordering::SeqCst);
        self.bar.println(format!(
            "{} {}/{} sections generated{}",
            if placeholders == 0 { green("✔") } else { cyan("⚠") },
            bold(&generated.to_string()),
            total_sections,
            if placeholders == 0 {
                String::new()
            } else {
                format!("  ({} placeholders)", red(&placeholders.to_string()))
            }
        ));
        self.bar.set_message("rendering…");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every PDF in PC/ with prompt.txt and the references in BASE/
  pcn-report

  # One course plan only
  pcn-report --subject "PC/Tecnico em Vendas.pdf"

  # Stop after the markdown cache (no DOCX)
  pcn-report --markdown-only

  # Another edgequake-llm provider instead of Azure OpenAI
  pcn-report --provider openai --model gpt-4.1

DIRECTORY LAYOUT (defaults):
  prompt.txt    specification defining the 24 report items
  BASE/         reference PDFs (the first, by file name, feeds every prompt)
  PC/           course plans, one report each
  CACHE/        <file>.pdf.txt extracted text, relatorio_completo_<name>.md
  RELATORIOS/   <YYYYMMDD_HHMMSS>_<name>.docx

  Cached text is never refreshed: delete CACHE/<file>.pdf.txt to re-extract.

ENVIRONMENT VARIABLES:
  AZURE_OPENAI_ENDPOINT     Azure OpenAI resource endpoint
  AZURE_OPENAI_API_KEY      Azure OpenAI API key
  AZURE_OPENAI_API_VERSION  REST API version (default 2024-02-01)
  PCN_REPORT_MODEL          Model / Azure deployment (default gpt-4o)
  EDGEQUAKE_LLM_PROVIDER    Provider when Azure credentials are absent
  OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY
                            Picked up by provider auto-detection
  PDFIUM_LIB_PATH           libpdfium file or directory (else the system library)
"#;

/// Generate PCN review reports from course-plan PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pcn-report",
    version,
    about = "Generate 24-section PCN review reports (DOCX) from course-plan PDFs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Process only this subject PDF instead of every PDF in --subject-dir.
    #[arg(long, env = "PCN_REPORT_SUBJECT")]
    subject: Option<PathBuf>,

    /// Specification text defining the report.
    #[arg(long, env = "PCN_REPORT_SPECIFICATION", default_value = "prompt.txt")]
    specification: PathBuf,

    /// Directory of reference PDFs.
    #[arg(long, env = "PCN_REPORT_REFERENCE_DIR", default_value = "BASE")]
    reference_dir: PathBuf,

    /// Directory of subject PDFs.
    #[arg(long, env = "PCN_REPORT_SUBJECT_DIR", default_value = "PC")]
    subject_dir: PathBuf,

    /// Extracted-text and report-markdown cache.
    #[arg(long, env = "PCN_REPORT_CACHE_DIR", default_value = "CACHE")]
    cache_dir: PathBuf,

    /// Where DOCX reports are written.
    #[arg(short, long, env = "PCN_REPORT_OUTPUT_DIR", default_value = "RELATORIOS")]
    output_dir: PathBuf,

    /// Azure OpenAI endpoint, e.g. https://my-resource.openai.azure.com
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    endpoint: Option<String>,

    /// Azure OpenAI API key.
    #[arg(long, env = "AZURE_OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Azure OpenAI REST API version.
    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = "2024-02-01")]
    api_version: String,

    /// Model ID (the deployment name on Azure).
    #[arg(long, env = "PCN_REPORT_MODEL", default_value = "gpt-4o")]
    model: String,

    /// edgequake-llm provider when no Azure credentials are given:
    /// openai, anthropic, gemini, ollama, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PCN_REPORT_TEMPERATURE", default_value_t = 0.5)]
    temperature: f32,

    /// Max output tokens per completion.
    #[arg(long, env = "PCN_REPORT_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Attempts per completion request.
    #[arg(long, env = "PCN_REPORT_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Delay between attempts in milliseconds.
    #[arg(long, env = "PCN_REPORT_RETRY_DELAY_MS", default_value_t = 5000)]
    retry_delay_ms: u64,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PCN_REPORT_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Write the markdown cache only; skip DOCX rendering.
    #[arg(long, env = "PCN_REPORT_MARKDOWN_ONLY")]
    markdown_only: bool,

    /// Print the batch summary as JSON on stdout.
    #[arg(long, env = "PCN_REPORT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PCN_REPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PCN_REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PCN_REPORT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO lines; failures still surface as ERROR.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ReportProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let client =
        CompletionClient::from_config(&config.completion).context("No completion backend")?;
    let reader = PdfTextReader::with_pdfium(&config.cache_dir);

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = match &cli.subject {
        Some(pdf) => run_subjects(&config, &client, &reader, std::slice::from_ref(pdf)).await,
        None => run_batch(&config, &client, &reader).await,
    }
    .context("Batch could not start")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    }
    if !cli.quiet {
        print_summary(&summary);
    }

    // Per-document failures are reported, not fatal.
    Ok(())
}

/// Map CLI args to `ReportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReportConfig> {
    let mut builder = ReportConfig::builder()
        .specification_path(&cli.specification)
        .reference_dir(&cli.reference_dir)
        .subject_dir(&cli.subject_dir)
        .cache_dir(&cli.cache_dir)
        .output_dir(&cli.output_dir)
        .api_version(&cli.api_version)
        .model(&cli.model)
        .temperature(cli.temperature)
        .max_attempts(cli.max_attempts)
        .retry_delay_ms(cli.retry_delay_ms)
        .request_timeout_secs(cli.api_timeout)
        .markdown_only(cli.markdown_only);

    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &BatchSummary) {
    for doc in &summary.documents {
        match doc {
            DocumentOutcome::Completed { subject, output } => eprintln!(
                "  {} {}  →  {}",
                green("✓"),
                subject,
                bold(&output.display().to_string())
            ),
            DocumentOutcome::Failed { subject, error } => {
                eprintln!("  {} {}  {}", red("✗"), subject, red(error))
            }
        }
    }
    eprintln!(
        "{}  {}/{} documents  {}  ({} reference document(s))",
        if summary.failed() == 0 { green("✔") } else { cyan("⚠") },
        summary.succeeded(),
        summary.documents.len(),
        dim(&format!("{}ms", summary.total_duration_ms)),
        summary.reference_documents,
    );
}
