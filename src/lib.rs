//! # edgequake-report
//!
//! Generate 24-section course-plan (PCN) review reports from PDF documents
//! with a text-completion model, and render them as DOCX.
//!
//! ## Pipeline Overview
//!
//! ```text
//! prompt.txt + BASE/*.pdf  (read once per batch)
//!  │
//!  for each PC/*.pdf
//!  ├─ 1. Extract    PDF text via pdfium, cached as CACHE/<file>.txt
//!  ├─ 2. Structure  24 section titles from the specification (fallback on < 15 items)
//!  ├─ 3. Facts      curricular unit list (UC<n>: <name>)
//!  ├─ 4. Sections   24 sequential completions, category-specific prompts
//!  ├─ 5. Assemble   title + sections → CACHE/relatorio_completo_<name>.md
//!  ├─ 6. Parse      markdown → headings, bullets, tables, paragraphs
//!  └─ 7. Render     RELATORIOS/<YYYYMMDD_HHMMSS>_<name>.docx
//! ```
//!
//! Every completion failure is contained where it happens: the structure
//! falls back to a fixed list, the unit list to an apology text, a section
//! to a placeholder body. Only I/O failures stop a subject document, and a
//! failed document never stops the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_report::{run_batch, CompletionClient, PdfTextReader, ReportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Azure OpenAI when endpoint + key are set, else any edgequake-llm provider
//!     let config = ReportConfig::builder()
//!         .endpoint("https://my-resource.openai.azure.com")
//!         .api_key(std::env::var("AZURE_OPENAI_API_KEY")?)
//!         .build()?;
//!     let client = CompletionClient::from_config(&config.completion)?;
//!     let reader = PdfTextReader::with_pdfium(&config.cache_dir);
//!
//!     let summary = run_batch(&config, &client, &reader).await?;
//!     eprintln!("{} reports, {} failures", summary.succeeded(), summary.failed());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pcn-report` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{list_pdfs, load_references, load_specification, run_batch, run_subjects};
pub use config::{CompletionConfig, PromptLimits, ReportConfig, ReportConfigBuilder};
pub use error::{CompletionError, ExtractionError, ReportError, StructureError};
pub use output::{
    AssembledReport, BatchSummary, DocumentOutcome, ReportStats, SectionContent, SectionResult,
    SectionStatus, SubjectOutput,
};
pub use pipeline::extract::{PdfTextReader, PdfiumTextExtractor, TextExtractor};
pub use pipeline::llm::{CompletionBackend, CompletionClient, Message, RequestOptions, Role};
pub use pipeline::markdown::{decode_table, parse_blocks, Block};
pub use pipeline::section::ReferenceDocument;
pub use pipeline::structure::{ReportStructure, StructureSource};
pub use progress::{NoopProgressCallback, ProgressCallback, ReportProgressCallback};
pub use report::{assemble_report, process_subject, ReportInputs};
