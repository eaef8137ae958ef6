//! Error types for the edgequake-report library.
//!
//! The pipeline contains failures as close to their origin as possible, so
//! most of these types never reach a caller:
//!
//! * [`ReportError`]: **Fatal for one subject document**: its report cannot
//!   be produced (cache or output not writable, provider not configured).
//!   The batch driver logs it and moves on to the next subject document.
//!
//! * [`CompletionError`]: one completion request failed. Each call site has
//!   its own fallback: the structure extractor switches to the canonical
//!   structure, the fact extractor returns an apology string and the section
//!   generator writes a placeholder body for that section only.
//!
//! * [`ExtractionError`]: PDF text extraction failed. Recovered by embedding
//!   a sentinel string as the document text.
//!
//! * [`StructureError`]: the structure response was unusable, either because
//!   the completion failed or because too few numbered items came back.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors for the processing of one subject document.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The specification text file does not exist.
    #[error("Specification file not found: '{path}'\nPass --specification <FILE> or create prompt.txt.")]
    SpecificationNotFound { path: PathBuf },

    /// A reference or subject document directory does not exist.
    #[error("Directory not found: '{path}'")]
    DirectoryNotFound { path: PathBuf },

    /// A file or directory exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No completion backend could be built from the configuration.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The assembled markdown could not be written to the cache directory.
    #[error("Failed to write report cache '{path}': {source}")]
    CacheWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rendered document could not be written.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The DOCX packer rejected the document.
    #[error("Failed to render document '{path}': {detail}")]
    RenderFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single completion request failed.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// The request never produced an HTTP response (DNS, TLS, timeout).
    #[error("Completion request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    /// The service answered but the completion text was empty.
    #[error("Completion service returned an empty completion")]
    EmptyCompletion,

    /// An edgequake-llm provider reported an error.
    #[error("LLM provider error: {0}")]
    Provider(String),
}

/// PDF text extraction failed.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    /// pdfium could not open the document.
    #[error("Failed to open PDF '{path}': {detail}")]
    OpenFailed { path: PathBuf, detail: String },

    /// Text could not be read from one page.
    #[error("Failed to read text of page {page}: {detail}")]
    PageTextFailed { page: usize, detail: String },

    /// The blocking extraction task died.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// The structure extractor could not trust the model's answer.
#[derive(Debug, Clone, Error)]
pub enum StructureError {
    /// The completion call failed after all attempts.
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Too few numbered items were recovered from the response.
    #[error("Only {found} structure items recovered (need at least {required})")]
    LowConfidence { found: usize, required: usize },
}
