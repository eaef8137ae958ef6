//! Pipeline stages for report generation.
//!
//! Each submodule implements one step, so each can be tested without the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ structure ──▶ facts ──▶ section ×24 ──▶ markdown ──▶ render
//!  (pdfium)     (LLM)        (LLM)      (LLM)          (blocks)     (docx)
//! ```
//!
//! 1. [`extract`]: PDF text through the file-name-keyed cache
//! 2. [`llm`]: completion client with fixed-delay retry; every network
//!    call goes through it
//! 3. [`structure`]: the 24 section titles, with a canonical fallback, and
//!    the per-section prompting table
//! 4. [`facts`]: curricular unit list shared by table sections
//! 5. [`section`]: one prompt and one completion per section
//! 6. [`markdown`]: assembled text → typed blocks
//! 7. [`render`]: blocks → paginated DOCX

pub mod extract;
pub mod facts;
pub mod llm;
pub mod markdown;
pub mod render;
pub mod section;
pub mod structure;

/// The first `max_chars` characters of `text`.
///
/// Counts Unicode scalar values so a bound never splits a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
