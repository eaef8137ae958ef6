//! Progress-callback trait for per-section report events.
//!
//! Inject an [`Arc<dyn ReportProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to receive
//! events as the assembler walks the 24 sections of a report.
//!
//! # Example
//!
//! ```rust
//! use edgequake_report::{ReportConfig, ReportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ReportProgressCallback for CountingCallback {
//!     fn on_section_complete(&self, section: usize, total: usize, content_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Section {}/{} done ({} bytes)", section, total, content_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ReportConfig::builder()
//!     .progress_callback(counter as Arc<dyn ReportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::structure::StructureSource;
use std::sync::Arc;

/// Called by the report assembler as it processes each section.
///
/// Sections are generated strictly in order, one at a time, but the trait is
/// `Send + Sync` so implementations can be shared with other tasks. All
/// methods have default no-op implementations.
pub trait ReportProgressCallback: Send + Sync {
    /// Called once per subject document, before structure extraction.
    ///
    /// # Arguments
    /// * `subject`: subject document display name
    /// * `total_sections`: number of section slots (always 24)
    fn on_report_start(&self, subject: &str, total_sections: usize) {
        let _ = (subject, total_sections);
    }

    /// Called once the structure and curricular units are known, before
    /// the first section.
    ///
    /// # Arguments
    /// * `structure`: whether the model's structure or the fallback is used
    /// * `units_available`: false when the apology text stands in for the
    ///   curricular-unit list
    fn on_context_ready(&self, structure: &StructureSource, units_available: bool) {
        let _ = (structure, units_available);
    }

    /// Called just before a section's completion request is sent.
    fn on_section_start(&self, section: usize, total_sections: usize) {
        let _ = (section, total_sections);
    }

    /// Called when a section was generated by the model.
    ///
    /// # Arguments
    /// * `section`: 1-indexed section number
    /// * `total_sections`: total section slots
    /// * `content_len`: byte length of the section text
    fn on_section_complete(&self, section: usize, total_sections: usize, content_len: usize) {
        let _ = (section, total_sections, content_len);
    }

    /// Called when a section fell back to a placeholder body.
    ///
    /// Undefined sections (missing from the structure) are reported here too.
    fn on_section_error(&self, section: usize, total_sections: usize, error: &str) {
        let _ = (section, total_sections, error);
    }

    /// Called once after all section slots have been filled.
    ///
    /// # Arguments
    /// * `total_sections`: total section slots
    /// * `generated`: sections produced by the model (no placeholder)
    fn on_report_complete(&self, total_sections: usize, generated: usize) {
        let _ = (total_sections, generated);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn ReportProgressCallback>;
