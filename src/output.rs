//! Output types: the assembled report, its per-section record and stats.

use crate::pipeline::structure::StructureSource;
use crate::prompts::SECTION_COUNT;
use serde::Serialize;
use std::path::PathBuf;

/// Generated text per section slot, filled in index order.
///
/// A slot is written at most once; later sections read earlier ones as
/// referenced context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionContent {
    slots: [Option<String>; SECTION_COUNT],
}

impl SectionContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of section `n` (1-indexed), if already generated.
    pub fn get(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .and_then(|s| s.as_deref())
    }

    /// Store the text of section `n`.
    ///
    /// Returns `false` and leaves the slot untouched when `n` is out of
    /// range or the slot is already filled.
    pub fn set(&mut self, n: usize, text: impl Into<String>) -> bool {
        match n.checked_sub(1).and_then(|i| self.slots.get_mut(i)) {
            Some(slot @ None) => {
                *slot = Some(text.into());
                true
            }
            _ => false,
        }
    }

    /// Filled slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_deref().map(|s| (i + 1, s)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How one section slot was filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// Model output, possibly with a heading prepended.
    Generated,
    /// The completion failed; a fixed body stands in.
    Placeholder,
    /// The structure had no title for this slot.
    Undefined,
}

/// Result for one section slot.
#[derive(Debug, Clone, Serialize)]
pub struct SectionResult {
    /// 1-indexed section number.
    pub number: usize,
    pub title: String,
    pub status: SectionStatus,
    /// The failure message when `status` is `Placeholder`.
    pub error: Option<String>,
    /// Characters of section text.
    pub chars: usize,
    pub duration_ms: u64,
}

/// Aggregate numbers for one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportStats {
    pub total_sections: usize,
    pub generated_sections: usize,
    pub placeholder_sections: usize,
    pub undefined_sections: usize,
    pub structure_source: StructureSource,
    pub total_duration_ms: u64,
}

/// One subject document's finished report.
#[derive(Debug, Clone)]
pub struct AssembledReport {
    /// File stem of the subject PDF.
    pub subject_name: String,
    /// Title line plus the 24 sections, each followed by a blank line.
    pub markdown: String,
    pub sections: Vec<SectionResult>,
    pub stats: ReportStats,
    /// Where the markdown was cached.
    pub cache_path: PathBuf,
}

/// A processed subject document: its report and, unless rendering was
/// skipped, the DOCX path.
#[derive(Debug, Clone)]
pub struct SubjectOutput {
    pub report: AssembledReport,
    pub docx_path: Option<PathBuf>,
}

impl SubjectOutput {
    /// The artifact to point the operator at.
    pub fn primary_path(&self) -> &std::path::Path {
        self.docx_path.as_deref().unwrap_or(&self.report.cache_path)
    }
}

/// Outcome of one subject document in a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// Report written; `output` is the DOCX path, or the markdown cache when
    /// rendering was skipped.
    Completed { subject: String, output: PathBuf },
    Failed { subject: String, error: String },
}

/// Counts and per-document outcomes of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub reference_documents: usize,
    pub documents: Vec<DocumentOutcome>,
    pub total_duration_ms: u64,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d, DocumentOutcome::Completed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.documents.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_content_is_write_once() {
        let mut content = SectionContent::new();
        assert!(content.set(9, "tabela"));
        assert!(!content.set(9, "outra"));
        assert_eq!(content.get(9), Some("tabela"));
        assert_eq!(content.len(), 1);
    }

    #[test]
    fn section_content_rejects_out_of_range() {
        let mut content = SectionContent::new();
        assert!(!content.set(0, "x"));
        assert!(!content.set(25, "x"));
        assert!(content.is_empty());
        assert_eq!(content.get(0), None);
    }

    #[test]
    fn section_content_iterates_in_order() {
        let mut content = SectionContent::new();
        content.set(3, "c");
        content.set(1, "a");
        let collected: Vec<_> = content.iter().collect();
        assert_eq!(collected, vec![(1, "a"), (3, "c")]);
    }

    #[test]
    fn batch_summary_counts() {
        let summary = BatchSummary {
            reference_documents: 1,
            documents: vec![
                DocumentOutcome::Completed {
                    subject: "A".into(),
                    output: PathBuf::from("RELATORIOS/a.docx"),
                },
                DocumentOutcome::Failed {
                    subject: "B".into(),
                    error: "boom".into(),
                },
            ],
            total_duration_ms: 0,
        };
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
    }
}
