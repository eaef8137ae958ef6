//! Report structure: the 24 section titles and how each section is prompted.
//!
//! Titles come from the model ([`extract_structure`]) with a versioned
//! fallback; the per-section prompting rules come from one fixed table
//! ([`section_spec`]) so category membership is decided in a single place.

use crate::error::StructureError;
use crate::pipeline::llm::{CompletionClient, Message};
use crate::pipeline::truncate_chars;
use crate::prompts::{
    structure_user_prompt, FALLBACK_STRUCTURE, SECTION_COUNT, STRUCTURE_SYSTEM_PROMPT,
};
use serde::Serialize;
use tracing::{info, warn};

/// Fewer non-empty response lines than this and the structure is discarded.
///
/// Kept at the value the report template was tuned with.
pub const MIN_STRUCTURE_ITEMS: usize = 15;

/// Ordered section titles, indexed 1..=24. Slots may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportStructure {
    titles: [Option<String>; SECTION_COUNT],
}

impl ReportStructure {
    /// The canonical structure with all 24 titles.
    pub fn fallback() -> Self {
        let mut s = Self::default();
        for (i, title) in FALLBACK_STRUCTURE.iter().enumerate() {
            s.titles[i] = Some((*title).to_string());
        }
        s
    }

    /// Parse `N. Title` lines.
    ///
    /// A line is admitted only when the text before its first `". "` is all
    /// ASCII digits and names a slot in 1..=24; anything else is dropped
    /// silently. A later line for the same slot replaces an earlier one.
    pub fn parse(text: &str) -> Self {
        let mut s = Self::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((number, title)) = line.split_once(". ") else {
                continue;
            };
            if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            match number.parse::<usize>() {
                Ok(n) if (1..=SECTION_COUNT).contains(&n) => {
                    s.titles[n - 1] = Some(title.to_string());
                }
                _ => {}
            }
        }
        s
    }

    /// Title of section `n` (1-indexed), if defined.
    pub fn title(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.titles.get(i))
            .and_then(|t| t.as_deref())
    }

    /// Number of defined slots.
    pub fn defined(&self) -> usize {
        self.titles.iter().filter(|t| t.is_some()).count()
    }

    /// Section numbers with no title.
    pub fn missing(&self) -> Vec<usize> {
        (1..=SECTION_COUNT)
            .filter(|&n| self.title(n).is_none())
            .collect()
    }
}

/// Where the structure used for a report came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureSource {
    /// Parsed from the model's answer.
    Extracted,
    /// The canonical structure; `reason` says why.
    Fallback { reason: String },
}

/// Ask the model for the section titles defined by `specification`.
///
/// Never fails: a failed call or a low-confidence answer (fewer than
/// [`MIN_STRUCTURE_ITEMS`] non-empty lines) yields [`ReportStructure::fallback`].
pub async fn extract_structure(
    client: &CompletionClient,
    specification: &str,
    max_chars: usize,
) -> (ReportStructure, StructureSource) {
    info!("Extracting report structure");
    match request_structure(client, specification, max_chars).await {
        Ok(structure) => {
            info!(
                "Structure extracted: {}/{} sections defined",
                structure.defined(),
                SECTION_COUNT
            );
            (structure, StructureSource::Extracted)
        }
        Err(e) => {
            warn!("Using fallback structure: {}", e);
            (
                ReportStructure::fallback(),
                StructureSource::Fallback {
                    reason: e.to_string(),
                },
            )
        }
    }
}

async fn request_structure(
    client: &CompletionClient,
    specification: &str,
    max_chars: usize,
) -> Result<ReportStructure, StructureError> {
    let messages = [
        Message::system(STRUCTURE_SYSTEM_PROMPT),
        Message::user(structure_user_prompt(truncate_chars(specification, max_chars))),
    ];
    let response = client.complete(&messages).await?;

    let found = response.lines().filter(|l| !l.trim().is_empty()).count();
    info!("  {} items identified in structure response", found);
    if found < MIN_STRUCTURE_ITEMS {
        return Err(StructureError::LowConfidence {
            found,
            required: MIN_STRUCTURE_ITEMS,
        });
    }
    Ok(ReportStructure::parse(&response))
}

// ── Section plan ─────────────────────────────────────────────────────────

/// Sections with bespoke instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialSection {
    /// 4: graduate profile as written in the course plan.
    ConclusionProfile,
    /// 5: suggested updates to the graduate profile.
    ProfileUpdates,
    /// 21: guidance for teachers' work plans.
    TeachingPlans,
    /// 23: facilities, equipment and teaching resources.
    Facilities,
}

/// How a section is prompted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionCategory {
    /// 1: course header.
    Header,
    /// A markdown table; `with_units` appends the curricular unit list.
    Table { with_units: bool },
    /// A direct answer from a fixed set of options.
    SingleChoice,
    /// ~2 000 characters of justification.
    Justification,
    Special(SpecialSection),
    /// No category-specific instructions.
    FreeText,
}

/// Prompting rules for one section slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    pub category: SectionCategory,
    /// Include section `n - 1`'s generated text as referenced context.
    pub references_previous: bool,
}

const fn spec(category: SectionCategory, references_previous: bool) -> SectionSpec {
    SectionSpec {
        category,
        references_previous,
    }
}

/// Prompting rules for section `n` (1-indexed). `None` outside 1..=24.
pub fn section_spec(n: usize) -> Option<SectionSpec> {
    use SectionCategory::{FreeText, Header, Justification, SingleChoice, Special, Table};
    use SpecialSection::{ConclusionProfile, Facilities, ProfileUpdates, TeachingPlans};

    const UNITS: SectionCategory = Table { with_units: true };

    // Index `n - 1` holds the rules for section `n`.
    const PLAN: [SectionSpec; SECTION_COUNT] = [
        spec(Header, false),                       // 1
        spec(UNITS, false),                        // 2
        spec(UNITS, false),                        // 3
        spec(Special(ConclusionProfile), false),   // 4
        spec(Special(ProfileUpdates), false),      // 5
        spec(UNITS, false),                        // 6
        spec(UNITS, false),                        // 7
        spec(UNITS, false),                        // 8
        spec(UNITS, false),                        // 9
        spec(UNITS, true),                         // 10
        spec(SingleChoice, false),                 // 11
        spec(Justification, true),                 // 12
        spec(SingleChoice, false),                 // 13
        spec(Justification, true),                 // 14
        spec(SingleChoice, false),                 // 15
        spec(Justification, true),                 // 16
        spec(SingleChoice, false),                 // 17
        spec(Justification, true),                 // 18
        spec(SingleChoice, false),                 // 19
        spec(Justification, false),                // 20
        spec(Special(TeachingPlans), false),       // 21
        spec(FreeText, false),                     // 22
        spec(Special(Facilities), false),          // 23
        spec(Table { with_units: false }, false),  // 24
    ];

    n.checked_sub(1).and_then(|i| PLAN.get(i)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::pipeline::llm::testing::ScriptedBackend;

    #[test]
    fn parse_admits_only_digit_prefixes() {
        let s = ReportStructure::parse(
            "1. Cabeçalho\n\n  2. Tabela de Impacto  \nItem 3. Perfil\n4) Outro\n5.Sem espaço\n",
        );
        assert_eq!(s.title(1), Some("Cabeçalho"));
        assert_eq!(s.title(2), Some("Tabela de Impacto"));
        assert_eq!(s.title(3), None);
        assert_eq!(s.title(4), None);
        assert_eq!(s.title(5), None);
        assert_eq!(s.defined(), 2);
    }

    #[test]
    fn parse_splits_on_first_separator_only() {
        let s = ReportStructure::parse("10. 10. Tabela de Atitudes");
        assert_eq!(s.title(10), Some("10. Tabela de Atitudes"));
    }

    #[test]
    fn parse_ignores_out_of_range_numbers() {
        let s = ReportStructure::parse("0. Zero\n25. Vinte e cinco\n24. Referências");
        assert_eq!(s.defined(), 1);
        assert_eq!(s.title(24), Some("Referências"));
        assert_eq!(s.title(0), None);
        assert_eq!(s.title(25), None);
    }

    #[test]
    fn later_duplicate_replaces_earlier() {
        let s = ReportStructure::parse("3. Primeiro\n3. Segundo");
        assert_eq!(s.title(3), Some("Segundo"));
    }

    #[test]
    fn fallback_defines_every_slot_verbatim() {
        let s = ReportStructure::fallback();
        assert_eq!(s.defined(), SECTION_COUNT);
        assert!(s.missing().is_empty());
        for (i, title) in FALLBACK_STRUCTURE.iter().enumerate() {
            assert_eq!(s.title(i + 1), Some(*title));
        }
    }

    #[test]
    fn missing_lists_undefined_slots() {
        let s = ReportStructure::parse("1. A\n3. C");
        let missing = s.missing();
        assert_eq!(missing.len(), 22);
        assert_eq!(missing[0], 2);
        assert!(!missing.contains(&3));
    }

    #[test]
    fn plan_categories() {
        let table_sections: Vec<usize> = (1..=24)
            .filter(|&n| matches!(section_spec(n).unwrap().category, SectionCategory::Table { .. }))
            .collect();
        assert_eq!(table_sections, vec![2, 3, 6, 7, 8, 9, 10, 24]);

        let choice: Vec<usize> = (1..=24)
            .filter(|&n| section_spec(n).unwrap().category == SectionCategory::SingleChoice)
            .collect();
        assert_eq!(choice, vec![11, 13, 15, 17, 19]);

        let justification: Vec<usize> = (1..=24)
            .filter(|&n| section_spec(n).unwrap().category == SectionCategory::Justification)
            .collect();
        assert_eq!(justification, vec![12, 14, 16, 18, 20]);

        assert_eq!(section_spec(1).unwrap().category, SectionCategory::Header);
        assert_eq!(
            section_spec(24).unwrap().category,
            SectionCategory::Table { with_units: false }
        );
    }

    #[test]
    fn plan_references_previous_for_justified_answers() {
        let refs: Vec<usize> = (1..=24)
            .filter(|&n| section_spec(n).unwrap().references_previous)
            .collect();
        assert_eq!(refs, vec![10, 12, 14, 16, 18]);
    }

    #[test]
    fn plan_special_sections() {
        for (n, special) in [
            (4, SpecialSection::ConclusionProfile),
            (5, SpecialSection::ProfileUpdates),
            (21, SpecialSection::TeachingPlans),
            (23, SpecialSection::Facilities),
        ] {
            assert_eq!(
                section_spec(n).unwrap().category,
                SectionCategory::Special(special)
            );
        }
        assert!(section_spec(0).is_none());
        assert!(section_spec(25).is_none());
    }

    fn numbered(count: usize) -> String {
        (1..=count).map(|n| format!("{n}. Item {n}\n")).collect()
    }

    #[tokio::test]
    async fn extracted_structure_is_used_when_confident() {
        let backend = ScriptedBackend::new([Ok(numbered(24))]);
        let (s, source) = extract_structure(&backend.client(), "espec", 60_000).await;
        assert_eq!(source, StructureSource::Extracted);
        assert_eq!(s.title(17), Some("Item 17"));
    }

    #[tokio::test]
    async fn fifteen_lines_are_enough() {
        let backend = ScriptedBackend::new([Ok(numbered(15))]);
        let (s, source) = extract_structure(&backend.client(), "espec", 60_000).await;
        assert_eq!(source, StructureSource::Extracted);
        assert_eq!(s.defined(), 15);
    }

    #[tokio::test]
    async fn low_confidence_uses_fallback() {
        let backend = ScriptedBackend::new([Ok(numbered(10))]);
        let (s, source) = extract_structure(&backend.client(), "espec", 60_000).await;
        assert_eq!(s, ReportStructure::fallback());
        match source {
            StructureSource::Fallback { reason } => assert!(reason.contains("10")),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_call_uses_fallback() {
        let backend = ScriptedBackend::new([Err(CompletionError::EmptyCompletion)]);
        let (s, source) = extract_structure(&backend.client(), "espec", 60_000).await;
        assert_eq!(s, ReportStructure::fallback());
        assert!(matches!(source, StructureSource::Fallback { .. }));
    }

    #[tokio::test]
    async fn specification_is_bounded() {
        let backend = ScriptedBackend::new([Ok(numbered(24))]);
        extract_structure(&backend.client(), "ação e reação", 4).await;
        let prompt = backend.last_user_message();
        assert!(prompt.contains("PROMPT:\nação\n"));
    }
}
