//! Section generation: one completion per report slot.
//!
//! Each request combines the category instructions from
//! [`section_spec`], the curricular unit list (table sections), the text of
//! the previous section (justification sections) and bounded prefixes of
//! the subject, first reference and specification texts.
//!
//! ## Heading normalisation
//!
//! Every section must start with `## <n>.`. The check accepts `## 7.` and
//! `##7.` and nothing looser; output failing it gets the canonical heading
//! prepended instead of being rewritten.

use crate::config::PromptLimits;
use crate::output::{SectionContent, SectionResult, SectionStatus};
use crate::pipeline::llm::{CompletionClient, Message};
use crate::pipeline::structure::{section_spec, SectionCategory, SpecialSection};
use crate::pipeline::truncate_chars;
use crate::prompts::{
    canonical_heading, curricular_units_block, prior_section_context, section_system_prompt,
    section_user_prompt, SectionPromptParts, CONCLUSION_PROFILE_INSTRUCTIONS,
    FACILITIES_INSTRUCTIONS, HEADER_INSTRUCTIONS, JUSTIFICATION_INSTRUCTIONS,
    PROFILE_UPDATES_INSTRUCTIONS, SECTION_FAILED_BODY, SINGLE_CHOICE_INSTRUCTIONS,
    TABLE_INSTRUCTIONS, TEACHING_PLAN_INSTRUCTIONS, UNDEFINED_SECTION_BODY,
    UNDEFINED_SECTION_TITLE,
};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A reference PDF's display name and extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDocument {
    pub name: String,
    pub text: String,
}

/// Everything one section request reads. Borrowed for a single call.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub specification: &'a str,
    pub references: &'a [ReferenceDocument],
    pub subject: &'a str,
    pub subject_name: &'a str,
    pub curricular_units: &'a str,
    pub sections: &'a SectionContent,
    pub limits: &'a PromptLimits,
}

/// Category instructions for section `n`, with the unit list appended for
/// table sections that carry it.
pub fn section_instructions(n: usize, curricular_units: &str) -> String {
    let Some(spec) = section_spec(n) else {
        return String::new();
    };
    match spec.category {
        SectionCategory::Header => HEADER_INSTRUCTIONS.to_string(),
        SectionCategory::Table { with_units: true } => {
            format!(
                "{TABLE_INSTRUCTIONS}{}",
                curricular_units_block(curricular_units)
            )
        }
        SectionCategory::Table { with_units: false } => TABLE_INSTRUCTIONS.to_string(),
        SectionCategory::SingleChoice => SINGLE_CHOICE_INSTRUCTIONS.to_string(),
        SectionCategory::Justification => JUSTIFICATION_INSTRUCTIONS.to_string(),
        SectionCategory::Special(s) => match s {
            SpecialSection::ConclusionProfile => CONCLUSION_PROFILE_INSTRUCTIONS,
            SpecialSection::ProfileUpdates => PROFILE_UPDATES_INSTRUCTIONS,
            SpecialSection::TeachingPlans => TEACHING_PLAN_INSTRUCTIONS,
            SpecialSection::Facilities => FACILITIES_INSTRUCTIONS,
        }
        .to_string(),
        SectionCategory::FreeText => String::new(),
    }
}

/// Referenced-context block for section `n`: the text of `n - 1` when `n`
/// justifies it and that text exists; empty otherwise.
pub fn prior_context(n: usize, sections: &SectionContent) -> String {
    let references_previous = section_spec(n).is_some_and(|s| s.references_previous);
    if !references_previous {
        return String::new();
    }
    match sections.get(n - 1) {
        Some(previous) => prior_section_context(n - 1, previous),
        None => String::new(),
    }
}

/// System and user messages for section `n`.
pub fn build_messages(n: usize, title: &str, ctx: &PromptContext<'_>) -> [Message; 2] {
    let prior = prior_context(n, ctx.sections);
    let instructions = section_instructions(n, ctx.curricular_units);
    let reference = ctx
        .references
        .first()
        .map(|r| truncate_chars(&r.text, ctx.limits.section_reference))
        .unwrap_or("");

    let user = section_user_prompt(&SectionPromptParts {
        section: n,
        title,
        subject_name: ctx.subject_name,
        prior_context: &prior,
        instructions: &instructions,
        subject: truncate_chars(ctx.subject, ctx.limits.section_subject),
        reference,
        specification: truncate_chars(ctx.specification, ctx.limits.section_specification),
    });

    [Message::system(section_system_prompt(n)), Message::user(user)]
}

/// True when `text` already opens with `## <n>.` or `##<n>.`.
pub fn has_section_heading(n: usize, text: &str) -> bool {
    let marker = format!("{n}.");
    text.strip_prefix("## ")
        .or_else(|| text.strip_prefix("##"))
        .is_some_and(|rest| rest.starts_with(&marker))
}

/// Prepend the canonical heading unless `text` already carries one.
pub fn ensure_heading(n: usize, title: &str, text: &str) -> String {
    if has_section_heading(n, text) {
        text.to_string()
    } else {
        format!("{}\n\n{}", canonical_heading(n, title), text)
    }
}

/// Section text used when generation failed.
pub fn placeholder_section(n: usize, title: &str) -> String {
    format!("{}\n\n{}", canonical_heading(n, title), SECTION_FAILED_BODY)
}

/// Section text for a slot the structure does not define.
pub fn undefined_section(n: usize) -> String {
    format!(
        "{}\n\n{}",
        canonical_heading(n, UNDEFINED_SECTION_TITLE),
        UNDEFINED_SECTION_BODY
    )
}

/// A generated (or substituted) section and its record.
#[derive(Debug, Clone)]
pub struct GeneratedSection {
    pub text: String,
    pub result: SectionResult,
}

/// Generate section `n`.
///
/// Never fails: once the client's retries are exhausted the placeholder
/// body is returned under the canonical heading and the error is kept in
/// the result record.
pub async fn generate_section(
    client: &CompletionClient,
    n: usize,
    title: &str,
    ctx: &PromptContext<'_>,
) -> GeneratedSection {
    let start = Instant::now();
    info!("Generating section {}: {}", n, title);

    let messages = build_messages(n, title, ctx);
    debug!(
        "Section {} prompt: {} chars",
        n,
        messages[1].content.chars().count()
    );

    let (text, status, error) = match client.complete(&messages).await {
        Ok(response) => (
            ensure_heading(n, title, &response),
            SectionStatus::Generated,
            None,
        ),
        Err(e) => {
            warn!("Section {} failed, using placeholder: {}", n, e);
            (
                placeholder_section(n, title),
                SectionStatus::Placeholder,
                Some(e.to_string()),
            )
        }
    };

    let result = SectionResult {
        number: n,
        title: title.to_string(),
        status,
        error,
        chars: text.chars().count(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    GeneratedSection { text, result }
}
