//! Report assembly for one subject document.
//!
//! [`assemble_report`] runs the structure and curricular-unit extractors
//! once, then generates the 24 sections strictly in order, since
//! justification sections quote the section before them. The assembled
//! markdown is cached as `relatorio_completo_<subject>.md` (overwritten each
//! run) before anything is rendered.

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::output::{
    AssembledReport, ReportStats, SectionContent, SectionResult, SectionStatus, SubjectOutput,
};
use crate::pipeline::extract::PdfTextReader;
use crate::pipeline::facts::extract_curricular_units;
use crate::pipeline::llm::CompletionClient;
use crate::pipeline::markdown::parse_blocks;
use crate::pipeline::render::{output_path, render_docx};
use crate::pipeline::section::{generate_section, undefined_section, PromptContext, ReferenceDocument};
use crate::pipeline::structure::extract_structure;
use crate::prompts::{report_title, SECTION_COUNT, UNDEFINED_SECTION_TITLE, UNITS_UNAVAILABLE};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// The texts one report is generated from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub specification: &'a str,
    pub references: &'a [ReferenceDocument],
    pub subject: &'a str,
    /// File stem of the subject PDF; used in the title and file names.
    pub subject_name: &'a str,
}

/// `<cache_dir>/relatorio_completo_<subject_name>.md`
pub fn report_cache_path(cache_dir: &Path, subject_name: &str) -> PathBuf {
    cache_dir.join(format!("relatorio_completo_{subject_name}.md"))
}

/// Subject name of a PDF path: its file stem.
pub fn subject_name(pdf_path: &Path) -> String {
    pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf_path.display().to_string())
}

/// Generate all 24 sections and write the markdown cache.
///
/// Completion failures never abort the report: they end up as fallback
/// structure, apology text or placeholder sections. Only a cache write
/// failure is returned as an error.
pub async fn assemble_report(
    client: &CompletionClient,
    inputs: &ReportInputs<'_>,
    config: &ReportConfig,
) -> Result<AssembledReport, ReportError> {
    let start = Instant::now();
    let callback = config.progress_callback.as_ref();
    info!("Assembling report for \"{}\"", inputs.subject_name);
    if let Some(cb) = callback {
        cb.on_report_start(inputs.subject_name, SECTION_COUNT);
    }

    let (structure, structure_source) = extract_structure(
        client,
        inputs.specification,
        config.limits.structure_specification,
    )
    .await;
    let units =
        extract_curricular_units(client, inputs.subject, config.limits.facts_subject).await;
    if let Some(cb) = callback {
        cb.on_context_ready(&structure_source, units != UNITS_UNAVAILABLE);
    }

    let mut markdown = format!("{}\n\n", report_title(inputs.subject_name));
    let mut sections = SectionContent::new();
    let mut results = Vec::with_capacity(SECTION_COUNT);

    for n in 1..=SECTION_COUNT {
        let (text, result) = match structure.title(n) {
            Some(title) => {
                if let Some(cb) = callback {
                    cb.on_section_start(n, SECTION_COUNT);
                }
                let ctx = PromptContext {
                    specification: inputs.specification,
                    references: inputs.references,
                    subject: inputs.subject,
                    subject_name: inputs.subject_name,
                    curricular_units: &units,
                    sections: &sections,
                    limits: &config.limits,
                };
                let generated = generate_section(client, n, title, &ctx).await;
                (generated.text, generated.result)
            }
            None => {
                warn!("Section {} is not defined in the report structure", n);
                let text = undefined_section(n);
                let result = SectionResult {
                    number: n,
                    title: UNDEFINED_SECTION_TITLE.to_string(),
                    status: SectionStatus::Undefined,
                    error: None,
                    chars: text.chars().count(),
                    duration_ms: 0,
                };
                (text, result)
            }
        };

        if let Some(cb) = callback {
            match (&result.status, &result.error) {
                (SectionStatus::Generated, _) => {
                    cb.on_section_complete(n, SECTION_COUNT, text.len())
                }
                (_, Some(e)) => cb.on_section_error(n, SECTION_COUNT, e),
                (_, None) => cb.on_section_error(n, SECTION_COUNT, "section not defined"),
            }
        }

        markdown.push_str(&text);
        markdown.push_str("\n\n");
        // Undefined slots never feed a later section's prior context.
        if result.status != SectionStatus::Undefined {
            sections.set(n, text);
        }
        results.push(result);
    }

    let count = |status: SectionStatus| results.iter().filter(|r| r.status == status).count();
    let stats = ReportStats {
        total_sections: SECTION_COUNT,
        generated_sections: count(SectionStatus::Generated),
        placeholder_sections: count(SectionStatus::Placeholder),
        undefined_sections: count(SectionStatus::Undefined),
        structure_source,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    let cache_path = report_cache_path(&config.cache_dir, inputs.subject_name);
    write_cache(&config.cache_dir, &cache_path, &markdown).await?;

    info!(
        "Report assembled: {}/{} sections generated, {} placeholders, {} undefined, {}ms",
        stats.generated_sections,
        SECTION_COUNT,
        stats.placeholder_sections,
        stats.undefined_sections,
        stats.total_duration_ms
    );
    if let Some(cb) = callback {
        cb.on_report_complete(SECTION_COUNT, stats.generated_sections);
    }

    Ok(AssembledReport {
        subject_name: inputs.subject_name.to_string(),
        markdown,
        sections: results,
        stats,
        cache_path,
    })
}

async fn write_cache(cache_dir: &Path, path: &Path, markdown: &str) -> Result<(), ReportError> {
    let wrap = |e| ReportError::CacheWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    tokio::fs::create_dir_all(cache_dir).await.map_err(wrap)?;
    tokio::fs::write(path, markdown).await.map_err(wrap)?;
    info!("Report markdown cached: {}", path.display());
    Ok(())
}

/// Full pipeline for one subject PDF: read, assemble, render.
///
/// With `markdown_only` set the DOCX step is skipped.
pub async fn process_subject(
    client: &CompletionClient,
    reader: &PdfTextReader,
    pdf_path: &Path,
    specification: &str,
    references: &[ReferenceDocument],
    config: &ReportConfig,
) -> Result<SubjectOutput, ReportError> {
    let name = subject_name(pdf_path);
    info!("Processing subject document: {}", pdf_path.display());

    let subject = reader.read(pdf_path).await;
    let inputs = ReportInputs {
        specification,
        references,
        subject: &subject,
        subject_name: &name,
    };
    let report = assemble_report(client, &inputs, config).await?;

    if config.markdown_only {
        return Ok(SubjectOutput {
            report,
            docx_path: None,
        });
    }

    let path = output_path(&config.output_dir, &name, &chrono::Local::now());
    render_docx(parse_blocks(&report.markdown), &path).await?;

    Ok(SubjectOutput {
        report,
        docx_path: Some(path),
    })
}
