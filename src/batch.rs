//! Batch driver: one report per subject PDF.
//!
//! The specification and the reference documents are read once; every
//! subject document then runs through [`process_subject`] on its own task.
//! A document that fails (error or panic) is logged and recorded in the
//! [`BatchSummary`], and the batch moves on.

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::output::{BatchSummary, DocumentOutcome};
use crate::pipeline::extract::PdfTextReader;
use crate::pipeline::llm::CompletionClient;
use crate::pipeline::section::ReferenceDocument;
use crate::report::{process_subject, subject_name};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Read the specification text.
pub async fn load_specification(path: &Path) -> Result<String, ReportError> {
    if !path.exists() {
        return Err(ReportError::SpecificationNotFound {
            path: path.to_path_buf(),
        });
    }
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ReportError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// PDF files directly under `dir`, sorted by file name.
///
/// The extension match is case-insensitive.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    if !dir.is_dir() {
        return Err(ReportError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|e| ReportError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(pdfs)
}

/// Read every reference PDF under `dir`, in file-name order.
pub async fn load_references(
    reader: &PdfTextReader,
    dir: &Path,
) -> Result<Vec<ReferenceDocument>, ReportError> {
    let mut references = Vec::new();
    for path in list_pdfs(dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = reader.read(&path).await;
        references.push(ReferenceDocument { name, text });
    }
    if references.is_empty() {
        warn!(
            "No reference documents in {}; section prompts get an empty reference block",
            dir.display()
        );
    } else {
        info!("{} reference document(s) loaded", references.len());
    }
    Ok(references)
}

/// Process every PDF in `config.subject_dir`.
///
/// Fails only when the batch cannot start: missing specification file or
/// missing reference/subject directory.
pub async fn run_batch(
    config: &ReportConfig,
    client: &CompletionClient,
    reader: &PdfTextReader,
) -> Result<BatchSummary, ReportError> {
    let subjects = list_pdfs(&config.subject_dir)?;
    run_subjects(config, client, reader, &subjects).await
}

/// Process the given subject PDFs in order.
pub async fn run_subjects(
    config: &ReportConfig,
    client: &CompletionClient,
    reader: &PdfTextReader,
    subjects: &[PathBuf],
) -> Result<BatchSummary, ReportError> {
    let start = Instant::now();
    let specification: Arc<str> = load_specification(&config.specification_path).await?.into();
    let references = Arc::new(load_references(reader, &config.reference_dir).await?);

    info!(
        "Starting batch: {} subject document(s), {} reference document(s)",
        subjects.len(),
        references.len()
    );

    let mut summary = BatchSummary {
        reference_documents: references.len(),
        ..Default::default()
    };

    for (i, pdf) in subjects.iter().enumerate() {
        let subject = subject_name(pdf);
        info!("[{}/{}] {}", i + 1, subjects.len(), subject);

        let task = {
            let client = client.clone();
            let reader = reader.clone();
            let config = config.clone();
            let specification = Arc::clone(&specification);
            let references = Arc::clone(&references);
            let pdf = pdf.clone();
            tokio::spawn(async move {
                process_subject(&client, &reader, &pdf, &specification, &references, &config)
                    .await
            })
        };

        let outcome = match task.await {
            Ok(Ok(output)) => {
                let path = output.primary_path().to_path_buf();
                info!("{} → {}", subject, path.display());
                DocumentOutcome::Completed {
                    subject,
                    output: path,
                }
            }
            Ok(Err(e)) => {
                error!("Failed to process {}: {:?}", pdf.display(), e);
                DocumentOutcome::Failed {
                    subject,
                    error: e.to_string(),
                }
            }
            Err(e) => {
                error!("Processing task for {} died: {}", pdf.display(), e);
                DocumentOutcome::Failed {
                    subject,
                    error: format!("task failed: {e}"),
                }
            }
        };
        summary.documents.push(outcome);
    }

    summary.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Batch finished: {} succeeded, {} failed, {}ms",
        summary.succeeded(),
        summary.failed(),
        summary.total_duration_ms
    );
    Ok(summary)
}
