//! PDF text extraction with an on-disk cache keyed by file name.
//!
//! ## Why spawn_blocking?
//!
//! pdfium keeps thread-local state and is CPU-bound, so extraction runs on
//! tokio's blocking pool rather than a worker thread.
//!
//! ## Cache semantics
//!
//! `<cache_dir>/<file name>.txt` holds the extracted text of each PDF. The
//! file's presence short-circuits extraction, and entries are never
//! invalidated: a PDF replaced under the same name keeps its old text until
//! the cache file is deleted by hand. Failed extractions are not cached.

use crate::error::ExtractionError;
use crate::prompts::EXTRACTION_ERROR_PREFIX;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Log extraction progress every this many pages.
const PROGRESS_EVERY_PAGES: usize = 20;

/// Produces the plain text of a PDF file.
///
/// Implementations are called from a blocking thread.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// pdfium-backed extractor.
///
/// Binds to `PDFIUM_LIB_PATH` (a library file or the directory holding it)
/// when set, else to the system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumTextExtractor {
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match &self.library_path {
            Some(p) if p.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
            }
            Some(p) => Pdfium::bind_to_library(p),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl TextExtractor for PdfiumTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let pdfium = self.bind()?;
        let document =
            pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| ExtractionError::OpenFailed {
                    path: path.to_path_buf(),
                    detail: format!("{e:?}"),
                })?;

        let pages = document.pages();
        let total = pages.len() as usize;
        let mut text = String::new();

        for (i, page) in pages.iter().enumerate() {
            if i % PROGRESS_EVERY_PAGES == 0 {
                debug!("  page {}/{}", i + 1, total);
            }
            let content = page
                .text()
                .map_err(|e| ExtractionError::PageTextFailed {
                    page: i + 1,
                    detail: format!("{e:?}"),
                })?
                .all();
            if !content.is_empty() {
                text.push_str(&content);
                text.push_str("\n\n");
            }
        }

        Ok(text)
    }
}

/// Reads PDF text through the file-name-keyed cache.
#[derive(Clone)]
pub struct PdfTextReader {
    cache_dir: PathBuf,
    extractor: Arc<dyn TextExtractor>,
}

impl PdfTextReader {
    pub fn new(cache_dir: impl Into<PathBuf>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            extractor,
        }
    }

    /// Reader backed by [`PdfiumTextExtractor`].
    pub fn with_pdfium(cache_dir: impl Into<PathBuf>) -> Self {
        Self::new(cache_dir, Arc::new(PdfiumTextExtractor::new()))
    }

    /// `<cache_dir>/<file name>.txt`
    pub fn cache_path(&self, pdf_path: &Path) -> PathBuf {
        let name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.cache_dir.join(format!("{name}.txt"))
    }

    /// Return the text of `pdf_path`, extracting it on a cache miss.
    ///
    /// Never fails: an extraction error is returned as a sentinel text
    /// (`ERRO NA EXTRAÇÃO: …`) so downstream steps can run on degraded input.
    pub async fn read(&self, pdf_path: &Path) -> String {
        let cache_path = self.cache_path(pdf_path);
        let file_label = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| pdf_path.display().to_string());

        match tokio::fs::read(&cache_path).await {
            Ok(bytes) => {
                info!("Using cached text for {}", file_label);
                return match String::from_utf8(bytes) {
                    Ok(cached) => cached,
                    Err(e) => {
                        warn!(
                            "Cached text for {} is not valid UTF-8, decoding lossily",
                            file_label
                        );
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not read cached text {}: {}",
                cache_path.display(),
                e
            ),
        }

        info!("Extracting text from {}", file_label);
        match self.extract_blocking(pdf_path).await {
            Ok(text) => {
                if let Err(e) = self.store(&cache_path, &text).await {
                    warn!("Could not cache text of {}: {}", file_label, e);
                }
                text
            }
            Err(e) => {
                warn!("Extraction failed for {}: {}", file_label, e);
                extraction_sentinel(&e)
            }
        }
    }

    async fn extract_blocking(&self, pdf_path: &Path) -> Result<String, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        let path = pdf_path.to_path_buf();
        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))?
    }

    async fn store(&self, cache_path: &Path, text: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(cache_path, text).await
    }
}

/// Document text standing in for a PDF that could not be read.
pub fn extraction_sentinel(err: &ExtractionError) -> String {
    format!("{EXTRACTION_ERROR_PREFIX} {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExtractor {
        calls: AtomicUsize,
        result: Result<String, ExtractionError>,
    }

    impl TextExtractor for CountingExtractor {
        fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[test]
    fn cache_path_uses_full_file_name() {
        let reader = PdfTextReader::new("CACHE", Arc::new(PdfiumTextExtractor::default()));
        assert_eq!(
            reader.cache_path(Path::new("PC/Tecnico em Vendas.pdf")),
            PathBuf::from("CACHE/Tecnico em Vendas.pdf.txt")
        );
    }

    #[tokio::test]
    async fn second_read_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Arc::new(CountingExtractor {
            calls: AtomicUsize::new(0),
            result: Ok("página um\n\n".to_string()),
        });
        let reader = PdfTextReader::new(dir.path().join("cache"), extractor.clone());
        let pdf = dir.path().join("doc.pdf");

        let first = reader.read(&pdf).await;
        let second = reader.read(&pdf).await;

        assert_eq!(first, "página um\n\n");
        assert_eq!(first, second);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert!(dir.path().join("cache/doc.pdf.txt").exists());
    }

    #[tokio::test]
    async fn stale_cache_entry_wins_over_extraction() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.pdf.txt"), "texto antigo").unwrap();
        let extractor = Arc::new(CountingExtractor {
            calls: AtomicUsize::new(0),
            result: Ok("texto novo".to_string()),
        });
        let reader = PdfTextReader::new(dir.path(), extractor.clone());

        assert_eq!(reader.read(Path::new("qualquer/doc.pdf")).await, "texto antigo");
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_utf8_cache_entry_still_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.pdf.txt"), b"texto \xff antigo").unwrap();
        let extractor = Arc::new(CountingExtractor {
            calls: AtomicUsize::new(0),
            result: Ok("texto novo".to_string()),
        });
        let reader = PdfTextReader::new(dir.path(), extractor.clone());

        let text = reader.read(Path::new("doc.pdf")).await;
        assert_eq!(text, "texto \u{FFFD} antigo");
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            std::fs::read(dir.path().join("doc.pdf.txt")).unwrap(),
            b"texto \xff antigo"
        );
    }

    #[tokio::test]
    async fn failure_yields_sentinel_and_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Arc::new(CountingExtractor {
            calls: AtomicUsize::new(0),
            result: Err(ExtractionError::OpenFailed {
                path: PathBuf::from("broken.pdf"),
                detail: "bad xref".into(),
            }),
        });
        let reader = PdfTextReader::new(dir.path(), extractor.clone());
        let pdf = Path::new("broken.pdf");

        let text = reader.read(pdf).await;
        assert!(text.starts_with("ERRO NA EXTRAÇÃO:"), "got: {text}");
        assert!(text.contains("bad xref"));
        assert!(!reader.cache_path(pdf).exists());

        reader.read(pdf).await;
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    }
}
