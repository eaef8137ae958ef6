//! DOCX rendering of parsed report blocks via docx-rs.
//!
//! ## Block mapping
//!
//! | Block | DOCX |
//! |-------|------|
//! | `Title` | centered paragraph, `Title` style |
//! | `Heading { level: 1 }` | `Heading1` style |
//! | `Heading { level: 2 }` | `Heading2` style |
//! | `Table` | autofit grid at full page width, bold centered header row, then an empty paragraph |
//! | `BulletItem` | paragraph on the bullet numbering |
//! | `Paragraph` | plain paragraph |
//!
//! A centered bold attribution line closes every document. Page geometry is
//! fixed: US Letter with one-inch margins.
//!
//! ## Why spawn_blocking?
//!
//! Packing the zip container is synchronous file I/O plus deflate, so it
//! runs on tokio's blocking pool like pdfium extraction does.

use crate::error::ReportError;
use crate::pipeline::markdown::Block;
use crate::prompts::ATTRIBUTION_FOOTER;
use chrono::{DateTime, Local};
use docx_rs::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 8.5 in, in twentieths of a point.
pub const PAGE_WIDTH_TWIPS: u32 = 12_240;
/// 11 in.
pub const PAGE_HEIGHT_TWIPS: u32 = 15_840;
/// 1 in on every side.
pub const PAGE_MARGIN_TWIPS: i32 = 1_440;

const BULLET_ABSTRACT_ID: usize = 1;
const BULLET_NUMBERING_ID: usize = 1;

/// `<output_dir>/<YYYYMMDD_HHMMSS>_<subject_name>.docx`
pub fn output_path(output_dir: &Path, subject_name: &str, timestamp: &DateTime<Local>) -> PathBuf {
    output_dir.join(format!(
        "{}_{}.docx",
        timestamp.format("%Y%m%d_%H%M%S"),
        subject_name
    ))
}

/// Render `blocks` to a DOCX file at `path`.
///
/// The file is written to a temporary sibling first and renamed into
/// place, so a failed render never leaves a truncated document behind.
pub async fn render_docx(blocks: Vec<Block>, path: &Path) -> Result<(), ReportError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || render_docx_blocking(&blocks, &path))
        .await
        .map_err(|e| ReportError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_docx_blocking(blocks: &[Block], path: &Path) -> Result<(), ReportError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| ReportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut tmp =
        tempfile::NamedTempFile::new_in(&dir).map_err(|e| ReportError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    build_document(blocks)
        .build()
        .pack(&mut tmp)
        .map_err(|e| ReportError::RenderFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    tmp.persist(path)
        .map_err(|e| ReportError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e.error,
        })?;

    info!("DOCX written: {}", path.display());
    Ok(())
}

/// Assemble the in-memory document for `blocks`.
pub fn build_document(blocks: &[Block]) -> Docx {
    let mut docx = Docx::new()
        .page_size(PAGE_WIDTH_TWIPS, PAGE_HEIGHT_TWIPS)
        .page_margin(
            PageMargin::new()
                .top(PAGE_MARGIN_TWIPS)
                .bottom(PAGE_MARGIN_TWIPS)
                .left(PAGE_MARGIN_TWIPS)
                .right(PAGE_MARGIN_TWIPS),
        )
        .add_style(
            Style::new("Title", StyleType::Paragraph)
                .name("Title")
                .size(52)
                .bold(),
        )
        .add_style(
            Style::new("Heading1", StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
        .add_style(
            Style::new("Heading2", StyleType::Paragraph)
                .name("Heading 2")
                .size(26)
                .bold(),
        )
        .add_abstract_numbering(
            AbstractNumbering::new(BULLET_ABSTRACT_ID).add_level(
                Level::new(
                    0,
                    Start::new(1),
                    NumberFormat::new("bullet"),
                    LevelText::new("•"),
                    LevelJc::new("left"),
                )
                .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
            ),
        )
        .add_numbering(Numbering::new(BULLET_NUMBERING_ID, BULLET_ABSTRACT_ID));

    let mut tables = 0usize;
    for block in blocks {
        docx = match block {
            Block::Title(text) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(text))
                    .style("Title")
                    .align(AlignmentType::Center),
            ),
            Block::Heading { level, text } => {
                let style = if *level <= 1 { "Heading1" } else { "Heading2" };
                docx.add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text(text))
                        .style(style),
                )
            }
            Block::Table { columns, rows } => {
                tables += 1;
                docx.add_table(grid_table(columns, rows))
                    .add_paragraph(Paragraph::new())
            }
            Block::BulletItem(text) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(text))
                    .numbering(NumberingId::new(BULLET_NUMBERING_ID), IndentLevel::new(0)),
            ),
            Block::Paragraph(text) => {
                docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
            }
        };
    }
    debug!("Built document: {} blocks, {} tables", blocks.len(), tables);

    docx.add_paragraph(
        Paragraph::new()
            .add_run(Run::new().add_text(ATTRIBUTION_FOOTER).bold())
            .align(AlignmentType::Center),
    )
}

fn grid_table(columns: &[String], rows: &[Vec<String>]) -> Table {
    let header = TableRow::new(
        columns
            .iter()
            .map(|c| {
                TableCell::new().add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text(c).bold())
                        .align(AlignmentType::Center),
                )
            })
            .collect(),
    );

    let body = rows.iter().map(|row| {
        TableRow::new(
            row.iter()
                .map(|cell| {
                    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(cell)))
                })
                .collect(),
        )
    });

    Table::new(std::iter::once(header).chain(body).collect())
        .layout(TableLayoutType::Autofit)
        .width(5000, WidthType::Pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_blocks() -> Vec<Block> {
        vec![
            Block::Title("Revisão do PCN \"Tecnico em Vendas\"".into()),
            Block::Heading {
                level: 1,
                text: "2. Impacto".into(),
            },
            Block::Table {
                columns: vec!["UC".into(), "Impacto".into()],
                rows: vec![vec!["UC1".into(), "Alto".into()]],
            },
            Block::Heading {
                level: 2,
                text: "Detalhes".into(),
            },
            Block::BulletItem("Automação".into()),
            Block::Paragraph("Texto".into()),
        ]
    }

    fn document_json(blocks: &[Block]) -> serde_json::Value {
        serde_json::from_str(&build_document(blocks).json()).unwrap()
    }

    fn body(doc: &serde_json::Value) -> &Vec<serde_json::Value> {
        doc["document"]["children"].as_array().unwrap()
    }

    /// Every `{"type": kind, "data": ..}` node under `value`, in document order.
    fn nodes<'a>(value: &'a serde_json::Value, kind: &str, out: &mut Vec<&'a serde_json::Value>) {
        match value {
            serde_json::Value::Object(map) => {
                if map.get("type").and_then(|t| t.as_str()) == Some(kind) {
                    if let Some(data) = map.get("data") {
                        out.push(data);
                    }
                }
                for v in map.values() {
                    nodes(v, kind, out);
                }
            }
            serde_json::Value::Array(items) => {
                for v in items {
                    nodes(v, kind, out);
                }
            }
            _ => {}
        }
    }

    fn paragraph_text(paragraph: &serde_json::Value) -> String {
        let mut texts = Vec::new();
        nodes(paragraph, "text", &mut texts);
        texts.iter().filter_map(|t| t["text"].as_str()).collect()
    }

    fn is_centered(paragraph: &serde_json::Value) -> bool {
        paragraph["property"]["alignment"] == "center"
    }

    fn all_runs_bold(paragraph: &serde_json::Value) -> bool {
        let mut runs = Vec::new();
        nodes(paragraph, "run", &mut runs);
        !runs.is_empty() && runs.iter().all(|r| r["runProperty"]["bold"] == true)
    }

    #[test]
    fn test_title_is_centered() {
        let doc = document_json(&sample_blocks());
        let first = &body(&doc)[0];
        assert_eq!(first["type"], "paragraph");
        assert_eq!(
            paragraph_text(&first["data"]),
            "Revisão do PCN \"Tecnico em Vendas\""
        );
        assert!(is_centered(&first["data"]));
    }

    #[test]
    fn test_table_header_is_bold_and_centered() {
        let doc = document_json(&sample_blocks());
        let table = body(&doc)
            .iter()
            .find(|c| c["type"] == "table")
            .expect("table emitted");

        let mut paragraphs = Vec::new();
        nodes(&table["data"], "paragraph", &mut paragraphs);
        let texts: Vec<String> = paragraphs.iter().map(|p| paragraph_text(p)).collect();
        assert_eq!(texts, ["UC", "Impacto", "UC1", "Alto"]);

        for header in &paragraphs[..2] {
            assert!(all_runs_bold(header), "header not bold: {header}");
            assert!(is_centered(header), "header not centered: {header}");
        }
        for cell in &paragraphs[2..] {
            assert!(!all_runs_bold(cell), "body cell bold: {cell}");
            assert!(!is_centered(cell));
        }
    }

    #[test]
    fn test_footer_is_last_bold_and_centered() {
        let doc = document_json(&sample_blocks());
        let last = body(&doc).last().unwrap();
        assert_eq!(last["type"], "paragraph");
        assert_eq!(paragraph_text(&last["data"]), ATTRIBUTION_FOOTER);
        assert!(all_runs_bold(&last["data"]));
        assert!(is_centered(&last["data"]));

        let plain = body(&doc)
            .iter()
            .find(|c| paragraph_text(&c["data"]) == "Texto")
            .unwrap();
        assert!(!all_runs_bold(&plain["data"]));
    }

    #[test]
    fn test_output_path_format() {
        let ts = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            output_path(Path::new("RELATORIOS"), "Tecnico em Vendas", &ts),
            PathBuf::from("RELATORIOS/20240305_140709_Tecnico em Vendas.docx")
        );
    }

    #[tokio::test]
    async fn test_render_writes_zip_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/relatorio.docx");

        render_docx(sample_blocks(), &path).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"), "not a zip container");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path() != path)
            .collect();
        assert!(leftovers.is_empty(), "temporary file left behind");
    }

    #[tokio::test]
    async fn test_render_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vazio.docx");
        render_docx(Vec::new(), &path).await.unwrap();
        assert!(path.exists());
    }
}
