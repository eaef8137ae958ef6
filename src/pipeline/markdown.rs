//! Markdown block parser for assembled reports.
//!
//! Reports use a small markdown subset: `#`/`##`/`###` headings, `- `
//! bullets, pipe tables and plain paragraphs. [`parse_blocks`] turns that
//! text into typed [`Block`]s in one top-to-bottom pass. It is total: any
//! input, however malformed, yields a block list.
//!
//! ## Tables
//!
//! A table starts at a line containing `|` whose next line also contains
//! `|` and a dash run (`---`, or the `—--` / `-—-` variants models produce
//! when they mix em-dashes in). Every following line that contains `|`
//! belongs to it. [`decode_table`] then squares the rows off against the
//! header: short rows are padded with empty cells, long rows truncated.

use once_cell::sync::Lazy;
use regex::Regex;

/// One structural element of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `# text`
    Title(String),
    /// `## text` (level 1) or `### text` (level 2).
    Heading { level: u8, text: String },
    /// `- text`
    BulletItem(String),
    /// Every row has exactly `columns.len()` cells.
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Paragraph(String),
}

const CELL_SEPARATOR: char = '|';

static RE_ROW_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"---|—--|-—-").unwrap());

/// A header/body separator line: contains `|` and a dash run.
fn is_separator_line(line: &str) -> bool {
    line.contains(CELL_SEPARATOR) && RE_ROW_SEPARATOR.is_match(line)
}

fn has_cell_separator(line: &str) -> bool {
    line.contains(CELL_SEPARATOR)
}

/// Parse report markdown into blocks.
///
/// Lines are trimmed before matching; blank lines produce no block.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(rest) = line.strip_prefix("# ") {
            blocks.push(Block::Title(rest.to_string()));
            i += 1;
        } else if let Some(rest) = line.strip_prefix("## ") {
            blocks.push(Block::Heading {
                level: 1,
                text: rest.to_string(),
            });
            i += 1;
        } else if let Some(rest) = line.strip_prefix("### ") {
            blocks.push(Block::Heading {
                level: 2,
                text: rest.to_string(),
            });
            i += 1;
        } else if has_cell_separator(line)
            && lines.get(i + 1).is_some_and(|next| is_separator_line(next))
        {
            let end = lines[i..]
                .iter()
                .position(|l| !has_cell_separator(l))
                .map_or(lines.len(), |offset| i + offset);
            let span = &lines[i..end];

            let (columns, rows) = decode_table(&span.join("\n"));
            if columns.is_empty() || rows.is_empty() {
                blocks.extend(span.iter().map(|l| Block::Paragraph(l.to_string())));
            } else {
                blocks.push(Block::Table { columns, rows });
            }
            i = end;
        } else if let Some(rest) = line.strip_prefix("- ") {
            blocks.push(Block::BulletItem(rest.to_string()));
            i += 1;
        } else if !line.is_empty() {
            blocks.push(Block::Paragraph(line.to_string()));
            i += 1;
        } else {
            i += 1;
        }
    }

    blocks
}

/// Decode a pipe table into `(columns, rows)`.
///
/// The header is the first line followed by a separator line; its non-empty
/// cells are the columns. Rows are the `|` lines after that separator,
/// with the single leading and trailing empty cell dropped, then padded or
/// truncated to the column count. Further separator lines and rows with no
/// content are skipped. Without a header both vectors are empty.
pub fn decode_table(text: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let Some(header_idx) = lines
        .windows(2)
        .position(|pair| has_cell_separator(pair[0]) && is_separator_line(pair[1]))
    else {
        return (Vec::new(), Vec::new());
    };

    let columns: Vec<String> = lines[header_idx]
        .split(CELL_SEPARATOR)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    let rows = lines[header_idx + 2..]
        .iter()
        .filter(|l| has_cell_separator(l) && !is_separator_line(l))
        .map(|l| split_row(l))
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(|mut cells| {
            cells.resize(columns.len(), String::new());
            cells
        })
        .collect();

    (columns, rows)
}

fn split_row(line: &str) -> Vec<String> {
    let mut cells: Vec<&str> = line.split(CELL_SEPARATOR).map(str::trim).collect();
    if cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    if cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    cells.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_short_row_is_padded() {
        let (columns, rows) = decode_table("| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |\n");
        assert_eq!(columns, strings(&["A", "B"]));
        assert_eq!(rows, vec![strings(&["1", "2"]), strings(&["3", ""])]);
    }

    #[test]
    fn test_long_row_is_truncated() {
        let (columns, rows) = decode_table("| A | B |\n|---|---|\n| 1 | 2 | 3 | 4 |");
        assert_eq!(columns.len(), 2);
        assert_eq!(rows, vec![strings(&["1", "2"])]);
    }

    #[test]
    fn test_inner_empty_cells_keep_their_position() {
        let (_, rows) = decode_table("| UC | Antes | Depois |\n|---|---|---|\n| UC1 |  | 60h |");
        assert_eq!(rows, vec![strings(&["UC1", "", "60h"])]);
    }

    #[test]
    fn test_rows_without_outer_pipes() {
        let (columns, rows) = decode_table("A | B\n---|---\n1 | 2");
        assert_eq!(columns, strings(&["A", "B"]));
        assert_eq!(rows, vec![strings(&["1", "2"])]);
    }

    #[test]
    fn test_em_dash_separator_variants() {
        for sep in ["|—--|—--|", "|-—-|-—-|"] {
            let text = format!("| A | B |\n{sep}\n| 1 | 2 |");
            let (columns, rows) = decode_table(&text);
            assert_eq!(columns.len(), 2, "separator {sep}");
            assert_eq!(rows.len(), 1, "separator {sep}");
        }
    }

    #[test]
    fn test_mid_table_separator_and_empty_rows_skipped() {
        let (_, rows) = decode_table("| A |\n|---|\n| 1 |\n|---|\n|   |\n| 2 |");
        assert_eq!(rows, vec![strings(&["1"]), strings(&["2"])]);
    }

    #[test]
    fn test_no_header_decodes_to_nothing() {
        let (columns, rows) = decode_table("| A | B |\n| 1 | 2 |");
        assert!(columns.is_empty());
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_headings_bullets_paragraphs() {
        let text = "# Revisão do PCN \"X\"\n\n## 1. Cabeçalho\n### Nome do curso\n- item um\n  Texto livre  \n\n";
        assert_eq!(
            parse_blocks(text),
            vec![
                Block::Title("Revisão do PCN \"X\"".into()),
                Block::Heading {
                    level: 1,
                    text: "1. Cabeçalho".into()
                },
                Block::Heading {
                    level: 2,
                    text: "Nome do curso".into()
                },
                Block::BulletItem("item um".into()),
                Block::Paragraph("Texto livre".into()),
            ]
        );
    }

    #[test]
    fn test_parse_table_consumes_whole_span() {
        let text = "## 2. Impacto\n| UC | Impacto |\n|---|---|\n| UC1 | Alto |\n| UC2 | Baixo |\nDepois";
        let blocks = parse_blocks(text);
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[1],
            Block::Table {
                columns: strings(&["UC", "Impacto"]),
                rows: vec![strings(&["UC1", "Alto"]), strings(&["UC2", "Baixo"])],
            }
        );
        assert_eq!(blocks[2], Block::Paragraph("Depois".into()));
    }

    #[test]
    fn test_table_without_rows_becomes_paragraphs() {
        let blocks = parse_blocks("| A | B |\n|---|---|\nfim");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("| A | B |".into()),
                Block::Paragraph("|---|---|".into()),
                Block::Paragraph("fim".into()),
            ]
        );
    }

    #[test]
    fn test_pipe_line_without_separator_is_paragraph() {
        assert_eq!(
            parse_blocks("a | b\nc"),
            vec![Block::Paragraph("a | b".into()), Block::Paragraph("c".into())]
        );
    }

    #[test]
    fn test_parser_is_total() {
        for input in [
            "",
            "\n\n\n",
            "|",
            "||\n||",
            "| A |",
            "| A |\n|---|",
            "|---|\n|---|\n|---|",
            "#\n##\n###\n-",
            "— | —-- | -—-\n|—--|",
        ] {
            let _ = parse_blocks(input);
        }
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("   \n\t\n").is_empty());
    }

    #[test]
    fn test_bare_markers_are_paragraphs() {
        assert_eq!(
            parse_blocks("#\n-"),
            vec![Block::Paragraph("#".into()), Block::Paragraph("-".into())]
        );
    }
}
