//! Table text from Word documents (docx-rs)

use crate::error::{ReconError, Result};
use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

/// Rows of cell texts, one entry per table
pub type TableText = Vec<Vec<String>>;

/// Text of every top-level table in the document, in document order.
pub fn read_tables(bytes: &[u8]) -> Result<Vec<TableText>> {
    let docx = read_docx(bytes).map_err(|e| ReconError::Docx(e.to_string()))?;

    let tables = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Table(table) => Some(table_text(table)),
            _ => None,
        })
        .collect();

    Ok(tables)
}

fn table_text(table: &Table) -> TableText {
    table
        .rows
        .iter()
        .filter_map(|row| match row {
            TableChild::TableRow(row) => Some(row),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .map(|row| {
            row.cells
                .iter()
                .filter_map(|cell| match cell {
                    TableRowChild::TableCell(cell) => Some(cell),
                    #[allow(unreachable_patterns)]
                    _ => None,
                })
                .map(|cell| {
                    let paragraphs: Vec<String> = cell
                        .children
                        .iter()
                        .filter_map(|content| match content {
                            TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                            _ => None,
                        })
                        .collect();
                    // Paragraphs inside a cell are separated by newlines
                    paragraphs.join("\n").trim().to_string()
                })
                .collect()
        })
        .collect()
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for node in &run.children {
                match node {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

/// Single-table document, for tests that need a real .docx
#[cfg(test)]
pub(crate) fn build_docx(rows: &[&[&str]]) -> Vec<u8> {
    use docx_rs::{Docx, Run, TableCell, TableRow};
    use std::io::Cursor;

    let rows = rows
        .iter()
        .map(|cells| {
            TableRow::new(
                cells
                    .iter()
                    .map(|c| TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(*c))))
                    .collect(),
            )
        })
        .collect();
    let mut buf = Cursor::new(Vec::new());
    Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Formulário")))
        .add_table(Table::new(rows))
        .build()
        .pack(&mut buf)
        .unwrap();
    buf.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_tables_keeps_cell_text() {
        let bytes = build_docx(&[&["TRL Inicial:", " TRL 3 "], &["ODS", "9", "extra"]]);
        let tables = read_tables(&bytes).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0][0], vec!["TRL Inicial:".to_string(), "TRL 3".to_string()]);
        assert_eq!(tables[0][1].len(), 3);
    }

    #[test]
    fn test_not_a_docx() {
        assert!(matches!(read_tables(b"plain text"), Err(ReconError::Docx(_))));
    }
}
