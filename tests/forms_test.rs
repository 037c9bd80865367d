//! Form folder extraction tests
//!
//! Word documents are generated with docx-rs into a temp folder.

use docrecon::forms::{self, FormDocument, FormLayout};
use docrecon::report::template;
use docrecon::Reconciler;
use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
use std::io::Cursor;
use std::path::Path;
use tempfile::tempdir;

fn table(rows: &[&[&str]]) -> Table {
    Table::new(
        rows.iter()
            .map(|cells| {
                TableRow::new(
                    cells
                        .iter()
                        .map(|c| TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(*c))))
                        .collect(),
                )
            })
            .collect(),
    )
}

fn write_docx(path: &Path, tables: Vec<Table>) {
    let mut docx = Docx::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Formulário")));
    for t in tables {
        docx = docx.add_table(t);
    }
    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).expect("Failed to pack docx");
    std::fs::write(path, buf.into_inner()).expect("Failed to write docx");
}

fn caption_form(path: &Path, project: &str, coordinator: &str) {
    write_docx(
        path,
        vec![table(&[
            &["Nome do projeto:", project],
            &["Coordenador(a)", coordinator],
            &["Observações", ""],
        ])],
    );
}

/// Forms in a folder are read in name order; other files are ignored
#[test]
fn test_extract_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    caption_form(&dir.path().join("Projeto Beta (2).docx"), "Beta", "Bia");
    caption_form(&dir.path().join("Projeto Alfa.docx"), "Alfa", "Ana");
    std::fs::write(dir.path().join("~$Projeto Alfa.docx"), "lock").unwrap();
    std::fs::write(dir.path().join("notas.txt"), "x").unwrap();

    let records = forms::extract_folder(dir.path(), &Reconciler::default(), &["Nome do Projeto", "Coordenador", "Orçamento"])
        .expect("Failed to extract");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Projeto Alfa");
    assert_eq!(records[0].get("Nome do Projeto"), Some("Alfa"));
    assert_eq!(records[0].get("Coordenador"), Some("Ana"));
    assert_eq!(records[0].unresolved, vec!["Orçamento".to_string()]);
    assert_eq!(records[1].name, "Projeto Beta");
    assert_eq!(records[1].row(), vec!["Beta".to_string(), "Bia".to_string(), String::new()]);
}

/// A corrupt document is skipped, not fatal
#[test]
fn test_extract_folder_skips_broken_files() {
    let dir = tempdir().expect("Failed to create temp dir");
    caption_form(&dir.path().join("ok.docx"), "Alfa", "Ana");
    std::fs::write(dir.path().join("broken.docx"), "not a zip").unwrap();

    let records = forms::extract_folder(dir.path(), &Reconciler::default(), &["Nome do Projeto"]).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "ok");
}

/// Research-line layout: captioned dates and TRL digits, keyword list
#[test]
fn test_research_line_layout() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("LP Materiais.docx");

    let mut tables: Vec<Table> = Vec::new();
    tables.push(table(&[
        &["Linha", "LP Materiais"],
        &["Nome do Projeto", "Compósitos leves"],
        &["TRL Inicial:", "TRL 3 - prova de conceito"],
        &["TRL Final:", "Nível 6"],
        &["Data de início (dia/mês/ano):", "01/02/2024"],
    ]));
    for _ in 1..8 {
        tables.push(table(&[&["-"]]));
    }
    tables.push(table(&[
        &["Palavra-chave 1", "fibra"],
        &["Palavra-chave 2", " resina "],
        &["Palavra-chave 3", ""],
    ]));
    write_docx(&path, tables);

    let doc = FormDocument::open(&path).unwrap();
    let record = doc.apply(&FormLayout::research_line(), &Reconciler::default());

    assert_eq!(record.get("Linha de Pesquisa"), Some("LP Materiais"));
    assert_eq!(record.get("TRL Inicial"), Some("3"));
    assert_eq!(record.get("TRL Final"), Some("6"));
    assert_eq!(record.get("Data de início"), Some("01/02/2024"));
    assert_eq!(record.get("Palavras-chave"), Some("fibra, resina"));
    assert!(record.unresolved.contains(&"Data de término".to_string()));
    assert_eq!(record.row().len(), 24);

    let rows = template::records_from_forms(&[record], Some("#"));
    assert_eq!(rows[0][0].0, "#");
    assert_eq!(rows[0].len(), 25);
}
