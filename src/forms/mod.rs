//! Field extraction from form-like Word documents
//!
//! A form is a set of two-column tables: caption on the left, answer on the
//! right. Captions are indexed once per document and reconciled against the
//! logical fields the caller wants.

pub mod docx;
pub mod layout;

use crate::error::{ReconError, Result};
use docrecon_common::{LabelIndex, Reconciler};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub use layout::FormLayout;

lazy_static! {
    /// "Projeto (2)" style copy suffix added by file managers
    static ref COPY_SUFFIX: Regex = Regex::new(r"\s*\(\d+\)$").unwrap();
}

/// A parsed form document.
#[derive(Debug, Clone)]
pub struct FormDocument {
    pub name: String,
    tables: Vec<docx::TableText>,
    index: LabelIndex,
}

impl FormDocument {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let tables = docx::read_tables(bytes)?;
        Ok(Self::from_tables(name, tables))
    }

    /// Document named after its file stem, copy suffix removed.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReconError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(record_name(path), &bytes)
    }

    pub fn from_tables(name: impl Into<String>, tables: Vec<docx::TableText>) -> Self {
        let pairs = tables
            .iter()
            .flatten()
            .filter(|row| row.len() >= 2)
            .map(|row| (row[0].clone(), row[1].clone()));
        let index = LabelIndex::from_pairs(pairs);

        Self {
            name: name.into(),
            tables,
            index,
        }
    }

    pub fn index(&self) -> &LabelIndex {
        &self.index
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Positional access for forms whose layout is fixed.
    pub fn cell(&self, table: usize, row: usize, col: usize) -> Option<&str> {
        self.tables
            .get(table)
            .and_then(|t| t.get(row))
            .and_then(|r| r.get(col))
            .map(String::as_str)
    }

    /// Rows of one table; empty when the table does not exist.
    pub fn rows(&self, table: usize) -> impl Iterator<Item = &[String]> {
        self.tables
            .get(table)
            .into_iter()
            .flatten()
            .map(Vec::as_slice)
    }

    pub fn extract<F: AsRef<str>>(&self, reconciler: &Reconciler, expected: &[F]) -> FormRecord {
        let (values, unresolved) = self.index.lookup(reconciler, expected);
        if !unresolved.is_empty() {
            debug!("{}: {} fields without caption", self.name, unresolved.len());
        }

        let mut seen = HashSet::new();
        let fields = expected
            .iter()
            .map(|f| f.as_ref().to_string())
            .filter(|f| seen.insert(f.clone()))
            .collect();

        FormRecord {
            name: self.name.clone(),
            fields,
            values,
            unresolved,
        }
    }
}

/// Values pulled out of one form, keyed by logical field.
#[derive(Debug, Clone, Serialize)]
pub struct FormRecord {
    pub name: String,
    /// Requested fields in request order
    pub fields: Vec<String>,
    pub values: HashMap<String, String>,
    pub unresolved: Vec<String>,
}

impl FormRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Values in field order; missing fields are blank.
    pub fn row(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| self.get(f).unwrap_or_default().to_string())
            .collect()
    }
}

/// `.docx` files directly inside `folder`, sorted by name. Word lock files
/// (`~$...`) are skipped.
pub fn scan_forms(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ReconError::FolderNotFound(folder.display().to_string()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("docx"))
                .unwrap_or(false)
        })
        .filter(|p| {
            !p.file_name()
                .map(|n| n.to_string_lossy().starts_with("~$"))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Extract every form in `folder` in parallel. Unreadable files are logged
/// and skipped; records come back in file-name order.
pub fn extract_folder<F>(folder: &Path, reconciler: &Reconciler, expected: &[F]) -> Result<Vec<FormRecord>>
where
    F: AsRef<str> + Sync,
{
    let files = scan_forms(folder)?;
    debug!("{} forms in {}", files.len(), folder.display());

    let records = files
        .par_iter()
        .filter_map(|path| match FormDocument::open(path) {
            Ok(doc) => Some(doc.extract(reconciler, expected)),
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    Ok(records)
}

/// File stem with a trailing " (n)" copy marker removed.
pub fn record_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    COPY_SUFFIX.replace(&stem, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FormDocument {
        FormDocument::from_tables(
            "Projeto X",
            vec![
                vec![
                    vec!["Nome do Projeto:".into(), "Sensor".into()],
                    vec!["TRL Inicial:".into(), "3".into()],
                    vec!["Observações".into()],
                ],
                vec![vec!["Data de término (dia/mês/ano):".into(), "31/12/2025".into()]],
            ],
        )
    }

    #[test]
    fn test_record_name_strips_copy_suffix() {
        assert_eq!(record_name(Path::new("/x/Projeto Alfa (2).docx")), "Projeto Alfa");
        assert_eq!(record_name(Path::new("Beta.docx")), "Beta");
        assert_eq!(record_name(Path::new("Gama (v2).docx")), "Gama (v2)");
    }

    #[test]
    fn test_single_cell_rows_not_indexed() {
        let doc = sample();
        assert_eq!(doc.index().len(), 3);
        assert_eq!(doc.cell(0, 2, 0), Some("Observações"));
        assert_eq!(doc.cell(1, 0, 1), Some("31/12/2025"));
        assert_eq!(doc.cell(2, 0, 0), None);
    }

    #[test]
    fn test_extract_in_field_order() {
        let doc = sample();
        let record = doc.extract(
            &Reconciler::default(),
            &["Data de término", "Nome do Projeto", "Nome do Projeto", "Orçamento"],
        );
        assert_eq!(record.fields, vec!["Data de término", "Nome do Projeto", "Orçamento"]);
        assert_eq!(record.row(), vec!["31/12/2025", "Sensor", ""]);
        assert_eq!(record.unresolved, vec!["Orçamento".to_string()]);
    }

    #[test]
    fn test_from_real_docx() {
        let bytes = docx::build_docx(&[&["TRL Final:", "6"]]);
        let doc = FormDocument::from_bytes("f", &bytes).unwrap();
        assert_eq!(doc.index().get("trl final:"), Some("6"));
    }

    #[test]
    fn test_scan_forms_missing_folder() {
        assert!(matches!(
            scan_forms(Path::new("/nonexistent/forms")),
            Err(ReconError::FolderNotFound(_))
        ));
    }
}
