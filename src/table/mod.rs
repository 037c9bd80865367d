//! Tabular data read from spreadsheets
//!
//! A `Table` is a header row plus typed data rows. Binding it to a
//! reconciliation (`BoundTable`) lets callers read values by logical field
//! instead of by whatever the header happens to say.

pub mod loader;

use crate::error::{ReconError, Result};
use chrono::NaiveDate;
use docrecon_common::{Reconciler, Reconciliation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub use loader::{load_grid, load_table, read_bytes, sheet_names, LoadOptions, SheetSelector};

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// Blank cells, whitespace-only text and literal "nan" count as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => {
                let t = s.trim();
                t.is_empty() || t.eq_ignore_ascii_case("nan")
            }
            _ => false,
        }
    }

    /// Numeric view; text is parsed, anything else that is not a number is None.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Trimmed text view; blank cells give an empty string.
    pub fn as_text(&self) -> String {
        if self.is_blank() {
            String::new()
        } else {
            self.to_string().trim().to_string()
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
        }
    }
}

/// Header row plus data rows of one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub sheet: String,
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Rows shorter than the header are padded with empty cells.
    pub fn new(sheet: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width.max(row.len()), CellValue::Empty);
                row
            })
            .collect();
        Self {
            sheet: sheet.into(),
            headers,
            rows,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header, compared verbatim.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Reconcile the headers against logical fields. Unresolved fields are
    /// kept in the binding for the caller to inspect.
    pub fn bind<F: AsRef<str>>(&self, reconciler: &Reconciler, expected: &[F]) -> BoundTable<'_> {
        let reconciliation = reconciler.reconcile(self.headers.as_slice(), expected);
        let columns = reconciliation
            .matches()
            .iter()
            .map(|m| (m.field.clone(), m.label_index))
            .collect();

        BoundTable {
            table: self,
            columns,
            reconciliation,
        }
    }

    /// Like [`Table::bind`] but every expected field must resolve.
    pub fn require<F: AsRef<str>>(&self, reconciler: &Reconciler, expected: &[F]) -> Result<BoundTable<'_>> {
        let bound = self.bind(reconciler, expected);
        if !bound.reconciliation.is_complete() {
            return Err(ReconError::MissingColumns {
                sheet: self.sheet.clone(),
                columns: bound.reconciliation.unresolved().to_vec(),
            });
        }
        Ok(bound)
    }
}

/// A table whose columns are addressed by logical field.
#[derive(Debug, Clone)]
pub struct BoundTable<'a> {
    table: &'a Table,
    columns: HashMap<String, usize>,
    reconciliation: Reconciliation,
}

impl<'a> BoundTable<'a> {
    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn reconciliation(&self) -> &Reconciliation {
        &self.reconciliation
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [CellValue]> {
        self.table.rows.iter().map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }

    pub fn value<'r>(&self, row: &'r [CellValue], field: &str) -> Option<&'r CellValue> {
        self.columns.get(field).and_then(|idx| row.get(*idx))
    }

    /// Trimmed text of a field; unknown fields and blank cells give "".
    pub fn text(&self, row: &[CellValue], field: &str) -> String {
        self.value(row, field).map(CellValue::as_text).unwrap_or_default()
    }

    pub fn number(&self, row: &[CellValue], field: &str) -> Option<f64> {
        self.value(row, field).and_then(CellValue::as_number)
    }

    /// Distinct non-blank values of a field, sorted.
    pub fn distinct(&self, field: &str) -> Vec<String> {
        self.rows()
            .map(|row| self.text(row, field))
            .filter(|v| !v.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
