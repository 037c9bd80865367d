//! Spreadsheet reading with calamine
//!
//! Everything works from an in-memory byte buffer so the same bytes can be
//! fingerprinted for the cache and parsed without touching the disk twice.

use super::{CellValue, Table};
use crate::error::{ReconError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{Days, NaiveDate};
use docrecon_common::HeaderSpec;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// How to find the header row of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub header: HeaderSpec,
    /// Rows searched when the header is located by keyword
    pub scan_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            header: HeaderSpec::Row(0),
            scan_rows: 20,
        }
    }
}

impl LoadOptions {
    pub fn row(row: usize) -> Self {
        Self {
            header: HeaderSpec::Row(row),
            ..Self::default()
        }
    }

    pub fn keyword(keyword: impl Into<String>, scan_rows: usize) -> Self {
        Self {
            header: HeaderSpec::Keyword(keyword.into()),
            scan_rows,
        }
    }

    /// Stable text form, used as part of cache keys.
    pub fn tag(&self) -> String {
        match &self.header {
            HeaderSpec::Row(row) => format!("row:{}", row),
            HeaderSpec::Keyword(keyword) => format!("keyword:{}:{}", keyword, self.scan_rows),
        }
    }
}

/// Which sheet to read: an exact name, or the first sheet starting with a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Exact(String),
    Prefix(String),
}

impl SheetSelector {
    /// `"Timesheet_*"` selects by prefix, anything else by exact name.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => SheetSelector::Prefix(prefix.to_string()),
            None => SheetSelector::Exact(pattern.to_string()),
        }
    }

    pub fn resolve(&self, names: &[String]) -> Result<String> {
        let found = match self {
            SheetSelector::Exact(name) => names.iter().find(|n| *n == name),
            SheetSelector::Prefix(prefix) => names.iter().find(|n| n.starts_with(prefix.as_str())),
        };
        found.cloned().ok_or_else(|| ReconError::SheetNotFound(self.to_string()))
    }
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::Exact(name) => write!(f, "{}", name),
            SheetSelector::Prefix(prefix) => write!(f, "{}*", prefix),
        }
    }
}

/// Read a whole file into memory.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(ReconError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

pub fn sheet_names(bytes: &[u8]) -> Result<Vec<String>> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    Ok(workbook.sheet_names())
}

/// Every row of a sheet, anchored at A1 (leading empty rows and columns kept).
pub fn load_grid(bytes: &[u8], sheet: &str) -> Result<Vec<Vec<CellValue>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    if !workbook.sheet_names().iter().any(|n| n == sheet) {
        return Err(ReconError::SheetNotFound(sheet.to_string()));
    }
    let range = workbook.worksheet_range(sheet)?;
    Ok(range_to_grid(&range))
}

/// Read a sheet as a header row plus data rows.
pub fn load_table(bytes: &[u8], sheet: &str, options: &LoadOptions) -> Result<Table> {
    let grid = load_grid(bytes, sheet)?;
    let header_row = locate_header(&grid, sheet, options)?;
    debug!("sheet '{}': header at row {}", sheet, header_row);

    let headers: Vec<String> = grid
        .get(header_row)
        .map(|row| row.iter().map(clean_header).collect())
        .unwrap_or_default();

    let rows: Vec<Vec<CellValue>> = grid
        .into_iter()
        .skip(header_row + 1)
        .filter(|row| row.iter().any(|c| !c.is_blank()))
        .collect();

    debug!("sheet '{}': {} columns, {} rows", sheet, headers.len(), rows.len());
    Ok(Table::new(sheet, headers, rows))
}

fn locate_header(grid: &[Vec<CellValue>], sheet: &str, options: &LoadOptions) -> Result<usize> {
    match &options.header {
        HeaderSpec::Row(row) => Ok(*row),
        HeaderSpec::Keyword(keyword) => {
            let wanted = keyword.trim().to_uppercase();
            grid.iter()
                .take(options.scan_rows)
                .position(|row| {
                    row.iter()
                        .any(|cell| cell.to_string().trim().to_uppercase() == wanted)
                })
                .ok_or_else(|| ReconError::HeaderNotFound {
                    keyword: keyword.clone(),
                    sheet: sheet.to_string(),
                })
        }
    }
}

fn clean_header(cell: &CellValue) -> String {
    if matches!(cell, CellValue::Empty) {
        return String::new();
    }
    WHITESPACE_RUN
        .replace_all(&cell.to_string(), " ")
        .trim()
        .to_string()
}

fn range_to_grid(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];

    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        grid.push(cells);
    }
    grid
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => serial_to_date(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

/// Excel 1900 date system; serials below 1 are times of day, not dates.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_to_date() {
        assert_eq!(serial_to_date(45292.0), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(serial_to_date(45292.75), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(serial_to_date(0.5), None);
    }

    #[test]
    fn test_clean_header_collapses_whitespace() {
        let cell = CellValue::Text("  Sim ou\u{a0}Não?\n  (obrigatório) ".into());
        assert_eq!(clean_header(&cell), "Sim ou Não? (obrigatório)");
        assert_eq!(clean_header(&CellValue::Empty), "");
    }

    #[test]
    fn test_locate_header_by_keyword() {
        let grid = vec![
            vec![CellValue::Text("Relatório".into())],
            vec![],
            vec![CellValue::Empty, CellValue::Text(" linha de pesquisa ".into())],
        ];
        let options = LoadOptions::keyword("LINHA DE PESQUISA", 20);
        assert_eq!(locate_header(&grid, "RH", &options).unwrap(), 2);

        let narrow = LoadOptions::keyword("LINHA DE PESQUISA", 2);
        assert!(matches!(
            locate_header(&grid, "RH", &narrow),
            Err(ReconError::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn test_sheet_selector() {
        let names = vec!["Resumo 2024".to_string(), "Timesheet_Jan".to_string()];
        assert_eq!(SheetSelector::parse("Timesheet_*").resolve(&names).unwrap(), "Timesheet_Jan");
        assert_eq!(SheetSelector::parse("Resumo 2024").resolve(&names).unwrap(), "Resumo 2024");
        assert!(matches!(
            SheetSelector::parse("Resumo").resolve(&names),
            Err(ReconError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_options_tag() {
        assert_eq!(LoadOptions::row(9).tag(), "row:9");
        assert_eq!(LoadOptions::keyword("X", 5).tag(), "keyword:X:5");
    }
}
