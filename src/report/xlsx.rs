//! Workbook output (rust_xlsxwriter)

use crate::error::Result;
use crate::table::CellValue;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;
use tracing::info;

/// One output sheet: a header row followed by data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetOut {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetOut {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the workbook in memory.
pub fn workbook_buffer(sheets: &[SheetOut]) -> Result<Vec<u8>> {
    let mut workbook = build(sheets)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn write_workbook(path: &Path, sheets: &[SheetOut]) -> Result<()> {
    let mut workbook = build(sheets)?;
    workbook.save(path)?;
    info!("wrote {} sheets to {}", sheets.len(), path.display());
    Ok(())
}

fn build(sheets: &[SheetOut]) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, header)?;
        }

        for (r, row) in sheet.rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                write_cell(worksheet, r as u32 + 1, col as u16, value)?;
            }
        }
    }

    Ok(workbook)
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Empty => {}
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Text(_) | CellValue::Date(_) => {
            worksheet.write_string(row, col, value.to_string())?;
        }
    }
    Ok(())
}
