//! Output renderers: plain text, workbooks and filled templates

pub mod template;
pub mod text;
pub mod xlsx;

pub use template::{fill, Filled, Record, Template};
pub use xlsx::{write_workbook, SheetOut};
