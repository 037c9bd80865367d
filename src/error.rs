use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Header row with '{keyword}' not found in sheet '{sheet}'")]
    HeaderNotFound { keyword: String, sheet: String },

    #[error("Columns not found in sheet '{sheet}':\n- {}", .columns.join("\n- "))]
    MissingColumns { sheet: String, columns: Vec<String> },

    #[error("Workbook read error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Word document error: {0}")]
    Docx(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] docrecon_common::Error),
}

pub type Result<T> = std::result::Result<T, ReconError>;
