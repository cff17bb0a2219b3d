use thiserror::Error;

/// Result type for workbook reading.
pub type Result<T> = std::result::Result<T, WorkbookError>;

/// Errors that can occur while decoding a workbook file.
#[derive(Error, Debug)]
pub enum WorkbookError {
    /// The file could not be opened or is not a valid workbook
    #[error("failed to open workbook: {0}")]
    Open(#[from] calamine::XlsxError),

    /// The file extension is not one the reader supports
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
}
