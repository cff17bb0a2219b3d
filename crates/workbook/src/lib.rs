//! # Cellgraph Workbook
//!
//! Turns an `.xlsx`/`.xlsm` file into per-sheet cell records.
//!
//! The reader walks the cached cell values and the formula layer of
//! each worksheet and merges them, so a formula cell carries both its
//! last calculated value and the formula text. Only populated cells are
//! emitted.

mod error;
mod reader;

pub use error::{Result, WorkbookError};
pub use reader::{column_letters, read_workbook, validate_extension, SUPPORTED_EXTENSIONS};
