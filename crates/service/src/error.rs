use thiserror::Error;

/// Result type for analysis orchestration.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that abort an analysis run.
///
/// Only conditions making the graph unconstructable belong here;
/// everything downstream degrades gracefully and is still reported in
/// the result.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The workbook produced no sheets at all
    #[error("workbook contains no sheets")]
    EmptyWorkbook,
}
