//! # Cellgraph Extract
//!
//! Recovers cell, range, and cross-sheet references from spreadsheet
//! formula text without evaluating the formula.
//!
//! The extractor is best-effort by contract: text that parses into no
//! reference yields an empty dependency set, never an error. Matching
//! runs in strict precedence order so that a span is claimed by at most
//! one pattern:
//!
//! ```text
//! Formula text
//!     │
//!     ├──> Cross-sheet references ('Sheet Name'!A1, Sheet2!A1:B10)
//!     │      └─ matched spans removed from the text
//!     ├──> Same-sheet ranges (A1:B10, corners only)
//!     │      └─ matched spans removed from the text
//!     ├──> Bare cell references ($A$1), validity-filtered
//!     │
//!     └──> Function names, collected from the original text
//! ```
//!
//! Ranges contribute their two corner addresses only; interior cells are
//! never materialized.

mod address;
mod extractor;

pub use address::{CellAddress, MAX_COLUMN_LETTERS, MAX_ROW};
pub use extractor::{extract, resolve_dynamic, ExtractedRefs, DYNAMIC_FUNCTIONS};
