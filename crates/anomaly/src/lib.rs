//! # Cellgraph Anomaly
//!
//! Rule-based anomaly detection over the dependency graph and the raw
//! cell records.
//!
//! Detection is stateless: every call to [`AnomalyDetector::detect`]
//! runs all passes from scratch and returns the concatenated findings.
//! A single cell may accumulate several findings of different kinds.

mod detector;

pub use detector::{by_severity, by_sheet, AnomalyDetector, ERROR_MARKERS};
