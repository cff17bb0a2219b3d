//! # Cellgraph Protocol
//!
//! Shared wire types for the cellgraph pipeline.
//!
//! Every structure in this crate is flat and JSON-serializable so that
//! frontends in any language can consume analysis output without coupling
//! to the internal graph representation. The crates that do the actual
//! work (`cellgraph-graph`, `cellgraph-analytics`, `cellgraph-anomaly`)
//! produce these types at their export boundaries.

mod export;
mod job;
mod records;

pub use export::{
    AnalysisReport, AnalysisSummary, Anomaly, AnomalyKind, AnomalyReport, ClusterSummary,
    CostDriver, CostDriverReport, GraphEdgeExport, GraphExport, GraphMetrics, GraphNodeExport,
    Severity, SeverityCounts,
};
pub use job::{AnalysisResponse, JobState, JobStatusResponse};
pub use records::{CellRecord, SheetData};
