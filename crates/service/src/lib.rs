//! # Cellgraph Service
//!
//! Orchestrates one analysis run: build the dependency graph, detect
//! anomalies, rank cost drivers, and assemble the combined report,
//! emitting coarse progress milestones along the way.
//!
//! Each run is pure with respect to its inputs and retains no
//! references into them, so independent analyses may execute fully in
//! parallel. Within one run the pipeline order is a strict data
//! dependency: the graph must be complete before either downstream
//! stage reads it.
//!
//! The crate also provides [`JobStore`], the explicit job-id → state
//! table that frontends poll while an analysis runs in the background.

mod error;
mod jobs;
mod pipeline;

pub use error::{Result, ServiceError};
pub use jobs::{Job, JobStore};
pub use pipeline::{analyze_sheets, AnalysisOptions};
