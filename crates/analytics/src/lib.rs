//! # Cellgraph Analytics
//!
//! Read-only graph analytics over a finished dependency graph:
//! PageRank-style centrality, reachability-based impact scores, and
//! connected-component clustering, combined into a ranked list of cost
//! drivers.
//!
//! The three metrics are independent of each other and of the final
//! ranking; all of them are deterministic for identical input,
//! including tie-breaks (node insertion order).

mod analyzer;
mod components;
mod pagerank;

pub use analyzer::CostDriverAnalyzer;
pub use components::connected_components;
pub use pagerank::{pagerank, PAGERANK_DAMPING, PAGERANK_MAX_ITER, PAGERANK_TOLERANCE};
