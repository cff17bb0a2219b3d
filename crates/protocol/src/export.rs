use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node of the dependency graph in export form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphNodeExport {
    /// Canonical address, e.g. "Sheet1!A1"
    pub id: String,
    pub sheet: String,
    pub column: String,
    pub row: u32,
    pub has_formula: bool,
    pub formula: Option<String>,
    pub value: Option<String>,
    pub is_input: bool,
    pub is_output: bool,
}

/// A directed dependency edge in export form (source is the referenced
/// cell, target is the formula cell referencing it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphEdgeExport {
    pub source: String,
    pub target: String,
    /// "static" or "dynamic"
    pub kind: String,
}

/// Structural metrics of the finished graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    /// `edges / (nodes * (nodes - 1))` for directed simple graphs
    pub density: f64,
    pub is_acyclic: bool,
    pub input_nodes: usize,
    pub output_nodes: usize,
    /// Mean total degree (in + out)
    pub avg_degree: f64,
}

/// Flat export of the full dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphExport {
    pub nodes: Vec<GraphNodeExport>,
    pub edges: Vec<GraphEdgeExport>,
    pub metrics: GraphMetrics,
}

/// Kind of a detected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    BrokenReference,
    UnusedFormula,
    CircularReference,
    HardCodedOverwrite,
    MissingDependency,
}

impl AnomalyKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BrokenReference => "broken_reference",
            Self::UnusedFormula => "unused_formula",
            Self::CircularReference => "circular_reference",
            Self::HardCodedOverwrite => "hard_coded_overwrite",
            Self::MissingDependency => "missing_dependency",
        }
    }
}

/// Severity of a detected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Wire name of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// One finding produced by an anomaly detection pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub cell_address: String,
    pub sheet: String,
    pub description: String,
    pub suggestion: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Anomaly counts broken down by severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Full anomaly summary: counts plus the findings themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyReport {
    pub total_count: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_severity: SeverityCounts,
    pub anomalies: Vec<Anomaly>,
}

/// One ranked cost driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostDriver {
    pub cell_address: String,
    pub sheet: String,
    pub column: String,
    pub row: u32,
    pub centrality_score: f64,
    pub impact_score: f64,
    pub dependent_count: usize,
    pub cluster_id: Option<usize>,
    pub description: String,
}

impl CostDriver {
    /// Ranking key: centrality and impact, equally weighted.
    #[must_use]
    pub fn combined_score(&self) -> f64 {
        self.centrality_score + self.impact_score
    }
}

/// Summary of one undirected cluster of the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub node_count: usize,
    pub sheets: Vec<String>,
    /// First few member addresses, for orientation
    pub sample_nodes: Vec<String>,
}

/// Cost-driver summary: the ranked list plus derived views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostDriverReport {
    pub total_drivers: usize,
    pub top_drivers: Vec<CostDriver>,
    pub input_drivers: Vec<CostDriver>,
    pub cluster_count: usize,
    pub cluster_summary: Vec<ClusterSummary>,
}

/// Workbook-level counts reported alongside the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub formula_count: usize,
    pub input_count: usize,
    pub sheet_count: usize,
}

/// The complete result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub graph: GraphExport,
    pub anomalies: Option<AnomalyReport>,
    pub cost_drivers: Option<CostDriverReport>,
    pub summary: AnalysisSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_anomaly_kind_wire_names() {
        assert_eq!(AnomalyKind::BrokenReference.as_str(), "broken_reference");
        assert_eq!(
            serde_json::to_string(&AnomalyKind::HardCodedOverwrite).unwrap(),
            "\"hard_coded_overwrite\""
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_graph_export_round_trip() {
        let export = GraphExport {
            nodes: vec![GraphNodeExport {
                id: "Sheet1!A1".to_string(),
                sheet: "Sheet1".to_string(),
                column: "A".to_string(),
                row: 1,
                has_formula: false,
                formula: None,
                value: None,
                is_input: true,
                is_output: true,
            }],
            edges: Vec::new(),
            metrics: GraphMetrics {
                node_count: 1,
                edge_count: 0,
                density: 0.0,
                is_acyclic: true,
                input_nodes: 1,
                output_nodes: 1,
                avg_degree: 0.0,
            },
        };

        let json = serde_json::to_string(&export).unwrap();
        let back: GraphExport = serde_json::from_str(&json).unwrap();
        assert_eq!(export, back);
    }
}
