use crate::components::connected_components;
use crate::pagerank::{pagerank, PAGERANK_DAMPING};
use cellgraph_graph::{CellGraph, CellNode, NodeId};
use cellgraph_protocol::{ClusterSummary, CostDriver, CostDriverReport};
use std::collections::{HashSet, VecDeque};

/// Number of cluster member addresses included as samples in summaries.
const CLUSTER_SAMPLE_SIZE: usize = 5;

/// Number of input drivers included in the report.
const INPUT_DRIVER_LIMIT: usize = 10;

/// Identifies the cells with the most leverage over the workbook.
///
/// Cost drivers combine two per-node metrics with equal weight:
/// PageRank centrality over incoming references, and the fraction of
/// the graph transitively downstream of the node. Clusters come from
/// the undirected projection and are reported alongside.
///
/// The analyzer never mutates the graph; it may be run concurrently
/// with other read-only consumers of the same snapshot.
pub struct CostDriverAnalyzer<'a> {
    graph: &'a CellGraph,
    drivers: Vec<CostDriver>,
    clusters: Vec<usize>,
}

impl<'a> CostDriverAnalyzer<'a> {
    pub fn new(graph: &'a CellGraph) -> Self {
        Self {
            graph,
            drivers: Vec::new(),
            clusters: Vec::new(),
        }
    }

    /// Compute all metrics and return the top `top_n` drivers by
    /// combined score. The full ranked set remains queryable through
    /// [`CostDriverAnalyzer::drivers`] afterwards.
    pub fn analyze(&mut self, top_n: usize) -> Vec<CostDriver> {
        log::info!("starting cost driver analysis");

        let centrality = self.centrality_scores();
        self.clusters = connected_components(self.graph);
        let node_count = self.graph.node_count();

        let mut drivers = Vec::with_capacity(node_count);
        for (id, node) in self.graph.nodes() {
            let dependent_count = self.descendant_count(id);
            let impact_score = if node_count > 0 {
                dependent_count as f64 / node_count as f64
            } else {
                0.0
            };
            drivers.push(CostDriver {
                cell_address: node.address.clone(),
                sheet: node.sheet.clone(),
                column: node.column.clone(),
                row: node.row,
                centrality_score: centrality[id.index()],
                impact_score,
                dependent_count,
                cluster_id: self.clusters.get(id.index()).copied(),
                description: describe(node, dependent_count),
            });
        }

        // Stable sort keeps insertion order on ties, which makes the
        // ranking deterministic for identical input.
        drivers.sort_by(|a, b| {
            b.combined_score()
                .partial_cmp(&a.combined_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.drivers = drivers;
        log::info!(
            "cost driver analysis complete: {} drivers ranked",
            self.drivers.len()
        );
        self.drivers.iter().take(top_n).cloned().collect()
    }

    /// PageRank centrality, falling back to normalized out-degree when
    /// the iteration degenerates. The fallback is always in `[0, 1]`.
    fn centrality_scores(&self) -> Vec<f64> {
        match pagerank(self.graph, PAGERANK_DAMPING) {
            Some(scores) => scores,
            None => {
                log::warn!("falling back to out-degree centrality");
                let n = self.graph.node_count();
                (0..n)
                    .map(|i| self.graph.out_degree(NodeId::from_index(i)) as f64 / n as f64)
                    .collect()
            }
        }
    }

    /// Number of nodes transitively downstream of `start`.
    fn descendant_count(&self, start: NodeId) -> usize {
        let mut seen: HashSet<NodeId> = HashSet::from([start]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([start]);
        let mut count = 0;
        while let Some(current) = queue.pop_front() {
            for &succ in self.graph.successors(current) {
                if seen.insert(succ) {
                    count += 1;
                    queue.push_back(succ);
                }
            }
        }
        count
    }

    /// Full ranked driver list from the last [`CostDriverAnalyzer::analyze`] run.
    #[must_use]
    pub fn drivers(&self) -> &[CostDriver] {
        &self.drivers
    }

    /// Ranked drivers that are input nodes (raw assumptions).
    #[must_use]
    pub fn input_drivers(&self) -> Vec<CostDriver> {
        self.drivers
            .iter()
            .filter(|d| {
                self.graph
                    .find_node(&d.cell_address)
                    .and_then(|id| self.graph.node(id))
                    .is_some_and(|n| n.is_input)
            })
            .cloned()
            .collect()
    }

    /// Ranked drivers on one sheet.
    #[must_use]
    pub fn drivers_for_sheet(&self, sheet: &str) -> Vec<CostDriver> {
        self.drivers
            .iter()
            .filter(|d| d.sheet == sheet)
            .cloned()
            .collect()
    }

    /// Per-cluster membership summary.
    #[must_use]
    pub fn cluster_summary(&self) -> Vec<ClusterSummary> {
        let cluster_count = self.clusters.iter().map(|&id| id + 1).max().unwrap_or(0);
        let mut summaries: Vec<ClusterSummary> = (0..cluster_count)
            .map(|cluster_id| ClusterSummary {
                cluster_id,
                node_count: 0,
                sheets: Vec::new(),
                sample_nodes: Vec::new(),
            })
            .collect();

        for (id, node) in self.graph.nodes() {
            let Some(&cluster_id) = self.clusters.get(id.index()) else {
                continue;
            };
            let summary = &mut summaries[cluster_id];
            summary.node_count += 1;
            if !summary.sheets.contains(&node.sheet) {
                summary.sheets.push(node.sheet.clone());
            }
            if summary.sample_nodes.len() < CLUSTER_SAMPLE_SIZE {
                summary.sample_nodes.push(node.address.clone());
            }
        }
        summaries
    }

    /// Flat report: the ranked list truncated to `top_n`, the input-only
    /// subset, and the cluster summary.
    #[must_use]
    pub fn export(&self, top_n: usize) -> CostDriverReport {
        let mut input_drivers = self.input_drivers();
        input_drivers.truncate(INPUT_DRIVER_LIMIT);
        CostDriverReport {
            total_drivers: self.drivers.len(),
            top_drivers: self.drivers.iter().take(top_n).cloned().collect(),
            input_drivers,
            cluster_count: self.clusters.iter().map(|&id| id + 1).max().unwrap_or(0),
            cluster_summary: self.cluster_summary(),
        }
    }
}

/// Human-readable role of a node, annotated with its downstream reach.
fn describe(node: &CellNode, dependent_count: usize) -> String {
    if node.is_input {
        format!("Input parameter affecting {dependent_count} cells")
    } else if node.has_formula {
        format!("Calculated value affecting {dependent_count} cells")
    } else {
        format!("Value affecting {dependent_count} cells")
    }
}
