use crate::types::{CellGraph, NodeId};
use cellgraph_protocol::{GraphEdgeExport, GraphExport, GraphMetrics, GraphNodeExport};
use std::collections::{HashSet, VecDeque};

impl CellGraph {
    /// Cells that `address` depends on: direct predecessors, or the full
    /// ancestor set when `recursive`. Unknown addresses yield an empty
    /// set.
    #[must_use]
    pub fn dependencies(&self, address: &str, recursive: bool) -> HashSet<String> {
        self.neighborhood(address, recursive, false)
    }

    /// Cells depending on `address`: direct successors, or the full
    /// descendant set when `recursive`. Unknown addresses yield an empty
    /// set.
    #[must_use]
    pub fn dependents(&self, address: &str, recursive: bool) -> HashSet<String> {
        self.neighborhood(address, recursive, true)
    }

    fn neighborhood(&self, address: &str, recursive: bool, forward: bool) -> HashSet<String> {
        let Some(start) = self.find_node(address) else {
            return HashSet::new();
        };
        let ids: Vec<NodeId> = if recursive {
            self.reachable(start, forward).into_iter().collect()
        } else if forward {
            self.successors(start).to_vec()
        } else {
            self.predecessors(start).to_vec()
        };
        ids.into_iter()
            .filter_map(|id| self.node(id).map(|n| n.address.clone()))
            .collect()
    }

    /// Every node reachable from `start`, excluding `start` itself,
    /// following successors when `forward` or predecessors otherwise.
    /// Safe in the presence of cycles.
    pub(crate) fn reachable(&self, start: NodeId, forward: bool) -> HashSet<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::from([start]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let next = if forward {
                self.successors(current)
            } else {
                self.predecessors(current)
            };
            for &id in next {
                if seen.insert(id) {
                    queue.push_back(id);
                }
            }
        }
        seen.remove(&start);
        seen
    }

    /// Topological ordering of all nodes (Kahn's algorithm). Returns an
    /// empty sequence when the graph contains a cycle; the cycle itself
    /// is a structural fact surfaced by [`CellGraph::detect_cycles`] and
    /// [`CellGraph::metrics`].
    #[must_use]
    pub fn calculation_order(&self) -> Vec<String> {
        let n = self.node_count();
        let mut in_degrees: Vec<usize> = (0..n)
            .map(|i| self.in_degree(NodeId::from_index(i)))
            .collect();
        let mut queue: VecDeque<NodeId> = (0..n)
            .map(NodeId::from_index)
            .filter(|&id| in_degrees[id.index()] == 0)
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.node(id) {
                order.push(node.address.clone());
            }
            for &succ in self.successors(id) {
                in_degrees[succ.index()] -= 1;
                if in_degrees[succ.index()] == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if order.len() != n {
            log::warn!("cannot compute calculation order: graph has cycles");
            return Vec::new();
        }
        order
    }

    /// Whether the graph is free of cycles.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.node_count() == 0 || !self.calculation_order().is_empty()
    }

    /// All simple cycles, each as the sequence of addresses around the
    /// loop (without repeating the first at the end).
    ///
    /// Enumeration is exhaustive: the anomaly engine attributes a
    /// finding to every cell on every cycle. Each cycle is reported once,
    /// rooted at its lowest node index, making output order
    /// deterministic. Worst-case cost is exponential in adversarial
    /// graphs; callers bound that externally.
    #[must_use]
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let n = self.node_count();
        let mut cycles = Vec::new();
        let mut path = Vec::new();
        let mut on_path = vec![false; n];
        for start in 0..n {
            self.cycle_dfs(start, start, &mut path, &mut on_path, &mut cycles);
        }
        cycles
    }

    fn cycle_dfs(
        &self,
        start: usize,
        current: usize,
        path: &mut Vec<usize>,
        on_path: &mut [bool],
        cycles: &mut Vec<Vec<String>>,
    ) {
        path.push(current);
        on_path[current] = true;

        for &succ in self.successors(NodeId::from_index(current)) {
            let next = succ.index();
            if next == start {
                cycles.push(
                    path.iter()
                        .filter_map(|&idx| self.node(NodeId::from_index(idx)).map(|n| n.address.clone()))
                        .collect(),
                );
            } else if next > start && !on_path[next] {
                self.cycle_dfs(start, next, path, on_path, cycles);
            }
        }

        path.pop();
        on_path[current] = false;
    }

    /// Induced subgraph over `addresses`, optionally extended with the
    /// full ancestor closure of each given node first. Unknown addresses
    /// are skipped. Input/output flags are recomputed for the new edge
    /// set.
    #[must_use]
    pub fn subgraph<S: AsRef<str>>(&self, addresses: &[S], include_dependencies: bool) -> Self {
        let mut included: HashSet<NodeId> = HashSet::new();
        for address in addresses {
            let Some(id) = self.find_node(address.as_ref()) else {
                continue;
            };
            included.insert(id);
            if include_dependencies {
                included.extend(self.reachable(id, false));
            }
        }

        let mut sub = Self::new();
        for (id, node) in self.nodes() {
            if included.contains(&id) {
                sub.insert_node(node.clone());
            }
        }
        for edge in self.edges() {
            if included.contains(&edge.from) && included.contains(&edge.to) {
                let (Some(from), Some(to)) = (
                    self.node(edge.from).and_then(|n| sub.find_node(&n.address)),
                    self.node(edge.to).and_then(|n| sub.find_node(&n.address)),
                ) else {
                    continue;
                };
                sub.insert_edge(from, to, edge.kind, edge.formula_excerpt.clone());
            }
        }
        sub.recompute_io_flags();
        sub
    }

    /// Structural metrics of the finished graph.
    #[must_use]
    pub fn metrics(&self) -> GraphMetrics {
        let n = self.node_count();
        let e = self.edge_count();
        let density = if n > 1 {
            e as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        };
        let avg_degree = if n > 0 {
            2.0 * e as f64 / n as f64
        } else {
            0.0
        };
        let (mut input_nodes, mut output_nodes) = (0, 0);
        for (_, node) in self.nodes() {
            if node.is_input {
                input_nodes += 1;
            }
            if node.is_output {
                output_nodes += 1;
            }
        }
        GraphMetrics {
            node_count: n,
            edge_count: e,
            density,
            is_acyclic: self.is_acyclic(),
            input_nodes,
            output_nodes,
            avg_degree,
        }
    }

    /// Flat, JSON-serializable form of the graph: nodes and edges in
    /// insertion order plus metrics.
    #[must_use]
    pub fn export(&self) -> GraphExport {
        let nodes = self
            .nodes()
            .map(|(_, node)| GraphNodeExport {
                id: node.address.clone(),
                sheet: node.sheet.clone(),
                column: node.column.clone(),
                row: node.row,
                has_formula: node.has_formula,
                formula: node.formula.clone(),
                value: node.value.clone(),
                is_input: node.is_input,
                is_output: node.is_output,
            })
            .collect();
        let edges = self
            .edges()
            .iter()
            .filter_map(|edge| {
                let from = self.node(edge.from)?;
                let to = self.node(edge.to)?;
                Some(GraphEdgeExport {
                    source: from.address.clone(),
                    target: to.address.clone(),
                    kind: edge.kind.as_str().to_string(),
                })
            })
            .collect();
        GraphExport {
            nodes,
            edges,
            metrics: self.metrics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::GraphBuilder;
    use cellgraph_protocol::{CellRecord, SheetData};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn cell(column: &str, row: u32, value: Option<&str>, formula: Option<&str>) -> CellRecord {
        CellRecord {
            row,
            column: column.to_string(),
            value: value.map(str::to_string),
            formula: formula.map(str::to_string),
            data_type: "float".to_string(),
        }
    }

    fn build(cells: Vec<CellRecord>) -> crate::CellGraph {
        let sheets = vec![SheetData {
            name: "Sheet1".to_string(),
            cells,
            row_count: 0,
            col_count: 0,
        }];
        GraphBuilder::new().build(&sheets, false)
    }

    /// A1 → B1 → C1, A1 → C1
    fn diamond_free_chain() -> crate::CellGraph {
        build(vec![
            cell("A", 1, Some("1"), None),
            cell("B", 1, None, Some("=A1*2")),
            cell("C", 1, None, Some("=A1+B1")),
        ])
    }

    #[test]
    fn test_direct_and_recursive_dependencies() {
        let graph = diamond_free_chain();
        assert_eq!(
            graph.dependencies("Sheet1!C1", false),
            HashSet::from(["Sheet1!A1".to_string(), "Sheet1!B1".to_string()])
        );
        assert_eq!(
            graph.dependencies("Sheet1!B1", true),
            HashSet::from(["Sheet1!A1".to_string()])
        );
        assert_eq!(graph.dependencies("Sheet1!A1", true), HashSet::new());
    }

    #[test]
    fn test_direct_and_recursive_dependents() {
        let graph = diamond_free_chain();
        assert_eq!(
            graph.dependents("Sheet1!A1", true),
            HashSet::from(["Sheet1!B1".to_string(), "Sheet1!C1".to_string()])
        );
        assert_eq!(
            graph.dependents("Sheet1!B1", false),
            HashSet::from(["Sheet1!C1".to_string()])
        );
    }

    #[test]
    fn test_unknown_address_yields_empty_sets() {
        let graph = diamond_free_chain();
        assert!(graph.dependencies("Sheet1!Z99", true).is_empty());
        assert!(graph.dependents("Nope!A1", false).is_empty());
    }

    #[test]
    fn test_calculation_order_respects_dependencies() {
        let graph = diamond_free_chain();
        let order = graph.calculation_order();
        assert_eq!(order.len(), 3);
        let pos = |addr: &str| order.iter().position(|a| a == addr).unwrap();
        assert!(pos("Sheet1!A1") < pos("Sheet1!B1"));
        assert!(pos("Sheet1!B1") < pos("Sheet1!C1"));
    }

    #[test]
    fn test_cycle_empties_calculation_order() {
        let graph = build(vec![
            cell("A", 1, None, Some("=C1")),
            cell("B", 1, Some("5"), None),
            cell("C", 1, None, Some("=A1+B1")),
        ]);
        assert!(graph.calculation_order().is_empty());
        assert!(!graph.is_acyclic());
    }

    #[test]
    fn test_detect_cycles_finds_exact_membership() {
        let graph = build(vec![
            cell("A", 1, None, Some("=C1")),
            cell("B", 1, Some("5"), None),
            cell("C", 1, None, Some("=A1+B1")),
        ]);
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        let members: HashSet<&str> = cycles[0].iter().map(String::as_str).collect();
        assert_eq!(members, HashSet::from(["Sheet1!A1", "Sheet1!C1"]));
    }

    #[test]
    fn test_detect_cycles_empty_on_acyclic_graph() {
        assert!(diamond_free_chain().detect_cycles().is_empty());
    }

    #[test]
    fn test_detect_cycles_enumerates_all_simple_cycles() {
        // B1 cycles with A1 and, separately, with C1.
        let graph = build(vec![
            cell("A", 1, None, Some("=B1")),
            cell("B", 1, None, Some("=A1+C1")),
            cell("C", 1, None, Some("=B1")),
        ]);
        // Edges: B1→A1, A1→B1, C1→B1, B1→C1.
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn test_reachability_excludes_start_even_on_cycles() {
        let graph = build(vec![
            cell("A", 1, None, Some("=C1")),
            cell("C", 1, None, Some("=A1")),
        ]);
        assert_eq!(
            graph.dependents("Sheet1!A1", true),
            HashSet::from(["Sheet1!C1".to_string()])
        );
        assert_eq!(
            graph.dependencies("Sheet1!A1", true),
            HashSet::from(["Sheet1!C1".to_string()])
        );
    }

    #[test]
    fn test_subgraph_with_ancestors() {
        let graph = diamond_free_chain();
        let sub = graph.subgraph(&["Sheet1!C1"], true);
        assert_eq!(sub.node_count(), 3);
        assert_eq!(sub.edge_count(), 3);

        let bare = graph.subgraph(&["Sheet1!C1"], false);
        assert_eq!(bare.node_count(), 1);
        assert_eq!(bare.edge_count(), 0);
        let id = bare.find_node("Sheet1!C1").unwrap();
        assert!(bare.node(id).unwrap().is_input);
        assert!(bare.node(id).unwrap().is_output);
    }

    #[test]
    fn test_metrics() {
        let graph = diamond_free_chain();
        let metrics = graph.metrics();
        assert_eq!(metrics.node_count, 3);
        assert_eq!(metrics.edge_count, 3);
        assert!((metrics.density - 0.5).abs() < 1e-9);
        assert!(metrics.is_acyclic);
        assert_eq!(metrics.input_nodes, 1);
        assert_eq!(metrics.output_nodes, 1);
        assert!((metrics.avg_degree - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_export_round_trips_counts() {
        let graph = build(vec![
            cell("A", 1, Some("5"), None),
            cell("B", 1, None, Some("=A1+Other!D4")),
            cell("C", 1, None, Some("=SUM(A1:B1)")),
        ]);
        let export = graph.export();
        assert_eq!(export.nodes.len(), export.metrics.node_count);
        assert_eq!(export.edges.len(), export.metrics.edge_count);
        assert_eq!(export.nodes.len(), graph.node_count());
        assert_eq!(export.edges.len(), graph.edge_count());

        // Every edge endpoint resolves to an exported node.
        let ids: HashSet<&str> = export.nodes.iter().map(|n| n.id.as_str()).collect();
        for edge in &export.edges {
            assert!(ids.contains(edge.source.as_str()));
            assert!(ids.contains(edge.target.as_str()));
        }
    }
}
