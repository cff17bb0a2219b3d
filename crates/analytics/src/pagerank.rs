use cellgraph_graph::{CellGraph, NodeId};

/// Standard damping factor.
pub const PAGERANK_DAMPING: f64 = 0.85;

/// Iteration cap; reaching it without convergence is a degeneracy and
/// callers fall back to a simpler proxy.
pub const PAGERANK_MAX_ITER: usize = 100;

/// Per-node convergence threshold; the L1 delta must drop below
/// `tolerance * node_count`.
pub const PAGERANK_TOLERANCE: f64 = 1e-6;

/// Power-iteration PageRank over the directed graph, indexed by node
/// position.
///
/// Dangling nodes (out-degree zero) redistribute their mass uniformly.
/// Returns `None` when the iteration fails to converge within
/// [`PAGERANK_MAX_ITER`] rounds or produces a non-finite score, so the
/// caller can substitute a deterministic fallback instead of
/// propagating a failure.
#[must_use]
pub fn pagerank(graph: &CellGraph, damping: f64) -> Option<Vec<f64>> {
    let n = graph.node_count();
    if n == 0 {
        return Some(Vec::new());
    }

    let count = n as f64;
    let mut scores = vec![1.0 / count; n];
    let mut next = vec![0.0; n];
    let out_degrees: Vec<usize> = (0..n)
        .map(|i| graph.out_degree(NodeId::from_index(i)))
        .collect();
    let teleport = (1.0 - damping) / count;

    for iteration in 0..PAGERANK_MAX_ITER {
        let dangling_mass: f64 = (0..n)
            .filter(|&i| out_degrees[i] == 0)
            .map(|i| scores[i])
            .sum();

        for score in next.iter_mut() {
            *score = teleport + damping * dangling_mass / count;
        }
        for source in 0..n {
            if out_degrees[source] == 0 {
                continue;
            }
            let share = damping * scores[source] / out_degrees[source] as f64;
            for &succ in graph.successors(NodeId::from_index(source)) {
                next[succ.index()] += share;
            }
        }

        let delta: f64 = scores
            .iter()
            .zip(next.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();
        std::mem::swap(&mut scores, &mut next);

        if !delta.is_finite() || scores.iter().any(|s| !s.is_finite()) {
            log::error!("pagerank produced non-finite scores");
            return None;
        }
        if delta < PAGERANK_TOLERANCE * count {
            log::debug!("pagerank converged after {} iterations", iteration + 1);
            return Some(scores);
        }
    }

    log::error!(
        "pagerank failed to converge within {} iterations",
        PAGERANK_MAX_ITER
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgraph_graph::GraphBuilder;
    use cellgraph_protocol::{CellRecord, SheetData};

    fn chain_graph() -> CellGraph {
        // A1 → B1 → C1 plus A1 → C1
        let sheets = vec![SheetData {
            name: "S".to_string(),
            cells: vec![
                CellRecord {
                    row: 1,
                    column: "A".to_string(),
                    value: Some("1".to_string()),
                    formula: None,
                    data_type: "float".to_string(),
                },
                CellRecord {
                    row: 1,
                    column: "B".to_string(),
                    value: None,
                    formula: Some("=A1*2".to_string()),
                    data_type: "float".to_string(),
                },
                CellRecord {
                    row: 1,
                    column: "C".to_string(),
                    value: None,
                    formula: Some("=A1+B1".to_string()),
                    data_type: "float".to_string(),
                },
            ],
            row_count: 0,
            col_count: 0,
        }];
        GraphBuilder::new().build(&sheets, false)
    }

    #[test]
    fn test_scores_sum_to_one() {
        let graph = chain_graph();
        let scores = pagerank(&graph, PAGERANK_DAMPING).unwrap();
        let total: f64 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sink_ranks_highest() {
        let graph = chain_graph();
        let scores = pagerank(&graph, PAGERANK_DAMPING).unwrap();
        let idx = |addr: &str| graph.find_node(addr).unwrap().index();
        // C1 receives links from both other nodes.
        assert!(scores[idx("S!C1")] > scores[idx("S!A1")]);
        assert!(scores[idx("S!C1")] > scores[idx("S!B1")]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = GraphBuilder::new().build(&[], false);
        assert_eq!(pagerank(&graph, PAGERANK_DAMPING), Some(Vec::new()));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let a = pagerank(&chain_graph(), PAGERANK_DAMPING).unwrap();
        let b = pagerank(&chain_graph(), PAGERANK_DAMPING).unwrap();
        assert_eq!(a, b);
    }
}
