use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Stable index of a node in the graph arena.
///
/// Indices are assigned in insertion order and never reused; downstream
/// tie-breaking relies on that order being deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Create an id from a raw arena position. Ids that do not name an
    /// existing node simply resolve to nothing in lookups.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position of this node in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// How a dependency edge was established.
///
/// Static edges come from references written in the formula text;
/// dynamic edges belong to formulas invoking an indirection-capable
/// function, whose true reference set may only be known at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Static,
    Dynamic,
}

impl EdgeKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

/// Characters of formula text retained on an edge for diagnostics.
pub const FORMULA_EXCERPT_MAX: usize = 50;

/// One cell in the dependency graph.
///
/// Placeholder nodes (addresses referenced by a formula but absent from
/// the scanned cell records) carry `has_formula = false` and no value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellNode {
    /// Canonical address, e.g. "Sheet1!A1"
    pub address: String,
    pub sheet: String,
    pub column: String,
    pub row: u32,

    /// Kept only when the caller opted into values
    pub value: Option<String>,
    pub formula: Option<String>,
    pub has_formula: bool,

    /// No incoming edges (recomputed whenever the edge set changes)
    pub is_input: bool,
    /// No outgoing edges (recomputed whenever the edge set changes)
    pub is_output: bool,
}

/// Directed edge from a referenced cell to the formula cell referencing
/// it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    /// Bounded slice of the owning formula, for diagnostics only
    pub formula_excerpt: Option<String>,
}

/// Dependency graph over cells: an arena of nodes with a canonical
/// address side map and adjacency lists in both directions.
///
/// The graph is simple: repeated references from one formula to the
/// same cell collapse into a single edge. Mutation is confined to this
/// crate; consumers only query.
#[derive(Debug, Clone, Default)]
pub struct CellGraph {
    nodes: Vec<CellNode>,
    edges: Vec<CellEdge>,
    address_index: HashMap<String, NodeId>,
    predecessors: Vec<Vec<NodeId>>,
    successors: Vec<Vec<NodeId>>,
    edge_set: HashSet<(NodeId, NodeId)>,
}

impl CellGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a node, overwriting the attributes of an existing node at
    /// the same address while keeping its id and edges.
    pub(crate) fn insert_node(&mut self, node: CellNode) -> NodeId {
        if let Some(&id) = self.address_index.get(&node.address) {
            self.nodes[id.index()] = node;
            return id;
        }
        let id = NodeId::from_index(self.nodes.len());
        self.address_index.insert(node.address.clone(), id);
        self.nodes.push(node);
        self.predecessors.push(Vec::new());
        self.successors.push(Vec::new());
        id
    }

    /// Insert a dependency → dependent edge. Duplicate endpoint pairs
    /// collapse to the first edge inserted.
    pub(crate) fn insert_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: EdgeKind,
        formula_excerpt: Option<String>,
    ) {
        if !self.edge_set.insert((from, to)) {
            return;
        }
        self.successors[from.index()].push(to);
        self.predecessors[to.index()].push(from);
        self.edges.push(CellEdge {
            from,
            to,
            kind,
            formula_excerpt,
        });
    }

    /// Recompute `is_input`/`is_output` from current degrees. Called
    /// after every batch of edge mutations.
    pub(crate) fn recompute_io_flags(&mut self) {
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            node.is_input = self.predecessors[idx].is_empty();
            node.is_output = self.successors[idx].is_empty();
        }
    }

    /// Look up a node by canonical address.
    #[must_use]
    pub fn find_node(&self, address: &str) -> Option<NodeId> {
        self.address_index.get(address).copied()
    }

    /// Node data for an id, if the id is valid.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&CellNode> {
        self.nodes.get(id.index())
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &CellNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (NodeId::from_index(idx), node))
    }

    /// All edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[CellEdge] {
        &self.edges
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Direct dependency ids of `id` (cells it references).
    #[must_use]
    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.predecessors
            .get(id.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Direct dependent ids of `id` (cells referencing it).
    #[must_use]
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.successors.get(id.index()).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.predecessors(id).len()
    }

    #[must_use]
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.successors(id).len()
    }
}
