use cellgraph_graph::CellGraph;

/// Union-find over node indices, path-halving with union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Connected components of the undirected projection of the graph
/// (edge direction dropped).
///
/// Returns one cluster id per node, indexed by arena position. Ids are
/// assigned in node discovery order, so identical graphs always produce
/// identical cluster ids. Isolated nodes form singleton clusters.
#[must_use]
pub fn connected_components(graph: &CellGraph) -> Vec<usize> {
    let n = graph.node_count();
    let mut uf = UnionFind::new(n);
    for edge in graph.edges() {
        uf.union(edge.from.index(), edge.to.index());
    }

    let mut ids = vec![usize::MAX; n];
    let mut next_id = 0;
    for node in 0..n {
        let root = uf.find(node);
        if ids[root] == usize::MAX {
            ids[root] = next_id;
            next_id += 1;
        }
        ids[node] = ids[root];
    }
    ids
}
