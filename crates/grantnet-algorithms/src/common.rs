//! Shared utilities for graph algorithms
//!
//! Provides a read-only, optimized view of the graph topology for algorithm execution.

/// Node Identifier type (u64)
pub type NodeId = u64;

/// A dense, integer-indexed view of an undirected weighted graph in
/// Compressed Sparse Row (CSR) format.
///
/// Every edge is stored once from each endpoint, so a node's neighbour slice
/// is its full neighbourhood.
#[derive(Debug, Clone)]
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Offsets into `targets`. Size = node_count + 1
    offsets: Vec<usize>,
    /// Contiguous neighbour indices, sorted within each row
    targets: Vec<usize>,
    /// Edge weights aligned with `targets`
    weights: Vec<f64>,
}

impl GraphView {
    /// Build an undirected, weighted view. Each `(a, b, w)` is stored as both
    /// `a -> b` and `b -> a`. Neighbour lists are sorted by index so traversal
    /// order is stable.
    pub fn from_undirected_edges(
        index_to_node: Vec<NodeId>,
        edges: &[(usize, usize, f64)],
    ) -> Self {
        let node_count = index_to_node.len();
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];

        for &(a, b, w) in edges {
            adjacency[a].push((b, w));
            if a != b {
                adjacency[b].push((a, w));
            }
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut targets = Vec::with_capacity(edges.len() * 2);
        let mut weights = Vec::with_capacity(edges.len() * 2);
        offsets.push(0);
        for mut row in adjacency {
            row.sort_by(|x, y| x.0.cmp(&y.0));
            for (t, w) in row {
                targets.push(t);
                weights.push(w);
            }
            offsets.push(targets.len());
        }

        GraphView {
            node_count,
            index_to_node,
            offsets,
            targets,
            weights,
        }
    }

    /// Number of incident edges of a node (by index)
    pub fn degree(&self, idx: usize) -> usize {
        self.offsets[idx + 1] - self.offsets[idx]
    }

    /// Neighbour indices of a node
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.targets[self.offsets[idx]..self.offsets[idx + 1]]
    }

    /// `(neighbour, weight)` pairs of a node, in neighbour order
    pub fn weighted_neighbors(&self, idx: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[idx]..self.offsets[idx + 1];
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    /// Sum of positive incident edge weights
    pub fn strength(&self, idx: usize) -> f64 {
        self.weighted_neighbors(idx)
            .map(|(_, w)| w.max(0.0))
            .sum()
    }
}
