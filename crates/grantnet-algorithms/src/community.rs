//! Community detection algorithms
//!
//! Weakly connected components (union-find) and modularity-maximizing
//! community detection (Louvain) behind the [`CommunityDetection`] trait.

use super::common::{GraphView, NodeId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

/// Result of WCC algorithm
pub struct WccResult {
    /// Map of Component ID -> List of NodeIds
    pub components: HashMap<usize, Vec<NodeId>>,
    /// Map of NodeId -> Component ID
    pub node_component: HashMap<NodeId, usize>,
}

impl WccResult {
    /// Number of distinct components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

/// Union-Find data structure
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        UnionFind {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            self.parent[i] = self.find(self.parent[i]); // Path compression
        }
        self.parent[i]
    }

    fn union(&mut self, i: usize, j: usize) {
        let root_i = self.find(i);
        let root_j = self.find(j);

        if root_i != root_j {
            if self.rank[root_i] < self.rank[root_j] {
                self.parent[root_i] = root_j;
            } else if self.rank[root_i] > self.rank[root_j] {
                self.parent[root_j] = root_i;
            } else {
                self.parent[root_j] = root_i;
                self.rank[root_i] += 1;
            }
        }
    }
}

/// Weakly Connected Components (WCC)
///
/// Finds all disjoint subgraphs in the graph.
/// Ignores edge direction.
pub fn weakly_connected_components(view: &GraphView) -> WccResult {
    let n = view.node_count;
    let mut uf = UnionFind::new(n);

    for u_idx in 0..n {
        for &v_idx in view.neighbors(u_idx) {
            uf.union(u_idx, v_idx);
        }
    }

    let mut components = HashMap::new();
    let mut node_component = HashMap::new();

    for i in 0..n {
        let root = uf.find(i);
        let node_id = view.index_to_node[i];

        components.entry(root).or_insert_with(Vec::new).push(node_id);
        node_component.insert(node_id, root);
    }

    WccResult {
        components,
        node_component,
    }
}

/// A community detection algorithm over an undirected weighted view.
///
/// `partition` returns one community index per dense node index. Indices are
/// canonical: communities are numbered `0..k` in order of their smallest member.
pub trait CommunityDetection {
    fn partition(&self, view: &GraphView) -> Vec<usize>;
}

/// Louvain modularity maximization (Blondel et al. 2008).
///
/// Node visiting order in each local-moving sweep is shuffled with a seeded
/// RNG, so identical input and seed always give the identical partition.
#[derive(Debug, Clone, Copy)]
pub struct Louvain {
    pub seed: u64,
    /// Resolution parameter (1.0 = standard modularity)
    pub resolution: f64,
    /// Maximum number of aggregation levels
    pub max_passes: usize,
    /// Maximum local-moving sweeps per level
    pub max_sweeps: usize,
}

impl Default for Louvain {
    fn default() -> Self {
        Self {
            seed: 42,
            resolution: 1.0,
            max_passes: 10,
            max_sweeps: 100,
        }
    }
}

/// Working graph for one Louvain level
struct Level {
    /// Neighbours excluding self loops
    adjacency: Vec<Vec<(usize, f64)>>,
    /// Self-loop weight per node (internal weight of an aggregated community)
    self_loops: Vec<f64>,
}

impl Level {
    fn from_view(view: &GraphView) -> Self {
        let n = view.node_count;
        let mut adjacency = vec![Vec::new(); n];
        let mut self_loops = vec![0.0; n];
        for (i, row) in adjacency.iter_mut().enumerate() {
            for (j, w) in view.weighted_neighbors(i) {
                if w <= 0.0 {
                    continue;
                }
                if i == j {
                    self_loops[i] += w;
                } else {
                    row.push((j, w));
                }
            }
        }
        Level {
            adjacency,
            self_loops,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Weighted degree, self loops counted twice
    fn degree(&self, i: usize) -> f64 {
        self.adjacency[i].iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * self.self_loops[i]
    }

    /// Collapse communities into super-nodes
    fn aggregate(&self, community: &[usize], count: usize) -> Level {
        let mut weights: Vec<HashMap<usize, f64>> = vec![HashMap::new(); count];
        let mut self_loops = vec![0.0; count];

        for i in 0..self.len() {
            let ci = community[i];
            self_loops[ci] += self.self_loops[i];
            for &(j, w) in &self.adjacency[i] {
                let cj = community[j];
                if ci == cj {
                    // Each internal edge is visited from both ends
                    self_loops[ci] += w / 2.0;
                } else {
                    *weights[ci].entry(cj).or_insert(0.0) += w;
                }
            }
        }

        let adjacency = weights
            .into_iter()
            .map(|row| {
                let mut row: Vec<(usize, f64)> = row.into_iter().collect();
                row.sort_by(|a, b| a.0.cmp(&b.0));
                row
            })
            .collect();

        Level {
            adjacency,
            self_loops,
        }
    }
}

impl Louvain {
    /// One round of local moving. Returns true if any node changed community.
    fn local_moving(&self, level: &Level, community: &mut [usize], rng: &mut StdRng) -> bool {
        let n = level.len();
        let degrees: Vec<f64> = (0..n).map(|i| level.degree(i)).collect();
        let m2: f64 = degrees.iter().sum();
        if m2 <= 0.0 {
            return false;
        }

        let mut totals = vec![0.0; n];
        for i in 0..n {
            totals[community[i]] += degrees[i];
        }

        let mut order: Vec<usize> = (0..n).collect();
        let mut improved = false;

        for _ in 0..self.max_sweeps {
            order.shuffle(rng);
            let mut moved = false;

            for &i in &order {
                let current = community[i];
                let k_i = degrees[i];

                let mut links: HashMap<usize, f64> = HashMap::new();
                for &(j, w) in &level.adjacency[i] {
                    *links.entry(community[j]).or_insert(0.0) += w;
                }

                totals[current] -= k_i;

                let gain = |c: usize, w_ic: f64| w_ic - self.resolution * totals[c] * k_i / m2;

                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));

                let mut candidates: Vec<(&usize, &f64)> = links.iter().collect();
                candidates.sort_by(|a, b| a.0.cmp(b.0));
                for (&c, &w_ic) in candidates {
                    let g = gain(c, w_ic);
                    if g > best_gain + 1e-12 {
                        best = c;
                        best_gain = g;
                    }
                }

                totals[best] += k_i;
                if best != current {
                    community[i] = best;
                    moved = true;
                    improved = true;
                }
            }

            if !moved {
                break;
            }
        }

        improved
    }
}

impl CommunityDetection for Louvain {
    fn partition(&self, view: &GraphView) -> Vec<usize> {
        let n = view.node_count;
        let mut membership: Vec<usize> = (0..n).collect();
        if n == 0 {
            return membership;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut level = Level::from_view(view);

        for _ in 0..self.max_passes {
            let mut community: Vec<usize> = (0..level.len()).collect();
            if !self.local_moving(&level, &mut community, &mut rng) {
                break;
            }

            let (renumbered, count) = canonicalize(&community);
            for m in membership.iter_mut() {
                *m = renumbered[*m];
            }

            if count == level.len() {
                break;
            }
            level = level.aggregate(&renumbered, count);
        }

        canonicalize(&membership).0
    }
}

/// Renumber labels `0..k` in order of first appearance
fn canonicalize(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let mut out = Vec::with_capacity(labels.len());
    for &label in labels {
        let next = mapping.len();
        out.push(*mapping.entry(label).or_insert(next));
    }
    let count = mapping.len();
    (out, count)
}

/// Modularity of an assignment over an undirected weighted view.
///
/// `Q = Σ_c [ in_c / 2m - γ (tot_c / 2m)² ]`, where `in_c` counts each internal
/// edge from both ends. Returns 0.0 for graphs without edge weight.
pub fn modularity(view: &GraphView, assignment: &[usize], resolution: f64) -> f64 {
    let n = view.node_count;
    let mut m2 = 0.0;
    let mut internal: HashMap<usize, f64> = HashMap::new();
    let mut totals: HashMap<usize, f64> = HashMap::new();

    for i in 0..n {
        for (j, w) in view.weighted_neighbors(i) {
            m2 += w;
            *totals.entry(assignment[i]).or_insert(0.0) += w;
            if assignment[i] == assignment[j] {
                *internal.entry(assignment[i]).or_insert(0.0) += w;
            }
        }
    }

    if m2 <= 0.0 {
        return 0.0;
    }

    totals
        .iter()
        .map(|(c, tot)| {
            let inside = internal.get(c).copied().unwrap_or(0.0);
            inside / m2 - resolution * (tot / m2).powi(2)
        })
        .sum()
}
