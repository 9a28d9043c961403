//! Degree and closeness centrality

use super::common::GraphView;
use super::pathfinding::bfs_distances;
use rayon::prelude::*;

/// Degree normalized by `n - 1`. A single-node graph scores 0.0.
pub fn degree_centrality(view: &GraphView) -> Vec<f64> {
    let n = view.node_count;
    if n <= 1 {
        return vec![0.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n).map(|i| view.degree(i) as f64 / denom).collect()
}

/// Closeness as the inverse of the mean hop distance to all reachable nodes.
///
/// Nodes with no reachable peers get `None` rather than 0.0. Each source is an
/// independent BFS, so sources are processed in parallel.
pub fn closeness_centrality(view: &GraphView) -> Vec<Option<f64>> {
    (0..view.node_count)
        .into_par_iter()
        .map(|source| {
            let dist = bfs_distances(view, source);
            let (reached, total) = dist
                .iter()
                .enumerate()
                .filter(|&(idx, _)| idx != source)
                .filter_map(|(_, d)| *d)
                .fold((0usize, 0usize), |(r, t), d| (r + 1, t + d));
            if reached == 0 || total == 0 {
                None
            } else {
                Some(reached as f64 / total as f64)
            }
        })
        .collect()
}
