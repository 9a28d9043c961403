//! PageRank algorithm implementation
//!
//! Weighted random-walk importance with convergence reporting.

use super::common::{GraphView, NodeId};
use std::collections::HashMap;

/// PageRank configuration
#[derive(Debug, Clone, Copy)]
pub struct PageRankConfig {
    /// Damping factor (usually 0.85)
    pub damping_factor: f64,
    /// Hard cap on the number of iterations
    pub iterations: usize,
    /// Convergence tolerance on the largest per-node score change
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            iterations: 200,
            tolerance: 1e-10,
        }
    }
}

/// Scores plus convergence bookkeeping
#[derive(Debug, Clone)]
pub struct PageRankResult {
    /// Score per node, summing to 1.0
    pub scores: HashMap<NodeId, f64>,
    /// Iterations actually run
    pub iterations: usize,
    /// Whether the tolerance was met before the iteration cap
    pub converged: bool,
    /// Largest per-node change in the final iteration
    pub max_delta: f64,
}

/// Calculate PageRank for the graph view.
///
/// Random-walk transitions are proportional to edge weight; unweighted views
/// use uniform transitions. Mass held by nodes without outgoing weight is
/// redistributed uniformly each iteration.
pub fn page_rank(view: &GraphView, config: PageRankConfig) -> PageRankResult {
    let n = view.node_count;

    if n == 0 {
        return PageRankResult {
            scores: HashMap::new(),
            iterations: 0,
            converged: true,
            max_delta: 0.0,
        };
    }

    let uniform = 1.0 / n as f64;
    let mut scores = vec![uniform; n];
    let mut next_scores = vec![0.0; n];

    let out_strength: Vec<f64> = (0..n).map(|i| view.strength(i)).collect();

    let d = config.damping_factor;
    let mut iterations = 0;
    let mut converged = false;
    let mut max_delta = 0.0;

    while iterations < config.iterations {
        iterations += 1;

        let dangling: f64 = (0..n)
            .filter(|&i| out_strength[i] <= 0.0)
            .map(|i| scores[i])
            .sum();
        let base = (1.0 - d) * uniform + d * dangling * uniform;
        next_scores.iter_mut().for_each(|s| *s = base);

        // Push each node's mass along its outgoing edges
        for i in 0..n {
            if out_strength[i] <= 0.0 {
                continue;
            }
            let share = d * scores[i] / out_strength[i];
            for (target, w) in view.weighted_neighbors(i) {
                next_scores[target] += share * w.max(0.0);
            }
        }

        max_delta = scores
            .iter()
            .zip(next_scores.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);

        // Swap buffers
        std::mem::swap(&mut scores, &mut next_scores);

        if max_delta < config.tolerance {
            converged = true;
            break;
        }
    }

    // Guard against floating drift
    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        scores.iter_mut().for_each(|s| *s /= total);
    }

    let mut result = HashMap::with_capacity(n);
    for (idx, score) in scores.into_iter().enumerate() {
        result.insert(view.index_to_node[idx], score);
    }

    PageRankResult {
        scores: result,
        iterations,
        converged,
        max_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagerank_star_center_ranks_highest() {
        // Center 0 linked to leaves 1, 2, 3
        let view = GraphView::from_undirected_edges(
            vec![0, 1, 2, 3],
            &[(0, 1, 1.0), (0, 2, 1.0), (0, 3, 1.0)],
        );

        let result = page_rank(&view, PageRankConfig::default());
        assert!(result.converged);

        let center = result.scores[&0];
        for leaf in 1..4 {
            assert!(center > result.scores[&leaf]);
        }

        let total: f64 = result.scores.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pagerank_respects_weights() {
        // 0 links heavily to 1 and lightly to 2
        let view = GraphView::from_undirected_edges(
            vec![0, 1, 2],
            &[(0, 1, 900.0), (0, 2, 100.0)],
        );

        let result = page_rank(&view, PageRankConfig::default());
        assert!(result.scores[&1] > result.scores[&2]);
    }

    #[test]
    fn test_pagerank_isolated_nodes_share_mass() {
        let view = GraphView::from_undirected_edges(vec![7, 8, 9], &[]);
        let result = page_rank(&view, PageRankConfig::default());

        for score in result.scores.values() {
            assert!((score - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_pagerank_reports_non_convergence() {
        let view = GraphView::from_undirected_edges(
            vec![0, 1, 2, 3],
            &[(0, 1, 1.0), (1, 2, 3.0), (2, 3, 1.0)],
        );
        let config = PageRankConfig {
            iterations: 1,
            ..PageRankConfig::default()
        };

        let result = page_rank(&view, config);
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert!(result.max_delta > 0.0);

        let total: f64 = result.scores.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pagerank_empty_graph() {
        let view = GraphView::from_undirected_edges(Vec::new(), &[]);
        let result = page_rank(&view, PageRankConfig::default());
        assert!(result.scores.is_empty());
        assert!(result.converged);
    }
}
