//! Influence ranking
//!
//! Degree, closeness and weighted PageRank per node, with a tier relative to
//! the current batch.

use super::build_view;
use crate::config::InfluenceConfig;
use crate::error::ConvergenceWarning;
use crate::graph::{NetworkGraph, NodeId, NodeKey};
use grantnet_algorithms::{closeness_centrality, degree_centrality, page_rank, PageRankConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Batch-relative influence tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfluenceTier {
    Low,
    Medium,
    High,
}

impl InfluenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfluenceTier::Low => "low",
            InfluenceTier::Medium => "medium",
            InfluenceTier::High => "high",
        }
    }
}

impl fmt::Display for InfluenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Centrality metrics for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceScore {
    pub node: NodeKey,
    pub name: String,
    /// 1-based position by PageRank
    pub rank: usize,
    /// Edge count / (n - 1)
    pub degree_centrality: f64,
    /// Inverse mean hop distance to reachable nodes; `None` when isolated
    pub closeness: Option<f64>,
    /// Sums to 1 across the graph
    pub pagerank: f64,
    pub tier: InfluenceTier,
}

/// Ranked influence scores for a whole graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceReport {
    /// Highest PageRank first
    pub scores: Vec<InfluenceScore>,
    pub iterations: usize,
    /// Set when PageRank hit the iteration cap
    pub convergence: Option<ConvergenceWarning>,
}

impl InfluenceReport {
    pub fn top(&self, n: usize) -> &[InfluenceScore] {
        &self.scores[..n.min(self.scores.len())]
    }

    pub fn get(&self, node: &NodeKey) -> Option<&InfluenceScore> {
        self.scores.iter().find(|s| &s.node == node)
    }

    pub fn converged(&self) -> bool {
        self.convergence.is_none()
    }
}

/// Number of leading ranks covered by `fraction` of `n`, rounded up
fn tier_cutoff(fraction: f64, n: usize) -> usize {
    // Guard against 0.3 * 10 = 3.0000000000000004 rounding up to 4
    ((fraction * n as f64) - 1e-9).ceil().max(0.0) as usize
}

pub fn analyze_influence(graph: &NetworkGraph, config: &InfluenceConfig) -> InfluenceReport {
    let view = build_view(graph);
    let n = view.node_count;

    let pagerank = page_rank(
        &view,
        PageRankConfig {
            damping_factor: config.damping_factor,
            iterations: config.max_iterations,
            tolerance: config.tolerance,
        },
    );
    let convergence = if pagerank.converged {
        None
    } else {
        warn!(
            "PageRank did not converge after {} iteration(s) (max delta {:e})",
            pagerank.iterations, pagerank.max_delta
        );
        Some(ConvergenceWarning {
            iterations: pagerank.iterations,
            max_delta: pagerank.max_delta,
        })
    };

    let degree = degree_centrality(&view);
    let closeness = closeness_centrality(&view);

    let mut scores: Vec<InfluenceScore> = (0..n)
        .filter_map(|idx| {
            let node = graph.node(NodeId::from(idx))?;
            Some(InfluenceScore {
                node: node.key.clone(),
                name: node.name.clone(),
                rank: 0,
                degree_centrality: degree[idx],
                closeness: closeness[idx],
                pagerank: pagerank
                    .scores
                    .get(&view.index_to_node[idx])
                    .copied()
                    .unwrap_or(0.0),
                tier: InfluenceTier::Low,
            })
        })
        .collect();

    scores.sort_by(|a, b| b.pagerank.total_cmp(&a.pagerank));

    // Scores within the convergence tolerance of a run's first score are ties:
    // they share a tier and are ordered by node key.
    let tie = config.tolerance.max(f64::EPSILON);
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    for i in 1..=scores.len() {
        if i == scores.len() || scores[start].pagerank - scores[i].pagerank > tie {
            scores[start..i].sort_by(|a, b| a.node.cmp(&b.node));
            runs.push((start, i));
            start = i;
        }
    }

    let high = tier_cutoff(config.high_fraction, n);
    let medium = tier_cutoff(config.medium_fraction, n).max(high);
    let mut counts = [0usize; 3];
    for (start, end) in runs {
        // A run straddling a cutoff takes the tier of its first position
        let tier = if start < high {
            InfluenceTier::High
        } else if start < medium {
            InfluenceTier::Medium
        } else {
            InfluenceTier::Low
        };
        counts[tier as usize] += end - start;
        for (i, score) in scores.iter_mut().enumerate().take(end).skip(start) {
            score.rank = i + 1;
            score.tier = tier;
        }
    }

    info!(
        "Ranked {} node(s): {} high, {} medium",
        n,
        counts[InfluenceTier::High as usize],
        counts[InfluenceTier::Medium as usize]
    );

    InfluenceReport {
        scores,
        iterations: pagerank.iterations,
        convergence,
    }
}
