//! Multi-hop pathways between organizations
//!
//! Enumerates simple paths up to a hop limit, scores each by its weakest
//! funding link and attaches a templated cultivation strategy.

use super::build_view;
use crate::config::PathfindingConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::graph::{NetworkGraph, NodeId, NodeKey, NodeKind, OrgId};
use grantnet_algorithms::{all_simple_paths, GraphView};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Caller-supplied enumeration bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathQuery {
    pub max_hops: usize,
    pub max_paths: usize,
}

impl PathQuery {
    pub fn from_config(config: &PathfindingConfig) -> Self {
        PathQuery {
            max_hops: config.default_max_hops,
            max_paths: config.max_paths,
        }
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    fn validate(&self, config: &PathfindingConfig) -> NetworkResult<()> {
        if self.max_hops == 0 || self.max_hops > config.max_hops_limit {
            return Err(NetworkError::invalid_parameter(
                "max_hops",
                format!(
                    "must be between 1 and {}, got {}",
                    config.max_hops_limit, self.max_hops
                ),
            ));
        }
        if self.max_paths == 0 {
            return Err(NetworkError::invalid_parameter("max_paths", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for PathQuery {
    fn default() -> Self {
        Self::from_config(&PathfindingConfig::default())
    }
}

/// One node along a pathway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub id: OrgId,
    pub name: String,
    pub kind: NodeKind,
}

/// A simple path between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pathway {
    /// Source first, alternating funder/recipient
    pub steps: Vec<PathStep>,
    /// Edge weights in path order
    pub edge_weights: Vec<f64>,
    /// Minimum edge weight along the path
    pub strength: f64,
    pub strategy: String,
}

impl Pathway {
    pub fn hops(&self) -> usize {
        self.edge_weights.len()
    }

    /// Nodes strictly between source and target
    pub fn intermediates(&self) -> &[PathStep] {
        match self.steps.len() {
            0..=2 => &self.steps[0..0],
            n => &self.steps[1..n - 1],
        }
    }
}

/// Ordered pathways between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathfindingResult {
    pub source: NodeKey,
    pub target: NodeKey,
    /// Strongest first, then shortest
    pub pathways: Vec<Pathway>,
    /// Enumeration stopped at `max_paths`
    pub truncated: bool,
}

impl PathfindingResult {
    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }
}

/// Pathfinder over one built graph. The algorithm view is built once and
/// reused across queries.
pub struct Pathfinder<'g> {
    graph: &'g NetworkGraph,
    view: GraphView,
    config: PathfindingConfig,
}

impl<'g> Pathfinder<'g> {
    pub fn new(graph: &'g NetworkGraph, config: &PathfindingConfig) -> Self {
        Pathfinder {
            graph,
            view: build_view(graph),
            config: config.clone(),
        }
    }

    /// All simple paths from `source` to `target` within `query.max_hops`.
    ///
    /// Node references accept a bare id or a `funder:`/`recipient:` prefix.
    /// Unknown nodes fail with `InvalidIdentifier`; no path is an empty,
    /// successful result.
    pub fn find_paths(
        &self,
        source: &str,
        target: &str,
        query: &PathQuery,
    ) -> NetworkResult<PathfindingResult> {
        query.validate(&self.config)?;
        let from = self.graph.require(source)?;
        let to = self.graph.require(target)?;
        if from == to {
            return Err(NetworkError::invalid_parameter(
                "target",
                format!("source and target are the same node ({})", source),
            ));
        }

        let found = all_simple_paths(
            &self.view,
            from.index(),
            to.index(),
            query.max_hops,
            query.max_paths,
        );
        if found.truncated {
            warn!(
                "Path enumeration {} -> {} truncated at {} path(s)",
                source, target, query.max_paths
            );
        }

        let mut pathways: Vec<Pathway> = found
            .paths
            .iter()
            .filter_map(|indices| self.pathway(indices))
            .collect();
        pathways.sort_by(compare_pathways);

        debug!(
            "{} pathway(s) between {} and {} within {} hop(s)",
            pathways.len(),
            source,
            target,
            query.max_hops
        );

        Ok(PathfindingResult {
            source: self.key(from)?,
            target: self.key(to)?,
            pathways,
            truncated: found.truncated,
        })
    }

    fn key(&self, id: NodeId) -> NetworkResult<NodeKey> {
        self.graph
            .node(id)
            .map(|n| n.key.clone())
            .ok_or_else(|| NetworkError::unknown("node", id.to_string()))
    }

    fn pathway(&self, indices: &[usize]) -> Option<Pathway> {
        let steps = indices
            .iter()
            .map(|&i| {
                self.graph.node(NodeId::from(i)).map(|n| PathStep {
                    id: n.org_id().clone(),
                    name: n.name.clone(),
                    kind: n.kind(),
                })
            })
            .collect::<Option<Vec<_>>>()?;

        let edge_weights = indices
            .windows(2)
            .map(|w| {
                self.graph
                    .edge_between(NodeId::from(w[0]), NodeId::from(w[1]))
                    .map(|e| e.weight)
            })
            .collect::<Option<Vec<_>>>()?;

        let strength = edge_weights.iter().copied().fold(f64::INFINITY, f64::min);
        let strategy = cultivation_strategy(&steps, strength);
        Some(Pathway {
            steps,
            edge_weights,
            strength,
            strategy,
        })
    }
}

/// One-shot pathfinding over a graph
pub fn find_paths(
    graph: &NetworkGraph,
    source: &str,
    target: &str,
    query: &PathQuery,
    config: &PathfindingConfig,
) -> NetworkResult<PathfindingResult> {
    Pathfinder::new(graph, config).find_paths(source, target, query)
}

fn compare_pathways(a: &Pathway, b: &Pathway) -> Ordering {
    b.strength
        .total_cmp(&a.strength)
        .then_with(|| a.hops().cmp(&b.hops()))
        .then_with(|| {
            let ka = a.steps.iter().map(|s| (s.kind, &s.id));
            let kb = b.steps.iter().map(|s| (s.kind, &s.id));
            ka.cmp(kb)
        })
}

/// Whole-dollar amount with thousands separators, e.g. `$12,500`
pub fn format_amount(amount: f64) -> String {
    let whole = amount.round().max(0.0) as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("${}", out)
}

/// Deterministic narrative for a path, naming intermediates by display name
pub fn cultivation_strategy(steps: &[PathStep], strength: f64) -> String {
    let amount = format_amount(strength);
    match steps {
        [a, b] => match a.kind {
            NodeKind::Funder => format!(
                "Direct relationship: {} funded {} ({}).",
                a.name, b.name, amount
            ),
            NodeKind::Recipient => format!(
                "Direct relationship: {} received {} from {}.",
                a.name, amount, b.name
            ),
        },
        [a, mid, c] => match mid.kind {
            NodeKind::Recipient => format!(
                "Shared grantee referral: {} and {} both fund {}. Ask {} for an introduction; weakest link {}.",
                a.name, c.name, mid.name, mid.name, amount
            ),
            NodeKind::Funder => format!(
                "Funder introduction: {} funds both {} and {}. Approach {} through its relationship with {}; weakest link {}.",
                mid.name, a.name, c.name, mid.name, a.name, amount
            ),
        },
        [_, rest @ ..] if rest.len() >= 3 => {
            let chain: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
            format!(
                "Chained introduction: {}. Start with {} and work each link in turn; weakest link {}.",
                chain.join(" -> "),
                rest[0].name,
                amount
            )
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKey;

    /// A funds X, Y; B funds Y, Z; C funds X, Y, Z. Y gets 100 from everyone,
    /// other links differ so path strengths are distinguishable.
    fn graph() -> NetworkGraph {
        let mut g = NetworkGraph::new();
        let a = g.add_node(NodeKey::funder("A"), "Alpha Fund");
        let b = g.add_node(NodeKey::funder("B"), "Beta Trust");
        let c = g.add_node(NodeKey::funder("C"), "Gamma Foundation");
        let x = g.add_node(NodeKey::recipient("X"), "Xavier Center");
        let y = g.add_node(NodeKey::recipient("Y"), "Youth Arts");
        let z = g.add_node(NodeKey::recipient("Z"), "Zoo Society");
        g.add_edge(a, x, 500.0, &[2022], 1).unwrap();
        g.add_edge(a, y, 100.0, &[2022], 1).unwrap();
        g.add_edge(b, y, 100.0, &[2022], 1).unwrap();
        g.add_edge(b, z, 50.0, &[2022], 1).unwrap();
        g.add_edge(c, x, 300.0, &[2022], 1).unwrap();
        g.add_edge(c, y, 100.0, &[2022], 1).unwrap();
        g.add_edge(c, z, 20.0, &[2022], 1).unwrap();
        g.add_node(NodeKey::funder("ISOLATED"), "Island Fund");
        g
    }

    fn ids(p: &Pathway) -> Vec<&str> {
        p.steps.iter().map(|s| s.id.as_str()).collect()
    }

    /// Edge weights read back from the graph for each hop of `p`
    fn graph_weights(g: &NetworkGraph, p: &Pathway) -> Vec<f64> {
        p.steps
            .windows(2)
            .map(|pair| {
                let node = |s: &PathStep| {
                    g.node_id(&NodeKey {
                        kind: s.kind,
                        id: s.id.clone(),
                    })
                    .unwrap()
                };
                g.edge_between(node(&pair[0]), node(&pair[1])).unwrap().weight
            })
            .collect()
    }

    #[test]
    fn test_paths_sorted_by_strength_then_hops() {
        let g = graph();
        let config = PathfindingConfig::default();
        let result = find_paths(&g, "A", "C", &PathQuery::default(), &config).unwrap();

        assert_eq!(result.source, NodeKey::funder("A"));
        assert_eq!(result.target, NodeKey::funder("C"));
        assert!(!result.truncated);

        let paths: Vec<Vec<&str>> = result.pathways.iter().map(ids).collect();
        assert_eq!(paths, vec![vec!["A", "X", "C"], vec!["A", "Y", "C"]]);
        assert_eq!(result.pathways[0].strength, 300.0);
        assert_eq!(result.pathways[1].strength, 100.0);
    }

    #[test]
    fn test_strength_is_minimum_edge_weight() {
        let g = graph();
        let query = PathQuery::default().with_max_hops(5);
        let result = find_paths(&g, "X", "Z", &query, &PathfindingConfig::default()).unwrap();
        assert!(!result.is_empty());
        for p in &result.pathways {
            let weights = graph_weights(&g, p);
            let min = weights.iter().copied().fold(f64::INFINITY, f64::min);
            assert_eq!(p.strength, min);
            assert_eq!(p.edge_weights, weights);
            assert_eq!(p.hops(), p.steps.len() - 1);
            for pair in p.steps.windows(2) {
                assert_ne!(pair[0].kind, pair[1].kind);
            }
        }
        for w in result.pathways.windows(2) {
            assert!(
                w[0].strength > w[1].strength
                    || (w[0].strength == w[1].strength && w[0].hops() <= w[1].hops())
            );
        }
    }

    #[test]
    fn test_hop_limit_bounds_results() {
        let g = graph();
        let query = PathQuery::default().with_max_hops(2);
        let result = find_paths(&g, "X", "Z", &query, &PathfindingConfig::default()).unwrap();
        assert_eq!(result.pathways.len(), 1);
        assert_eq!(ids(&result.pathways[0]), vec!["X", "C", "Z"]);

        let query = PathQuery::default().with_max_hops(1);
        let result = find_paths(&g, "X", "Z", &query, &PathfindingConfig::default()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_disconnected_is_empty_not_error() {
        let g = graph();
        let config = PathfindingConfig::default();
        let result = find_paths(&g, "A", "ISOLATED", &PathQuery::default(), &config).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_node_is_error() {
        let g = graph();
        let config = PathfindingConfig::default();
        let err = find_paths(&g, "A", "NOPE", &PathQuery::default(), &config).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_invalid_queries() {
        let g = graph();
        let config = PathfindingConfig::default();
        let too_far = PathQuery::default().with_max_hops(7);
        assert!(matches!(
            find_paths(&g, "A", "C", &too_far, &config).unwrap_err(),
            NetworkError::InvalidParameter { name: "max_hops", .. }
        ));
        let none = PathQuery::default().with_max_paths(0);
        assert!(find_paths(&g, "A", "C", &none, &config).is_err());
        assert!(find_paths(&g, "A", "A", &PathQuery::default(), &config).is_err());
    }

    #[test]
    fn test_max_paths_truncates() {
        let g = graph();
        let query = PathQuery::default().with_max_hops(5).with_max_paths(1);
        let result = find_paths(&g, "X", "Z", &query, &PathfindingConfig::default()).unwrap();
        assert_eq!(result.pathways.len(), 1);
        assert!(result.truncated);
    }

    #[test]
    fn test_strategies() {
        let g = graph();
        let config = PathfindingConfig::default();

        let direct = find_paths(&g, "A", "X", &PathQuery::default(), &config).unwrap();
        assert_eq!(
            direct.pathways[0].strategy,
            "Direct relationship: Alpha Fund funded Xavier Center ($500)."
        );

        let shared = find_paths(&g, "A", "B", &PathQuery::default(), &config).unwrap();
        assert!(shared.pathways[0].strategy.starts_with(
            "Shared grantee referral: Alpha Fund and Beta Trust both fund Youth Arts."
        ));

        let two_hops = PathQuery::default().with_max_hops(2);
        let intro = find_paths(&g, "X", "Z", &two_hops, &config).unwrap();
        assert!(intro.pathways[0].strategy.starts_with(
            "Funder introduction: Gamma Foundation funds both Xavier Center and Zoo Society."
        ));

        let chained = find_paths(&g, "A", "Z", &PathQuery::default(), &config).unwrap();
        assert!(chained
            .pathways
            .iter()
            .all(|p| p.strategy.starts_with("Chained introduction: Alpha Fund -> ")));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "$0");
        assert_eq!(format_amount(999.4), "$999");
        assert_eq!(format_amount(1234.0), "$1,234");
        assert_eq!(format_amount(1_250_000.0), "$1,250,000");
    }
}
