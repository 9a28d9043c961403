//! Graph algorithms module
//!
//! The algorithms themselves live in the `grantnet-algorithms` crate and run
//! over a dense [`GraphView`]. This module provides the adapter from
//! [`NetworkGraph`] plus the network-level analyses built on top: multi-hop
//! pathways and influence ranking.

pub mod influence;
pub mod pathway;

pub use influence::{analyze_influence, InfluenceReport, InfluenceScore, InfluenceTier};
pub use pathway::{
    cultivation_strategy, find_paths, format_amount, PathQuery, PathStep, Pathfinder,
    PathfindingResult, Pathway,
};

use crate::graph::NetworkGraph;
use grantnet_algorithms::GraphView;

/// Build an undirected view of the funding graph for algorithm execution.
///
/// Dense index `i` is the node with `NodeId(i)`; edge weights are funded
/// amounts.
pub fn build_view(graph: &NetworkGraph) -> GraphView {
    let index_to_node: Vec<u64> = graph.nodes().map(|n| n.id.as_u64()).collect();
    let edges: Vec<(usize, usize, f64)> = graph
        .edges()
        .map(|e| (e.funder.index(), e.recipient.index(), e.weight))
        .collect();
    GraphView::from_undirected_edges(index_to_node, &edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKey;

    #[test]
    fn test_build_view_mirrors_graph() {
        let mut g = NetworkGraph::new();
        let a = g.add_node(NodeKey::funder("A"), "A");
        let x = g.add_node(NodeKey::recipient("X"), "X");
        let y = g.add_node(NodeKey::recipient("Y"), "Y");
        g.add_edge(a, x, 10.0, &[2022], 1).unwrap();
        g.add_edge(a, y, 30.0, &[2022], 1).unwrap();

        let view = build_view(&g);
        assert_eq!(view.node_count, 3);
        assert_eq!(view.neighbors(a.index()), &[x.index(), y.index()]);
        assert_eq!(view.neighbors(y.index()), &[a.index()]);
        assert_eq!(
            view.weighted_neighbors(y.index()).collect::<Vec<_>>(),
            vec![(a.index(), 30.0)]
        );
        assert_eq!(view.strength(a.index()), 40.0);
    }
}
