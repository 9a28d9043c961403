//! In-memory bipartite funding graph
//!
//! Nodes live in an insertion-ordered map keyed by [`NodeKey`]; a node's
//! position in that map is its [`NodeId`]. Edges are stored in an arena with
//! per-node adjacency lists and a (funder, recipient) index, so every query
//! below runs against the built graph without rebuilding it.

use super::edge::GraphEdge;
use super::node::GraphNode;
use super::types::{EdgeId, FiscalYear, NodeId, NodeKey, NodeKind, OrgId};
use crate::algo::build_view;
use crate::error::{NetworkError, NetworkResult};
use grantnet_algorithms::weakly_connected_components;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Structural summary of a built graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub funder_count: usize,
    pub recipient_count: usize,
    pub edge_count: usize,
    /// edges / (funders * recipients); 0 when either side is empty
    pub density: f64,
    /// 2E / N
    pub average_degree: f64,
    pub component_count: usize,
    pub is_connected: bool,
    pub total_funding: f64,
}

/// One funder of a recipient, from `co_funders_of`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoFunder {
    pub funder_id: OrgId,
    pub funder_name: String,
    pub amount: f64,
    pub years: Vec<FiscalYear>,
    pub grant_count: u32,
}

/// A recipient funded by both funders, from `shared_grantees`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedGrantee {
    pub recipient_id: OrgId,
    pub recipient_name: String,
    pub amount_a: f64,
    pub amount_b: f64,
}

/// Bipartite funder/recipient graph
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    /// Node storage, position == NodeId
    nodes: IndexMap<NodeKey, GraphNode>,
    /// Edge arena, position == EdgeId
    edges: Vec<GraphEdge>,
    /// Incident edges per node
    adjacency: Vec<Vec<EdgeId>>,
    /// (funder, recipient) -> edge
    edge_index: FxHashMap<(NodeId, NodeId), EdgeId>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or return the existing one for `key`.
    ///
    /// An existing node keeps its name unless that name is empty.
    pub fn add_node(&mut self, key: NodeKey, name: impl Into<String>) -> NodeId {
        if let Some(index) = self.nodes.get_index_of(&key) {
            let node = &mut self.nodes[index];
            if node.name.is_empty() {
                node.name = name.into();
            }
            return node.id;
        }

        let id = NodeId::from(self.nodes.len());
        self.nodes.insert(key.clone(), GraphNode::new(id, key, name));
        self.adjacency.push(Vec::new());
        id
    }

    /// Add a funding edge, merging into the existing edge for the same pair.
    ///
    /// `funder` must be a funder node and `recipient` a recipient node; the
    /// weight must be positive and finite.
    pub fn add_edge(
        &mut self,
        funder: NodeId,
        recipient: NodeId,
        weight: f64,
        years: &[FiscalYear],
        grant_count: u32,
    ) -> NetworkResult<EdgeId> {
        match (self.node(funder), self.node(recipient)) {
            (Some(f), Some(r)) if f.is_funder() && r.is_recipient() => {}
            (Some(f), Some(r)) => {
                return Err(NetworkError::invalid_parameter(
                    "edge",
                    format!("{} -> {} does not join a funder to a recipient", f.key, r.key),
                ))
            }
            (None, _) => return Err(NetworkError::unknown("node", funder.to_string())),
            (_, None) => return Err(NetworkError::unknown("node", recipient.to_string())),
        }
        if !(weight.is_finite() && weight > 0.0) {
            return Err(NetworkError::invalid_parameter(
                "weight",
                format!("edge weight must be positive and finite, got {}", weight),
            ));
        }

        if let Some(&existing) = self.edge_index.get(&(funder, recipient)) {
            let edge = &mut self.edges[existing.index()];
            edge.weight += weight;
            let merged: BTreeSet<FiscalYear> =
                edge.years.iter().chain(years.iter()).copied().collect();
            edge.years = merged.into_iter().collect();
            edge.grant_count += grant_count;
            return Ok(existing);
        }

        let id = EdgeId::from(self.edges.len());
        let mut years = years.to_vec();
        years.sort_unstable();
        years.dedup();
        self.edges.push(GraphEdge {
            id,
            funder,
            recipient,
            weight,
            years,
            grant_count,
        });
        self.adjacency[funder.index()].push(id);
        self.adjacency[recipient.index()].push(id);
        self.edge_index.insert((funder, recipient), id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get_index(id.index()).map(|(_, node)| node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_index_mut(id.index()).map(|(_, node)| node)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.edges.get(id.index())
    }

    pub fn node_id(&self, key: &NodeKey) -> Option<NodeId> {
        self.nodes.get_index_of(key).map(NodeId::from)
    }

    /// Resolve a node reference.
    ///
    /// `funder:<id>` and `recipient:<id>` pick a side explicitly; a bare id
    /// resolves to the funder node first, then the recipient node.
    pub fn resolve(&self, id: &str) -> Option<NodeId> {
        if let Some(rest) = id.strip_prefix("funder:") {
            return self.node_id(&NodeKey::funder(rest));
        }
        if let Some(rest) = id.strip_prefix("recipient:") {
            return self.node_id(&NodeKey::recipient(rest));
        }
        self.node_id(&NodeKey::funder(id))
            .or_else(|| self.node_id(&NodeKey::recipient(id)))
    }

    /// Like [`resolve`](Self::resolve), failing with `InvalidIdentifier`
    pub fn require(&self, id: &str) -> NetworkResult<NodeId> {
        self.resolve(id).ok_or_else(|| NetworkError::unknown("node", id))
    }

    fn require_kind(&self, kind: NodeKind, id: &OrgId) -> NetworkResult<NodeId> {
        self.node_id(&NodeKey {
            kind,
            id: id.clone(),
        })
        .ok_or_else(|| NetworkError::unknown(kind.as_str(), id.as_str()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    pub fn funders(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(|n| n.is_funder())
    }

    pub fn recipients(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(|n| n.is_recipient())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges incident to `node`
    pub fn edges_of(&self, node: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.adjacency
            .get(node.index())
            .into_iter()
            .flatten()
            .map(move |e| &self.edges[e.index()])
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency.get(node.index()).map_or(0, Vec::len)
    }

    /// Sum of incident edge weights
    pub fn strength(&self, node: NodeId) -> f64 {
        self.edges_of(node).map(|e| e.weight).sum()
    }

    /// The edge joining `a` and `b`, in either order
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&GraphEdge> {
        self.edge_index
            .get(&(a, b))
            .or_else(|| self.edge_index.get(&(b, a)))
            .map(|e| &self.edges[e.index()])
    }

    pub fn total_funding(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// All funders with an edge to `recipient_id`, largest amount first
    pub fn co_funders_of(&self, recipient_id: &OrgId) -> NetworkResult<Vec<CoFunder>> {
        let recipient = self.require_kind(NodeKind::Recipient, recipient_id)?;

        let mut out: Vec<CoFunder> = self
            .edges_of(recipient)
            .filter_map(|e| {
                let funder = self.node(e.funder)?;
                Some(CoFunder {
                    funder_id: funder.org_id().clone(),
                    funder_name: funder.name.clone(),
                    amount: e.weight,
                    years: e.years.clone(),
                    grant_count: e.grant_count,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.funder_id.cmp(&b.funder_id))
        });
        Ok(out)
    }

    /// Recipients funded by both funders, with each funder's amount.
    ///
    /// Ordered by combined amount (descending), then recipient id.
    pub fn shared_grantees(
        &self,
        funder_a: &OrgId,
        funder_b: &OrgId,
    ) -> NetworkResult<Vec<SharedGrantee>> {
        let a = self.require_kind(NodeKind::Funder, funder_a)?;
        let b = self.require_kind(NodeKind::Funder, funder_b)?;

        let mut out: Vec<SharedGrantee> = self
            .edges_of(a)
            .filter_map(|ea| {
                let eb = self.edge_index.get(&(b, ea.recipient))?;
                let recipient = self.node(ea.recipient)?;
                Some(SharedGrantee {
                    recipient_id: recipient.org_id().clone(),
                    recipient_name: recipient.name.clone(),
                    amount_a: ea.weight,
                    amount_b: self.edges[eb.index()].weight,
                })
            })
            .collect();
        out.sort_by(|x, y| {
            (y.amount_a + y.amount_b)
                .total_cmp(&(x.amount_a + x.amount_b))
                .then_with(|| x.recipient_id.cmp(&y.recipient_id))
        });
        Ok(out)
    }

    /// Induced subgraph: the given funders, their recipients and the edges
    /// between them. Node ids are reassigned.
    pub fn subgraph_for(&self, funder_ids: &[OrgId]) -> NetworkResult<NetworkGraph> {
        let mut funders = Vec::with_capacity(funder_ids.len());
        let mut seen = HashSet::new();
        for id in funder_ids {
            let node = self.require_kind(NodeKind::Funder, id)?;
            if seen.insert(node) {
                funders.push(node);
            }
        }

        let mut sub = NetworkGraph::new();
        for &f in &funders {
            self.copy_node(f, &mut sub);
        }
        for &f in &funders {
            for edge in self.edges_of(f) {
                let new_f = self.copy_node(edge.funder, &mut sub);
                let new_r = self.copy_node(edge.recipient, &mut sub);
                sub.add_edge(new_f, new_r, edge.weight, &edge.years, edge.grant_count)?;
            }
        }
        Ok(sub)
    }

    fn copy_node(&self, id: NodeId, into: &mut NetworkGraph) -> NodeId {
        match self.node(id) {
            Some(node) => {
                let new_id = into.add_node(node.key.clone(), node.name.clone());
                if let Some(copy) = into.node_mut(new_id) {
                    copy.attributes = node.attributes.clone();
                }
                new_id
            }
            None => id,
        }
    }

    pub fn statistics(&self) -> GraphStatistics {
        let node_count = self.node_count();
        let funder_count = self.funders().count();
        let recipient_count = node_count - funder_count;
        let edge_count = self.edge_count();

        let possible = funder_count * recipient_count;
        let density = if possible == 0 {
            0.0
        } else {
            edge_count as f64 / possible as f64
        };
        let average_degree = if node_count == 0 {
            0.0
        } else {
            2.0 * edge_count as f64 / node_count as f64
        };

        let component_count = if node_count == 0 {
            0
        } else {
            weakly_connected_components(&build_view(self)).component_count()
        };

        GraphStatistics {
            node_count,
            funder_count,
            recipient_count,
            edge_count,
            density,
            average_degree,
            component_count,
            is_connected: component_count == 1,
            total_funding: self.total_funding(),
        }
    }
}
