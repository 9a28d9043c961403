//! Node-link JSON
//!
//! A flat `nodes` / `links` document for web renderers (d3, vis.js and
//! friends). Node ids are the node key strings (`funder:<id>`,
//! `recipient:<id>`) so an organization on both sides stays two nodes.

use crate::error::{NetworkError, NetworkResult};
use crate::graph::{FiscalYear, NetworkGraph, NodeKey, NodeKind, OrgAttributes, OrgId};
use crate::similarity::SimilarityPair;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkNode {
    /// Node key string, unique within the document
    pub id: String,
    pub org_id: OrgId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub attributes: OrgAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkEdge {
    /// Funder node id
    pub source: String,
    /// Recipient node id
    pub target: String,
    pub weight: f64,
    #[serde(default)]
    pub years: Vec<FiscalYear>,
    #[serde(default)]
    pub grant_count: u32,
}

/// Funder-to-funder similarity overlay, for display only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityLink {
    pub source: String,
    pub target: String,
    pub weighted_score: f64,
    pub raw_score: f64,
    pub shared_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    pub directed: bool,
    pub bipartite: bool,
    pub nodes: Vec<NodeLinkNode>,
    pub links: Vec<NodeLinkEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_links: Option<Vec<SimilarityLink>>,
}

impl NodeLinkGraph {
    pub fn to_json(&self) -> NetworkResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> NetworkResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Convert the graph to a node-link document.
///
/// When `pairs` is given, pairs whose funders are both in the graph become
/// `similarity_links`.
pub fn to_node_link(graph: &NetworkGraph, pairs: Option<&[SimilarityPair]>) -> NodeLinkGraph {
    let nodes = graph
        .nodes()
        .map(|node| NodeLinkNode {
            id: node.key.to_string(),
            org_id: node.org_id().clone(),
            name: node.name.clone(),
            kind: node.kind(),
            attributes: node.attributes.clone(),
        })
        .collect();

    let links = graph
        .edges()
        .filter_map(|edge| {
            let funder = graph.node(edge.funder)?;
            let recipient = graph.node(edge.recipient)?;
            Some(NodeLinkEdge {
                source: funder.key.to_string(),
                target: recipient.key.to_string(),
                weight: edge.weight,
                years: edge.years.clone(),
                grant_count: edge.grant_count,
            })
        })
        .collect();

    let similarity_links = pairs.map(|pairs| {
        pairs
            .iter()
            .filter_map(|pair| {
                let a = NodeKey::funder(pair.funder_a.clone());
                let b = NodeKey::funder(pair.funder_b.clone());
                graph.node_id(&a)?;
                graph.node_id(&b)?;
                Some(SimilarityLink {
                    source: a.to_string(),
                    target: b.to_string(),
                    weighted_score: pair.weighted_score,
                    raw_score: pair.raw_score,
                    shared_count: pair.shared_count,
                })
            })
            .collect()
    });

    NodeLinkGraph {
        directed: true,
        bipartite: true,
        nodes,
        links,
        similarity_links,
    }
}

/// Rebuild a graph from a node-link document.
///
/// Similarity links are ignored. Every link must join a funder node to a
/// recipient node with a positive weight.
pub fn from_node_link(doc: &NodeLinkGraph) -> NetworkResult<NetworkGraph> {
    let mut graph = NetworkGraph::new();
    let mut ids = FxHashMap::default();

    for node in &doc.nodes {
        let key = NodeKey {
            kind: node.kind,
            id: node.org_id.clone(),
        };
        if key.to_string() != node.id {
            return Err(NetworkError::Import(format!(
                "node id '{}' does not match its type and org_id ({})",
                node.id, key
            )));
        }
        if ids.contains_key(node.id.as_str()) {
            return Err(NetworkError::Import(format!("duplicate node id '{}'", node.id)));
        }
        let id = graph.add_node(key, node.name.clone());
        if let Some(added) = graph.node_mut(id) {
            added.attributes = node.attributes.clone();
        }
        ids.insert(node.id.as_str(), id);
    }

    for (i, link) in doc.links.iter().enumerate() {
        let lookup = |end: &str| {
            ids.get(end).copied().ok_or_else(|| {
                NetworkError::Import(format!("link {} references unknown node '{}'", i, end))
            })
        };
        let source = lookup(&link.source)?;
        let target = lookup(&link.target)?;
        graph
            .add_edge(source, target, link.weight, &link.years, link.grant_count)
            .map_err(|e| NetworkError::Import(format!("link {}: {}", i, e)))?;
    }

    Ok(graph)
}

pub fn from_node_link_json(json: &str) -> NetworkResult<NetworkGraph> {
    from_node_link(&NodeLinkGraph::from_json(json)?)
}
