//! Core type definitions for the funding network

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fiscal / tax year of a filing
pub type FiscalYear = i32;

/// Stable organization identifier (tax ID or equivalent)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OrgId(String);

impl OrgId {
    pub fn new(id: impl Into<String>) -> Self {
        OrgId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrgId {
    fn from(s: String) -> Self {
        OrgId(s)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        OrgId(s.to_string())
    }
}

/// Dense handle of a node inside a [`NetworkGraph`](super::NetworkGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(idx: usize) -> Self {
        NodeId(idx as u64)
    }
}

/// Dense handle of an edge inside a [`NetworkGraph`](super::NetworkGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn new(id: u64) -> Self {
        EdgeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl From<usize> for EdgeId {
    fn from(idx: usize) -> Self {
        EdgeId(idx as u64)
    }
}

/// Side of the bipartite graph a node sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Funder,
    Recipient,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Funder => "funder",
            NodeKind::Recipient => "recipient",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Graph identity of a node.
///
/// An organization that both gives and receives grants owns two nodes, one per
/// side, so the graph stays bipartite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub id: OrgId,
}

impl NodeKey {
    pub fn funder(id: impl Into<OrgId>) -> Self {
        NodeKey {
            kind: NodeKind::Funder,
            id: id.into(),
        }
    }

    pub fn recipient(id: impl Into<OrgId>) -> Self {
        NodeKey {
            kind: NodeKind::Recipient,
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_id() {
        let id = OrgId::new("13-1684331");
        assert_eq!(id.as_str(), "13-1684331");
        assert_eq!(format!("{}", id), "13-1684331");

        let id2: OrgId = "94-1156365".into();
        assert!(id < id2);
    }

    #[test]
    fn test_dense_ids() {
        let id = NodeId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{}", id), "NodeId(42)");

        let edge: EdgeId = 7usize.into();
        assert_eq!(format!("{}", edge), "EdgeId(7)");
    }

    #[test]
    fn test_org_id_serializes_transparently() {
        let id = OrgId::new("EIN-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"EIN-1\"");
    }

    #[test]
    fn test_node_key() {
        let f = NodeKey::funder("A");
        let r = NodeKey::recipient("A");
        assert_ne!(f, r);
        assert_eq!(format!("{}", f), "funder:A");
        // Funders order before recipients
        assert!(f < r);
    }

    #[test]
    fn test_node_kind_serde() {
        assert_eq!(serde_json::to_string(&NodeKind::Recipient).unwrap(), "\"recipient\"");
    }
}
