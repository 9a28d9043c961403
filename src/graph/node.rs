//! Node implementation for the funding network

use super::property::OrgAttributes;
use super::types::{NodeId, NodeKey, NodeKind, OrgId};
use serde::{Deserialize, Serialize};

/// A funder or recipient node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Dense handle inside the owning graph
    pub id: NodeId,
    /// Identity (kind + organization id)
    pub key: NodeKey,
    /// Display name
    pub name: String,
    /// Enrichment payload (may be empty)
    pub attributes: OrgAttributes,
}

impl GraphNode {
    pub fn new(id: NodeId, key: NodeKey, name: impl Into<String>) -> Self {
        GraphNode {
            id,
            key,
            name: name.into(),
            attributes: OrgAttributes::default(),
        }
    }

    pub fn org_id(&self) -> &OrgId {
        &self.key.id
    }

    pub fn kind(&self) -> NodeKind {
        self.key.kind
    }

    pub fn is_funder(&self) -> bool {
        self.key.kind == NodeKind::Funder
    }

    pub fn is_recipient(&self) -> bool {
        self.key.kind == NodeKind::Recipient
    }
}
