//! Funding edge implementation
//!
//! Every edge joins a funder node to a recipient node. Weight is the total
//! amount funded across the contributing years.

use super::types::{EdgeId, FiscalYear, NodeId};
use serde::{Deserialize, Serialize};

/// A funder -> recipient funding relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    /// Funder side
    pub funder: NodeId,
    /// Recipient side
    pub recipient: NodeId,
    /// Total amount funded (always > 0)
    pub weight: f64,
    /// Fiscal years with at least one grant, ascending
    pub years: Vec<FiscalYear>,
    /// Number of grant records behind the weight
    pub grant_count: u32,
}
