//! Bipartite funding network
//!
//! This module implements the queryable network representation:
//! - Funder and recipient nodes keyed by (kind, organization id)
//! - Funder -> recipient edges weighted by total amount funded
//! - Typed enrichment attributes on nodes
//! - Construction from portfolios and structural queries

pub mod builder;
pub mod edge;
pub mod enrichment;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use builder::GraphBuilder;
pub use edge::GraphEdge;
pub use enrichment::{enrich, DirectoryEnrichment, EnrichmentProvider, EnrichmentSummary};
pub use node::GraphNode;
pub use property::{OrgAttributes, OrgRole, Organization};
pub use store::{CoFunder, GraphStatistics, NetworkGraph, SharedGrantee};
pub use types::{EdgeId, FiscalYear, NodeId, NodeKey, NodeKind, OrgId};
