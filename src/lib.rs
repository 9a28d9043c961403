//! Grantnet: foundation network intelligence
//!
//! Turns raw grant disbursement records into a funder network and analyses
//! it: who funds the same organizations, which funders form peer groups,
//! how a nonprofit can reach a prospective funder through existing
//! relationships, and which nodes hold the most influence.
//!
//! # Architecture
//!
//! Data flows strictly forward:
//!
//! - [`aggregate`]: per-funder portfolios with recipient normalization
//! - [`similarity`]: pairwise funder similarity and funder recommendations
//! - [`peers`]: peer-group detection over the similarity graph
//! - [`graph`]: bipartite funder/recipient graph and structural queries
//! - [`algo`]: multi-hop pathways and influence ranking
//! - [`export`]: GraphML and node-link JSON
//!
//! [`analyzer::NetworkAnalyzer`] runs the stages in order with cancellation
//! between them; [`cache::AnalysisCache`] optionally keeps results between
//! runs.
//!
//! ## Example Usage
//!
//! ```rust
//! use grantnet::{AnalysisRequest, EngineConfig, GrantRecord, InMemoryGrantSource, NetworkAnalyzer, OrgId};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), grantnet::NetworkError> {
//! let source = InMemoryGrantSource::new(vec![
//!     GrantRecord::new("A", Some(OrgId::new("X")), "Xavier Center", 5000.0, 2022),
//!     GrantRecord::new("B", Some(OrgId::new("X")), "Xavier Center", 2500.0, 2022),
//! ]);
//! let analyzer = NetworkAnalyzer::new(Arc::new(source), EngineConfig::default())?;
//!
//! let request = AnalysisRequest::new(vec![OrgId::new("A"), OrgId::new("B")], vec![2022]);
//! let report = analyzer.analyze(request).await?;
//!
//! assert_eq!(report.pairs.len(), 1);
//! assert_eq!(report.statistics.edge_count, 2);
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod algo;
pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod peers;
pub mod similarity;

// Re-export main types for convenience
pub use aggregate::{
    bundle_recipients, AggregationReport, FunderPortfolio, FundingBundle, GrantAggregator,
    GrantDataSource, GrantDataset, GrantRecord, InMemoryGrantSource, JsonFileGrantSource,
    MatchKind, RecipientFunding,
};

pub use algo::{
    analyze_influence, find_paths, InfluenceReport, InfluenceScore, InfluenceTier, PathQuery,
    Pathfinder, PathfindingResult, Pathway,
};

pub use analyzer::{AnalysisReport, AnalysisRequest, AnalysisWarning, NetworkAnalyzer};

pub use cache::{AnalysisCache, CacheKey};

pub use config::EngineConfig;

pub use error::{
    ConvergenceWarning, FunderFailure, NetworkError, NetworkResult, PartialDataWarning,
    SourceError,
};

pub use export::{from_node_link, to_graphml, to_node_link, NodeLinkGraph};

pub use graph::{
    FiscalYear, GraphBuilder, GraphStatistics, NetworkGraph, NodeKey, NodeKind, OrgAttributes,
    OrgId, OrgRole, Organization,
};

pub use peers::{detect_peer_groups, PeerGroup};

pub use similarity::{
    compute_similarity, recommend_funders, FunderRecommendation, SimilarityOptions,
    SimilarityPair,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
