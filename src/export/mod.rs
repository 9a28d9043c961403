//! Graph serialization for external tools
//!
//! GraphML for desktop visualization suites, node-link JSON for the web.

pub mod graphml;
pub mod node_link;

pub use graphml::to_graphml;
pub use node_link::{
    from_node_link, from_node_link_json, to_node_link, NodeLinkEdge, NodeLinkGraph, NodeLinkNode,
    SimilarityLink,
};
