pub mod common;
pub mod pagerank;
pub mod community;
pub mod pathfinding;
pub mod centrality;

pub use common::{GraphView, NodeId};
pub use pagerank::{page_rank, PageRankConfig, PageRankResult};
pub use community::{
    modularity, weakly_connected_components, CommunityDetection, Louvain, WccResult,
};
pub use pathfinding::{all_simple_paths, bfs_distances, SimplePaths};
pub use centrality::{closeness_centrality, degree_centrality};
