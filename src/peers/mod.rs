//! Peer-group detection
//!
//! Partitions funders into clusters over the similarity graph (funders as
//! nodes, weighted similarity as edge weight). The clustering algorithm is
//! pluggable through [`CommunityDetection`]; Louvain is the default.

use crate::aggregate::FunderPortfolio;
use crate::config::CommunityConfig;
use crate::error::NetworkResult;
use crate::graph::OrgId;
use crate::similarity::{funders_with_grantees, SimilarityPair};
use grantnet_algorithms::{CommunityDetection, GraphView, Louvain};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// A cluster of similar funders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerGroup {
    pub cluster_id: usize,
    /// Sorted, never empty
    pub members: Vec<OrgId>,
    /// Similarity pairs with both ends inside the cluster
    pub internal_edges: usize,
    /// `internal_edges / C(k, 2)`; 0 for singletons
    pub density: f64,
    pub total_funding: f64,
    /// Members with more pairs leaving the cluster than inside it
    pub bridges: Vec<OrgId>,
}

impl PeerGroup {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, funder: &OrgId) -> bool {
        self.members.binary_search(funder).is_ok()
    }
}

impl From<&CommunityConfig> for Louvain {
    fn from(config: &CommunityConfig) -> Self {
        Louvain {
            seed: config.seed,
            resolution: config.resolution,
            max_passes: config.max_passes,
            max_sweeps: config.max_sweeps,
        }
    }
}

/// Partition with the configured Louvain detector
pub fn detect_peer_groups(
    portfolios: &[FunderPortfolio],
    pairs: &[SimilarityPair],
    config: &CommunityConfig,
    include_unresolved: bool,
) -> NetworkResult<Vec<PeerGroup>> {
    detect_with(&Louvain::from(config), portfolios, pairs, include_unresolved)
}

/// Partition with any [`CommunityDetection`] implementation.
///
/// Every distinct funder among `portfolios` lands in exactly one group,
/// including funders with no pair above threshold (as singletons). Fails
/// with `InsufficientData` when fewer than two funders have grantees.
pub fn detect_with<D: CommunityDetection>(
    detector: &D,
    portfolios: &[FunderPortfolio],
    pairs: &[SimilarityPair],
    include_unresolved: bool,
) -> NetworkResult<Vec<PeerGroup>> {
    funders_with_grantees(portfolios, include_unresolved, "community detection")?;

    let mut funders: Vec<&FunderPortfolio> = Vec::with_capacity(portfolios.len());
    let mut seen = HashSet::new();
    for p in portfolios {
        if seen.insert(&p.funder_id) {
            funders.push(p);
        }
    }
    funders.sort_by(|a, b| a.funder_id.cmp(&b.funder_id));

    let index_of: HashMap<&OrgId, usize> = funders
        .iter()
        .enumerate()
        .map(|(i, p)| (&p.funder_id, i))
        .collect();

    let mut edges = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match (index_of.get(&pair.funder_a), index_of.get(&pair.funder_b)) {
            (Some(&a), Some(&b)) if a != b => edges.push((a, b, pair.weighted_score)),
            _ => warn!(
                "Similarity pair {}-{} references an unknown funder; skipped",
                pair.funder_a, pair.funder_b
            ),
        }
    }

    let view = GraphView::from_undirected_edges((0..funders.len() as u64).collect(), &edges);
    let assignment = detector.partition(&view);

    let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &cluster) in assignment.iter().enumerate() {
        clusters.entry(cluster).or_default().push(idx);
    }

    let mut internal = vec![0usize; funders.len()];
    let mut external = vec![0usize; funders.len()];
    let mut internal_by_cluster: HashMap<usize, usize> = HashMap::new();
    for &(a, b, _) in &edges {
        if assignment[a] == assignment[b] {
            internal[a] += 1;
            internal[b] += 1;
            *internal_by_cluster.entry(assignment[a]).or_insert(0) += 1;
        } else {
            external[a] += 1;
            external[b] += 1;
        }
    }

    let groups: Vec<PeerGroup> = clusters
        .into_iter()
        .map(|(cluster_id, members)| {
            let k = members.len();
            let internal_edges = internal_by_cluster.get(&cluster_id).copied().unwrap_or(0);
            let possible = k * k.saturating_sub(1) / 2;
            let density = if possible == 0 {
                0.0
            } else {
                internal_edges as f64 / possible as f64
            };
            let bridges = members
                .iter()
                .filter(|&&i| external[i] > internal[i])
                .map(|&i| funders[i].funder_id.clone())
                .collect();

            PeerGroup {
                cluster_id,
                members: members.iter().map(|&i| funders[i].funder_id.clone()).collect(),
                internal_edges,
                density,
                total_funding: members.iter().map(|&i| funders[i].total_amount()).sum(),
                bridges,
            }
        })
        .collect();

    debug!("Peer group sizes: {:?}", groups.iter().map(|g| g.size()).collect::<Vec<_>>());
    info!(
        "Partitioned {} funder(s) into {} peer group(s)",
        funders.len(),
        groups.len()
    );
    Ok(groups)
}
