//! Funder-targeting recommendations
//!
//! Given the funders a caller already works with, rank every other funder by
//! how similar it is to that set.

use super::{pair_index, SimilarityPair};
use crate::config::RecommendationConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::graph::OrgId;
use crate::peers::PeerGroup;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::warn;

/// Recommendation confidence tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn for_score(score: f64, config: &RecommendationConfig) -> Self {
        if score >= config.high_score {
            ConfidenceTier::High
        } else if score >= config.medium_score {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A funder worth approaching, with the evidence behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunderRecommendation {
    pub funder_id: OrgId,
    /// Mean weighted similarity to the linked existing funders
    pub score: f64,
    pub tier: ConfidenceTier,
    /// Existing funders this candidate is similar to, sorted
    pub linked_funders: Vec<OrgId>,
    /// Distinct grantees shared with the existing set
    pub shared_grantees: usize,
    pub evidence: Vec<String>,
}

/// Rank candidate funders by similarity to `existing`.
///
/// Only funders linked to the existing set by at least one pair are
/// candidates. Results are ordered by score, then link count (both
/// descending), then id, and cut at `config.max_results`.
pub fn recommend_funders(
    existing: &[OrgId],
    pairs: &[SimilarityPair],
    peer_groups: &[PeerGroup],
    config: &RecommendationConfig,
) -> NetworkResult<Vec<FunderRecommendation>> {
    if existing.is_empty() {
        return Err(NetworkError::invalid_parameter(
            "existing",
            "at least one existing funder is required",
        ));
    }

    let index = pair_index(pairs);
    let group_of: HashMap<&OrgId, &PeerGroup> = peer_groups
        .iter()
        .flat_map(|g| g.members.iter().map(move |m| (m, g)))
        .collect();

    let existing: HashSet<&OrgId> = existing.iter().collect();
    for id in &existing {
        if !index.contains_key(*id) && !group_of.contains_key(*id) {
            warn!("Existing funder {} not present in the analysis; ignored", id);
        }
    }

    // candidate -> linked existing funder -> pair
    let mut links: BTreeMap<&OrgId, BTreeMap<&OrgId, &SimilarityPair>> = BTreeMap::new();
    for pair in pairs {
        for (mine, theirs) in [(&pair.funder_a, &pair.funder_b), (&pair.funder_b, &pair.funder_a)] {
            if existing.contains(mine) && !existing.contains(theirs) {
                links.entry(theirs).or_default().insert(mine, pair);
            }
        }
    }

    let mut recommendations: Vec<FunderRecommendation> = links
        .into_iter()
        .map(|(candidate, linked)| {
            let score =
                linked.values().map(|p| p.weighted_score).sum::<f64>() / linked.len() as f64;

            let mut shared: HashSet<&OrgId> = HashSet::new();
            let mut evidence = Vec::with_capacity(linked.len() + 1);
            for (funder, pair) in &linked {
                shared.extend(pair.shared_recipients.iter());
                evidence.push(format!(
                    "Shares {} grantee(s) with {} (similarity {:.2})",
                    pair.shared_count, funder, pair.weighted_score
                ));
            }

            if let Some(group) = group_of.get(candidate) {
                let mut peers: Vec<&str> = group
                    .members
                    .iter()
                    .filter(|m| existing.contains(m))
                    .map(|m| m.as_str())
                    .collect();
                if !peers.is_empty() {
                    peers.sort_unstable();
                    evidence.push(format!(
                        "Same peer group ({}) as {}",
                        group.cluster_id,
                        peers.join(", ")
                    ));
                }
            }

            FunderRecommendation {
                funder_id: candidate.clone(),
                score,
                tier: ConfidenceTier::for_score(score, config),
                linked_funders: linked.keys().map(|id| (*id).clone()).collect(),
                shared_grantees: shared.len(),
                evidence,
            }
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.linked_funders.len().cmp(&a.linked_funders.len()))
            .then_with(|| a.funder_id.cmp(&b.funder_id))
    });
    recommendations.truncate(config.max_results);
    Ok(recommendations)
}
