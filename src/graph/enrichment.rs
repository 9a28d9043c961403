//! Optional node enrichment
//!
//! Decorates graph nodes with organization attributes from an external
//! provider. Enrichment never blocks graph construction: a provider error or
//! a missing profile leaves the node's attributes as they were.

use super::property::Organization;
use super::store::NetworkGraph;
use super::types::OrgId;
use crate::error::SourceError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Source of organization profiles
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Profile for `org_id`, or `None` when the provider has nothing on it
    async fn get_organization_attributes(
        &self,
        org_id: &OrgId,
    ) -> Result<Option<Organization>, SourceError>;
}

/// Provider backed by a fixed set of organizations
#[derive(Debug, Clone, Default)]
pub struct DirectoryEnrichment {
    organizations: HashMap<OrgId, Organization>,
}

impl DirectoryEnrichment {
    pub fn new(organizations: impl IntoIterator<Item = Organization>) -> Self {
        DirectoryEnrichment {
            organizations: organizations
                .into_iter()
                .map(|org| (org.id.clone(), org))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.organizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty()
    }
}

#[async_trait]
impl EnrichmentProvider for DirectoryEnrichment {
    async fn get_organization_attributes(
        &self,
        org_id: &OrgId,
    ) -> Result<Option<Organization>, SourceError> {
        Ok(self.organizations.get(org_id).cloned())
    }
}

/// Outcome counts of one enrichment pass, per distinct organization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    pub enriched: usize,
    pub missing: usize,
    pub failed: usize,
}

/// Look up every organization in the graph and merge the returned attributes
/// into its node(s). Nodes whose name is empty or just the identifier take
/// the provider's display name.
pub async fn enrich(
    graph: &mut NetworkGraph,
    provider: &dyn EnrichmentProvider,
) -> EnrichmentSummary {
    let ids: BTreeSet<OrgId> = graph.nodes().map(|n| n.org_id().clone()).collect();

    let lookups: Vec<(OrgId, Result<Option<Organization>, SourceError>)> = stream::iter(ids)
        .map(|id| async move {
            let result = provider.get_organization_attributes(&id).await;
            (id, result)
        })
        .buffered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await;

    let mut by_org: HashMap<OrgId, Vec<_>> = HashMap::new();
    for node in graph.nodes() {
        by_org.entry(node.org_id().clone()).or_default().push(node.id);
    }

    let mut summary = EnrichmentSummary::default();
    for (id, result) in lookups {
        let org = match result {
            Ok(Some(org)) => org,
            Ok(None) => {
                debug!("No enrichment profile for {}", id);
                summary.missing += 1;
                continue;
            }
            Err(e) => {
                warn!("Enrichment lookup failed for {}: {}", id, e);
                summary.failed += 1;
                continue;
            }
        };

        for &node_id in by_org.get(&id).into_iter().flatten() {
            if let Some(node) = graph.node_mut(node_id) {
                node.attributes.merge(&org.attributes);
                if node.name.is_empty() || node.name == id.as_str() {
                    node.name = org.name.clone();
                }
            }
        }
        summary.enriched += 1;
    }

    info!(
        "Enrichment: {} enriched, {} missing, {} failed",
        summary.enriched, summary.missing, summary.failed
    );
    summary
}
