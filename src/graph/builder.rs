//! Graph construction from funder portfolios

use super::store::NetworkGraph;
use super::types::{NodeKey, OrgId};
use crate::aggregate::FunderPortfolio;
use crate::config::AggregationConfig;
use crate::error::NetworkResult;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Builds a [`NetworkGraph`] from portfolios.
///
/// One funder node per portfolio (even with no grants), one recipient node
/// per distinct funded recipient, one edge per funded (funder, recipient)
/// row. Funders are inserted in id order, then recipients in id order.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    include_unresolved: bool,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AggregationConfig) -> Self {
        GraphBuilder {
            include_unresolved: config.include_unresolved,
        }
    }

    /// Keep recipients that could not be matched to a known organization
    pub fn include_unresolved(mut self, include: bool) -> Self {
        self.include_unresolved = include;
        self
    }

    pub fn includes_unresolved(&self) -> bool {
        self.include_unresolved
    }

    pub fn build(&self, portfolios: &[FunderPortfolio]) -> NetworkResult<NetworkGraph> {
        let mut seen = HashSet::new();
        let mut funders: Vec<&FunderPortfolio> = portfolios
            .iter()
            .filter(|p| seen.insert(&p.funder_id))
            .collect();
        funders.sort_by(|a, b| a.funder_id.cmp(&b.funder_id));

        let mut recipients: BTreeMap<&OrgId, &str> = BTreeMap::new();
        for p in &funders {
            for row in p.funded_rows(self.include_unresolved) {
                recipients
                    .entry(&row.recipient_id)
                    .or_insert(row.recipient_name.as_str());
            }
        }

        let mut graph = NetworkGraph::new();
        let funder_nodes: Vec<_> = funders
            .iter()
            .map(|p| graph.add_node(NodeKey::funder(p.funder_id.clone()), p.funder_name.clone()))
            .collect();
        for (id, name) in &recipients {
            graph.add_node(NodeKey::recipient((*id).clone()), *name);
        }

        for (p, &funder) in funders.iter().zip(&funder_nodes) {
            let mut edges = 0usize;
            for row in p.funded_rows(self.include_unresolved) {
                let Some(recipient) = graph.node_id(&NodeKey::recipient(row.recipient_id.clone()))
                else {
                    continue;
                };
                let years: Vec<_> = row.years.iter().copied().collect();
                graph.add_edge(funder, recipient, row.total_amount, &years, row.grant_count)?;
                edges += 1;
            }
            debug!("Funder {}: {} edge(s)", p.funder_id, edges);
        }

        info!(
            "Built graph: {} funder(s), {} recipient(s), {} edge(s)",
            funder_nodes.len(),
            recipients.len(),
            graph.edge_count()
        );
        Ok(graph)
    }
}
