//! Grant aggregation
//!
//! Fetches raw grant records per funder, resolves recipients and folds the
//! records into one [`FunderPortfolio`] per funder. Retrieval failures are
//! tolerated per funder; only a batch where every funder failed is fatal.

pub mod bundle;
pub mod normalize;
pub mod portfolio;
pub mod record;
pub mod source;

pub use bundle::{bundle_recipients, BundleContribution, FundingBundle};
pub use normalize::{canonical_name, NormalizedRecipient, RecipientNormalizer};
pub use portfolio::{FunderPortfolio, MatchKind, RecipientFunding};
pub use record::GrantRecord;
pub use source::{GrantDataSource, GrantDataset, InMemoryGrantSource, JsonFileGrantSource};

use crate::config::{AggregationConfig, EngineConfig, NormalizationConfig};
use crate::error::{FunderFailure, NetworkError, NetworkResult, PartialDataWarning, SourceError};
use crate::graph::{FiscalYear, OrgId, Organization};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Portfolios for one batch, plus any per-funder retrieval failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// One portfolio per successfully fetched funder, in request order
    pub portfolios: Vec<FunderPortfolio>,
    pub partial: Option<PartialDataWarning>,
}

impl AggregationReport {
    pub fn get(&self, funder_id: &OrgId) -> Option<&FunderPortfolio> {
        self.portfolios.iter().find(|p| &p.funder_id == funder_id)
    }

    /// Funders whose portfolio holds at least one funded recipient
    pub fn funders_with_data(&self, include_unresolved: bool) -> Vec<&OrgId> {
        self.portfolios
            .iter()
            .filter(|p| p.funded_rows(include_unresolved).next().is_some())
            .map(|p| &p.funder_id)
            .collect()
    }

    pub fn is_partial(&self) -> bool {
        self.partial.is_some()
    }
}

/// Builds funder portfolios from a [`GrantDataSource`]
pub struct GrantAggregator {
    source: Arc<dyn GrantDataSource>,
    aggregation: AggregationConfig,
    normalization: NormalizationConfig,
    directory: Vec<Organization>,
}

impl GrantAggregator {
    pub fn new(source: Arc<dyn GrantDataSource>, config: &EngineConfig) -> Self {
        GrantAggregator {
            source,
            aggregation: config.aggregation.clone(),
            normalization: config.normalization.clone(),
            directory: Vec::new(),
        }
    }

    /// Known organizations used for recipient matching and funder display names
    pub fn with_directory(mut self, organizations: impl IntoIterator<Item = Organization>) -> Self {
        self.directory.extend(organizations);
        self
    }

    /// Aggregate every requested funder over the requested years.
    ///
    /// Duplicate funder ids are collapsed. A funder with no filings in range
    /// yields an empty portfolio.
    pub async fn aggregate(
        &self,
        funder_ids: &[OrgId],
        years: &[FiscalYear],
    ) -> NetworkResult<AggregationReport> {
        let mut seen = HashSet::new();
        let funders: Vec<OrgId> = funder_ids
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        let mut years = years.to_vec();
        years.sort_unstable();
        years.dedup();

        if funders.is_empty() {
            return Ok(AggregationReport {
                portfolios: Vec::new(),
                partial: None,
            });
        }

        info!(
            "Aggregating {} funder(s) over {} fiscal year(s)",
            funders.len(),
            years.len()
        );

        let fetched = self.fetch_all(&funders, &years).await;

        let names: HashMap<&OrgId, &str> = self
            .directory
            .iter()
            .map(|org| (&org.id, org.name.as_str()))
            .collect();
        let mut normalizer = RecipientNormalizer::new(self.normalization.clone(), &self.directory);
        let year_set: HashSet<FiscalYear> = years.iter().copied().collect();

        let mut portfolios = Vec::with_capacity(fetched.len());
        let mut failures = Vec::new();

        for (funder_id, result) in fetched {
            let records = match result {
                Ok(records) => records,
                Err(e) => {
                    warn!("Failed to fetch grants for funder {}: {}", funder_id, e);
                    failures.push(FunderFailure {
                        funder_id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let name = names
                .get(&funder_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| funder_id.to_string());
            let mut portfolio = FunderPortfolio::new(funder_id.clone(), name, &years);

            for record in &records {
                if record.funder_id != funder_id || !year_set.contains(&record.fiscal_year) {
                    continue;
                }
                if !record.is_well_formed() {
                    warn!(
                        "Rejected malformed grant from {} to '{}': amount {}",
                        funder_id, record.recipient_name, record.amount
                    );
                    portfolio.rejected_records += 1;
                    continue;
                }
                let recipient =
                    normalizer.normalize(record.recipient_id.as_ref(), &record.recipient_name);
                portfolio.add(&recipient, record, self.aggregation.per_year_breakdown);
            }

            debug!(
                "Funder {}: {} record(s), {} recipient(s), {} rejected",
                funder_id,
                portfolio.record_count,
                portfolio.recipients.len(),
                portfolio.rejected_records
            );
            portfolios.push(portfolio);
        }

        if portfolios.is_empty() {
            return Err(NetworkError::DataSource {
                requested: funders.len(),
                failures,
            });
        }

        let partial = if failures.is_empty() {
            None
        } else {
            warn!(
                "Partial aggregation: {} of {} funder(s) failed",
                failures.len(),
                funders.len()
            );
            Some(PartialDataWarning { failures })
        };

        info!("Aggregated {} portfolio(s)", portfolios.len());
        Ok(AggregationReport { portfolios, partial })
    }

    /// Fetch concurrently, bounded by `max_concurrent_fetches`, preserving input order
    async fn fetch_all(
        &self,
        funders: &[OrgId],
        years: &[FiscalYear],
    ) -> Vec<(OrgId, Result<Vec<GrantRecord>, SourceError>)> {
        let timeout_secs = self.aggregation.fetch_timeout_secs;
        let timeout = Duration::from_secs(timeout_secs);
        let limit = self.aggregation.max_concurrent_fetches.max(1);

        stream::iter(funders.iter().cloned())
            .map(|funder_id| {
                let source = Arc::clone(&self.source);
                async move {
                    let fetch = source.get_grant_records(&funder_id, years);
                    let result = match tokio::time::timeout(timeout, fetch).await {
                        Ok(result) => result,
                        Err(_) => Err(SourceError::Timeout(timeout_secs)),
                    };
                    (funder_id, result)
                }
            })
            .buffered(limit)
            .collect()
            .await
    }
}
