//! Pipeline orchestration
//!
//! [`NetworkAnalyzer`] runs the full batch (aggregation, similarity, peer
//! groups, recommendations, graph, influence) in dependency order and also
//! exposes each stage on its own. A run can be cancelled between stages
//! through the analyzer's [`CancellationToken`].

use crate::aggregate::{AggregationReport, FunderPortfolio, GrantAggregator, GrantDataSource};
use crate::algo::{analyze_influence, InfluenceReport, PathQuery, Pathfinder, PathfindingResult};
use crate::cache::{AnalysisCache, CacheKey};
use crate::config::EngineConfig;
use crate::error::{ConvergenceWarning, NetworkError, NetworkResult, PartialDataWarning};
use crate::graph::{
    enrich, EnrichmentProvider, EnrichmentSummary, FiscalYear, GraphBuilder, GraphStatistics,
    NetworkGraph, OrgId, Organization,
};
use crate::peers::{detect_peer_groups, PeerGroup};
use crate::similarity::{
    compute_similarity, recommend_funders, FunderRecommendation, SimilarityOptions, SimilarityPair,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Input for a full analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub funders: Vec<OrgId>,
    pub years: Vec<FiscalYear>,
    /// Overrides `similarity.threshold`
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Funders the caller already works with; enables recommendations
    #[serde(default)]
    pub existing: Vec<OrgId>,
    /// Overrides `aggregation.include_unresolved`
    #[serde(default)]
    pub include_unresolved: Option<bool>,
}

impl AnalysisRequest {
    pub fn new(funders: Vec<OrgId>, years: Vec<FiscalYear>) -> Self {
        AnalysisRequest {
            funders,
            years,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_existing(mut self, existing: Vec<OrgId>) -> Self {
        self.existing = existing;
        self
    }

    pub fn include_unresolved(mut self, include: bool) -> Self {
        self.include_unresolved = Some(include);
        self
    }
}

/// Non-fatal conditions collected during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    PartialData(PartialDataWarning),
    /// Similarity, peer groups and recommendations were skipped
    InsufficientData {
        operation: String,
        available: usize,
        funders_with_data: Vec<OrgId>,
    },
    Convergence(ConvergenceWarning),
}

/// Everything one run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub aggregation: AggregationReport,
    pub pairs: Vec<SimilarityPair>,
    pub peer_groups: Vec<PeerGroup>,
    pub recommendations: Vec<FunderRecommendation>,
    pub statistics: GraphStatistics,
    pub influence: InfluenceReport,
    pub enrichment: Option<EnrichmentSummary>,
    pub warnings: Vec<AnalysisWarning>,
    #[serde(skip)]
    pub graph: Arc<NetworkGraph>,
}

impl AnalysisReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

pub struct NetworkAnalyzer {
    config: EngineConfig,
    source: Arc<dyn GrantDataSource>,
    directory: Vec<Organization>,
    enrichment: Option<Arc<dyn EnrichmentProvider>>,
    cache: Option<Arc<AnalysisCache>>,
    cancel: CancellationToken,
}

impl NetworkAnalyzer {
    /// Create an analyzer over `source`. The configuration is validated here.
    pub fn new(source: Arc<dyn GrantDataSource>, config: EngineConfig) -> NetworkResult<Self> {
        config.validate()?;
        Ok(NetworkAnalyzer {
            config,
            source,
            directory: Vec::new(),
            enrichment: None,
            cache: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Known organizations for recipient matching and display names
    pub fn with_directory(mut self, organizations: impl IntoIterator<Item = Organization>) -> Self {
        self.directory.extend(organizations);
        self
    }

    pub fn with_enrichment(mut self, provider: Arc<dyn EnrichmentProvider>) -> Self {
        self.enrichment = Some(provider);
        self
    }

    pub fn with_cache(mut self, cache: Arc<AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token observed between stages; cancel it to stop a run early
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn checkpoint(&self, stage: &'static str) -> NetworkResult<()> {
        if self.cancel.is_cancelled() {
            warn!("Analysis cancelled before {}", stage);
            return Err(NetworkError::Cancelled { stage });
        }
        Ok(())
    }

    fn include_unresolved(&self, request: Option<bool>) -> bool {
        request.unwrap_or(self.config.aggregation.include_unresolved)
    }

    /// Aggregate portfolios, reading through the cache when one is attached
    pub async fn aggregate(
        &self,
        funders: &[OrgId],
        years: &[FiscalYear],
    ) -> NetworkResult<AggregationReport> {
        let key = CacheKey::new(funders, years);
        if let Some(cache) = &self.cache {
            if let Some(entry) = cache.get(&key).await {
                info!("Using cached aggregation from {}", entry.computed_at);
                return Ok(entry.report);
            }
        }

        let report = GrantAggregator::new(Arc::clone(&self.source), &self.config)
            .with_directory(self.directory.iter().cloned())
            .aggregate(funders, years)
            .await?;

        if let Some(cache) = &self.cache {
            cache.put(key, report.clone()).await;
        }
        Ok(report)
    }

    pub fn similarity(
        &self,
        portfolios: &[FunderPortfolio],
        threshold: Option<f64>,
        include_unresolved: bool,
    ) -> NetworkResult<Vec<SimilarityPair>> {
        let mut options =
            SimilarityOptions::from_config(&self.config.similarity, include_unresolved);
        if let Some(threshold) = threshold {
            options = options.with_threshold(threshold);
        }
        compute_similarity(portfolios, &options, &self.config.similarity)
    }

    pub fn peer_groups(
        &self,
        portfolios: &[FunderPortfolio],
        pairs: &[SimilarityPair],
        include_unresolved: bool,
    ) -> NetworkResult<Vec<PeerGroup>> {
        detect_peer_groups(portfolios, pairs, &self.config.community, include_unresolved)
    }

    pub fn recommend(
        &self,
        existing: &[OrgId],
        pairs: &[SimilarityPair],
        peer_groups: &[PeerGroup],
    ) -> NetworkResult<Vec<FunderRecommendation>> {
        recommend_funders(existing, pairs, peer_groups, &self.config.recommendation)
    }

    /// Build the bipartite graph and decorate it when an enrichment provider
    /// is attached
    pub async fn build_graph(
        &self,
        portfolios: &[FunderPortfolio],
        include_unresolved: bool,
    ) -> NetworkResult<(NetworkGraph, Option<EnrichmentSummary>)> {
        let mut graph = GraphBuilder::new()
            .include_unresolved(include_unresolved)
            .build(portfolios)?;
        let summary = match &self.enrichment {
            Some(provider) => Some(enrich(&mut graph, provider.as_ref()).await),
            None => None,
        };
        Ok((graph, summary))
    }

    /// Paths between two node identifiers; `max_hops` defaults to the
    /// configured hop count
    pub fn find_paths(
        &self,
        graph: &NetworkGraph,
        source: &str,
        target: &str,
        max_hops: Option<usize>,
    ) -> NetworkResult<PathfindingResult> {
        let mut query = PathQuery::from_config(&self.config.pathfinding);
        if let Some(hops) = max_hops {
            query = query.with_max_hops(hops);
        }
        Pathfinder::new(graph, &self.config.pathfinding).find_paths(source, target, &query)
    }

    pub fn influence(&self, graph: &NetworkGraph) -> InfluenceReport {
        analyze_influence(graph, &self.config.influence)
    }

    /// Run every stage in order.
    ///
    /// Insufficient data for similarity is reported as a warning and the
    /// graph stages still run. Any other stage error ends the run.
    pub async fn analyze(&self, request: AnalysisRequest) -> NetworkResult<AnalysisReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("analysis", %run_id, funders = request.funders.len());
        self.run(run_id, request).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, request: AnalysisRequest) -> NetworkResult<AnalysisReport> {
        let started_at = Utc::now();
        let include_unresolved = self.include_unresolved(request.include_unresolved);
        let mut warnings = Vec::new();

        self.checkpoint("aggregation")?;
        let aggregation = self.aggregate(&request.funders, &request.years).await?;
        if let Some(partial) = &aggregation.partial {
            warnings.push(AnalysisWarning::PartialData(partial.clone()));
        }
        let portfolios = &aggregation.portfolios;

        self.checkpoint("similarity")?;
        let pairs = match self.similarity(portfolios, request.threshold, include_unresolved) {
            Ok(pairs) => Some(pairs),
            Err(NetworkError::InsufficientData {
                operation,
                available,
                funders_with_data,
            }) => {
                warn!("Skipping similarity: {} funder(s) with grants", available);
                warnings.push(AnalysisWarning::InsufficientData {
                    operation: operation.to_string(),
                    available,
                    funders_with_data,
                });
                None
            }
            Err(e) => return Err(e),
        };

        let (pairs, peer_groups, recommendations) = match pairs {
            Some(pairs) => {
                self.checkpoint("peer groups")?;
                let groups = self.peer_groups(portfolios, &pairs, include_unresolved)?;

                self.checkpoint("recommendations")?;
                let recommendations = if request.existing.is_empty() {
                    Vec::new()
                } else {
                    self.recommend(&request.existing, &pairs, &groups)?
                };
                (pairs, groups, recommendations)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        self.checkpoint("graph")?;
        let (graph, enrichment) = self.graph_for(&request, portfolios, include_unresolved).await?;
        let statistics = graph.statistics();

        self.checkpoint("influence")?;
        let influence = self.influence(&graph);
        if let Some(convergence) = influence.convergence {
            warnings.push(AnalysisWarning::Convergence(convergence));
        }

        info!(
            "Analysis complete: {} pair(s), {} peer group(s), {} node(s), {} warning(s)",
            pairs.len(),
            peer_groups.len(),
            statistics.node_count,
            warnings.len()
        );

        Ok(AnalysisReport {
            run_id,
            started_at,
            aggregation,
            pairs,
            peer_groups,
            recommendations,
            statistics,
            influence,
            enrichment,
            warnings,
            graph,
        })
    }

    /// Cached graph when available; enriched graphs are always built fresh
    async fn graph_for(
        &self,
        request: &AnalysisRequest,
        portfolios: &[FunderPortfolio],
        include_unresolved: bool,
    ) -> NetworkResult<(Arc<NetworkGraph>, Option<EnrichmentSummary>)> {
        if let (Some(cache), None) = (&self.cache, &self.enrichment) {
            let key = CacheKey::new(&request.funders, &request.years);
            let builder = GraphBuilder::new().include_unresolved(include_unresolved);
            if let Some(graph) = cache.graph_for(&key, &builder).await? {
                return Ok((graph, None));
            }
        }
        let (graph, summary) = self.build_graph(portfolios, include_unresolved).await?;
        Ok((Arc::new(graph), summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{GrantRecord, InMemoryGrantSource};

    fn grant(funder: &str, recipient: &str, amount: f64, year: FiscalYear) -> GrantRecord {
        GrantRecord::new(funder, Some(OrgId::new(recipient)), recipient, amount, year)
    }

    fn source() -> Arc<dyn GrantDataSource> {
        Arc::new(InMemoryGrantSource::new(vec![
            grant("A", "X", 1000.0, 2022),
            grant("A", "Y", 2000.0, 2022),
            grant("B", "X", 500.0, 2022),
            grant("B", "Y", 700.0, 2023),
            grant("C", "Z", 900.0, 2023),
        ]))
    }

    fn ids(raw: &[&str]) -> Vec<OrgId> {
        raw.iter().map(|s| OrgId::new(*s)).collect()
    }

    #[tokio::test]
    async fn test_full_run() {
        let analyzer = NetworkAnalyzer::new(source(), EngineConfig::default()).unwrap();
        let request = AnalysisRequest::new(ids(&["A", "B", "C"]), vec![2022, 2023])
            .with_existing(ids(&["A"]));
        let report = analyzer.analyze(request).await.unwrap();

        assert_eq!(report.aggregation.portfolios.len(), 3);
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.pairs[0].funder_a, OrgId::new("A"));
        assert_eq!(report.pairs[0].funder_b, OrgId::new("B"));

        let grouped: usize = report.peer_groups.iter().map(|g| g.size()).sum();
        assert_eq!(grouped, 3);

        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].funder_id, OrgId::new("B"));

        assert_eq!(report.statistics.funder_count, 3);
        assert_eq!(report.statistics.recipient_count, 3);
        assert_eq!(report.statistics.edge_count, 5);
        assert_eq!(report.influence.scores.len(), 6);
        assert!(!report.has_warnings());
    }

    #[tokio::test]
    async fn test_single_funder_warns_but_builds_graph() {
        let analyzer = NetworkAnalyzer::new(source(), EngineConfig::default()).unwrap();
        let report = analyzer
            .analyze(AnalysisRequest::new(ids(&["A"]), vec![2022]))
            .await
            .unwrap();

        assert!(report.pairs.is_empty());
        assert!(report.peer_groups.is_empty());
        assert!(matches!(
            report.warnings.as_slice(),
            [AnalysisWarning::InsufficientData { available: 1, .. }]
        ));
        assert_eq!(report.statistics.edge_count, 2);
    }

    #[tokio::test]
    async fn test_standalone_similarity_errors() {
        let analyzer = NetworkAnalyzer::new(source(), EngineConfig::default()).unwrap();
        let aggregation = analyzer.aggregate(&ids(&["A"]), &[2022]).await.unwrap();
        let err = analyzer
            .similarity(&aggregation.portfolios, None, false)
            .unwrap_err();
        assert!(matches!(err, NetworkError::InsufficientData { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let analyzer = NetworkAnalyzer::new(source(), EngineConfig::default()).unwrap();
        analyzer.cancellation_token().cancel();
        let err = analyzer
            .analyze(AnalysisRequest::new(ids(&["A", "B"]), vec![2022]))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Cancelled { stage: "aggregation" }));
    }

    #[tokio::test]
    async fn test_cache_is_read_through() {
        let cache = Arc::new(AnalysisCache::new());
        let analyzer = NetworkAnalyzer::new(source(), EngineConfig::default())
            .unwrap()
            .with_cache(Arc::clone(&cache));

        let request = AnalysisRequest::new(ids(&["B", "A"]), vec![2022, 2023]);
        let first = analyzer.analyze(request).await.unwrap();
        assert_eq!(cache.len().await, 1);

        let key = CacheKey::new(&ids(&["A", "B"]), &[2023, 2022]);
        let entry = cache.get(&key).await.unwrap();
        assert!(entry.has_graph());
        assert_eq!(entry.report, first.aggregation);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.similarity.threshold = 1.5;
        assert!(NetworkAnalyzer::new(source(), config).is_err());
    }
}
