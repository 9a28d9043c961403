//! Engine configuration
//!
//! Every tunable threshold lives here rather than in the algorithms. Configs
//! are plain serde structs with defaults, loadable from YAML.

use crate::error::{NetworkError, NetworkResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grant retrieval and portfolio accumulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Concurrent per-funder fetches against the data source
    pub max_concurrent_fetches: usize,
    /// Per-funder fetch timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Keep per-year amounts on each portfolio row
    pub per_year_breakdown: bool,
    /// Feed unresolved recipients into similarity and graph construction
    pub include_unresolved: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            fetch_timeout_secs: 30,
            per_year_breakdown: false,
            include_unresolved: false,
        }
    }
}

/// Recipient name matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Jaro-Winkler similarity at or above which a name match is accepted
    pub match_threshold: f64,
    /// Below this the recipient is left unresolved
    pub min_threshold: f64,
    /// Confidence assigned to an exact canonical-name match; fuzzy matches scale it
    pub name_confidence_ceiling: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.90,
            min_threshold: 0.75,
            name_confidence_ceiling: 0.95,
        }
    }
}

/// Funder-to-funder similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Minimum raw Jaccard score for a pair to be emitted
    pub threshold: f64,
    /// Most recent N fiscal years counted as "recent"
    pub recency_window_years: u32,
    /// Multiplier applied to the recency score (weighted = raw * (1 + recency * boost))
    pub recency_boost: f64,
    /// Upper bound on funders per batch (pairing is quadratic)
    pub max_funders: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            recency_window_years: 2,
            recency_boost: 0.2,
            max_funders: 500,
        }
    }
}

/// Peer-group detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    pub seed: u64,
    pub resolution: f64,
    pub max_passes: usize,
    pub max_sweeps: usize,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            resolution: 1.0,
            max_passes: 10,
            max_sweeps: 100,
        }
    }
}

/// Multi-hop path enumeration bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    pub default_max_hops: usize,
    /// Largest hop count a caller may request
    pub max_hops_limit: usize,
    /// Paths collected before enumeration stops
    pub max_paths: usize,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            default_max_hops: 3,
            max_hops_limit: 6,
            max_paths: 1000,
        }
    }
}

/// Centrality and tiering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceConfig {
    pub damping_factor: f64,
    /// Largest per-node PageRank change treated as converged
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Share of the batch ranked `high`
    pub high_fraction: f64,
    /// Cumulative share ranked `high` or `medium`
    pub medium_fraction: f64,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            tolerance: 1e-10,
            max_iterations: 200,
            high_fraction: 0.1,
            medium_fraction: 0.3,
        }
    }
}

/// Funder-targeting recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub high_score: f64,
    pub medium_score: f64,
    pub max_results: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            high_score: 0.6,
            medium_score: 0.4,
            max_results: 25,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub aggregation: AggregationConfig,
    pub normalization: NormalizationConfig,
    pub similarity: SimilarityConfig,
    pub community: CommunityConfig,
    pub pathfinding: PathfindingConfig,
    pub influence: InfluenceConfig,
    pub recommendation: RecommendationConfig,
}

impl EngineConfig {
    /// Parse and validate a YAML document. Missing sections take defaults.
    pub fn from_yaml_str(yaml: &str) -> NetworkResult<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(yaml).map_err(|e| NetworkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> NetworkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> NetworkResult<()> {
        let unit = |name: &str, v: f64| -> NetworkResult<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(NetworkError::Config(format!("{} must be within [0, 1], got {}", name, v)))
            }
        };

        let n = &self.normalization;
        unit("normalization.match_threshold", n.match_threshold)?;
        unit("normalization.min_threshold", n.min_threshold)?;
        unit("normalization.name_confidence_ceiling", n.name_confidence_ceiling)?;
        if n.min_threshold > n.match_threshold {
            return Err(NetworkError::Config(
                "normalization.min_threshold must not exceed match_threshold".to_string(),
            ));
        }

        let s = &self.similarity;
        unit("similarity.threshold", s.threshold)?;
        if s.recency_boost < 0.0 || !s.recency_boost.is_finite() {
            return Err(NetworkError::Config("similarity.recency_boost must be >= 0".to_string()));
        }
        if s.recency_window_years == 0 || s.max_funders < 2 {
            return Err(NetworkError::Config(
                "similarity.recency_window_years must be >= 1 and max_funders >= 2".to_string(),
            ));
        }

        if self.community.resolution <= 0.0 || self.community.max_passes == 0 {
            return Err(NetworkError::Config(
                "community.resolution must be > 0 and max_passes >= 1".to_string(),
            ));
        }

        let p = &self.pathfinding;
        if p.default_max_hops == 0 || p.default_max_hops > p.max_hops_limit || p.max_paths == 0 {
            return Err(NetworkError::Config(
                "pathfinding requires 1 <= default_max_hops <= max_hops_limit and max_paths >= 1"
                    .to_string(),
            ));
        }

        let i = &self.influence;
        unit("influence.damping_factor", i.damping_factor)?;
        unit("influence.high_fraction", i.high_fraction)?;
        unit("influence.medium_fraction", i.medium_fraction)?;
        if i.high_fraction > i.medium_fraction || i.max_iterations == 0 || i.tolerance <= 0.0 {
            return Err(NetworkError::Config(
                "influence requires high_fraction <= medium_fraction, max_iterations >= 1, tolerance > 0"
                    .to_string(),
            ));
        }

        let r = &self.recommendation;
        unit("recommendation.high_score", r.high_score)?;
        unit("recommendation.medium_score", r.medium_score)?;
        if r.medium_score > r.high_score {
            return Err(NetworkError::Config(
                "recommendation.medium_score must not exceed high_score".to_string(),
            ));
        }

        if self.aggregation.max_concurrent_fetches == 0 {
            return Err(NetworkError::Config(
                "aggregation.max_concurrent_fetches must be >= 1".to_string(),
            ));
        }

        Ok(())
    }
}
