//! Funder-to-funder similarity
//!
//! Pairwise Jaccard overlap of grantee sets with a recency boost. Pairing is
//! quadratic in the number of funders, so batch size is bounded by
//! `similarity.max_funders` and only pairs at or above the threshold are kept.

pub mod recommend;

pub use recommend::{recommend_funders, ConfidenceTier, FunderRecommendation};

use crate::aggregate::FunderPortfolio;
use crate::config::SimilarityConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::graph::{FiscalYear, OrgId};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Symmetric similarity between two funders. `funder_a < funder_b` always.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPair {
    pub funder_a: OrgId,
    pub funder_b: OrgId,
    /// Jaccard index of the two grantee sets, in [0, 1]
    pub raw_score: f64,
    /// Share of shared grantees funded by both in the recent window, in [0, 1]
    pub recency_score: f64,
    /// `raw * (1 + recency * boost)`
    pub weighted_score: f64,
    pub shared_count: usize,
    /// Sorted
    pub shared_recipients: Vec<OrgId>,
    /// Both funders' amounts to the shared recipients
    pub co_funding_total: f64,
    /// Sorted
    pub common_themes: Vec<String>,
}

impl SimilarityPair {
    pub fn involves(&self, funder: &OrgId) -> bool {
        &self.funder_a == funder || &self.funder_b == funder
    }

    /// The member of the pair that is not `funder`
    pub fn other(&self, funder: &OrgId) -> Option<&OrgId> {
        if &self.funder_a == funder {
            Some(&self.funder_b)
        } else if &self.funder_b == funder {
            Some(&self.funder_a)
        } else {
            None
        }
    }
}

/// Per-call similarity options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityOptions {
    /// Minimum raw score for a pair to be emitted
    pub threshold: f64,
    pub include_unresolved: bool,
}

impl SimilarityOptions {
    pub fn from_config(config: &SimilarityConfig, include_unresolved: bool) -> Self {
        SimilarityOptions {
            threshold: config.threshold,
            include_unresolved,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self::from_config(&SimilarityConfig::default(), false)
    }
}

/// The most recent `window` years across the portfolios' requested ranges
pub fn recent_years(portfolios: &[FunderPortfolio], window: u32) -> BTreeSet<FiscalYear> {
    let all: BTreeSet<FiscalYear> = portfolios
        .iter()
        .flat_map(|p| p.years_requested.iter().copied())
        .collect();
    all.into_iter().rev().take(window as usize).collect()
}

/// Score one pair. Argument order does not matter.
pub fn score_pair(
    a: &FunderPortfolio,
    b: &FunderPortfolio,
    recent: &BTreeSet<FiscalYear>,
    recency_boost: f64,
    include_unresolved: bool,
) -> SimilarityPair {
    let (a, b) = if a.funder_id <= b.funder_id { (a, b) } else { (b, a) };

    let grantees_a = a.grantees(include_unresolved);
    let grantees_b = b.grantees(include_unresolved);

    let shared: Vec<&OrgId> = grantees_a.intersection(&grantees_b).copied().collect();
    let union = grantees_a.len() + grantees_b.len() - shared.len();
    let raw_score = if union == 0 {
        0.0
    } else {
        shared.len() as f64 / union as f64
    };

    let mut recent_shared = 0usize;
    let mut co_funding_total = 0.0;
    for id in &shared {
        if let (Some(ra), Some(rb)) = (a.get(id), b.get(id)) {
            co_funding_total += ra.total_amount + rb.total_amount;
            if ra.funded_in_any(recent) && rb.funded_in_any(recent) {
                recent_shared += 1;
            }
        }
    }
    let recency_score = if shared.is_empty() {
        0.0
    } else {
        recent_shared as f64 / shared.len() as f64
    };

    SimilarityPair {
        funder_a: a.funder_id.clone(),
        funder_b: b.funder_id.clone(),
        raw_score,
        recency_score,
        weighted_score: raw_score * (1.0 + recency_score * recency_boost),
        shared_count: shared.len(),
        shared_recipients: shared.into_iter().cloned().collect(),
        co_funding_total,
        common_themes: a.themes.intersection(&b.themes).cloned().collect(),
    }
}

/// Keep one portfolio per funder with at least one grantee, sorted by id.
///
/// Fails with `InsufficientData` when fewer than two remain.
pub(crate) fn funders_with_grantees<'a>(
    portfolios: &'a [FunderPortfolio],
    include_unresolved: bool,
    operation: &'static str,
) -> NetworkResult<Vec<&'a FunderPortfolio>> {
    let mut seen = HashSet::new();
    let mut eligible: Vec<&FunderPortfolio> = Vec::with_capacity(portfolios.len());
    for p in portfolios {
        if !seen.insert(&p.funder_id) {
            warn!("Duplicate portfolio for funder {} ignored", p.funder_id);
            continue;
        }
        if p.funded_rows(include_unresolved).next().is_some() {
            eligible.push(p);
        } else {
            debug!("Funder {} has no grantees; excluded from {}", p.funder_id, operation);
        }
    }
    eligible.sort_by(|x, y| x.funder_id.cmp(&y.funder_id));

    if eligible.len() < 2 {
        return Err(NetworkError::InsufficientData {
            operation,
            available: eligible.len(),
            funders_with_data: eligible.iter().map(|p| p.funder_id.clone()).collect(),
        });
    }
    Ok(eligible)
}

/// All pairs with raw score at or above `options.threshold`, strongest first.
///
/// Ties on weighted score break by co-funding total (descending), then by
/// funder ids.
pub fn compute_similarity(
    portfolios: &[FunderPortfolio],
    options: &SimilarityOptions,
    config: &SimilarityConfig,
) -> NetworkResult<Vec<SimilarityPair>> {
    if !(0.0..=1.0).contains(&options.threshold) {
        return Err(NetworkError::invalid_parameter(
            "threshold",
            format!("must be within [0, 1], got {}", options.threshold),
        ));
    }

    let funders = funders_with_grantees(portfolios, options.include_unresolved, "similarity")?;
    if funders.len() > config.max_funders {
        return Err(NetworkError::invalid_parameter(
            "funders",
            format!(
                "{} funders exceed the batch limit of {}",
                funders.len(),
                config.max_funders
            ),
        ));
    }

    let recent = recent_years(portfolios, config.recency_window_years);
    let n = funders.len();
    info!(
        "Scoring {} funder pair(s) (threshold {:.2}, recent years {:?})",
        n * (n - 1) / 2,
        options.threshold,
        recent
    );

    let mut pairs: Vec<SimilarityPair> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let funders = &funders;
            let recent = &recent;
            (i + 1..n).filter_map(move |j| {
                let pair = score_pair(
                    funders[i],
                    funders[j],
                    recent,
                    config.recency_boost,
                    options.include_unresolved,
                );
                (pair.shared_count > 0 && pair.raw_score >= options.threshold).then_some(pair)
            })
        })
        .collect();

    pairs.sort_by(|x, y| {
        y.weighted_score
            .total_cmp(&x.weighted_score)
            .then_with(|| y.co_funding_total.total_cmp(&x.co_funding_total))
            .then_with(|| x.funder_a.cmp(&y.funder_a))
            .then_with(|| x.funder_b.cmp(&y.funder_b))
    });

    info!("{} pair(s) at or above threshold", pairs.len());
    Ok(pairs)
}

/// Adjacency over similarity pairs: funder -> (neighbour, weighted score)
pub(crate) fn pair_index(pairs: &[SimilarityPair]) -> FxHashMap<&OrgId, Vec<(&OrgId, f64)>> {
    let mut index: FxHashMap<&OrgId, Vec<(&OrgId, f64)>> = FxHashMap::default();
    for pair in pairs {
        index
            .entry(&pair.funder_a)
            .or_default()
            .push((&pair.funder_b, pair.weighted_score));
        index
            .entry(&pair.funder_b)
            .or_default()
            .push((&pair.funder_a, pair.weighted_score));
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{GrantRecord, MatchKind, NormalizedRecipient};

    fn portfolio(funder: &str, grants: &[(&str, FiscalYear)]) -> FunderPortfolio {
        let mut p = FunderPortfolio::new(OrgId::new(funder), funder, &[2020, 2021, 2022]);
        for (recipient, year) in grants {
            let r = NormalizedRecipient {
                id: OrgId::new(*recipient),
                name: recipient.to_string(),
                confidence: 1.0,
                match_kind: MatchKind::ExactId,
            };
            p.add(&r, &GrantRecord::new(funder, None, *recipient, 100.0, *year), false);
        }
        p
    }

    /// One grant to each recipient, tagged with `themes`
    fn themed(funder: &str, grants: &[(&str, &[&str])]) -> FunderPortfolio {
        let mut p = FunderPortfolio::new(OrgId::new(funder), funder, &[2022]);
        for (recipient, themes) in grants {
            let r = NormalizedRecipient {
                id: OrgId::new(*recipient),
                name: recipient.to_string(),
                confidence: 1.0,
                match_kind: MatchKind::ExactId,
            };
            let record = GrantRecord::new(funder, None, *recipient, 100.0, 2022)
                .with_themes(themes.iter().copied());
            p.add(&r, &record, false);
        }
        p
    }

    fn scenario() -> Vec<FunderPortfolio> {
        vec![
            portfolio("A", &[("X", 2022), ("Y", 2022)]),
            portfolio("B", &[("Y", 2022), ("Z", 2022)]),
            portfolio("C", &[("X", 2022), ("Y", 2022), ("Z", 2022)]),
        ]
    }

    fn find<'a>(pairs: &'a [SimilarityPair], a: &str, b: &str) -> &'a SimilarityPair {
        pairs
            .iter()
            .find(|p| p.funder_a.as_str() == a && p.funder_b.as_str() == b)
            .unwrap()
    }

    #[test]
    fn test_common_themes_are_sorted_intersection() {
        let portfolios = vec![
            themed("A", &[("X", &["hunger", "education"][..]), ("Y", &["arts"][..])]),
            themed("B", &[("X", &["housing"][..]), ("Y", &["hunger", "education"][..])]),
            themed("C", &[("Y", &["environment"][..])]),
        ];
        let options = SimilarityOptions::default().with_threshold(0.0);
        let pairs = compute_similarity(&portfolios, &options, &SimilarityConfig::default()).unwrap();

        assert_eq!(find(&pairs, "A", "B").common_themes, vec!["education", "hunger"]);
        assert!(find(&pairs, "A", "C").common_themes.is_empty());
        assert!(find(&pairs, "B", "C").common_themes.is_empty());
    }

    #[test]
    fn test_jaccard_scores() {
        let options = SimilarityOptions::default().with_threshold(0.0);
        let pairs =
            compute_similarity(&scenario(), &options, &SimilarityConfig::default()).unwrap();
        assert_eq!(pairs.len(), 3);

        let ab = find(&pairs, "A", "B");
        assert!((ab.raw_score - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(ab.shared_recipients, vec![OrgId::new("Y")]);
        assert_eq!(ab.co_funding_total, 200.0);

        let ac = find(&pairs, "A", "C");
        assert!((ac.raw_score - 2.0 / 3.0).abs() < 1e-12);
        let bc = find(&pairs, "B", "C");
        assert!((bc.raw_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_recency_boost() {
        let pairs = compute_similarity(
            &scenario(),
            &SimilarityOptions::default(),
            &SimilarityConfig::default(),
        )
        .unwrap();
        // All grants in 2022, inside the 2021-2022 window
        let ac = find(&pairs, "A", "C");
        assert_eq!(ac.recency_score, 1.0);
        assert!((ac.weighted_score - ac.raw_score * 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_stale_overlap_gets_no_boost() {
        let portfolios = vec![
            portfolio("A", &[("X", 2020)]),
            portfolio("B", &[("X", 2020)]),
        ];
        let pairs = compute_similarity(
            &portfolios,
            &SimilarityOptions::default(),
            &SimilarityConfig::default(),
        )
        .unwrap();
        assert_eq!(pairs[0].raw_score, 1.0);
        assert_eq!(pairs[0].recency_score, 0.0);
        assert_eq!(pairs[0].weighted_score, 1.0);
    }

    #[test]
    fn test_threshold_filters_pairs() {
        let options = SimilarityOptions::default().with_threshold(0.5);
        let pairs =
            compute_similarity(&scenario(), &options, &SimilarityConfig::default()).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.raw_score >= 0.5));
    }

    #[test]
    fn test_ordering_by_weighted_then_cofunding() {
        let options = SimilarityOptions::default().with_threshold(0.0);
        let pairs =
            compute_similarity(&scenario(), &options, &SimilarityConfig::default()).unwrap();
        for w in pairs.windows(2) {
            assert!(w[0].weighted_score >= w[1].weighted_score);
        }
        assert_eq!(pairs[2].funder_a.as_str(), "A");
        assert_eq!(pairs[2].funder_b.as_str(), "B");
    }

    #[test]
    fn test_symmetry() {
        let p = scenario();
        let recent: BTreeSet<FiscalYear> = [2021, 2022].into_iter().collect();
        let ab = score_pair(&p[0], &p[1], &recent, 0.2, false);
        let ba = score_pair(&p[1], &p[0], &recent, 0.2, false);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_empty_portfolio_excluded() {
        let mut portfolios = scenario();
        portfolios.push(portfolio("EMPTY", &[]));
        let options = SimilarityOptions::default().with_threshold(0.0);
        let pairs =
            compute_similarity(&portfolios, &options, &SimilarityConfig::default()).unwrap();
        assert!(pairs.iter().all(|p| !p.involves(&OrgId::new("EMPTY"))));
    }

    #[test]
    fn test_insufficient_data() {
        let portfolios = vec![portfolio("A", &[("X", 2022)]), portfolio("B", &[])];
        let err = compute_similarity(
            &portfolios,
            &SimilarityOptions::default(),
            &SimilarityConfig::default(),
        )
        .unwrap_err();
        match err {
            NetworkError::InsufficientData {
                available,
                funders_with_data,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(funders_with_data, vec![OrgId::new("A")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_threshold() {
        let options = SimilarityOptions::default().with_threshold(1.5);
        let err =
            compute_similarity(&scenario(), &options, &SimilarityConfig::default()).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidParameter { name: "threshold", .. }));
    }

    #[test]
    fn test_batch_limit_enforced() {
        let config = SimilarityConfig {
            max_funders: 2,
            ..SimilarityConfig::default()
        };
        let err =
            compute_similarity(&scenario(), &SimilarityOptions::default(), &config).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidParameter { name: "funders", .. }));
    }

    #[test]
    fn test_pair_index_is_symmetric() {
        let options = SimilarityOptions::default().with_threshold(0.0);
        let pairs =
            compute_similarity(&scenario(), &options, &SimilarityConfig::default()).unwrap();
        let index = pair_index(&pairs);
        assert_eq!(index[&OrgId::new("A")].len(), 2);
        assert_eq!(index[&OrgId::new("C")].len(), 2);
    }
}
