//! Recipient bundling: who is co-funded by whom, and for how much

use super::portfolio::FunderPortfolio;
use crate::graph::OrgId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One funder's share of a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleContribution {
    pub funder_id: OrgId,
    pub funder_name: String,
    pub amount: f64,
}

/// All funding a single recipient received across the batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingBundle {
    pub recipient_id: OrgId,
    pub recipient_name: String,
    pub funder_count: usize,
    pub total_funding: f64,
    /// Contributing funders, largest amount first
    pub funders: Vec<BundleContribution>,
}

/// Group portfolio rows by recipient.
///
/// Only recipients with at least `min_funders` contributing funders are kept.
/// Ordered by funder count, then total funding (both descending), then id.
pub fn bundle_recipients(
    portfolios: &[FunderPortfolio],
    min_funders: usize,
    include_unresolved: bool,
) -> Vec<FundingBundle> {
    let mut by_recipient: BTreeMap<&OrgId, FundingBundle> = BTreeMap::new();

    for portfolio in portfolios {
        for row in portfolio.funded_rows(include_unresolved) {
            let bundle = by_recipient
                .entry(&row.recipient_id)
                .or_insert_with(|| FundingBundle {
                    recipient_id: row.recipient_id.clone(),
                    recipient_name: row.recipient_name.clone(),
                    funder_count: 0,
                    total_funding: 0.0,
                    funders: Vec::new(),
                });
            bundle.funder_count += 1;
            bundle.total_funding += row.total_amount;
            bundle.funders.push(BundleContribution {
                funder_id: portfolio.funder_id.clone(),
                funder_name: portfolio.funder_name.clone(),
                amount: row.total_amount,
            });
        }
    }

    let mut bundles: Vec<FundingBundle> = by_recipient
        .into_values()
        .filter(|b| b.funder_count >= min_funders)
        .map(|mut b| {
            b.funders.sort_by(|x, y| {
                y.amount
                    .total_cmp(&x.amount)
                    .then_with(|| x.funder_id.cmp(&y.funder_id))
            });
            b
        })
        .collect();

    bundles.sort_by(|a, b| {
        b.funder_count
            .cmp(&a.funder_count)
            .then_with(|| b.total_funding.total_cmp(&a.total_funding))
            .then_with(|| a.recipient_id.cmp(&b.recipient_id))
    });
    bundles
}
