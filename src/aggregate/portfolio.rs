//! Per-funder aggregates

use super::normalize::NormalizedRecipient;
use super::record::GrantRecord;
use crate::graph::{FiscalYear, OrgId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a recipient was resolved to its identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactId,
    ExactName,
    Fuzzy,
    LowConfidence,
    Unresolved,
}

/// One recipient row of a funder portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientFunding {
    pub recipient_id: OrgId,
    pub recipient_name: String,
    /// Sum across all requested years
    pub total_amount: f64,
    pub years: BTreeSet<FiscalYear>,
    pub grant_count: u32,
    /// Lowest match confidence among the contributing records
    pub confidence: f64,
    pub match_kind: MatchKind,
    /// Present only when a per-year breakdown was requested
    pub amount_by_year: Option<BTreeMap<FiscalYear, f64>>,
}

impl RecipientFunding {
    pub fn is_unresolved(&self) -> bool {
        self.match_kind == MatchKind::Unresolved
    }

    pub fn is_low_confidence(&self) -> bool {
        matches!(self.match_kind, MatchKind::LowConfidence | MatchKind::Unresolved)
    }

    pub fn funded_in_any(&self, years: &BTreeSet<FiscalYear>) -> bool {
        self.years.iter().any(|y| years.contains(y))
    }
}

/// Everything one funder gave across the requested years, keyed by
/// normalized recipient identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunderPortfolio {
    pub funder_id: OrgId,
    pub funder_name: String,
    pub years_requested: Vec<FiscalYear>,
    pub recipients: BTreeMap<OrgId, RecipientFunding>,
    /// Union of the theme tags on the funder's records
    pub themes: BTreeSet<String>,
    /// Records accepted into the portfolio
    pub record_count: usize,
    /// Records dropped as malformed (negative or non-finite amount)
    pub rejected_records: usize,
}

impl FunderPortfolio {
    pub fn new(funder_id: OrgId, funder_name: impl Into<String>, years: &[FiscalYear]) -> Self {
        FunderPortfolio {
            funder_id,
            funder_name: funder_name.into(),
            years_requested: years.to_vec(),
            recipients: BTreeMap::new(),
            themes: BTreeSet::new(),
            record_count: 0,
            rejected_records: 0,
        }
    }

    /// Fold one record into the portfolio under its normalized recipient
    pub fn add(&mut self, recipient: &NormalizedRecipient, record: &GrantRecord, per_year: bool) {
        let row = self
            .recipients
            .entry(recipient.id.clone())
            .or_insert_with(|| RecipientFunding {
                recipient_id: recipient.id.clone(),
                recipient_name: recipient.name.clone(),
                total_amount: 0.0,
                years: BTreeSet::new(),
                grant_count: 0,
                confidence: recipient.confidence,
                match_kind: recipient.match_kind,
                amount_by_year: per_year.then(BTreeMap::new),
            });

        row.total_amount += record.amount;
        row.years.insert(record.fiscal_year);
        row.grant_count += 1;
        if recipient.confidence < row.confidence {
            row.confidence = recipient.confidence;
            row.match_kind = recipient.match_kind;
        }
        if let Some(by_year) = row.amount_by_year.as_mut() {
            *by_year.entry(record.fiscal_year).or_insert(0.0) += record.amount;
        }

        self.themes.extend(record.themes.iter().cloned());
        self.record_count += 1;
    }

    /// Total across every recipient row
    pub fn total_amount(&self) -> f64 {
        self.recipients.values().map(|r| r.total_amount).sum()
    }

    /// Recipients with non-zero funding
    pub fn grantees(&self, include_unresolved: bool) -> BTreeSet<&OrgId> {
        self.funded_rows(include_unresolved)
            .map(|r| &r.recipient_id)
            .collect()
    }

    /// Rows with non-zero funding, optionally including unresolved recipients
    pub fn funded_rows(&self, include_unresolved: bool) -> impl Iterator<Item = &RecipientFunding> {
        self.recipients
            .values()
            .filter(move |r| r.total_amount > 0.0 && (include_unresolved || !r.is_unresolved()))
    }

    pub fn get(&self, recipient: &OrgId) -> Option<&RecipientFunding> {
        self.recipients.get(recipient)
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Rows flagged low-confidence or unresolved
    pub fn low_confidence_count(&self) -> usize {
        self.recipients.values().filter(|r| r.is_low_confidence()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(id: &str) -> NormalizedRecipient {
        NormalizedRecipient {
            id: OrgId::new(id),
            name: format!("Org {}", id),
            confidence: 1.0,
            match_kind: MatchKind::ExactId,
        }
    }

    #[test]
    fn test_amounts_sum_across_years() {
        let mut p = FunderPortfolio::new(OrgId::new("F"), "Fund", &[2021, 2022]);
        let r = resolved("R");
        p.add(&r, &GrantRecord::new("F", None, "R", 100.0, 2021), false);
        p.add(&r, &GrantRecord::new("F", None, "R", 50.0, 2022), false);

        let row = p.get(&OrgId::new("R")).unwrap();
        assert_eq!(row.total_amount, 150.0);
        assert_eq!(row.grant_count, 2);
        assert_eq!(row.years.iter().copied().collect::<Vec<_>>(), vec![2021, 2022]);
        assert!(row.amount_by_year.is_none());
        assert_eq!(p.total_amount(), 150.0);
    }

    #[test]
    fn test_per_year_breakdown() {
        let mut p = FunderPortfolio::new(OrgId::new("F"), "Fund", &[2021, 2022]);
        let r = resolved("R");
        p.add(&r, &GrantRecord::new("F", None, "R", 100.0, 2021), true);
        p.add(&r, &GrantRecord::new("F", None, "R", 25.0, 2021), true);
        p.add(&r, &GrantRecord::new("F", None, "R", 50.0, 2022), true);

        let by_year = p.get(&OrgId::new("R")).unwrap().amount_by_year.clone().unwrap();
        assert_eq!(by_year[&2021], 125.0);
        assert_eq!(by_year[&2022], 50.0);
    }

    #[test]
    fn test_grantees_skip_zero_and_unresolved() {
        let mut p = FunderPortfolio::new(OrgId::new("F"), "Fund", &[2022]);
        p.add(&resolved("A"), &GrantRecord::new("F", None, "A", 10.0, 2022), false);
        p.add(&resolved("Z"), &GrantRecord::new("F", None, "Z", 0.0, 2022), false);
        let unresolved = NormalizedRecipient {
            id: OrgId::new("Mystery Org"),
            name: "Mystery Org".to_string(),
            confidence: 0.0,
            match_kind: MatchKind::Unresolved,
        };
        p.add(&unresolved, &GrantRecord::new("F", None, "Mystery Org", 5.0, 2022), false);

        let ids: Vec<&str> = p.grantees(false).iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["A"]);
        assert_eq!(p.grantees(true).len(), 2);
        assert_eq!(p.low_confidence_count(), 1);
    }

    #[test]
    fn test_lowest_confidence_wins() {
        let mut p = FunderPortfolio::new(OrgId::new("F"), "Fund", &[2022]);
        p.add(&resolved("A"), &GrantRecord::new("F", None, "A", 10.0, 2022), false);
        let fuzzy = NormalizedRecipient {
            id: OrgId::new("A"),
            name: "Org A".to_string(),
            confidence: 0.8,
            match_kind: MatchKind::LowConfidence,
        };
        p.add(&fuzzy, &GrantRecord::new("F", None, "Org  A.", 10.0, 2022), false);

        let row = p.get(&OrgId::new("A")).unwrap();
        assert_eq!(row.confidence, 0.8);
        assert_eq!(row.match_kind, MatchKind::LowConfidence);
        assert!(row.is_low_confidence());
    }
}
