//! Raw grant disbursement records

use crate::graph::{FiscalYear, OrgId};
use serde::{Deserialize, Serialize};

/// One disbursement as reported in a filing. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub funder_id: OrgId,
    /// Recipient identifier when the filing carries one
    #[serde(default)]
    pub recipient_id: Option<OrgId>,
    /// Recipient name as written in the filing
    pub recipient_name: String,
    pub amount: f64,
    pub fiscal_year: FiscalYear,
    /// Purpose / theme tags
    #[serde(default)]
    pub themes: Vec<String>,
}

impl GrantRecord {
    pub fn new(
        funder_id: impl Into<OrgId>,
        recipient_id: Option<OrgId>,
        recipient_name: impl Into<String>,
        amount: f64,
        fiscal_year: FiscalYear,
    ) -> Self {
        GrantRecord {
            funder_id: funder_id.into(),
            recipient_id,
            recipient_name: recipient_name.into(),
            amount,
            fiscal_year,
            themes: Vec::new(),
        }
    }

    pub fn with_themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes = themes.into_iter().map(Into::into).collect();
        self
    }

    /// Amount must be finite and non-negative
    pub fn is_well_formed(&self) -> bool {
        self.amount.is_finite() && self.amount >= 0.0
    }

    /// False when the filing carries neither a recipient id nor a name
    pub fn names_recipient(&self) -> bool {
        self.recipient_id.is_some() || !self.recipient_name.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_amounts() {
        let ok = GrantRecord::new("F", None, "Food Bank", 0.0, 2022);
        assert!(ok.is_well_formed());

        let negative = GrantRecord::new("F", None, "Food Bank", -5.0, 2022);
        assert!(!negative.is_well_formed());

        let nan = GrantRecord::new("F", None, "Food Bank", f64::NAN, 2022);
        assert!(!nan.is_well_formed());
    }

    #[test]
    fn test_recipient_reference() {
        assert!(GrantRecord::new("F", None, "Food Bank", 1.0, 2022).names_recipient());
        assert!(GrantRecord::new("F", Some(OrgId::new("R1")), "", 1.0, 2022).names_recipient());
        assert!(!GrantRecord::new("F", None, "  ", 1.0, 2022).names_recipient());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{"funder_id":"F1","recipient_name":"Arts Council","amount":5000,"fiscal_year":2021}"#;
        let record: GrantRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.recipient_id, None);
        assert!(record.themes.is_empty());
        assert_eq!(record.amount, 5000.0);
    }
}
