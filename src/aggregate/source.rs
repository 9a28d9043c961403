//! Grant data sources
//!
//! The tax-filing store is an external collaborator. The engine only needs
//! `get_grant_records(funder, years)`; an empty list means "no filings in
//! range" and is never an error.

use super::record::GrantRecord;
use crate::error::{NetworkResult, SourceError};
use crate::graph::{FiscalYear, OrgId, Organization};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Query interface over the external grant-record store.
///
/// A funder whose filings cannot be interpreted (a record naming no recipient
/// at all) fails as a whole with [`SourceError::Malformed`].
#[async_trait]
pub trait GrantDataSource: Send + Sync {
    /// All records filed by `funder_id` for the given fiscal years
    async fn get_grant_records(
        &self,
        funder_id: &OrgId,
        years: &[FiscalYear],
    ) -> Result<Vec<GrantRecord>, SourceError>;
}

/// A self-contained dataset: known organizations plus grant records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantDataset {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub grants: Vec<GrantRecord>,
}

impl GrantDataset {
    pub fn from_json_str(json: &str) -> NetworkResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> NetworkResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let dataset = Self::from_json_str(&text)?;
        info!(
            "Loaded dataset from {:?}: {} organizations, {} grants",
            path.as_ref(),
            dataset.organizations.len(),
            dataset.grants.len()
        );
        Ok(dataset)
    }

    /// Distinct funder ids in record order
    pub fn funder_ids(&self) -> Vec<OrgId> {
        let mut seen = HashSet::new();
        self.grants
            .iter()
            .filter(|g| seen.insert(g.funder_id.clone()))
            .map(|g| g.funder_id.clone())
            .collect()
    }

    /// Distinct fiscal years, ascending
    pub fn years(&self) -> Vec<FiscalYear> {
        let mut years: Vec<FiscalYear> = self.grants.iter().map(|g| g.fiscal_year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

/// In-process source backed by a record list.
///
/// Funders can be marked unavailable to simulate a partial outage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGrantSource {
    records: Vec<GrantRecord>,
    unavailable: HashSet<OrgId>,
}

impl InMemoryGrantSource {
    pub fn new(records: Vec<GrantRecord>) -> Self {
        InMemoryGrantSource {
            records,
            unavailable: HashSet::new(),
        }
    }

    pub fn from_dataset(dataset: &GrantDataset) -> Self {
        Self::new(dataset.grants.clone())
    }

    pub fn mark_unavailable(&mut self, funder_id: impl Into<OrgId>) {
        self.unavailable.insert(funder_id.into());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl GrantDataSource for InMemoryGrantSource {
    async fn get_grant_records(
        &self,
        funder_id: &OrgId,
        years: &[FiscalYear],
    ) -> Result<Vec<GrantRecord>, SourceError> {
        if self.unavailable.contains(funder_id) {
            return Err(SourceError::Unavailable(format!(
                "no filings reachable for {}",
                funder_id
            )));
        }
        let records: Vec<GrantRecord> = self
            .records
            .iter()
            .filter(|r| &r.funder_id == funder_id && years.contains(&r.fiscal_year))
            .cloned()
            .collect();

        let nameless = records.iter().filter(|r| !r.names_recipient()).count();
        if nameless > 0 {
            return Err(SourceError::Malformed(format!(
                "{} record(s) for {} name no recipient",
                nameless, funder_id
            )));
        }
        Ok(records)
    }
}

/// Source backed by a JSON dataset file
#[derive(Debug, Clone)]
pub struct JsonFileGrantSource {
    dataset: GrantDataset,
    inner: InMemoryGrantSource,
}

impl JsonFileGrantSource {
    pub fn open(path: impl AsRef<Path>) -> NetworkResult<Self> {
        let dataset = GrantDataset::load(path)?;
        let inner = InMemoryGrantSource::from_dataset(&dataset);
        Ok(JsonFileGrantSource { dataset, inner })
    }

    pub fn dataset(&self) -> &GrantDataset {
        &self.dataset
    }
}

#[async_trait]
impl GrantDataSource for JsonFileGrantSource {
    async fn get_grant_records(
        &self,
        funder_id: &OrgId,
        years: &[FiscalYear],
    ) -> Result<Vec<GrantRecord>, SourceError> {
        self.inner.get_grant_records(funder_id, years).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<GrantRecord> {
        vec![
            GrantRecord::new("F1", None, "Arts Council", 100.0, 2021),
            GrantRecord::new("F1", None, "Food Bank", 200.0, 2022),
            GrantRecord::new("F2", None, "Food Bank", 300.0, 2022),
        ]
    }

    #[tokio::test]
    async fn test_in_memory_filters_by_funder_and_year() {
        let source = InMemoryGrantSource::new(records());
        let got = source
            .get_grant_records(&OrgId::new("F1"), &[2022])
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].recipient_name, "Food Bank");
    }

    #[tokio::test]
    async fn test_unknown_funder_returns_empty() {
        let source = InMemoryGrantSource::new(records());
        let got = source
            .get_grant_records(&OrgId::new("NOPE"), &[2021, 2022])
            .await
            .unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_funder_errors() {
        let mut source = InMemoryGrantSource::new(records());
        source.mark_unavailable("F2");
        let err = source
            .get_grant_records(&OrgId::new("F2"), &[2022])
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_record_without_recipient_is_malformed() {
        let mut grants = records();
        grants.push(GrantRecord::new("F2", None, " ", 50.0, 2022));
        let source = InMemoryGrantSource::new(grants);

        let err = source
            .get_grant_records(&OrgId::new("F2"), &[2022])
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));

        // Other funders are unaffected
        let ok = source
            .get_grant_records(&OrgId::new("F1"), &[2021, 2022])
            .await
            .unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[test]
    fn test_dataset_helpers() {
        let dataset = GrantDataset {
            organizations: Vec::new(),
            grants: records(),
        };
        assert_eq!(dataset.funder_ids(), vec![OrgId::new("F1"), OrgId::new("F2")]);
        assert_eq!(dataset.years(), vec![2021, 2022]);
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.json");
        let dataset = GrantDataset {
            organizations: Vec::new(),
            grants: records(),
        };
        std::fs::write(&path, serde_json::to_string(&dataset).unwrap()).unwrap();

        let source = JsonFileGrantSource::open(&path).unwrap();
        assert_eq!(source.dataset().grants.len(), 3);
        let got = source
            .get_grant_records(&OrgId::new("F2"), &[2022])
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
    }
}
