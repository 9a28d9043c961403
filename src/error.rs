//! Error and warning types for the network engine
//!
//! Fatal conditions are [`NetworkError`] variants. Recoverable conditions
//! (partial data, non-convergence) are plain data carried on results.

use crate::graph::OrgId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to callers of the engine
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The grant source failed for every requested funder
    #[error("Grant data source unavailable for all {requested} requested funder(s)")]
    DataSource {
        requested: usize,
        failures: Vec<FunderFailure>,
    },

    /// Similarity and clustering need at least two funders with grants
    #[error("Insufficient data for {operation}: {available} funder(s) with grants, at least 2 required")]
    InsufficientData {
        operation: &'static str,
        available: usize,
        funders_with_data: Vec<OrgId>,
    },

    /// An identifier does not exist in the built graph
    #[error("Unknown {role} identifier: {id}")]
    InvalidIdentifier { id: String, role: &'static str },

    /// A caller-supplied bound or option is out of range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The caller cancelled the run between stages
    #[error("Analysis cancelled before {stage}")]
    Cancelled { stage: &'static str },

    /// A serialized graph could not be imported
    #[error("Import error: {0}")]
    Import(String),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cache snapshot encoding error
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl NetworkError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        NetworkError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown(role: &'static str, id: impl Into<String>) -> Self {
        NetworkError::InvalidIdentifier {
            id: id.into(),
            role,
        }
    }
}

/// Errors reported by a [`GrantDataSource`](crate::aggregate::GrantDataSource)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed records: {0}")]
    Malformed(String),

    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// A funder whose records could not be retrieved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunderFailure {
    pub funder_id: OrgId,
    pub reason: String,
}

/// Some, but not all, funders in a batch failed to load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialDataWarning {
    pub failures: Vec<FunderFailure>,
}

impl PartialDataWarning {
    pub fn failed_ids(&self) -> Vec<&OrgId> {
        self.failures.iter().map(|f| &f.funder_id).collect()
    }
}

/// PageRank hit its iteration cap before meeting the tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceWarning {
    pub iterations: usize,
    pub max_delta: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = NetworkError::InsufficientData {
            operation: "similarity",
            available: 1,
            funders_with_data: vec![OrgId::new("A")],
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data for similarity: 1 funder(s) with grants, at least 2 required"
        );

        let err = NetworkError::unknown("node", "X-1");
        assert_eq!(err.to_string(), "Unknown node identifier: X-1");
    }

    #[test]
    fn test_partial_warning_lists_failed_ids() {
        let warning = PartialDataWarning {
            failures: vec![FunderFailure {
                funder_id: OrgId::new("B"),
                reason: SourceError::Timeout(30).to_string(),
            }],
        };
        assert_eq!(warning.failed_ids(), vec![&OrgId::new("B")]);
        assert_eq!(warning.failures[0].reason, "timed out after 30s");
    }
}
