//! Organization records and their typed enrichment attributes

use super::types::OrgId;
use serde::{Deserialize, Serialize};

/// Role an organization plays in the funding network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Funder,
    Recipient,
    Both,
}

/// Optional enrichment attributes attached to an organization.
///
/// Every field is optional; a missing enrichment provider simply leaves them empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgAttributes {
    /// City / state or free-form location
    #[serde(default)]
    pub location: Option<String>,
    /// Classification code (NTEE-style)
    #[serde(default)]
    pub classification_code: Option<String>,
    /// Asset size band, e.g. "$10M-$50M"
    #[serde(default)]
    pub asset_band: Option<String>,
    /// Revenue size band
    #[serde(default)]
    pub revenue_band: Option<String>,
}

impl OrgAttributes {
    /// True when no attribute is set
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.classification_code.is_none()
            && self.asset_band.is_none()
            && self.revenue_band.is_none()
    }

    /// Fill unset fields from `other`; fields already set are kept
    pub fn merge(&mut self, other: &OrgAttributes) {
        if self.location.is_none() {
            self.location = other.location.clone();
        }
        if self.classification_code.is_none() {
            self.classification_code = other.classification_code.clone();
        }
        if self.asset_band.is_none() {
            self.asset_band = other.asset_band.clone();
        }
        if self.revenue_band.is_none() {
            self.revenue_band = other.revenue_band.clone();
        }
    }

    /// (name, value) pairs for the attributes that are set
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Some(v) = &self.location {
            out.push(("location", v.as_str()));
        }
        if let Some(v) = &self.classification_code {
            out.push(("classification_code", v.as_str()));
        }
        if let Some(v) = &self.asset_band {
            out.push(("asset_band", v.as_str()));
        }
        if let Some(v) = &self.revenue_band {
            out.push(("revenue_band", v.as_str()));
        }
        out
    }
}

/// A funder or recipient entity. Identity is the `id`; names may vary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub role: OrgRole,
    #[serde(default)]
    pub attributes: OrgAttributes,
}

impl Organization {
    pub fn new(id: impl Into<OrgId>, name: impl Into<String>, role: OrgRole) -> Self {
        Organization {
            id: id.into(),
            name: name.into(),
            role,
            attributes: OrgAttributes::default(),
        }
    }

    pub fn with_attributes(mut self, attributes: OrgAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn is_funder(&self) -> bool {
        matches!(self.role, OrgRole::Funder | OrgRole::Both)
    }

    pub fn is_recipient(&self) -> bool {
        matches!(self.role, OrgRole::Recipient | OrgRole::Both)
    }
}
