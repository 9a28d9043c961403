//! Recipient normalization
//!
//! Resolves the recipient named on a grant record to a canonical
//! organization identifier: exact identifier first, then canonical name,
//! then Jaro-Winkler similarity against the known-organization directory.
//! Nothing is ever dropped; unmatched names become their own identifier.

use super::portfolio::MatchKind;
use crate::config::NormalizationConfig;
use crate::graph::{OrgId, Organization};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use strsim::jaro_winkler;
use tracing::{debug, warn};

const LEGAL_SUFFIXES: &[&str] = &[
    "INC",
    "INCORPORATED",
    "CORP",
    "CORPORATION",
    "LLC",
    "LTD",
    "CO",
    "NFP",
];

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Z0-9 ]+").expect("static regex"))
}

/// Canonical comparison form of an organization name.
///
/// Upper-cases, spells out `&`, strips punctuation, a leading `THE` and
/// trailing legal-form suffixes, and collapses whitespace.
pub fn canonical_name(raw: &str) -> String {
    let upper = raw.to_uppercase().replace('&', " AND ");
    let cleaned = non_alphanumeric().replace_all(&upper, " ");

    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.len() > 1 && words[0] == "THE" {
        words.remove(0);
    }
    while words.len() > 1 && words.last().is_some_and(|w| LEGAL_SUFFIXES.contains(w)) {
        words.pop();
    }
    words.join(" ")
}

/// Outcome of resolving one recipient reference
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecipient {
    pub id: OrgId,
    /// Display name (directory name when matched, raw name otherwise)
    pub name: String,
    /// Match confidence in [0, 1]
    pub confidence: f64,
    pub match_kind: MatchKind,
}

struct Candidate {
    canonical: String,
    id: OrgId,
    name: String,
}

/// Resolves raw recipient references against a directory of known organizations.
///
/// Results are memoized per raw name for the lifetime of the normalizer.
pub struct RecipientNormalizer {
    config: NormalizationConfig,
    names_by_id: HashMap<OrgId, String>,
    by_canonical: HashMap<String, OrgId>,
    candidates: Vec<Candidate>,
    memo: HashMap<String, NormalizedRecipient>,
}

impl RecipientNormalizer {
    pub fn new<'a>(
        config: NormalizationConfig,
        directory: impl IntoIterator<Item = &'a Organization>,
    ) -> Self {
        let mut names_by_id = HashMap::new();
        let mut by_canonical: HashMap<String, OrgId> = HashMap::new();
        let mut candidates = Vec::new();

        for org in directory {
            names_by_id.insert(org.id.clone(), org.name.clone());
            let canonical = canonical_name(&org.name);
            if canonical.is_empty() {
                continue;
            }
            // First (lowest) id wins when two directory entries share a canonical name
            match by_canonical.get(&canonical) {
                Some(existing) if existing <= &org.id => {}
                _ => {
                    by_canonical.insert(canonical.clone(), org.id.clone());
                }
            }
            candidates.push(Candidate {
                canonical,
                id: org.id.clone(),
                name: org.name.clone(),
            });
        }
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        RecipientNormalizer {
            config,
            names_by_id,
            by_canonical,
            candidates,
            memo: HashMap::new(),
        }
    }

    /// Resolve a recipient reference
    pub fn normalize(
        &mut self,
        recipient_id: Option<&OrgId>,
        raw_name: &str,
    ) -> NormalizedRecipient {
        if let Some(id) = recipient_id {
            let name = self
                .names_by_id
                .get(id)
                .cloned()
                .unwrap_or_else(|| raw_name.trim().to_string());
            return NormalizedRecipient {
                id: id.clone(),
                name,
                confidence: 1.0,
                match_kind: MatchKind::ExactId,
            };
        }

        if let Some(hit) = self.memo.get(raw_name) {
            return hit.clone();
        }

        let resolved = self.match_name(raw_name);
        self.memo.insert(raw_name.to_string(), resolved.clone());
        resolved
    }

    fn match_name(&self, raw_name: &str) -> NormalizedRecipient {
        let canonical = canonical_name(raw_name);
        let ceiling = self.config.name_confidence_ceiling;

        if let Some(id) = self.by_canonical.get(&canonical) {
            return NormalizedRecipient {
                id: id.clone(),
                name: self.display_name(id, raw_name),
                confidence: ceiling,
                match_kind: MatchKind::ExactName,
            };
        }

        // Raw names that are already a known identifier resolve to themselves
        let trimmed = raw_name.trim();
        let as_id = OrgId::new(trimmed);
        if self.names_by_id.contains_key(&as_id) {
            return NormalizedRecipient {
                name: self.display_name(&as_id, raw_name),
                id: as_id,
                confidence: 1.0,
                match_kind: MatchKind::ExactId,
            };
        }

        let best = if canonical.is_empty() {
            None
        } else {
            self.candidates
                .iter()
                .map(|c| (jaro_winkler(&canonical, &c.canonical), c))
                .fold(None, |best: Option<(f64, &Candidate)>, (score, c)| match best {
                    Some((b, _)) if b >= score => best,
                    _ => Some((score, c)),
                })
        };

        match best {
            Some((score, c)) if score >= self.config.match_threshold => {
                debug!("Fuzzy matched '{}' to {} ({:.3})", raw_name, c.id, score);
                NormalizedRecipient {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    confidence: score * ceiling,
                    match_kind: MatchKind::Fuzzy,
                }
            }
            Some((score, c)) if score >= self.config.min_threshold => {
                warn!(
                    "Low-confidence recipient match '{}' -> {} ({:.3})",
                    raw_name, c.id, score
                );
                NormalizedRecipient {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    confidence: score * ceiling,
                    match_kind: MatchKind::LowConfidence,
                }
            }
            _ => {
                let id = if trimmed.is_empty() { "UNRESOLVED" } else { trimmed };
                debug!("Recipient '{}' left unresolved", raw_name);
                NormalizedRecipient {
                    id: OrgId::new(id),
                    name: id.to_string(),
                    confidence: 0.0,
                    match_kind: MatchKind::Unresolved,
                }
            }
        }
    }

    fn display_name(&self, id: &OrgId, fallback: &str) -> String {
        self.names_by_id
            .get(id)
            .cloned()
            .unwrap_or_else(|| fallback.trim().to_string())
    }
}
