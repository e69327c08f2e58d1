//! Weak-supervision labels from the exclusion registry

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One record of the exclusion registry snapshot
///
/// Field aliases accept the column names of the published exclusion list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryEntry {
    /// Identifier, often blank or a zero placeholder
    #[serde(default, alias = "NPI")]
    pub identifier: Option<String>,
    /// Organization name
    #[serde(default, alias = "BUSNAME")]
    pub organization: Option<String>,
    #[serde(default, alias = "LASTNAME")]
    pub last_name: Option<String>,
    #[serde(default, alias = "FIRSTNAME")]
    pub first_name: Option<String>,
    /// State or other jurisdiction code
    #[serde(default, alias = "STATE")]
    pub jurisdiction: Option<String>,
    /// Exclusion reason code
    #[serde(default, alias = "EXCLTYPE")]
    pub reason_code: Option<String>,
}

/// Display information for one identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntry {
    #[serde(alias = "npi", alias = "NPI")]
    pub identifier: String,
    /// Organization or full display name
    #[serde(default, alias = "provider_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, alias = "state")]
    pub jurisdiction: Option<String>,
}

/// How a registry entry was tied to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Identifier equality
    Exact,
    /// Normalized name plus jurisdiction
    Fuzzy,
}

/// Label for one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExclusionLabel {
    pub provider: String,
    /// Severity in `[0, 1]`, the maximum over all matching entries
    pub weight: f64,
    /// Source of the winning match
    pub matched_by: MatchSource,
}

/// Labels for a provider universe
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelSet {
    /// Positive providers only; everything absent is negative
    pub labels: BTreeMap<String, ExclusionLabel>,
    /// Providers whose label came from an identifier match
    pub exact_matches: usize,
    /// Providers whose label came from a name match
    pub fuzzy_matches: usize,
}

impl LabelSet {
    /// Binary training target
    #[must_use]
    pub fn is_positive(&self, provider: &str) -> bool {
        self.labels.contains_key(provider)
    }

    /// Continuous severity; 0 for unlabeled providers
    #[must_use]
    pub fn weight(&self, provider: &str) -> f64 {
        self.labels.get(provider).map_or(0.0, |l| l.weight)
    }

    #[must_use]
    pub fn positive_count(&self) -> usize {
        self.labels.len()
    }
}
