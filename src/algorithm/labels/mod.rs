//! Weak-supervision labels from an exclusion registry
//!
//! Registry entries are tied to providers by identifier first and by
//! normalized name plus jurisdiction second. Each provider keeps the highest
//! severity over every entry that matched it.

pub mod normalize;
pub mod weights;

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;
use smallvec::SmallVec;

use crate::config::LabelConfig;
use crate::error::{Result, RiskEngineError};
use crate::models::{DirectoryEntry, ExclusionLabel, LabelSet, MatchSource, RegistryEntry};
use crate::utils::{log_operation_complete, log_operation_start};

use normalize::{normalize_jurisdiction, organization_key, person_key, valid_identifier};
use weights::ReasonWeights;

/// Read-only identity lookup used for name matching
///
/// Implementations may sit in front of a remote service; lookups must be
/// idempotent so that the label set does not depend on call order.
pub trait IdentityDirectory: Send + Sync {
    /// Display information for an identity, if known
    fn lookup(&self, identifier: &str) -> Option<DirectoryEntry>;
}

/// Directory held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    entries: FxHashMap<String, DirectoryEntry>,
}

impl InMemoryDirectory {
    /// Build from entries; later duplicates replace earlier ones
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.identifier.trim().to_string(), e))
            .collect();
        Self { entries }
    }

    /// Load a directory snapshot from a Parquet file
    ///
    /// # Errors
    /// `ExternalSourceUnavailable` if the file cannot be read, `Serialization`
    /// if its rows do not match [`DirectoryEntry`]
    pub fn from_parquet(path: &Path) -> Result<Self> {
        Ok(Self::new(read_snapshot::<DirectoryEntry>(
            path,
            "identity directory",
        )?))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IdentityDirectory for InMemoryDirectory {
    fn lookup(&self, identifier: &str) -> Option<DirectoryEntry> {
        self.entries.get(identifier).cloned()
    }
}

/// Finite snapshot of the exclusion registry
#[derive(Debug, Clone, Default)]
pub struct ExclusionRegistry {
    entries: Vec<RegistryEntry>,
}

impl ExclusionRegistry {
    #[must_use]
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    /// Load a registry snapshot from a Parquet file
    ///
    /// # Errors
    /// `ExternalSourceUnavailable` if the file cannot be read, `Serialization`
    /// if its rows do not match [`RegistryEntry`]
    pub fn from_parquet(path: &Path) -> Result<Self> {
        Ok(Self::new(read_snapshot::<RegistryEntry>(
            path,
            "exclusion registry",
        )?))
    }

    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deserialize every row of a Parquet snapshot
fn read_snapshot<T: DeserializeOwned>(path: &Path, source_name: &str) -> Result<Vec<T>> {
    let file = File::open(path)
        .map_err(|e| RiskEngineError::unavailable(source_name, format!("{}: {e}", path.display())))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| RiskEngineError::unavailable(source_name, e.to_string()))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        let mut decoded = serde_arrow::from_record_batch::<Vec<T>>(&batch)
            .map_err(|e| RiskEngineError::Serialization(format!("{source_name}: {e}")))?;
        rows.append(&mut decoded);
    }
    log::debug!("Read {} rows from {source_name} at {}", rows.len(), path.display());
    Ok(rows)
}

/// Builds the [`LabelSet`] for a provider universe
#[derive(Debug, Clone)]
pub struct LabelBuilder {
    weights: ReasonWeights,
    min_org_name_len: usize,
    identifier_len: usize,
}

impl LabelBuilder {
    #[must_use]
    pub fn new(config: &LabelConfig) -> Self {
        Self {
            weights: ReasonWeights::from_config(config),
            min_org_name_len: config.min_org_name_len,
            identifier_len: config.identifier_len,
        }
    }

    /// Match every registry entry against the universe
    ///
    /// # Arguments
    /// * `universe` - Provider identifiers eligible for a label
    /// * `registry` - Exclusion registry snapshot
    /// * `directory` - Lookup used to build the name index of the universe
    ///
    /// # Returns
    /// Positive labels with the maximum matched weight per provider. On equal
    /// weights an identifier match wins over a name match.
    #[must_use]
    pub fn build(
        &self,
        universe: &[String],
        registry: &ExclusionRegistry,
        directory: &dyn IdentityDirectory,
    ) -> LabelSet {
        let start = Instant::now();
        log_operation_start("Building labels", &format!("{} registry entries", registry.len()));

        let members: FxHashSet<&str> = universe.iter().map(String::as_str).collect();
        let name_index = self.name_index(universe, directory);

        let mut best: FxHashMap<&str, (f64, MatchSource)> = FxHashMap::default();
        let mut offer = |provider: &str, weight: f64, source: MatchSource| {
            let Some(&provider) = members.get(provider) else {
                return;
            };
            best.entry(provider)
                .and_modify(|current| {
                    if weight > current.0 || (weight == current.0 && source < current.1) {
                        *current = (weight, source);
                    }
                })
                .or_insert((weight, source));
        };

        for entry in registry.entries() {
            let weight = self.weights.weight(entry.reason_code.as_deref());

            if let Some(id) = valid_identifier(entry.identifier.as_deref(), self.identifier_len) {
                if members.contains(id) {
                    offer(id, weight, MatchSource::Exact);
                    continue;
                }
            }

            let Some(key) = self.registry_key(entry) else {
                continue;
            };
            if let Some(providers) = name_index.get(&key) {
                for provider in providers {
                    offer(provider, weight, MatchSource::Fuzzy);
                }
            }
        }

        let mut labels = LabelSet::default();
        for (provider, (weight, matched_by)) in best {
            match matched_by {
                MatchSource::Exact => labels.exact_matches += 1,
                MatchSource::Fuzzy => labels.fuzzy_matches += 1,
            }
            labels.labels.insert(
                provider.to_string(),
                ExclusionLabel {
                    provider: provider.to_string(),
                    weight,
                    matched_by,
                },
            );
        }

        log::info!(
            "Labels: {} positive ({} by identifier, {} by name) out of {} providers",
            labels.positive_count(),
            labels.exact_matches,
            labels.fuzzy_matches,
            universe.len()
        );
        log_operation_complete(
            "Built",
            "labels",
            labels.positive_count(),
            Some(start.elapsed()),
        );
        labels
    }

    /// Organization key when the name is distinctive enough, else person key
    fn registry_key(&self, entry: &RegistryEntry) -> Option<String> {
        let jurisdiction = normalize_jurisdiction(entry.jurisdiction.as_deref());
        organization_key(
            entry.organization.as_deref(),
            &jurisdiction,
            self.min_org_name_len,
        )
        .or_else(|| {
            person_key(
                entry.last_name.as_deref(),
                entry.first_name.as_deref(),
                &jurisdiction,
            )
        })
    }

    /// Name keys of every universe member the directory knows
    fn name_index<'u>(
        &self,
        universe: &'u [String],
        directory: &dyn IdentityDirectory,
    ) -> FxHashMap<String, SmallVec<[&'u str; 2]>> {
        let keyed: Vec<(String, &str)> = universe
            .par_iter()
            .filter_map(|provider| directory.lookup(provider).map(|e| (provider.as_str(), e)))
            .flat_map_iter(|(provider, entry)| {
                let jurisdiction = normalize_jurisdiction(entry.jurisdiction.as_deref());
                let org = organization_key(entry.name.as_deref(), &jurisdiction, 1);
                let person = person_key(
                    entry.last_name.as_deref(),
                    entry.first_name.as_deref(),
                    &jurisdiction,
                );
                org.into_iter()
                    .chain(person)
                    .map(move |key| (key, provider))
            })
            .collect();

        let mut index: FxHashMap<String, SmallVec<[&str; 2]>> = FxHashMap::default();
        for (key, provider) in keyed {
            let slot = index.entry(key).or_default();
            if !slot.contains(&provider) {
                slot.push(provider);
            }
        }
        index
    }
}
