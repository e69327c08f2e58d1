//! Per-provider feature extraction
//!
//! Features are derived from the grouped aggregates of the claims snapshot,
//! never from raw rows. The extractor hands them out chunk by chunk through
//! [`FeatureSource`], so training and scoring never hold the whole matrix.

use std::ops::Range;

use rayon::prelude::*;

use super::snapshot::ClaimsSnapshot;
use super::stats::safe_div;
use crate::config::FeatureConfig;
use crate::models::{FeatureVector, ProviderAggregate, ProviderFeatures};

/// A population of providers whose features can be produced in chunks
pub trait FeatureSource: Sync {
    /// Number of providers in the population
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Features for positions `range` of the population, in provider order
    fn chunk(&self, range: Range<usize>) -> Vec<ProviderFeatures>;
}

/// Feature extractor over a claims snapshot
#[derive(Debug, Clone)]
pub struct FeatureExtractor<'a> {
    snapshot: &'a ClaimsSnapshot,
    config: &'a FeatureConfig,
    /// Indices into `snapshot.providers()` with positive lifetime paid
    population: Vec<usize>,
}

impl<'a> FeatureExtractor<'a> {
    #[must_use]
    pub fn new(snapshot: &'a ClaimsSnapshot, config: &'a FeatureConfig) -> Self {
        let population = snapshot
            .providers()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.total_paid > 0.0)
            .map(|(i, _)| i)
            .collect();
        Self {
            snapshot,
            config,
            population,
        }
    }

    /// Provider identities in population order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.population
            .iter()
            .map(|&i| self.snapshot.providers()[i].provider.as_str())
    }

    /// Features of one provider
    #[must_use]
    pub fn extract(&self, p: &ProviderAggregate) -> FeatureVector {
        let codes = self.snapshot.codes.get(&p.provider);
        let top_code_paid = codes.iter().map(|c| c.paid).fold(0.0, f64::max);

        let floor = self.config.growth_floor;
        let (min_year, max_year) = self
            .snapshot
            .years
            .get(&p.provider)
            .iter()
            .filter(|y| y.paid > floor)
            .fold((f64::INFINITY, 0.0_f64), |(lo, hi), y| (lo.min(y.paid), hi.max(y.paid)));
        let max_growth_ratio = if min_year.is_finite() {
            safe_div(max_year, min_year)
        } else {
            0.0
        };

        let network_size = self
            .snapshot
            .networks
            .binary_search_by(|n| n.provider.as_str().cmp(&p.provider))
            .map_or(0.0, |i| self.snapshot.networks[i].servicing_count as f64);

        FeatureVector {
            total_paid: p.total_paid,
            total_claims: p.total_claims,
            total_beneficiaries: p.total_beneficiaries,
            code_count: p.code_count as f64,
            active_months: p.active_months as f64,
            cost_per_claim: p.cost_per_claim(),
            cost_per_beneficiary: p.cost_per_beneficiary(),
            claims_per_beneficiary: p.claims_per_beneficiary(),
            paid_per_month: p.paid_per_month(),
            claims_per_month: p.claims_per_month(),
            top_code_concentration: safe_div(top_code_paid, p.total_paid).clamp(0.0, 1.0),
            self_billing_ratio: p.self_billing_ratio(),
            max_growth_ratio,
            short_burst: p.active_months <= self.config.short_burst_max_months
                && p.total_paid > self.config.short_burst_min_paid,
            low_code_high_bill: p.code_count <= self.config.low_code_max_codes
                && p.total_paid > self.config.low_code_min_paid,
            network_size,
        }
    }
}

impl FeatureSource for FeatureExtractor<'_> {
    fn len(&self) -> usize {
        self.population.len()
    }

    fn chunk(&self, range: Range<usize>) -> Vec<ProviderFeatures> {
        let end = range.end.min(self.population.len());
        let start = range.start.min(end);
        self.population[start..end]
            .par_iter()
            .map(|&i| {
                let p = &self.snapshot.providers()[i];
                ProviderFeatures {
                    provider: p.provider.clone(),
                    features: self.extract(p),
                }
            })
            .collect()
    }
}

/// Features held in memory, mainly for tests and small populations
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeatures {
    rows: Vec<ProviderFeatures>,
}

impl InMemoryFeatures {
    /// Rows are sorted by provider so chunking is order-independent
    #[must_use]
    pub fn new(mut rows: Vec<ProviderFeatures>) -> Self {
        rows.sort_by(|a, b| a.provider.cmp(&b.provider));
        Self { rows }
    }
}

impl FeatureSource for InMemoryFeatures {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn chunk(&self, range: Range<usize>) -> Vec<ProviderFeatures> {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        self.rows[start..end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{ClaimRow, snapshot_of};

    fn snapshot() -> ClaimsSnapshot {
        snapshot_of(&[
            ClaimRow::new("F", "A", "2021-01", 100, 1_000.0).beneficiaries(10),
            ClaimRow::new("F", "A", "2021-02", 100, 1_000.0)
                .beneficiaries(10)
                .servicing(Some("S1")),
            ClaimRow::new("F", "B", "2022-01", 200, 3_000.0)
                .beneficiaries(20)
                .servicing(Some("S2")),
            ClaimRow::new("Z", "A", "2022-01", 0, 0.0),
        ])
    }

    #[test]
    fn test_feature_values() {
        let snapshot = snapshot();
        let config = FeatureConfig::default();
        let extractor = FeatureExtractor::new(&snapshot, &config);

        assert_eq!(extractor.len(), 1);
        assert_eq!(extractor.providers().collect::<Vec<_>>(), ["F"]);

        let rows = extractor.chunk(0..10);
        let f = &rows[0].features;
        assert_eq!(f.total_paid, 5_000.0);
        assert_eq!(f.code_count, 2.0);
        assert_eq!(f.active_months, 3.0);
        assert_eq!(f.cost_per_claim, 12.5);
        assert_eq!(f.claims_per_beneficiary, 10.0);
        assert!((f.top_code_concentration - 0.6).abs() < 1e-12);
        assert!((f.self_billing_ratio - 1.0 / 3.0).abs() < 1e-12);
        assert!((f.max_growth_ratio - 1.5).abs() < 1e-12);
        assert!(!f.short_burst);
        assert!(!f.low_code_high_bill);
        assert_eq!(f.network_size, 2.0);
    }

    #[test]
    fn test_growth_ratio_edge_cases() {
        let snapshot = snapshot_of(&[
            ClaimRow::new("One", "A", "2021-01", 10, 5_000.0),
            ClaimRow::new("Low", "A", "2021-01", 10, 50.0),
            ClaimRow::new("Low", "A", "2022-01", 10, 60.0),
        ]);
        let config = FeatureConfig::default();
        let extractor = FeatureExtractor::new(&snapshot, &config);
        let rows = extractor.chunk(0..extractor.len());

        let by_id = |id: &str| rows.iter().find(|r| r.provider == id).map(|r| r.features.max_growth_ratio);
        assert_eq!(by_id("One"), Some(1.0));
        assert_eq!(by_id("Low"), Some(0.0));
    }

    #[test]
    fn test_chunks_cover_population_in_order() {
        let rows: Vec<ClaimRow> = (0..25)
            .map(|i| ClaimRow::new(&format!("P{i:03}"), "A", "2022-01", 10, 100.0 + f64::from(i)))
            .collect();
        let snapshot = snapshot_of(&rows);
        let config = FeatureConfig::default();
        let extractor = FeatureExtractor::new(&snapshot, &config);

        let mut seen = Vec::new();
        for start in (0..extractor.len()).step_by(7) {
            seen.extend(extractor.chunk(start..start + 7).into_iter().map(|r| r.provider));
        }
        let expected: Vec<String> = extractor.providers().map(str::to_string).collect();
        assert_eq!(seen, expected);
        assert_eq!(seen.len(), 25);
        assert!(extractor.chunk(30..40).is_empty());
    }
}
