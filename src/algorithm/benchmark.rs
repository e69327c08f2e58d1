//! Per-procedure-code national cost benchmarks
//!
//! Each (provider, code) pair contributes one cost-per-claim observation.
//! Pairs with no claims or a non-positive cost are skipped, and codes with
//! fewer contributing providers than the support minimum get no benchmark at
//! all, which keeps them out of every outlier and tier computation.

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::stats::{mean, percentile_cont, sample_std};
use crate::config::BenchmarkConfig;
use crate::models::{CodeBenchmark, CostTier, ProviderCodeAggregate};
use crate::utils::{log_operation_complete, log_operation_start};

#[derive(Default)]
struct CodeObservations {
    cost_per_claim: Vec<f64>,
    spending: f64,
    claims: f64,
}

/// Benchmarks keyed by procedure code
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkTable {
    benchmarks: BTreeMap<String, CodeBenchmark>,
}

impl BenchmarkTable {
    /// Build benchmarks from provider x code totals
    ///
    /// # Arguments
    /// * `rows` - Provider x code totals, any order
    /// * `config` - Support minimum
    #[must_use]
    pub fn build(rows: &[ProviderCodeAggregate], config: &BenchmarkConfig) -> Self {
        let start = Instant::now();
        log_operation_start("Building code benchmarks from", "provider x code totals");

        let mut by_code: FxHashMap<&str, CodeObservations> = FxHashMap::default();
        let mut skipped = 0usize;
        for row in rows {
            if row.claims <= 0.0 {
                skipped += 1;
                continue;
            }
            let cpc = row.cost_per_claim();
            if cpc <= 0.0 {
                skipped += 1;
                continue;
            }
            let obs = by_code.entry(row.code.as_str()).or_default();
            obs.cost_per_claim.push(cpc);
            obs.spending += row.paid;
            obs.claims += row.claims;
        }

        let candidates = by_code.len();
        let benchmarks: BTreeMap<String, CodeBenchmark> = by_code
            .into_par_iter()
            .filter(|(_, obs)| obs.cost_per_claim.len() >= config.min_providers)
            .map(|(code, obs)| (code.to_string(), summarize(code, obs)))
            .collect();

        log::debug!(
            "Skipped {skipped} pairs without positive cost; dropped {} under-supported codes",
            candidates - benchmarks.len()
        );
        log_operation_complete("built", "code benchmarks", benchmarks.len(), Some(start.elapsed()));
        Self { benchmarks }
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&CodeBenchmark> {
        self.benchmarks.get(code)
    }

    /// Tier of a cost per claim, `None` if the code has no benchmark
    #[must_use]
    pub fn tier_for(&self, code: &str, cost_per_claim: f64) -> Option<CostTier> {
        self.get(code).map(|b| b.tier(cost_per_claim))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.benchmarks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty()
    }

    /// Benchmarks in code order
    pub fn iter(&self) -> impl Iterator<Item = &CodeBenchmark> {
        self.benchmarks.values()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<CodeBenchmark> {
        self.benchmarks.into_values().collect()
    }
}

fn summarize(code: &str, mut obs: CodeObservations) -> CodeBenchmark {
    obs.cost_per_claim.sort_unstable_by(f64::total_cmp);
    let sorted = &obs.cost_per_claim;
    let pct = |q| percentile_cont(sorted, q);

    CodeBenchmark {
        code: code.to_string(),
        providers: sorted.len(),
        total_spending: obs.spending,
        total_claims: obs.claims,
        mean_cpc: mean(sorted),
        median_cpc: pct(0.5),
        stddev_cpc: sample_std(sorted),
        min_cpc: sorted.first().copied().unwrap_or_default(),
        max_cpc: sorted.last().copied().unwrap_or_default(),
        p10: pct(0.10),
        p25: pct(0.25),
        p75: pct(0.75),
        p90: pct(0.90),
        p95: pct(0.95),
        p99: pct(0.99),
    }
}
