//! Providers billing a code far above the code's national median

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::benchmark::BenchmarkTable;
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::CodeOutlierThresholds;
use crate::models::{CodeOutlierFlag, FlagKind, FlagRecord};

/// Provider cost per claim compared with the code median
#[must_use]
pub fn detect_code_outliers(
    snapshot: &ClaimsSnapshot,
    benchmarks: &BenchmarkTable,
    t: &CodeOutlierThresholds,
) -> Vec<CodeOutlierFlag> {
    let flags = snapshot
        .codes
        .rows()
        .iter()
        .filter(|row| row.claims >= t.min_claims as f64 && row.paid > t.min_paid)
        .filter_map(|row| {
            let benchmark = benchmarks.get(&row.code)?;
            if benchmark.median_cpc <= 0.0 {
                return None;
            }
            let cpc = row.cost_per_claim();
            let ratio = cpc / benchmark.median_cpc;
            (ratio > t.min_median_ratio && row.paid > t.min_flag_paid).then(|| CodeOutlierFlag {
                provider: row.provider.clone(),
                code: row.code.clone(),
                claims: row.claims,
                paid: row.paid,
                cost_per_claim: cpc,
                median_cpc: benchmark.median_cpc,
                ratio_to_median: ratio,
                tier: benchmark.tier(cpc),
            })
        })
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.paid, |f| f.provider.as_str())
}

/// Detector wrapper for [`detect_code_outliers`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeOutlierDetector;

impl Detector for CodeOutlierDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::CodeOutlier
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_code_outliers(ctx.snapshot, ctx.benchmarks, &ctx.config.code_outlier)
            .into_iter()
            .map(FlagRecord::CodeOutlier)
            .collect()
    }
}
