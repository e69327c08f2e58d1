//! Top spenders billing several codes above national upper percentiles

use rayon::prelude::*;

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::benchmark::BenchmarkTable;
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::RateOutlierThresholds;
use crate::models::{FlagKind, FlagRecord, OutlierCode, RateOutlierFlag};

fn analyze_provider(
    provider: &str,
    snapshot: &ClaimsSnapshot,
    benchmarks: &BenchmarkTable,
    t: &RateOutlierThresholds,
) -> Option<RateOutlierFlag> {
    let mut total_paid = 0.0;
    let mut above_p99 = 0;
    let mut outliers = Vec::new();

    for row in snapshot.codes.get(provider) {
        if row.claims < t.min_code_claims as f64 {
            continue;
        }
        total_paid += row.paid;

        let Some(benchmark) = benchmarks.get(&row.code) else {
            continue;
        };
        let cpc = row.cost_per_claim();
        if cpc <= benchmark.p90 {
            continue;
        }
        let is_p99 = cpc > benchmark.p99;
        if is_p99 {
            above_p99 += 1;
        }
        outliers.push(OutlierCode {
            code: row.code.clone(),
            cost_per_claim: cpc,
            p90: benchmark.p90,
            p99: benchmark.p99,
            ratio_to_p90: cpc / benchmark.p90,
            paid: row.paid,
            above_p99: is_p99,
        });
    }

    let above_p90 = outliers.len();
    let flagged = above_p90 >= t.min_codes_above_p90
        || (above_p99 >= t.min_codes_above_p99 && total_paid > t.p99_min_total_paid);
    if !flagged {
        return None;
    }

    outliers.sort_by(|a, b| b.paid.total_cmp(&a.paid).then_with(|| a.code.cmp(&b.code)));
    outliers.truncate(t.top_codes_reported);

    Some(RateOutlierFlag {
        provider: provider.to_string(),
        total_paid,
        codes_above_p90: above_p90,
        codes_above_p99: above_p99,
        outlier_codes: outliers,
    })
}

/// Multi-code rate analysis over the largest providers by lifetime paid
#[must_use]
pub fn detect_rate_outliers(
    snapshot: &ClaimsSnapshot,
    benchmarks: &BenchmarkTable,
    t: &RateOutlierThresholds,
) -> Vec<RateOutlierFlag> {
    let top: Vec<&str> = rank_and_cap(
        snapshot.providers().iter().collect(),
        t.top_providers,
        |p| p.total_paid,
        |p| p.provider.as_str(),
    )
    .into_iter()
    .map(|p| p.provider.as_str())
    .collect();

    let flags = top
        .par_iter()
        .filter_map(|provider| analyze_provider(provider, snapshot, benchmarks, t))
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.total_paid, |f| f.provider.as_str())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RateOutlierDetector;

impl Detector for RateOutlierDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::MultiCodeRateOutlier
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_rate_outliers(ctx.snapshot, ctx.benchmarks, &ctx.config.rate_outlier)
            .into_iter()
            .map(FlagRecord::MultiCodeRateOutlier)
            .collect()
    }
}
