//! Month-to-month billing consistency
//!
//! Real practices fluctuate. A long series that is almost perfectly flat, or
//! one dominated by a few enormous months, both warrant a look.

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::algorithm::stats::{mean, population_std, safe_div};
use crate::config::ConsistencyThresholds;
use crate::models::{ConsistencyFlag, ConsistencyPattern, FlagKind, FlagRecord};

/// Smooth and volatile monthly series
///
/// # Returns
/// Smooth flags (capped) followed by volatile flags (capped), each sorted by
/// total paid
#[must_use]
pub fn detect_consistency(snapshot: &ClaimsSnapshot, t: &ConsistencyThresholds) -> Vec<ConsistencyFlag> {
    let mut smooth = Vec::new();
    let mut volatile = Vec::new();

    for (provider, months) in snapshot.months.groups() {
        if (months.len() as u64) < t.min_active_months {
            continue;
        }
        let series: Vec<f64> = months.iter().map(|m| m.paid).collect();
        let avg = mean(&series);
        if avg < t.min_avg_monthly_paid {
            continue;
        }
        let stddev = population_std(&series);
        let cv = safe_div(stddev, avg);

        let pattern = if cv < t.smooth_max_cv {
            ConsistencyPattern::Smooth
        } else if cv > t.volatile_min_cv {
            ConsistencyPattern::Volatile
        } else {
            continue;
        };

        let flag = ConsistencyFlag {
            provider: provider.to_string(),
            pattern,
            active_months: months.len() as u64,
            avg_monthly_paid: avg,
            stddev_monthly_paid: stddev,
            cv,
            min_monthly_paid: series.iter().copied().fold(f64::INFINITY, f64::min),
            max_monthly_paid: series.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            total_paid: series.iter().sum(),
        };
        match pattern {
            ConsistencyPattern::Smooth => smooth.push(flag),
            ConsistencyPattern::Volatile => volatile.push(flag),
        }
    }

    let mut flags = rank_and_cap(smooth, t.max_smooth_flags, |f| f.total_paid, |f| f.provider.as_str());
    flags.extend(rank_and_cap(
        volatile,
        t.max_volatile_flags,
        |f| f.total_paid,
        |f| f.provider.as_str(),
    ));
    flags
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyDetector;

impl Detector for ConsistencyDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::ConsistencyAnomaly
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_consistency(ctx.snapshot, &ctx.config.consistency)
            .into_iter()
            .map(FlagRecord::ConsistencyAnomaly)
            .collect()
    }
}
