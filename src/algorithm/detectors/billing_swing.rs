//! Year-over-year detectors: large swings and explosive growth
//!
//! Both compare consecutive calendar years of the same provider. A gap year
//! breaks the chain, so 2019 -> 2021 is never compared.

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::{BillingSwingThresholds, GrowthThresholds};
use crate::models::{
    BillingSwingFlag, ExplosiveGrowthFlag, FlagKind, FlagRecord, ProviderYearAggregate,
};

fn consecutive_years(
    snapshot: &ClaimsSnapshot,
) -> impl Iterator<Item = (&ProviderYearAggregate, &ProviderYearAggregate)> {
    snapshot.years.groups().flat_map(|(_, years)| {
        years
            .windows(2)
            .filter(|pair| pair[1].year == pair[0].year + 1)
            .map(|pair| (&pair[0], &pair[1]))
    })
}

/// Swings in either direction that are large both relatively and absolutely
#[must_use]
pub fn detect_billing_swings(snapshot: &ClaimsSnapshot, t: &BillingSwingThresholds) -> Vec<BillingSwingFlag> {
    let flags = consecutive_years(snapshot)
        .filter(|(prior, _)| prior.paid > t.min_prior_paid)
        .filter_map(|(prior, current)| {
            let change = current.paid - prior.paid;
            let pct_change = change / prior.paid * 100.0;
            (pct_change.abs() > t.min_abs_pct_change && change.abs() > t.min_abs_change).then(|| {
                BillingSwingFlag {
                    provider: current.provider.clone(),
                    prior_year: prior.year,
                    year: current.year,
                    prior_paid: prior.paid,
                    paid: current.paid,
                    change,
                    pct_change,
                }
            })
        })
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.change.abs(), |f| f.provider.as_str())
}

/// Growth of several hundred percent over a small but real prior year
#[must_use]
pub fn detect_explosive_growth(snapshot: &ClaimsSnapshot, t: &GrowthThresholds) -> Vec<ExplosiveGrowthFlag> {
    let flags = consecutive_years(snapshot)
        .filter(|(prior, _)| prior.paid > t.min_prior_paid)
        .filter_map(|(prior, current)| {
            let growth_pct = (current.paid - prior.paid) / prior.paid * 100.0;
            (growth_pct > t.min_growth_pct).then(|| ExplosiveGrowthFlag {
                provider: current.provider.clone(),
                prior_year: prior.year,
                year: current.year,
                prior_paid: prior.paid,
                paid: current.paid,
                growth_pct,
            })
        })
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.paid, |f| f.provider.as_str())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BillingSwingDetector;

impl Detector for BillingSwingDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::BillingSwing
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_billing_swings(ctx.snapshot, &ctx.config.billing_swing)
            .into_iter()
            .map(FlagRecord::BillingSwing)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExplosiveGrowthDetector;

impl Detector for ExplosiveGrowthDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::ExplosiveGrowth
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_explosive_growth(ctx.snapshot, &ctx.config.explosive_growth)
            .into_iter()
            .map(FlagRecord::ExplosiveGrowth)
            .collect()
    }
}
