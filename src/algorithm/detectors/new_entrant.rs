//! Recently appeared providers with outsized billing

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::{InstantVolumeThresholds, NewEntrantThresholds};
use crate::models::{FlagKind, FlagRecord, InstantVolumeFlag, NewEntrantFlag};

/// Providers first seen at or after the cutoff year with large lifetime paid
#[must_use]
pub fn detect_new_entrants(snapshot: &ClaimsSnapshot, t: &NewEntrantThresholds) -> Vec<NewEntrantFlag> {
    let flags = snapshot
        .providers()
        .iter()
        .filter(|p| p.total_paid > t.min_lifetime_paid)
        .filter_map(|p| {
            let first_month = p.first_month?;
            (p.first_year()? >= t.first_year_cutoff).then(|| NewEntrantFlag {
                provider: p.provider.clone(),
                first_month,
                last_month: p.last_month,
                lifetime_paid: p.total_paid,
                lifetime_claims: p.total_claims,
                active_months: p.active_months,
                paid_per_month: p.paid_per_month(),
            })
        })
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.lifetime_paid, |f| f.provider.as_str())
}

/// New providers whose first calendar year alone is already large
#[must_use]
pub fn detect_instant_volume(snapshot: &ClaimsSnapshot, t: &InstantVolumeThresholds) -> Vec<InstantVolumeFlag> {
    let flags = snapshot
        .providers()
        .iter()
        .filter_map(|p| {
            let first_year = p.first_year()?;
            if first_year < t.first_year_cutoff {
                return None;
            }
            let year = snapshot
                .years
                .get(&p.provider)
                .iter()
                .find(|y| y.year == first_year)?;
            (year.paid > t.min_first_year_paid).then(|| InstantVolumeFlag {
                provider: p.provider.clone(),
                first_year,
                first_year_paid: year.paid,
                first_year_claims: year.claims,
                lifetime_paid: p.total_paid,
            })
        })
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.first_year_paid, |f| f.provider.as_str())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NewEntrantDetector;

impl Detector for NewEntrantDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::NewEntrant
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_new_entrants(ctx.snapshot, &ctx.config.new_entrant)
            .into_iter()
            .map(FlagRecord::NewEntrant)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstantVolumeDetector;

impl Detector for InstantVolumeDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::InstantVolume
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_instant_volume(ctx.snapshot, &ctx.config.instant_volume)
            .into_iter()
            .map(FlagRecord::InstantVolume)
            .collect()
    }
}
