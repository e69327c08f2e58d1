//! Pairs of codes billed with near-identical claim counts
//!
//! Candidate codes of a provider are sorted by claim count. For a code with
//! `c` claims only the following codes with fewer than `c / (1 - max_diff)`
//! claims can qualify, so the inner scan stops early instead of testing all
//! pairs.

use rayon::prelude::*;

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::DualBillingThresholds;
use crate::models::{DualBillingFlag, FlagKind, FlagRecord, ProviderCodeAggregate};

fn provider_pairs(
    provider: &str,
    rows: &[ProviderCodeAggregate],
    t: &DualBillingThresholds,
) -> Vec<DualBillingFlag> {
    let mut candidates: Vec<&ProviderCodeAggregate> = rows
        .iter()
        .filter(|r| r.claims > t.min_code_claims as f64)
        .collect();
    if candidates.len() < 2 {
        return Vec::new();
    }
    candidates.sort_by(|a, b| a.claims.total_cmp(&b.claims).then_with(|| a.code.cmp(&b.code)));

    let mut flags = Vec::new();
    for (i, low) in candidates.iter().enumerate() {
        for high in &candidates[i + 1..] {
            let diff = (high.claims - low.claims) / high.claims;
            if diff >= t.max_claim_diff {
                break;
            }
            let combined_paid = low.paid + high.paid;
            if combined_paid <= t.min_combined_paid {
                continue;
            }
            let (a, b) = if low.code <= high.code { (low, high) } else { (high, low) };
            flags.push(DualBillingFlag {
                provider: provider.to_string(),
                code_a: a.code.clone(),
                code_b: b.code.clone(),
                claims_a: a.claims,
                claims_b: b.claims,
                claim_diff: diff,
                combined_paid,
            });
        }
    }
    flags
}

/// Code pairs per provider with matching claim volumes
#[must_use]
pub fn detect_dual_billing(snapshot: &ClaimsSnapshot, t: &DualBillingThresholds) -> Vec<DualBillingFlag> {
    let groups: Vec<(&str, &[ProviderCodeAggregate])> = snapshot.codes.groups().collect();
    let flags = groups
        .par_iter()
        .flat_map_iter(|(provider, rows)| provider_pairs(provider, rows, t))
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.combined_paid, |f| f.provider.as_str())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DualBillingDetector;

impl Detector for DualBillingDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::DualBilling
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_dual_billing(ctx.snapshot, &ctx.config.dual_billing)
            .into_iter()
            .map(FlagRecord::DualBilling)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{ClaimRow, snapshot_of};

    #[test]
    fn test_near_identical_claim_counts() {
        let snapshot = snapshot_of(&[
            ClaimRow::new("D", "Y", "2022-01", 10_200, 400_000.0),
            ClaimRow::new("D", "X", "2022-01", 10_000, 400_000.0),
            ClaimRow::new("D", "Z", "2022-01", 20_000, 900_000.0),
            // matching counts but too little money
            ClaimRow::new("E", "X", "2022-01", 5_000, 100_000.0),
            ClaimRow::new("E", "Y", "2022-01", 5_000, 100_000.0),
        ]);
        let flags = detect_dual_billing(&snapshot, &DualBillingThresholds::default());

        assert_eq!(flags.len(), 1);
        let flag = &flags[0];
        assert_eq!(flag.provider, "D");
        assert_eq!((flag.code_a.as_str(), flag.code_b.as_str()), ("X", "Y"));
        assert_eq!(flag.claims_a, 10_000.0);
        assert!((flag.claim_diff - 200.0 / 10_200.0).abs() < 1e-12);
        assert_eq!(flag.combined_paid, 800_000.0);
    }
}
