//! Dominant procedure code changes between an early and a late window

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::MigrationThresholds;
use crate::models::{FlagKind, FlagRecord, MigrationFlag, ProviderCodeAggregate};

// Largest code by paid; ties go to the smaller code.
fn top_code(rows: &[ProviderCodeAggregate]) -> Option<&ProviderCodeAggregate> {
    rows.iter()
        .max_by(|a, b| a.paid.total_cmp(&b.paid).then_with(|| b.code.cmp(&a.code)))
}

/// Providers whose top code in the early window differs from the late window
///
/// Window bounds live in the snapshot queries; see
/// [`MigrationThresholds::early_window_end`].
#[must_use]
pub fn detect_code_migration(snapshot: &ClaimsSnapshot, t: &MigrationThresholds) -> Vec<MigrationFlag> {
    let flags = snapshot
        .providers()
        .iter()
        .filter(|p| p.total_paid > t.min_lifetime_paid)
        .filter_map(|p| {
            let early = top_code(snapshot.early_codes.get(&p.provider))?;
            let late = top_code(snapshot.late_codes.get(&p.provider))?;
            (early.code != late.code).then(|| MigrationFlag {
                provider: p.provider.clone(),
                early_code: early.code.clone(),
                early_paid: early.paid,
                late_code: late.code.clone(),
                late_paid: late.paid,
                lifetime_paid: p.total_paid,
            })
        })
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.lifetime_paid, |f| f.provider.as_str())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeMigrationDetector;

impl Detector for CodeMigrationDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::CodeMigration
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_code_migration(ctx.snapshot, &ctx.config.code_migration)
            .into_iter()
            .map(FlagRecord::CodeMigration)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{ClaimRow, snapshot_of};

    #[test]
    fn test_dominant_code_change() {
        let snapshot = snapshot_of(&[
            ClaimRow::new("M", "A", "2019-05", 100, 2_000_000.0),
            ClaimRow::new("M", "B", "2019-06", 100, 100_000.0),
            // middle window is ignored
            ClaimRow::new("M", "C", "2021-01", 100, 9_000_000.0),
            ClaimRow::new("M", "B", "2022-05", 100, 3_000_000.0),
            ClaimRow::new("N", "A", "2019-05", 100, 2_000_000.0),
            ClaimRow::new("N", "A", "2022-05", 100, 2_000_000.0),
        ]);
        let flags = detect_code_migration(&snapshot, &MigrationThresholds::default());

        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].provider, "M");
        assert_eq!(flags[0].early_code, "A");
        assert_eq!(flags[0].late_code, "B");
        assert_eq!(flags[0].late_paid, 3_000_000.0);
        assert_eq!(flags[0].lifetime_paid, 14_100_000.0);
    }
}
