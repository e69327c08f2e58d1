//! Provider-level volume shape detectors: code concentration and
//! beneficiary stuffing

use smallvec::SmallVec;

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::{ConcentrationThresholds, StuffingThresholds};
use crate::models::{ConcentrationFlag, FlagKind, FlagRecord, StuffingFlag};

/// Large billers using at most a couple of procedure codes
#[must_use]
pub fn detect_concentration(snapshot: &ClaimsSnapshot, t: &ConcentrationThresholds) -> Vec<ConcentrationFlag> {
    let flags = snapshot
        .providers()
        .iter()
        .filter(|p| p.code_count > 0 && p.code_count <= t.max_distinct_codes && p.total_paid > t.min_paid)
        .map(|p| {
            let mut codes: Vec<_> = snapshot.codes.get(&p.provider).iter().collect();
            codes.sort_by(|a, b| b.paid.total_cmp(&a.paid).then_with(|| a.code.cmp(&b.code)));
            ConcentrationFlag {
                provider: p.provider.clone(),
                code_count: p.code_count,
                total_paid: p.total_paid,
                codes: codes.into_iter().map(|c| c.code.clone()).collect::<SmallVec<_>>(),
            }
        })
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.total_paid, |f| f.provider.as_str())
}

/// Claims per beneficiary far beyond any plausible treatment course
#[must_use]
pub fn detect_beneficiary_stuffing(snapshot: &ClaimsSnapshot, t: &StuffingThresholds) -> Vec<StuffingFlag> {
    let flags = snapshot
        .providers()
        .iter()
        .filter(|p| p.total_beneficiaries > 0.0 && p.total_paid > t.min_paid)
        .filter(|p| p.claims_per_beneficiary() > t.min_claims_per_beneficiary)
        .map(|p| StuffingFlag {
            provider: p.provider.clone(),
            total_claims: p.total_claims,
            total_beneficiaries: p.total_beneficiaries,
            claims_per_beneficiary: p.claims_per_beneficiary(),
            total_paid: p.total_paid,
        })
        .collect();

    rank_and_cap(flags, t.max_flags, |f| f.claims_per_beneficiary, |f| f.provider.as_str())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConcentrationDetector;

impl Detector for ConcentrationDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::ProcedureConcentration
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_concentration(ctx.snapshot, &ctx.config.concentration)
            .into_iter()
            .map(FlagRecord::ProcedureConcentration)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BeneficiaryStuffingDetector;

impl Detector for BeneficiaryStuffingDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::BeneficiaryStuffing
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_beneficiary_stuffing(ctx.snapshot, &ctx.config.beneficiary_stuffing)
            .into_iter()
            .map(FlagRecord::BeneficiaryStuffing)
            .collect()
    }
}
