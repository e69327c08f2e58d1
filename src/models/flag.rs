//! Flag records emitted by the rule-based detectors
//!
//! Each detector kind has its own record type with strongly typed supporting
//! metrics. `FlagRecord` is the tagged union over all of them.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::benchmark::CostTier;

/// Detector kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    CodeOutlier,
    BillingSwing,
    NewEntrant,
    MultiCodeRateOutlier,
    ExplosiveGrowth,
    InstantVolume,
    ProcedureConcentration,
    ConsistencyAnomaly,
    BeneficiaryStuffing,
    Network,
    CodeMigration,
    DualBilling,
}

impl FlagKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 12] = [
        Self::CodeOutlier,
        Self::BillingSwing,
        Self::NewEntrant,
        Self::MultiCodeRateOutlier,
        Self::ExplosiveGrowth,
        Self::InstantVolume,
        Self::ProcedureConcentration,
        Self::ConsistencyAnomaly,
        Self::BeneficiaryStuffing,
        Self::Network,
        Self::CodeMigration,
        Self::DualBilling,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeOutlier => "code_outlier",
            Self::BillingSwing => "billing_swing",
            Self::NewEntrant => "new_entrant",
            Self::MultiCodeRateOutlier => "multi_code_rate_outlier",
            Self::ExplosiveGrowth => "explosive_growth",
            Self::InstantVolume => "instant_volume",
            Self::ProcedureConcentration => "procedure_concentration",
            Self::ConsistencyAnomaly => "consistency_anomaly",
            Self::BeneficiaryStuffing => "beneficiary_stuffing",
            Self::Network => "network",
            Self::CodeMigration => "code_migration",
            Self::DualBilling => "dual_billing",
        }
    }
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider billing one code far above the national median
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeOutlierFlag {
    pub provider: String,
    pub code: String,
    pub claims: f64,
    pub paid: f64,
    pub cost_per_claim: f64,
    pub median_cpc: f64,
    pub ratio_to_median: f64,
    pub tier: CostTier,
}

/// Large swing between consecutive years
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingSwingFlag {
    pub provider: String,
    pub prior_year: i32,
    pub year: i32,
    pub prior_paid: f64,
    pub paid: f64,
    /// Signed dollar change
    pub change: f64,
    /// Signed percent change
    pub pct_change: f64,
}

/// Provider first seen recently with large lifetime billing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEntrantFlag {
    pub provider: String,
    pub first_month: NaiveDate,
    pub last_month: Option<NaiveDate>,
    pub lifetime_paid: f64,
    pub lifetime_claims: f64,
    pub active_months: u64,
    pub paid_per_month: f64,
}

/// One code billed above a national upper percentile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierCode {
    pub code: String,
    pub cost_per_claim: f64,
    pub p90: f64,
    pub p99: f64,
    pub ratio_to_p90: f64,
    pub paid: f64,
    pub above_p99: bool,
}

/// Top spender with several codes above national percentiles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateOutlierFlag {
    pub provider: String,
    pub total_paid: f64,
    pub codes_above_p90: usize,
    pub codes_above_p99: usize,
    /// Largest outlier codes by paid
    pub outlier_codes: Vec<OutlierCode>,
}

/// Year-over-year growth of several hundred percent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplosiveGrowthFlag {
    pub provider: String,
    pub prior_year: i32,
    pub year: i32,
    pub prior_paid: f64,
    pub paid: f64,
    pub growth_pct: f64,
}

/// New provider billing heavily in its first calendar year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstantVolumeFlag {
    pub provider: String,
    pub first_year: i32,
    pub first_year_paid: f64,
    pub first_year_claims: f64,
    pub lifetime_paid: f64,
}

/// Large biller concentrated in very few codes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationFlag {
    pub provider: String,
    pub code_count: u64,
    pub total_paid: f64,
    /// Codes billed, largest first
    pub codes: SmallVec<[String; 2]>,
}

/// Shape of an anomalous monthly billing series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPattern {
    /// Suspiciously flat month to month
    Smooth,
    /// Extreme spikes relative to the mean
    Volatile,
}

/// Monthly coefficient of variation outside the normal range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyFlag {
    pub provider: String,
    pub pattern: ConsistencyPattern,
    pub active_months: u64,
    pub avg_monthly_paid: f64,
    pub stddev_monthly_paid: f64,
    pub cv: f64,
    pub min_monthly_paid: f64,
    pub max_monthly_paid: f64,
    pub total_paid: f64,
}

/// Many claims per beneficiary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StuffingFlag {
    pub provider: String,
    pub total_claims: f64,
    pub total_beneficiaries: f64,
    pub claims_per_beneficiary: f64,
    pub total_paid: f64,
}

/// Role of a provider within the billing network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkRole {
    /// Bills on behalf of many servicing identities
    Hub,
    /// Bills but never appears as a servicing identity
    GhostBiller,
}

/// Billing network anomaly
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkFlag {
    pub provider: String,
    pub role: NetworkRole,
    /// Distinct servicing identities other than the provider itself
    pub servicing_count: u64,
    /// Paid on rows serviced by other identities
    pub network_paid: f64,
    pub network_claims: f64,
    pub total_paid: f64,
}

/// Dominant code changed between the early and late windows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationFlag {
    pub provider: String,
    pub early_code: String,
    pub early_paid: f64,
    pub late_code: String,
    pub late_paid: f64,
    pub lifetime_paid: f64,
}

/// Two codes billed with near-identical claim counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualBillingFlag {
    pub provider: String,
    pub code_a: String,
    pub code_b: String,
    pub claims_a: f64,
    pub claims_b: f64,
    /// `|a - b| / max(a, b)`
    pub claim_diff: f64,
    pub combined_paid: f64,
}

/// A flag raised by one detector for one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlagRecord {
    CodeOutlier(CodeOutlierFlag),
    BillingSwing(BillingSwingFlag),
    NewEntrant(NewEntrantFlag),
    MultiCodeRateOutlier(RateOutlierFlag),
    ExplosiveGrowth(ExplosiveGrowthFlag),
    InstantVolume(InstantVolumeFlag),
    ProcedureConcentration(ConcentrationFlag),
    ConsistencyAnomaly(ConsistencyFlag),
    BeneficiaryStuffing(StuffingFlag),
    Network(NetworkFlag),
    CodeMigration(MigrationFlag),
    DualBilling(DualBillingFlag),
}

impl FlagRecord {
    /// Billing identity the flag is about
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::CodeOutlier(f) => &f.provider,
            Self::BillingSwing(f) => &f.provider,
            Self::NewEntrant(f) => &f.provider,
            Self::MultiCodeRateOutlier(f) => &f.provider,
            Self::ExplosiveGrowth(f) => &f.provider,
            Self::InstantVolume(f) => &f.provider,
            Self::ProcedureConcentration(f) => &f.provider,
            Self::ConsistencyAnomaly(f) => &f.provider,
            Self::BeneficiaryStuffing(f) => &f.provider,
            Self::Network(f) => &f.provider,
            Self::CodeMigration(f) => &f.provider,
            Self::DualBilling(f) => &f.provider,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FlagKind {
        match self {
            Self::CodeOutlier(_) => FlagKind::CodeOutlier,
            Self::BillingSwing(_) => FlagKind::BillingSwing,
            Self::NewEntrant(_) => FlagKind::NewEntrant,
            Self::MultiCodeRateOutlier(_) => FlagKind::MultiCodeRateOutlier,
            Self::ExplosiveGrowth(_) => FlagKind::ExplosiveGrowth,
            Self::InstantVolume(_) => FlagKind::InstantVolume,
            Self::ProcedureConcentration(_) => FlagKind::ProcedureConcentration,
            Self::ConsistencyAnomaly(_) => FlagKind::ConsistencyAnomaly,
            Self::BeneficiaryStuffing(_) => FlagKind::BeneficiaryStuffing,
            Self::Network(_) => FlagKind::Network,
            Self::CodeMigration(_) => FlagKind::CodeMigration,
            Self::DualBilling(_) => FlagKind::DualBilling,
        }
    }
}
