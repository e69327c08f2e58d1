//! Threshold policy for the rule-based detectors.
//!
//! Every constant here was picked empirically on one claims dataset. They are
//! policy, not invariants, and can be overridden from a config file.

use chrono::NaiveDate;
use serde::Deserialize;

/// First day of a month; falls back to the epoch for impossible dates
#[must_use]
pub fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
}

/// Thresholds for every detector in the suite
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub code_outlier: CodeOutlierThresholds,
    pub billing_swing: BillingSwingThresholds,
    pub new_entrant: NewEntrantThresholds,
    pub rate_outlier: RateOutlierThresholds,
    pub explosive_growth: GrowthThresholds,
    pub instant_volume: InstantVolumeThresholds,
    pub concentration: ConcentrationThresholds,
    pub consistency: ConsistencyThresholds,
    pub beneficiary_stuffing: StuffingThresholds,
    pub network: NetworkThresholds,
    pub code_migration: MigrationThresholds,
    pub dual_billing: DualBillingThresholds,
}

/// Provider billing a code far above the national median cost per claim
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodeOutlierThresholds {
    /// Minimum claims for the (provider, code) pair
    pub min_claims: u64,
    /// Minimum paid before a pair is considered at all
    pub min_paid: f64,
    /// Provider CPC / code median must exceed this
    pub min_median_ratio: f64,
    /// Paid must exceed this for the flag to fire
    pub min_flag_paid: f64,
    /// Largest pairs by paid kept
    pub max_flags: usize,
}

impl Default for CodeOutlierThresholds {
    fn default() -> Self {
        Self {
            min_claims: 100,
            min_paid: 100_000.0,
            min_median_ratio: 3.0,
            min_flag_paid: 500_000.0,
            max_flags: 300,
        }
    }
}

/// Year-over-year swings in either direction
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingSwingThresholds {
    pub min_prior_paid: f64,
    /// Absolute percent change, e.g. 200.0 for 200%
    pub min_abs_pct_change: f64,
    pub min_abs_change: f64,
    pub max_flags: usize,
}

impl Default for BillingSwingThresholds {
    fn default() -> Self {
        Self {
            min_prior_paid: 50_000.0,
            min_abs_pct_change: 200.0,
            min_abs_change: 1_000_000.0,
            max_flags: 300,
        }
    }
}

/// Providers first seen recently with large lifetime billing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewEntrantThresholds {
    /// First-seen year must be at or after this year
    pub first_year_cutoff: i32,
    pub min_lifetime_paid: f64,
    pub max_flags: usize,
}

impl Default for NewEntrantThresholds {
    fn default() -> Self {
        Self {
            first_year_cutoff: 2022,
            min_lifetime_paid: 5_000_000.0,
            max_flags: 200,
        }
    }
}

/// Top spenders billing several codes above the national upper percentiles
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateOutlierThresholds {
    /// Number of top providers by lifetime paid examined
    pub top_providers: usize,
    /// Codes with fewer claims are ignored
    pub min_code_claims: u64,
    pub min_codes_above_p90: usize,
    pub min_codes_above_p99: usize,
    /// The p99 branch also needs total paid above this
    pub p99_min_total_paid: f64,
    /// Outlier codes reported per flag
    pub top_codes_reported: usize,
    pub max_flags: usize,
}

impl Default for RateOutlierThresholds {
    fn default() -> Self {
        Self {
            top_providers: 500,
            min_code_claims: 10,
            min_codes_above_p90: 2,
            min_codes_above_p99: 1,
            p99_min_total_paid: 10_000_000.0,
            top_codes_reported: 5,
            max_flags: 500,
        }
    }
}

/// Very large relative year-over-year growth
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrowthThresholds {
    pub min_prior_paid: f64,
    /// Percent growth, e.g. 500.0 for 500%
    pub min_growth_pct: f64,
    pub max_flags: usize,
}

impl Default for GrowthThresholds {
    fn default() -> Self {
        Self {
            min_prior_paid: 10_000.0,
            min_growth_pct: 500.0,
            max_flags: 200,
        }
    }
}

/// New providers billing heavily in their very first year
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstantVolumeThresholds {
    pub first_year_cutoff: i32,
    pub min_first_year_paid: f64,
    pub max_flags: usize,
}

impl Default for InstantVolumeThresholds {
    fn default() -> Self {
        Self {
            first_year_cutoff: 2021,
            min_first_year_paid: 1_000_000.0,
            max_flags: 200,
        }
    }
}

/// Large billers using only one or two procedure codes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConcentrationThresholds {
    pub max_distinct_codes: u64,
    pub min_paid: f64,
    pub max_flags: usize,
}

impl Default for ConcentrationThresholds {
    fn default() -> Self {
        Self {
            max_distinct_codes: 2,
            min_paid: 5_000_000.0,
            max_flags: 200,
        }
    }
}

/// Month-to-month coefficient of variation extremes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsistencyThresholds {
    pub min_active_months: u64,
    /// Inclusive floor on the average monthly paid
    pub min_avg_monthly_paid: f64,
    /// CV strictly below this is "smooth"
    pub smooth_max_cv: f64,
    /// CV strictly above this is "volatile"
    pub volatile_min_cv: f64,
    pub max_smooth_flags: usize,
    pub max_volatile_flags: usize,
}

impl Default for ConsistencyThresholds {
    fn default() -> Self {
        Self {
            min_active_months: 24,
            min_avg_monthly_paid: 100_000.0,
            smooth_max_cv: 0.05,
            volatile_min_cv: 2.0,
            max_smooth_flags: 100,
            max_volatile_flags: 50,
        }
    }
}

/// Many claims per beneficiary
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StuffingThresholds {
    pub min_claims_per_beneficiary: f64,
    pub min_paid: f64,
    pub max_flags: usize,
}

impl Default for StuffingThresholds {
    fn default() -> Self {
        Self {
            min_claims_per_beneficiary: 100.0,
            min_paid: 1_000_000.0,
            max_flags: 200,
        }
    }
}

/// Billing hubs and ghost identities
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkThresholds {
    /// Distinct servicing identities (excluding self) needed for a hub
    pub min_servicing: u64,
    /// Ghost billers are flagged only at or above this lifetime paid
    pub ghost_biller_min_paid: f64,
    pub max_flags: usize,
    pub max_ghost_flags: usize,
}

impl Default for NetworkThresholds {
    fn default() -> Self {
        Self {
            min_servicing: 10,
            ghost_biller_min_paid: 1_000_000.0,
            max_flags: 200,
            max_ghost_flags: 200,
        }
    }
}

/// Change of dominant procedure code between an early and a late window
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationThresholds {
    /// Early window is every month strictly before this date
    pub early_window_end: NaiveDate,
    /// Late window is every month at or after this date
    pub late_window_start: NaiveDate,
    pub min_lifetime_paid: f64,
    pub max_flags: usize,
}

impl Default for MigrationThresholds {
    fn default() -> Self {
        Self {
            early_window_end: month_start(2020, 1),
            late_window_start: month_start(2022, 1),
            min_lifetime_paid: 1_000_000.0,
            max_flags: 200,
        }
    }
}

/// Two codes billed with near-identical claim counts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DualBillingThresholds {
    /// Each code needs strictly more claims than this
    pub min_code_claims: u64,
    /// Relative claim-count difference must be strictly below this
    pub max_claim_diff: f64,
    pub min_combined_paid: f64,
    pub max_flags: usize,
}

impl Default for DualBillingThresholds {
    fn default() -> Self {
        Self {
            min_code_claims: 1_000,
            max_claim_diff: 0.03,
            min_combined_paid: 500_000.0,
            max_flags: 100,
        }
    }
}
