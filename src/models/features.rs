//! Per-provider feature vectors for the risk model

use serde::Serialize;

/// Number of model features
pub const FEATURE_COUNT: usize = 16;

/// Feature names in model column order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "total_paid",
    "total_claims",
    "total_beneficiaries",
    "code_count",
    "active_months",
    "cost_per_claim",
    "cost_per_beneficiary",
    "claims_per_beneficiary",
    "paid_per_month",
    "claims_per_month",
    "top_code_concentration",
    "self_billing_ratio",
    "max_growth_ratio",
    "short_burst",
    "low_code_high_bill",
    "network_size",
];

/// Numeric features for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    pub total_paid: f64,
    pub total_claims: f64,
    pub total_beneficiaries: f64,
    pub code_count: f64,
    pub active_months: f64,
    pub cost_per_claim: f64,
    pub cost_per_beneficiary: f64,
    pub claims_per_beneficiary: f64,
    pub paid_per_month: f64,
    pub claims_per_month: f64,
    /// Largest code's share of total paid
    pub top_code_concentration: f64,
    /// Share of rows where billing and servicing identity coincide
    pub self_billing_ratio: f64,
    /// Largest over smallest yearly paid among years above the floor
    pub max_growth_ratio: f64,
    pub short_burst: bool,
    pub low_code_high_bill: bool,
    /// Distinct servicing identities other than the provider
    pub network_size: f64,
}

impl FeatureVector {
    /// Values in `FEATURE_NAMES` order with non-finite entries zeroed
    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.total_paid,
            self.total_claims,
            self.total_beneficiaries,
            self.code_count,
            self.active_months,
            self.cost_per_claim,
            self.cost_per_beneficiary,
            self.claims_per_beneficiary,
            self.paid_per_month,
            self.claims_per_month,
            self.top_code_concentration,
            self.self_billing_ratio,
            self.max_growth_ratio,
            f64::from(u8::from(self.short_burst)),
            f64::from(u8::from(self.low_code_high_bill)),
            self.network_size,
        ]
        .map(|v| if v.is_finite() { v } else { 0.0 })
    }
}

/// Features keyed by provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFeatures {
    pub provider: String,
    pub features: FeatureVector,
}
