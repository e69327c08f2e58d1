//! Aggregated claims views
//!
//! These rows are recomputed from the fact table on every run and never
//! mutated afterwards. Ratios are derived on demand and are always finite.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::algorithm::stats::safe_div;

/// Lifetime totals for one billing identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderAggregate {
    /// Billing identity
    pub provider: String,
    pub total_paid: f64,
    pub total_claims: f64,
    pub total_beneficiaries: f64,
    /// Distinct procedure codes billed
    pub code_count: u64,
    /// Distinct months with any billing
    pub active_months: u64,
    /// Earliest month billed
    pub first_month: Option<NaiveDate>,
    /// Latest month billed
    pub last_month: Option<NaiveDate>,
    /// Fact rows attributed to this provider
    pub rows: u64,
    /// Rows where the billing and servicing identity coincide
    pub self_billed_rows: u64,
}

impl ProviderAggregate {
    #[must_use]
    pub fn cost_per_claim(&self) -> f64 {
        safe_div(self.total_paid, self.total_claims)
    }

    #[must_use]
    pub fn cost_per_beneficiary(&self) -> f64 {
        safe_div(self.total_paid, self.total_beneficiaries)
    }

    #[must_use]
    pub fn claims_per_beneficiary(&self) -> f64 {
        safe_div(self.total_claims, self.total_beneficiaries)
    }

    #[must_use]
    pub fn paid_per_month(&self) -> f64 {
        safe_div(self.total_paid, self.active_months as f64)
    }

    #[must_use]
    pub fn claims_per_month(&self) -> f64 {
        safe_div(self.total_claims, self.active_months as f64)
    }

    /// Fraction of rows that are self-billed, always in `[0, 1]`
    #[must_use]
    pub fn self_billing_ratio(&self) -> f64 {
        safe_div(self.self_billed_rows as f64, self.rows as f64).clamp(0.0, 1.0)
    }

    /// Year of the first billed month
    #[must_use]
    pub fn first_year(&self) -> Option<i32> {
        self.first_month.map(|m| m.year())
    }
}

/// Totals for one (provider, procedure code) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderCodeAggregate {
    pub provider: String,
    pub code: String,
    pub paid: f64,
    pub claims: f64,
    pub beneficiaries: f64,
}

impl ProviderCodeAggregate {
    #[must_use]
    pub fn cost_per_claim(&self) -> f64 {
        safe_div(self.paid, self.claims)
    }
}

/// Totals for one provider in one calendar year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderYearAggregate {
    pub provider: String,
    pub year: i32,
    pub paid: f64,
    pub claims: f64,
}

/// Totals for one provider in one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderMonthAggregate {
    pub provider: String,
    pub month: NaiveDate,
    pub paid: f64,
    pub claims: f64,
}

/// Totals for one provider over rows billed on behalf of other identities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkAggregate {
    pub provider: String,
    /// Distinct servicing identities other than the provider itself
    pub servicing_count: u64,
    pub paid: f64,
    pub claims: f64,
}
