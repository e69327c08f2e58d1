//! Grouped queries over the claims fact table
//!
//! The engine never touches raw claim rows directly. Everything it needs is
//! expressed as a grouped aggregate query against an [`AggregationProvider`].
//! Providers are read-only and every query is self-contained, so queries may
//! run concurrently.

pub mod loader;
pub mod schema;
pub mod source;
pub mod table;

use std::sync::Arc;

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use crate::error::Result;

pub use loader::{ParquetDirectorySource, find_parquet_files, load_claims_async};
pub use schema::ClaimsBatchView;
pub use source::{BatchSource, InMemoryBatches};
pub use table::ArrowClaimsProvider;

/// Grouping of fact rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupBy {
    /// One row per billing identity
    Billing,
    /// One row per (billing identity, procedure code)
    BillingCode,
    /// One row per (billing identity, calendar year)
    BillingYear,
    /// One row per (billing identity, month)
    BillingMonth,
}

/// Which identity column of the fact table to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityRole {
    Billing,
    Servicing,
}

/// Row-level predicate applied before grouping
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    /// Inclusive lower month bound
    pub from_month: Option<NaiveDate>,
    /// Exclusive upper month bound
    pub until_month: Option<NaiveDate>,
    /// Keep only rows serviced by an identity other than the billing one
    pub exclude_self_billed: bool,
    /// Keep only these billing identities
    pub billing_in: Option<Arc<FxHashSet<String>>>,
}

impl RowFilter {
    /// Rows in `[from, until)`
    #[must_use]
    pub const fn months(from: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self {
            from_month: from,
            until_month: until,
            exclude_self_billed: false,
            billing_in: None,
        }
    }

    /// Whether the filter restricts months at all
    #[must_use]
    pub const fn has_month_bounds(&self) -> bool {
        self.from_month.is_some() || self.until_month.is_some()
    }
}

/// Count-distinct columns tracked per group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistinctColumns {
    pub codes: bool,
    pub months: bool,
    pub servicing: bool,
}

impl DistinctColumns {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            codes: true,
            months: true,
            servicing: true,
        }
    }
}

/// A grouped aggregate query
#[derive(Debug, Clone)]
pub struct AggregateQuery {
    pub group_by: GroupBy,
    pub filter: RowFilter,
    pub distinct: DistinctColumns,
}

impl AggregateQuery {
    #[must_use]
    pub fn new(group_by: GroupBy) -> Self {
        Self {
            group_by,
            filter: RowFilter::default(),
            distinct: DistinctColumns::default(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub const fn with_distinct(mut self, distinct: DistinctColumns) -> Self {
        self.distinct = distinct;
        self
    }
}

/// Group key of an aggregate row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Billing(String),
    BillingCode(String, String),
    BillingYear(String, i32),
    BillingMonth(String, NaiveDate),
}

impl GroupKey {
    /// Billing identity of the group
    #[must_use]
    pub fn billing(&self) -> &str {
        match self {
            Self::Billing(b)
            | Self::BillingCode(b, _)
            | Self::BillingYear(b, _)
            | Self::BillingMonth(b, _) => b,
        }
    }
}

/// One result row of a grouped query
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub paid: f64,
    pub claims: f64,
    pub beneficiaries: f64,
    /// Fact rows in the group
    pub rows: u64,
    /// Rows whose servicing identity equals the billing identity
    pub self_billed_rows: u64,
    /// Zero unless requested through `DistinctColumns`
    pub distinct_codes: u64,
    pub distinct_months: u64,
    pub distinct_servicing: u64,
    pub min_month: Option<NaiveDate>,
    pub max_month: Option<NaiveDate>,
}

/// Read-only grouped-query capability over a claims fact table
pub trait AggregationProvider: Send + Sync {
    /// Run a grouped query; rows come back sorted by key
    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>>;

    /// Sorted distinct identities appearing in the given role
    fn distinct_identities(&self, role: IdentityRole) -> Result<Vec<String>>;
}
