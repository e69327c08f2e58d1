//! Immutable per-run snapshot of every aggregate the engine reads
//!
//! The snapshot is built once from an [`AggregationProvider`] by issuing all
//! grouped queries in parallel. Benchmarks, detectors and the feature
//! extractor only ever borrow it.

use std::ops::Range;
use std::time::Instant;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::aggregation::{
    AggregateQuery, AggregateRow, AggregationProvider, DistinctColumns, GroupBy, GroupKey,
    IdentityRole, RowFilter,
};
use crate::config::EngineConfig;
use crate::error::{Result, RiskEngineError};
use crate::models::{
    NetworkAggregate, ProviderAggregate, ProviderCodeAggregate, ProviderMonthAggregate,
    ProviderYearAggregate,
};
use crate::utils::{log_operation_complete, log_operation_start};

/// Rows sorted by provider with constant-time access to each provider's slice
#[derive(Debug, Clone)]
pub struct GroupedRows<T> {
    rows: Vec<T>,
    ranges: FxHashMap<String, Range<usize>>,
    order: Vec<String>,
}

impl<T> Default for GroupedRows<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            ranges: FxHashMap::default(),
            order: Vec::new(),
        }
    }
}

impl<T> GroupedRows<T> {
    /// Index rows that are already sorted by provider
    pub fn from_sorted(rows: Vec<T>, provider_of: impl Fn(&T) -> &str) -> Self {
        let mut ranges = FxHashMap::default();
        let mut order = Vec::new();
        let mut start = 0;
        for i in 1..=rows.len() {
            let boundary = i == rows.len() || provider_of(&rows[i]) != provider_of(&rows[start]);
            if boundary {
                let provider = provider_of(&rows[start]).to_string();
                ranges.insert(provider.clone(), start..i);
                order.push(provider);
                start = i;
            }
        }
        Self { rows, ranges, order }
    }

    /// Rows of one provider; empty if it has none
    #[must_use]
    pub fn get(&self, provider: &str) -> &[T] {
        self.ranges
            .get(provider)
            .map(|range| &self.rows[range.clone()])
            .unwrap_or(&[])
    }

    /// Providers and their rows in provider order
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.order
            .iter()
            .map(|p| (p.as_str(), self.get(p)))
    }

    #[must_use]
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.order.len()
    }
}

/// Every aggregate of one run
#[derive(Debug, Clone, Default)]
pub struct ClaimsSnapshot {
    providers: Vec<ProviderAggregate>,
    provider_index: FxHashMap<String, usize>,
    pub codes: GroupedRows<ProviderCodeAggregate>,
    pub years: GroupedRows<ProviderYearAggregate>,
    pub months: GroupedRows<ProviderMonthAggregate>,
    /// Provider x code totals before the early window ends
    pub early_codes: GroupedRows<ProviderCodeAggregate>,
    /// Provider x code totals from the late window on
    pub late_codes: GroupedRows<ProviderCodeAggregate>,
    /// Totals over rows serviced by another identity
    pub networks: Vec<NetworkAggregate>,
    /// Sorted distinct billing identities
    pub billers: Vec<String>,
    /// Sorted distinct servicing identities
    pub servicers: Vec<String>,
}

fn key_mismatch(expected: &str, key: &GroupKey) -> RiskEngineError {
    RiskEngineError::unavailable(
        "aggregation provider",
        format!("Expected {expected} rows, got key {key:?}"),
    )
}

fn provider_rows(rows: Vec<AggregateRow>) -> Result<Vec<ProviderAggregate>> {
    rows.into_iter()
        .map(|row| match row.key {
            GroupKey::Billing(provider) => Ok(ProviderAggregate {
                provider,
                total_paid: row.paid,
                total_claims: row.claims,
                total_beneficiaries: row.beneficiaries,
                code_count: row.distinct_codes,
                active_months: row.distinct_months,
                first_month: row.min_month,
                last_month: row.max_month,
                rows: row.rows,
                self_billed_rows: row.self_billed_rows,
            }),
            other => Err(key_mismatch("provider", &other)),
        })
        .collect()
}

fn code_rows(rows: Vec<AggregateRow>) -> Result<GroupedRows<ProviderCodeAggregate>> {
    let rows = rows
        .into_iter()
        .map(|row| match row.key {
            GroupKey::BillingCode(provider, code) => Ok(ProviderCodeAggregate {
                provider,
                code,
                paid: row.paid,
                claims: row.claims,
                beneficiaries: row.beneficiaries,
            }),
            other => Err(key_mismatch("provider x code", &other)),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(GroupedRows::from_sorted(rows, |r| r.provider.as_str()))
}

fn year_rows(rows: Vec<AggregateRow>) -> Result<GroupedRows<ProviderYearAggregate>> {
    let rows = rows
        .into_iter()
        .map(|row| match row.key {
            GroupKey::BillingYear(provider, year) => Ok(ProviderYearAggregate {
                provider,
                year,
                paid: row.paid,
                claims: row.claims,
            }),
            other => Err(key_mismatch("provider x year", &other)),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(GroupedRows::from_sorted(rows, |r| r.provider.as_str()))
}

fn month_rows(rows: Vec<AggregateRow>) -> Result<GroupedRows<ProviderMonthAggregate>> {
    let rows = rows
        .into_iter()
        .map(|row| match row.key {
            GroupKey::BillingMonth(provider, month) => Ok(ProviderMonthAggregate {
                provider,
                month,
                paid: row.paid,
                claims: row.claims,
            }),
            other => Err(key_mismatch("provider x month", &other)),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(GroupedRows::from_sorted(rows, |r| r.provider.as_str()))
}

fn network_rows(rows: Vec<AggregateRow>) -> Result<Vec<NetworkAggregate>> {
    rows.into_iter()
        .map(|row| match row.key {
            GroupKey::Billing(provider) => Ok(NetworkAggregate {
                provider,
                servicing_count: row.distinct_servicing,
                paid: row.paid,
                claims: row.claims,
            }),
            other => Err(key_mismatch("network", &other)),
        })
        .collect()
}

impl ClaimsSnapshot {
    /// Issue every grouped query in parallel and assemble the snapshot
    pub fn build(source: &dyn AggregationProvider, config: &EngineConfig) -> Result<Self> {
        let start = Instant::now();
        log_operation_start("Building claims snapshot from", "aggregation provider");

        let migration = &config.detectors.code_migration;
        let early_end: Option<NaiveDate> = Some(migration.early_window_end);
        let late_start: Option<NaiveDate> = Some(migration.late_window_start);

        let totals_q = AggregateQuery::new(GroupBy::Billing).with_distinct(DistinctColumns::all());
        let codes_q = AggregateQuery::new(GroupBy::BillingCode);
        let years_q = AggregateQuery::new(GroupBy::BillingYear);
        let months_q = AggregateQuery::new(GroupBy::BillingMonth);
        let early_q = AggregateQuery::new(GroupBy::BillingCode).with_filter(RowFilter::months(None, early_end));
        let late_q = AggregateQuery::new(GroupBy::BillingCode).with_filter(RowFilter::months(late_start, None));
        let network_q = AggregateQuery::new(GroupBy::Billing)
            .with_filter(RowFilter {
                exclude_self_billed: true,
                ..RowFilter::default()
            })
            .with_distinct(DistinctColumns {
                servicing: true,
                ..DistinctColumns::default()
            });

        let (((totals, codes), (years, months)), ((early, late), (networks, (billers, servicers)))) =
            rayon::join(
                || {
                    rayon::join(
                        || rayon::join(|| source.aggregate(&totals_q), || source.aggregate(&codes_q)),
                        || rayon::join(|| source.aggregate(&years_q), || source.aggregate(&months_q)),
                    )
                },
                || {
                    rayon::join(
                        || rayon::join(|| source.aggregate(&early_q), || source.aggregate(&late_q)),
                        || {
                            rayon::join(
                                || source.aggregate(&network_q),
                                || {
                                    rayon::join(
                                        || source.distinct_identities(IdentityRole::Billing),
                                        || source.distinct_identities(IdentityRole::Servicing),
                                    )
                                },
                            )
                        },
                    )
                },
            );

        let providers = provider_rows(totals?)?;
        let provider_index = providers
            .iter()
            .enumerate()
            .map(|(i, p)| (p.provider.clone(), i))
            .collect();

        let snapshot = Self {
            providers,
            provider_index,
            codes: code_rows(codes?)?,
            years: year_rows(years?)?,
            months: month_rows(months?)?,
            early_codes: code_rows(early?)?,
            late_codes: code_rows(late?)?,
            networks: network_rows(networks?)?,
            billers: billers?,
            servicers: servicers?,
        };

        log_operation_complete(
            "aggregated",
            "claims snapshot providers",
            snapshot.providers.len(),
            Some(start.elapsed()),
        );
        Ok(snapshot)
    }

    /// Providers sorted by identity
    #[must_use]
    pub fn providers(&self) -> &[ProviderAggregate] {
        &self.providers
    }

    #[must_use]
    pub fn provider(&self, id: &str) -> Option<&ProviderAggregate> {
        self.provider_index.get(id).map(|&i| &self.providers[i])
    }

    /// Lifetime paid of a provider, 0 if unknown
    #[must_use]
    pub fn total_paid(&self, id: &str) -> f64 {
        self.provider(id).map_or(0.0, |p| p.total_paid)
    }
}
