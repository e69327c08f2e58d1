//! `AggregationProvider` over Arrow record batches
//!
//! Each partition is folded into its own hash map of accumulators on a rayon
//! worker. Partition maps are then merged sequentially in partition order and
//! the rows are sorted by key, which keeps floating-point sums and output
//! order identical from run to run.

use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use super::schema::ClaimsBatchView;
use super::source::BatchSource;
use super::{
    AggregateQuery, AggregateRow, AggregationProvider, GroupBy, GroupKey, IdentityRole, RowFilter,
};
use crate::config::ClaimsColumns;
use crate::error::Result;
use crate::utils::arrow::{month_from_index, month_index, year_of_index};

#[derive(Debug, Default)]
struct Accumulator {
    paid: f64,
    claims: f64,
    beneficiaries: f64,
    rows: u64,
    self_billed_rows: u64,
    codes: FxHashSet<String>,
    months: FxHashSet<i32>,
    servicing: FxHashSet<String>,
    min_month: Option<i32>,
    max_month: Option<i32>,
}

impl Accumulator {
    fn merge(&mut self, other: Self) {
        self.paid += other.paid;
        self.claims += other.claims;
        self.beneficiaries += other.beneficiaries;
        self.rows += other.rows;
        self.self_billed_rows += other.self_billed_rows;
        self.codes.extend(other.codes);
        self.months.extend(other.months);
        self.servicing.extend(other.servicing);
        self.min_month = min_opt(self.min_month, other.min_month);
        self.max_month = max_opt(self.max_month, other.max_month);
    }

    fn into_row(self, key: GroupKey) -> AggregateRow {
        AggregateRow {
            key,
            paid: self.paid,
            claims: self.claims,
            beneficiaries: self.beneficiaries,
            rows: self.rows,
            self_billed_rows: self.self_billed_rows,
            distinct_codes: self.codes.len() as u64,
            distinct_months: self.months.len() as u64,
            distinct_servicing: self.servicing.len() as u64,
            min_month: self.min_month.and_then(month_from_index),
            max_month: self.max_month.and_then(month_from_index),
        }
    }
}

fn min_opt(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

fn max_opt(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

/// Month bounds of a filter as month indices
#[derive(Debug, Clone, Copy)]
struct MonthWindow {
    from: Option<i32>,
    until: Option<i32>,
}

impl MonthWindow {
    fn from_filter(filter: &RowFilter) -> Self {
        Self {
            from: filter.from_month.map(month_index),
            until: filter.until_month.map(month_index),
        }
    }

    fn contains(self, month: Option<i32>) -> bool {
        match month {
            Some(m) => self.from.is_none_or(|f| m >= f) && self.until.is_none_or(|u| m < u),
            None => self.from.is_none() && self.until.is_none(),
        }
    }
}

type PartitionMap = FxHashMap<GroupKey, Accumulator>;

/// Grouped queries over a [`BatchSource`] of claims batches
#[derive(Debug)]
pub struct ArrowClaimsProvider<S: BatchSource> {
    source: S,
    columns: ClaimsColumns,
}

impl<S: BatchSource> ArrowClaimsProvider<S> {
    #[must_use]
    pub const fn new(source: S, columns: ClaimsColumns) -> Self {
        Self { source, columns }
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    fn fold_partition(&self, partition: usize, query: &AggregateQuery) -> Result<PartitionMap> {
        let mut groups = PartitionMap::default();
        let window = MonthWindow::from_filter(&query.filter);
        let columns = &self.columns;

        self.source.for_each_batch(partition, &mut |batch| {
            let view = ClaimsBatchView::try_new(batch, columns)?;
            for row in 0..view.len() {
                fold_row(&view, row, query, window, &mut groups);
            }
            Ok(())
        })?;

        Ok(groups)
    }
}

fn fold_row(
    view: &ClaimsBatchView,
    row: usize,
    query: &AggregateQuery,
    window: MonthWindow,
    groups: &mut PartitionMap,
) {
    let Some(billing) = view.billing(row) else {
        return;
    };
    let month = view.month(row);
    if !window.contains(month) {
        return;
    }
    let servicing = view.servicing(row);
    let self_billed = servicing == Some(billing);
    if query.filter.exclude_self_billed && (self_billed || servicing.is_none()) {
        return;
    }
    if let Some(allowed) = &query.filter.billing_in {
        if !allowed.contains(billing) {
            return;
        }
    }

    let code = view.code(row);
    let key = match query.group_by {
        GroupBy::Billing => GroupKey::Billing(billing.to_string()),
        GroupBy::BillingCode => {
            let Some(code) = code else { return };
            GroupKey::BillingCode(billing.to_string(), code.to_string())
        }
        GroupBy::BillingYear => {
            let Some(m) = month else { return };
            GroupKey::BillingYear(billing.to_string(), year_of_index(m))
        }
        GroupBy::BillingMonth => {
            let Some(date) = month.and_then(month_from_index) else {
                return;
            };
            GroupKey::BillingMonth(billing.to_string(), date)
        }
    };

    let acc = groups.entry(key).or_default();
    acc.paid += view.paid(row);
    acc.claims += view.claims(row);
    acc.beneficiaries += view.beneficiaries(row);
    acc.rows += 1;
    if self_billed {
        acc.self_billed_rows += 1;
    }
    acc.min_month = min_opt(acc.min_month, month);
    acc.max_month = max_opt(acc.max_month, month);

    let distinct = query.distinct;
    if distinct.codes {
        if let Some(code) = code {
            if !acc.codes.contains(code) {
                acc.codes.insert(code.to_string());
            }
        }
    }
    if distinct.months {
        if let Some(m) = month {
            acc.months.insert(m);
        }
    }
    if distinct.servicing {
        if let Some(s) = servicing.filter(|s| *s != billing) {
            if !acc.servicing.contains(s) {
                acc.servicing.insert(s.to_string());
            }
        }
    }
}

impl<S: BatchSource> AggregationProvider for ArrowClaimsProvider<S> {
    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
        let start = Instant::now();
        let partitions: Vec<PartitionMap> = (0..self.source.partition_count())
            .into_par_iter()
            .map(|partition| self.fold_partition(partition, query))
            .collect::<Result<_>>()?;

        let mut merged = PartitionMap::default();
        for partition in partitions {
            for (key, acc) in partition {
                match merged.get_mut(&key) {
                    Some(existing) => existing.merge(acc),
                    None => {
                        merged.insert(key, acc);
                    }
                }
            }
        }

        let mut rows: Vec<AggregateRow> = merged
            .into_iter()
            .map(|(key, acc)| acc.into_row(key))
            .collect();
        rows.par_sort_unstable_by(|a, b| a.key.cmp(&b.key));

        log::debug!(
            "Aggregated {:?} into {} groups in {:?}",
            query.group_by,
            rows.len(),
            start.elapsed()
        );
        Ok(rows)
    }

    fn distinct_identities(&self, role: IdentityRole) -> Result<Vec<String>> {
        let partitions: Vec<FxHashSet<String>> = (0..self.source.partition_count())
            .into_par_iter()
            .map(|partition| {
                let mut seen = FxHashSet::default();
                self.source.for_each_batch(partition, &mut |batch| {
                    let view = ClaimsBatchView::try_new(batch, &self.columns)?;
                    for row in 0..view.len() {
                        let identity = match role {
                            IdentityRole::Billing => view.billing(row),
                            IdentityRole::Servicing => view.servicing(row),
                        };
                        if let Some(id) = identity {
                            if !seen.contains(id) {
                                seen.insert(id.to_string());
                            }
                        }
                    }
                    Ok(())
                })?;
                Ok(seen)
            })
            .collect::<Result<_>>()?;

        let mut identities: Vec<String> = partitions
            .into_iter()
            .flatten()
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        identities.sort_unstable();
        Ok(identities)
    }
}
