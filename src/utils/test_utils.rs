//! Fixtures for unit tests: claim rows, Arrow batches and snapshots

use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::aggregation::{ArrowClaimsProvider, InMemoryBatches};
use crate::algorithm::benchmark::BenchmarkTable;
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::{ClaimsColumns, EngineConfig};

/// One fact-table row
#[derive(Debug, Clone)]
pub struct ClaimRow {
    pub billing: String,
    pub servicing: Option<String>,
    pub code: String,
    /// `YYYY-MM`
    pub month: String,
    pub beneficiaries: i64,
    pub claims: i64,
    pub paid: f64,
}

impl ClaimRow {
    /// Self-billed row with one beneficiary per ten claims
    pub fn new(billing: &str, code: &str, month: &str, claims: i64, paid: f64) -> Self {
        Self {
            billing: billing.to_string(),
            servicing: Some(billing.to_string()),
            code: code.to_string(),
            month: month.to_string(),
            beneficiaries: (claims / 10).max(1),
            claims,
            paid,
        }
    }

    pub fn servicing(mut self, servicing: Option<&str>) -> Self {
        self.servicing = servicing.map(str::to_string);
        self
    }

    pub fn beneficiaries(mut self, beneficiaries: i64) -> Self {
        self.beneficiaries = beneficiaries;
        self
    }
}

/// `count` consecutive monthly rows starting at `year`-`month`
pub fn monthly(billing: &str, code: &str, year: i32, month: u32, count: u32, paid: impl Fn(u32) -> f64) -> Vec<ClaimRow> {
    (0..count)
        .map(|i| {
            let index = year * 12 + (month as i32 - 1) + i as i32;
            let label = format!("{}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1);
            ClaimRow::new(billing, code, &label, 100, paid(i))
        })
        .collect()
}

/// Arrow batch with the default column names
pub fn claims_batch(rows: &[ClaimRow]) -> RecordBatch {
    let c = ClaimsColumns::default();
    let schema = Schema::new(vec![
        Field::new(&c.billing, DataType::Utf8, false),
        Field::new(&c.servicing, DataType::Utf8, true),
        Field::new(&c.code, DataType::Utf8, false),
        Field::new(&c.month, DataType::Utf8, false),
        Field::new(&c.beneficiaries, DataType::Int64, false),
        Field::new(&c.claims, DataType::Int64, false),
        Field::new(&c.paid, DataType::Float64, false),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.billing.as_str()))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.servicing.as_deref()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.code.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.month.as_str()))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.beneficiaries))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.claims))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.paid))),
        ],
    )
    .expect("fixture batch")
}

/// Provider over two partitions so merging is always exercised
pub fn provider_of(rows: &[ClaimRow]) -> ArrowClaimsProvider<InMemoryBatches> {
    let (first, second) = rows.split_at(rows.len() / 2);
    ArrowClaimsProvider::new(
        InMemoryBatches::new(vec![claims_batch(first), claims_batch(second)]),
        ClaimsColumns::default(),
    )
}

pub fn snapshot_of(rows: &[ClaimRow]) -> ClaimsSnapshot {
    ClaimsSnapshot::build(&provider_of(rows), &EngineConfig::default()).expect("fixture snapshot")
}

pub fn benchmarks_of(snapshot: &ClaimsSnapshot) -> BenchmarkTable {
    BenchmarkTable::build(snapshot.codes.rows(), &EngineConfig::default().benchmark)
}
