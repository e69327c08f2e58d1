//! Shared fixtures: claims batches, Parquet files and registry snapshots

use std::fs::{self, File};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use serde::Serialize;
use serde_arrow::schema::{SchemaLike, TracingOptions};

use provider_risk::config::ClaimsColumns;

/// One fact-table row
#[derive(Debug, Clone)]
pub struct ClaimRow {
    pub billing: String,
    pub servicing: Option<String>,
    pub code: String,
    pub month: NaiveDate,
    pub beneficiaries: i64,
    pub claims: i64,
    pub paid: f64,
}

impl ClaimRow {
    /// Self-billed row with one beneficiary per ten claims
    pub fn new(billing: &str, code: &str, year: i32, month: u32, claims: i64, paid: f64) -> Self {
        Self {
            billing: billing.to_string(),
            servicing: Some(billing.to_string()),
            code: code.to_string(),
            month: NaiveDate::from_ymd_opt(year, month, 1).expect("valid month"),
            beneficiaries: (claims / 10).max(1),
            claims,
            paid,
        }
    }

    pub fn servicing(mut self, servicing: &str) -> Self {
        self.servicing = Some(servicing.to_string());
        self
    }

    pub fn beneficiaries(mut self, beneficiaries: i64) -> Self {
        self.beneficiaries = beneficiaries;
        self
    }
}

/// `count` consecutive monthly rows
pub fn monthly(billing: &str, code: &str, year: i32, count: u32, paid: impl Fn(u32) -> f64) -> Vec<ClaimRow> {
    (0..count)
        .map(|i| {
            let y = year + (i / 12) as i32;
            ClaimRow::new(billing, code, y, i % 12 + 1, 100, paid(i))
        })
        .collect()
}

/// Batch with the default column names; months stored as `Date32`
pub fn claims_batch(rows: &[ClaimRow]) -> RecordBatch {
    let c = ClaimsColumns::default();
    let schema = Schema::new(vec![
        Field::new(&c.billing, DataType::Utf8, false),
        Field::new(&c.servicing, DataType::Utf8, true),
        Field::new(&c.code, DataType::Utf8, false),
        Field::new(&c.month, DataType::Date32, false),
        Field::new(&c.beneficiaries, DataType::Int64, false),
        Field::new(&c.claims, DataType::Int64, false),
        Field::new(&c.paid, DataType::Float64, false),
    ]);
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch");
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.billing.as_str()))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.servicing.as_deref()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.code.as_str()))),
            Arc::new(Date32Array::from_iter_values(
                rows.iter().map(|r| (r.month - epoch).num_days() as i32),
            )),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.beneficiaries))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.claims))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.paid))),
        ],
    )
    .expect("claims batch")
}

/// Route engine logs to the test harness; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

/// Temporary directory removed when dropped
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl Deref for ScratchDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Fresh scratch directory under the system temp dir
pub fn scratch_dir(name: &str) -> ScratchDir {
    init_logging();
    let path = std::env::temp_dir().join(format!("provider-risk-{name}-{}", std::process::id()));
    if path.exists() {
        fs::remove_dir_all(&path).expect("clear scratch dir");
    }
    fs::create_dir_all(&path).expect("create scratch dir");
    ScratchDir { path }
}

/// Write batches to one Parquet file
pub fn write_parquet(path: &Path, batches: &[RecordBatch]) {
    let file = File::create(path).expect("create parquet file");
    let schema = batches.first().expect("at least one batch").schema();
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("parquet writer");
    for batch in batches {
        writer.write(batch).expect("write batch");
    }
    writer.close().expect("close parquet writer");
}

/// Serialize rows with serde_arrow and write them to a Parquet file
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) {
    let fields = Vec::<FieldRef>::from_samples(rows, TracingOptions::default().allow_null_fields(true))
        .expect("trace schema");
    let batch = serde_arrow::to_record_batch(&fields, &rows).expect("serialize rows");
    write_parquet(path, &[batch]);
}

/// Registry row in the published exclusion-list column layout
#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
pub struct PublishedRegistryRow {
    pub NPI: Option<String>,
    pub BUSNAME: Option<String>,
    pub LASTNAME: Option<String>,
    pub FIRSTNAME: Option<String>,
    pub STATE: Option<String>,
    pub EXCLTYPE: Option<String>,
}

impl PublishedRegistryRow {
    pub fn organization(name: &str, state: &str, reason: &str) -> Self {
        Self {
            NPI: Some("0000000000".into()),
            BUSNAME: Some(name.into()),
            LASTNAME: Some(String::new()),
            FIRSTNAME: Some(String::new()),
            STATE: Some(state.into()),
            EXCLTYPE: Some(reason.into()),
        }
    }

    pub fn person(last: &str, first: &str, state: &str, reason: &str) -> Self {
        Self {
            NPI: Some(String::new()),
            BUSNAME: Some(String::new()),
            LASTNAME: Some(last.into()),
            FIRSTNAME: Some(first.into()),
            STATE: Some(state.into()),
            EXCLTYPE: Some(reason.into()),
        }
    }

    pub fn identifier(npi: &str, reason: &str) -> Self {
        Self {
            NPI: Some(npi.into()),
            BUSNAME: Some(String::new()),
            LASTNAME: Some(String::new()),
            FIRSTNAME: Some(String::new()),
            STATE: Some(String::new()),
            EXCLTYPE: Some(reason.into()),
        }
    }
}

/// Directory row as published by the identity lookup service
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryRow {
    pub npi: String,
    pub provider_name: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub state: Option<String>,
}

impl DirectoryRow {
    pub fn organization(npi: &str, name: &str, state: &str) -> Self {
        Self {
            npi: npi.into(),
            provider_name: Some(name.into()),
            last_name: Some(String::new()),
            first_name: Some(String::new()),
            state: Some(state.into()),
        }
    }

    pub fn person(npi: &str, last: &str, first: &str, state: &str) -> Self {
        Self {
            npi: npi.into(),
            provider_name: Some(format!("{first} {last}")),
            last_name: Some(last.into()),
            first_name: Some(first.into()),
            state: Some(state.into()),
        }
    }
}

pub fn ten_digit(i: usize) -> String {
    format!("{:010}", 1_000_000_000 + i)
}

#[test]
fn test_scratch_dir_is_removed_on_drop() {
    let dir = scratch_dir("fixture-cleanup");
    let kept = dir.to_path_buf();
    write_parquet(&dir.join("part.parquet"), &[claims_batch(&[ClaimRow::new("A", "X", 2022, 1, 1, 1.0)])]);
    assert!(kept.join("part.parquet").is_file());
    drop(dir);
    assert!(!kept.exists());
}
