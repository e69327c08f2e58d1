use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use provider_risk::aggregation::{
    AggregateQuery, AggregationProvider, DistinctColumns, GroupBy, GroupKey, IdentityRole,
    ParquetDirectorySource,
};
use provider_risk::config::ClaimsColumns;
use provider_risk::{ArrowClaimsProvider, RiskEngineError};

use crate::utils::{ClaimRow, ScratchDir, claims_batch, scratch_dir, write_parquet};

fn write_claims(name: &str) -> ScratchDir {
    let dir = scratch_dir(name);
    write_parquet(
        &dir.join("part-000.parquet"),
        &[claims_batch(&[
            ClaimRow::new("A", "X", 2021, 1, 10, 100.0),
            ClaimRow::new("A", "Y", 2021, 2, 5, 50.0).servicing("S1"),
        ])],
    );
    write_parquet(
        &dir.join("part-001.parquet"),
        &[claims_batch(&[
            ClaimRow::new("A", "X", 2022, 1, 1, 10.0).servicing("S2"),
            ClaimRow::new("B", "X", 2022, 3, 2, 20.0),
        ])],
    );
    // ignored
    std::fs::write(dir.join("README.txt"), "not parquet").unwrap();
    dir
}

#[test]
fn test_directory_source_aggregates_across_files() -> anyhow::Result<()> {
    let dir = write_claims("directory-source");
    let source = ParquetDirectorySource::new(&dir, &ClaimsColumns::default())?.with_batch_size(1);
    assert_eq!(source.files().len(), 2);

    let provider = ArrowClaimsProvider::new(source, ClaimsColumns::default());
    let rows = provider.aggregate(&AggregateQuery::new(GroupBy::Billing).with_distinct(DistinctColumns::all()))?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key, GroupKey::Billing("A".into()));
    assert_eq!(rows[0].paid, 160.0);
    assert_eq!(rows[0].rows, 3);
    assert_eq!(rows[0].self_billed_rows, 1);
    assert_eq!(rows[0].distinct_codes, 2);
    assert_eq!(rows[0].distinct_servicing, 2);

    let servicers = provider.distinct_identities(IdentityRole::Servicing)?;
    assert_eq!(servicers, ["A", "B", "S1", "S2"]);
    Ok(())
}

#[test]
fn test_missing_directory_is_unavailable() {
    let err = ParquetDirectorySource::new(
        std::path::Path::new("/nonexistent/claims"),
        &ClaimsColumns::default(),
    )
    .unwrap_err();
    assert!(err.is_source_unavailable());
}

#[test]
fn test_directory_without_parquet_files_is_unavailable() {
    let dir = scratch_dir("empty-source");
    std::fs::write(dir.join("notes.csv"), "a,b").unwrap();

    let err = ParquetDirectorySource::new(&dir, &ClaimsColumns::default()).unwrap_err();
    assert!(err.is_source_unavailable());
    assert!(err.to_string().contains("No Parquet files"));
}

#[test]
fn test_missing_column_is_schema_error() {
    let dir = scratch_dir("missing-column");
    let c = ClaimsColumns::default();
    let schema = Schema::new(vec![
        Field::new(&c.billing, DataType::Utf8, false),
        Field::new(&c.paid, DataType::Float64, false),
    ]);
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(vec!["A"])),
            Arc::new(Float64Array::from(vec![1.0])),
        ],
    )
    .unwrap();
    write_parquet(&dir.join("broken.parquet"), &[batch]);

    let source = ParquetDirectorySource::new(&dir, &c).unwrap();
    let provider = ArrowClaimsProvider::new(source, c);
    let err = provider
        .aggregate(&AggregateQuery::new(GroupBy::Billing))
        .unwrap_err();
    assert!(matches!(err, RiskEngineError::Schema(_)));
}
