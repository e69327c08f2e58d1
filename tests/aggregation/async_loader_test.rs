use provider_risk::aggregation::{AggregateQuery, AggregationProvider, GroupBy};
use provider_risk::config::ClaimsColumns;
use provider_risk::{ArrowClaimsProvider, InMemoryBatches, load_claims_async};

use crate::utils::{ClaimRow, claims_batch, scratch_dir, write_parquet};

#[tokio::test]
async fn test_async_load_keeps_file_order() -> anyhow::Result<()> {
    let dir = scratch_dir("async-loader");
    for (i, provider) in ["A", "B", "C"].iter().enumerate() {
        write_parquet(
            &dir.join(format!("part-{i:03}.parquet")),
            &[claims_batch(&[
                ClaimRow::new(provider, "X", 2022, 1, 10, 100.0),
                ClaimRow::new(provider, "Y", 2022, 2, 10, 50.0),
            ])],
        );
    }

    let batches = load_claims_async(&dir, Some(1)).await?;
    assert_eq!(batches.len(), 6);
    assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 6);

    let provider = ArrowClaimsProvider::new(InMemoryBatches::new(batches), ClaimsColumns::default());
    let rows = provider.aggregate(&AggregateQuery::new(GroupBy::BillingCode))?;
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.claims == 10.0));
    Ok(())
}

#[tokio::test]
async fn test_async_load_missing_directory() {
    let err = load_claims_async(std::path::Path::new("/nonexistent/claims"), None)
        .await
        .unwrap_err();
    assert!(err.is_source_unavailable());
}

#[tokio::test]
async fn test_async_load_empty_directory() {
    let dir = scratch_dir("async-empty");
    let err = load_claims_async(&dir, None).await.unwrap_err();
    assert!(err.is_source_unavailable());
}
