//! Parquet-backed claims sources
//!
//! `ParquetDirectorySource` streams one file per partition and drops every
//! batch after it has been folded, so grouped queries run in bounded memory.
//! `load_claims_async` bulk-loads a directory for callers that prefer to keep
//! the table resident.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use futures::stream::{self, StreamExt};
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::async_reader::ParquetRecordBatchStreamBuilder;

use super::schema::required_columns;
use super::source::BatchSource;
use crate::config::ClaimsColumns;
use crate::error::{Result, RiskEngineError};
use crate::utils::{log_operation_complete, log_operation_start};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

const SOURCE_NAME: &str = "claims fact table";

fn is_parquet(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "parquet")
}

/// Sorted Parquet files in a directory
///
/// # Errors
/// Returns `ExternalSourceUnavailable` if the directory cannot be read or
/// holds no Parquet files
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RiskEngineError::unavailable(
            SOURCE_NAME,
            format!("Directory does not exist: {}", dir.display()),
        ));
    }
    let entries = std::fs::read_dir(dir).map_err(|e| {
        RiskEngineError::unavailable(SOURCE_NAME, format!("Failed to read {}: {e}", dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_parquet(&path) {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(RiskEngineError::unavailable(
            SOURCE_NAME,
            format!("No Parquet files in {}", dir.display()),
        ));
    }
    Ok(files)
}

/// Streams a directory of Parquet files, one partition per file
#[derive(Debug, Clone)]
pub struct ParquetDirectorySource {
    files: Vec<PathBuf>,
    projection: Vec<String>,
    batch_size: usize,
}

impl ParquetDirectorySource {
    /// Open a directory, projecting only the claims columns
    pub fn new(dir: &Path, columns: &ClaimsColumns) -> Result<Self> {
        let files = find_parquet_files(dir)?;
        log::info!("Claims source {} has {} Parquet files", dir.display(), files.len());
        Ok(Self {
            files,
            projection: required_columns(columns).iter().map(ToString::to_string).collect(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl BatchSource for ParquetDirectorySource {
    fn partition_count(&self) -> usize {
        self.files.len()
    }

    fn for_each_batch(
        &self,
        partition: usize,
        visit: &mut dyn FnMut(&RecordBatch) -> Result<()>,
    ) -> Result<()> {
        let Some(path) = self.files.get(partition) else {
            return Ok(());
        };
        let file = File::open(path).map_err(|e| {
            RiskEngineError::unavailable(SOURCE_NAME, format!("Failed to open {}: {e}", path.display()))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let mask = ProjectionMask::columns(
            builder.parquet_schema(),
            self.projection.iter().map(String::as_str),
        );
        let reader = builder
            .with_projection(mask)
            .with_batch_size(self.batch_size)
            .build()?;

        for batch in reader {
            visit(&batch?)?;
        }
        Ok(())
    }
}

async fn read_parquet_async(path: PathBuf, batch_size: usize) -> Result<Vec<RecordBatch>> {
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        RiskEngineError::unavailable(SOURCE_NAME, format!("Failed to open {}: {e}", path.display()))
    })?;

    let stream = ParquetRecordBatchStreamBuilder::new(file)
        .await?
        .with_batch_size(batch_size)
        .build()?;

    let batches = stream.try_collect::<Vec<_>>().await?;
    Ok(batches)
}

/// Load every Parquet file of a directory into memory
///
/// Files are read concurrently but the returned batches keep file order, so
/// aggregation over the result is deterministic.
///
/// # Arguments
/// * `dir` - Directory containing Parquet files
/// * `batch_size` - Optional batch size (defaults to `DEFAULT_BATCH_SIZE`)
///
/// # Errors
/// Returns `ExternalSourceUnavailable` for a missing or empty directory and
/// `Parquet` for unreadable files
pub async fn load_claims_async(dir: &Path, batch_size: Option<usize>) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();
    let subject = dir.display().to_string();
    log_operation_start("Loading claims asynchronously from", &subject);

    let files = find_parquet_files(dir)?;
    let batch_size = batch_size.unwrap_or(DEFAULT_BATCH_SIZE);

    let per_file: Vec<Vec<RecordBatch>> = stream::iter(files)
        .map(|path| read_parquet_async(path, batch_size))
        .buffered(num_cpus::get())
        .try_collect()
        .await?;

    let batches: Vec<RecordBatch> = per_file.into_iter().flatten().collect();
    log_operation_complete("loaded", &subject, batches.len(), Some(start.elapsed()));
    Ok(batches)
}
