//! Partitioned record-batch sources

use arrow::record_batch::RecordBatch;

use crate::error::Result;

/// A set of partitions, each yielding record batches in a stable order
///
/// Partitions are folded independently (and in parallel) by the aggregation
/// code, so a source must allow concurrent reads of different partitions.
pub trait BatchSource: Send + Sync {
    /// Number of independently readable partitions
    fn partition_count(&self) -> usize;

    /// Feed every batch of one partition to `visit`, in order
    ///
    /// Batches may be dropped as soon as `visit` returns.
    fn for_each_batch(
        &self,
        partition: usize,
        visit: &mut dyn FnMut(&RecordBatch) -> Result<()>,
    ) -> Result<()>;
}

/// Batches already held in memory; one partition per batch
#[derive(Debug, Clone, Default)]
pub struct InMemoryBatches {
    batches: Vec<RecordBatch>,
}

impl InMemoryBatches {
    #[must_use]
    pub const fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

impl BatchSource for InMemoryBatches {
    fn partition_count(&self) -> usize {
        self.batches.len()
    }

    fn for_each_batch(
        &self,
        partition: usize,
        visit: &mut dyn FnMut(&RecordBatch) -> Result<()>,
    ) -> Result<()> {
        match self.batches.get(partition) {
            Some(batch) => visit(batch),
            None => Ok(()),
        }
    }
}
