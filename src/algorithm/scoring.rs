//! Chunked batch scoring of the whole provider population

use std::time::Instant;

use rayon::prelude::*;

use super::features::FeatureSource;
use super::model::TrainedModel;
use super::stats::percentiles_of;
use crate::models::{ScorePercentiles, ScoredProvider};
use crate::utils::{
    create_main_progress_bar, finish_progress_bar, log_operation_complete, log_operation_start,
};

/// Applies a fitted model to a feature source in fixed-size chunks
///
/// Only one chunk of features is alive at a time; each is dropped before the
/// next is extracted. Rows inside a chunk are scored in parallel.
#[derive(Debug, Clone)]
pub struct BatchScorer {
    chunk_size: usize,
    show_progress: bool,
}

impl BatchScorer {
    #[must_use]
    pub fn new(chunk_size: usize, show_progress: bool) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            show_progress,
        }
    }

    /// Score every provider of `source`
    ///
    /// # Returns
    /// Scores ordered by descending score, then ascending provider. The result
    /// does not depend on the chunk size.
    #[must_use]
    pub fn score(&self, source: &dyn FeatureSource, model: &TrainedModel) -> Vec<ScoredProvider> {
        let start = Instant::now();
        let total = source.len();
        log_operation_start("Scoring", &format!("{total} providers"));

        let progress = create_main_progress_bar(total as u64, Some("Scoring providers"), self.show_progress);
        let mut scores = Vec::with_capacity(total);
        for offset in (0..total).step_by(self.chunk_size) {
            let chunk = source.chunk(offset..offset + self.chunk_size);
            let scored: Vec<ScoredProvider> = chunk
                .into_par_iter()
                .map(|row| ScoredProvider {
                    score: model.score(&row.features.to_array()),
                    provider: row.provider,
                })
                .collect();
            progress.inc(scored.len() as u64);
            scores.extend(scored);
        }
        finish_progress_bar(&progress, Some("Scoring complete"));

        scores.par_sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.provider.cmp(&b.provider))
        });

        log_operation_complete("Scored", "providers", scores.len(), Some(start.elapsed()));
        scores
    }
}

/// p50, p90, p95, p99 and p99.9 of the final scores
#[must_use]
pub fn score_percentiles(scores: &[ScoredProvider]) -> ScorePercentiles {
    let values: Vec<f64> = scores.iter().map(|s| s.score).collect();
    let [p50, p90, p95, p99, p999] = percentiles_of(&values, [0.5, 0.9, 0.95, 0.99, 0.999]);
    ScorePercentiles {
        p50,
        p90,
        p95,
        p99,
        p999,
    }
}
