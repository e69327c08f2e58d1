//! Isolation forest anomaly scoring
//!
//! Anomalies are isolated by fewer random splits than ordinary rows. The
//! anomaly score is `2^(-E[h(x)] / c(psi))` where `c` is the average path
//! length of an unsuccessful binary search tree lookup over `psi` rows.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::algorithm::stats::percentile_cont;
use crate::config::IsolationParams;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful search in a BST of `n` nodes
#[must_use]
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum IsolationNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct IsolationTree {
    nodes: Vec<IsolationNode>,
}

impl IsolationTree {
    fn fit(x: &Array2<f64>, rows: Vec<usize>, height_limit: usize, rng: &mut StdRng, splits: &mut [usize]) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, rows, 0, height_limit, rng, splits);
        tree
    }

    fn grow(
        &mut self,
        x: &Array2<f64>,
        rows: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
        splits: &mut [usize],
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(IsolationNode::Leaf { size: rows.len() });
        if depth >= height_limit || rows.len() <= 1 {
            return id;
        }

        // only features that still vary can separate these rows
        let varying: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = x[[r, feature]];
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((feature, lo, hi))
            })
            .collect();
        if varying.is_empty() {
            return id;
        }

        let (feature, lo, hi) = varying[rng.random_range(0..varying.len())];
        let threshold = rng.random_range(lo..hi);
        splits[feature] += 1;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| x[[r, feature]] < threshold);

        let left = self.grow(x, left_rows, depth + 1, height_limit, rng, splits);
        let right = self.grow(x, right_rows, depth + 1, height_limit, rng, splits);
        self.nodes[id] = IsolationNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes.get(id) {
                Some(IsolationNode::Leaf { size }) => return depth + average_path_length(*size),
                Some(IsolationNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
                None => return depth,
            }
        }
    }
}

/// Fitted isolation forest with a risk scale fitted on its training rows
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// Rows drawn per tree
    sample_size: usize,
    /// Anomaly score at the `1 - contamination` quantile of the training rows
    threshold: f64,
    /// Decision function range over the training rows
    bounds: (f64, f64),
    importances: Vec<f64>,
}

impl IsolationForest {
    /// Fit on standardized rows
    ///
    /// Each tree draws `max_samples` rows without replacement and grows to
    /// `ceil(log2(max_samples))`. Tree `i` is seeded with `seed + i`.
    #[must_use]
    pub fn fit(x: &Array2<f64>, params: &IsolationParams, seed: u64) -> Self {
        let n_rows = x.nrows();
        let n_features = x.ncols();
        let sample_size = params.max_samples.min(n_rows).max(1);
        let height_limit = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let fitted: Vec<(IsolationTree, Vec<usize>)> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let rows = if n_rows == 0 {
                    Vec::new()
                } else {
                    rand::seq::index::sample(&mut rng, n_rows, sample_size).into_vec()
                };
                let mut splits = vec![0; n_features];
                let tree = IsolationTree::fit(x, rows, height_limit, &mut rng, &mut splits);
                (tree, splits)
            })
            .collect();

        let mut split_counts = vec![0usize; n_features];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, splits) in fitted {
            for (total, count) in split_counts.iter_mut().zip(splits) {
                *total += count;
            }
            trees.push(tree);
        }
        let total_splits: usize = split_counts.iter().sum();
        let importances = split_counts
            .iter()
            .map(|&c| if total_splits > 0 { c as f64 / total_splits as f64 } else { 0.0 })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            threshold: 0.0,
            bounds: (0.0, 0.0),
            importances,
        };

        let mut training_scores: Vec<f64> = (0..n_rows)
            .into_par_iter()
            .map(|i| forest.anomaly_score(x.row(i)))
            .collect();
        training_scores.sort_unstable_by(f64::total_cmp);
        forest.threshold = percentile_cont(&training_scores, 1.0 - params.contamination);

        let low = training_scores.first().copied().unwrap_or(0.0) - forest.threshold;
        let high = training_scores.last().copied().unwrap_or(0.0) - forest.threshold;
        forest.bounds = (low, high);

        let flagged = training_scores.iter().filter(|&&s| s > forest.threshold).count();
        log::debug!(
            "Isolation forest: {} trees, {} training rows above threshold {:.4}",
            forest.trees.len(),
            flagged,
            forest.threshold
        );
        forest
    }

    /// Raw anomaly score in `(0, 1]`; higher is more isolated
    #[must_use]
    pub fn anomaly_score(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let mean_path =
            self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
        let normalizer = average_path_length(self.sample_size);
        if normalizer <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / normalizer)
    }

    /// Anomaly score relative to the contamination threshold; positive means anomalous
    #[must_use]
    pub fn decision_function(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.anomaly_score(row) - self.threshold
    }

    /// Decision function rescaled to `[0, 1]` with the training range
    #[must_use]
    pub fn risk_score(&self, row: ArrayView1<'_, f64>) -> f64 {
        let (low, high) = self.bounds;
        let span = high - low;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.decision_function(row) - low) / span).clamp(0.0, 1.0)
    }

    /// Share of all splits made on each feature
    #[must_use]
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!(c256 > 9.0 && c256 < 11.0);
    }

    #[test]
    fn test_outlier_scores_higher() {
        let mut values = Vec::new();
        for i in 0..200 {
            let jitter = f64::from(i % 10) * 0.01;
            values.extend([jitter, -jitter]);
        }
        values.extend([25.0, 25.0]);
        let x = Array2::from_shape_vec((201, 2), values).unwrap();

        let params = IsolationParams {
            n_estimators: 100,
            max_samples: 64,
            contamination: 0.01,
        };
        let forest = IsolationForest::fit(&x, &params, 42);

        let outlier = forest.risk_score(array![25.0, 25.0].view());
        let inlier = forest.risk_score(array![0.05, -0.05].view());
        assert!(outlier > inlier);
        assert!((0.0..=1.0).contains(&outlier));
        assert!((0.0..=1.0).contains(&inlier));
        assert!(forest.decision_function(array![25.0, 25.0].view()) > 0.0);
        assert_eq!(forest, IsolationForest::fit(&x, &params, 42));
    }
}
