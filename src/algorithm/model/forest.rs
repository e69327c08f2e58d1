//! Class-weighted random forest of gini decision trees

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::ForestParams;
use crate::utils::{create_main_progress_bar, finish_progress_bar};

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        /// Weighted share of positive rows
        probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Weighted class totals of a set of rows
#[derive(Debug, Clone, Copy, Default)]
struct ClassWeights {
    positive: f64,
    negative: f64,
}

impl ClassWeights {
    fn add(&mut self, positive: bool, weight: f64) {
        if positive {
            self.positive += weight;
        } else {
            self.negative += weight;
        }
    }

    fn total(self) -> f64 {
        self.positive + self.negative
    }

    /// Total weight times gini impurity
    fn weighted_gini(self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let p = self.positive / total;
        let n = self.negative / total;
        total * (1.0 - p * p - n * n)
    }

    fn probability(self) -> f64 {
        let total = self.total();
        if total > 0.0 { self.positive / total } else { 0.0 }
    }
}

/// Best split found for one node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Training data shared by every node of one tree
struct TreeData<'a> {
    x: &'a Array2<f64>,
    y: &'a [bool],
    weights: &'a [f64],
    params: &'a ForestParams,
    max_features: usize,
}

/// One CART classification tree stored as a node arena
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// Weighted impurity decrease per feature
    importances: Vec<f64>,
}

impl DecisionTree {
    fn fit(data: &TreeData<'_>, rows: Vec<usize>, rng: &mut StdRng) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            importances: vec![0.0; data.x.ncols()],
        };
        tree.grow(data, rows, 0, rng);
        tree
    }

    fn grow(&mut self, data: &TreeData<'_>, rows: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let mut totals = ClassWeights::default();
        for &row in &rows {
            totals.add(data.y[row], data.weights[row]);
        }

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            probability: totals.probability(),
        });

        let pure = totals.positive <= 0.0 || totals.negative <= 0.0;
        if pure || depth >= data.params.max_depth || rows.len() < data.params.min_samples_split {
            return id;
        }

        let parent_impurity = totals.weighted_gini();
        let Some(split) = Self::best_split(data, &rows, rng) else {
            return id;
        };
        if parent_impurity - split.impurity <= 1e-12 {
            return id;
        }
        self.importances[split.feature] += parent_impurity - split.impurity;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&row| data.x[[row, split.feature]] <= split.threshold);

        let left = self.grow(data, left_rows, depth + 1, rng);
        let right = self.grow(data, right_rows, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Lowest child impurity over a random subset of features
    fn best_split(data: &TreeData<'_>, rows: &[usize], rng: &mut StdRng) -> Option<SplitCandidate> {
        let n_features = data.x.ncols();
        let min_leaf = data.params.min_samples_leaf.max(1);
        let features = rand::seq::index::sample(rng, n_features, data.max_features.min(n_features));

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();
        for feature in features {
            sorted.sort_unstable_by(|&a, &b| data.x[[a, feature]].total_cmp(&data.x[[b, feature]]));

            let mut totals = ClassWeights::default();
            for &row in &sorted {
                totals.add(data.y[row], data.weights[row]);
            }

            let mut left = ClassWeights::default();
            for i in 0..sorted.len().saturating_sub(1) {
                let row = sorted[i];
                left.add(data.y[row], data.weights[row]);

                let value = data.x[[row, feature]];
                let next = data.x[[sorted[i + 1], feature]];
                if value >= next || i + 1 < min_leaf || sorted.len() - i - 1 < min_leaf {
                    continue;
                }

                let right = ClassWeights {
                    positive: totals.positive - left.positive,
                    negative: totals.negative - left.negative,
                };
                let impurity = left.weighted_gini() + right.weighted_gini();
                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: value + (next - value) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }

    /// Positive-class probability of one row
    #[must_use]
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { probability }) => return *probability,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Bagged ensemble of decision trees
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on standardized rows with per-row class weights
    ///
    /// Every tree sees a bootstrap sample and considers `sqrt(n_features)`
    /// candidate features per split. Tree `i` is seeded with `seed + i`, so
    /// the result does not depend on thread scheduling.
    #[must_use]
    pub fn fit(
        x: &Array2<f64>,
        y: &[bool],
        sample_weights: &[f64],
        params: &ForestParams,
        seed: u64,
        show_progress: bool,
    ) -> Self {
        let n_rows = x.nrows();
        let n_features = x.ncols();
        let data = TreeData {
            x,
            y,
            weights: sample_weights,
            params,
            max_features: ((n_features as f64).sqrt().round() as usize).max(1),
        };

        let progress = create_main_progress_bar(
            params.n_estimators as u64,
            Some("Training random forest"),
            show_progress,
        );
        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let rows: Vec<usize> = if n_rows == 0 {
                    Vec::new()
                } else {
                    (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect()
                };
                let tree = DecisionTree::fit(&data, rows, &mut rng);
                progress.inc(1);
                tree
            })
            .collect();
        finish_progress_bar(&progress, Some("Random forest trained"));

        let mut importances = vec![0.0; n_features];
        for tree in &trees {
            for (total, value) in importances.iter_mut().zip(&tree.importances) {
                *total += value;
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            importances.iter_mut().for_each(|v| *v /= sum);
        }

        Self { trees, importances }
    }

    /// Mean positive-class probability across trees
    #[must_use]
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_proba(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Mean impurity decrease per feature, normalized to sum to 1
    #[must_use]
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}
