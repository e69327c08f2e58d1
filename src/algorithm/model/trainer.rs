//! Risk model training
//!
//! The regime depends on how many providers carry a positive label. With
//! enough positives the trainer keeps every positive, reservoir-samples the
//! negatives, cross-validates each candidate family and refits the winner.
//! Otherwise it fits an isolation forest on a uniform sample of the whole
//! population.

use std::time::Instant;

use itertools::Itertools;
use ndarray::{Array2, Axis};

use super::forest::RandomForest;
use super::isolation::IsolationForest;
use super::logistic::LogisticRegression;
use super::metrics::{balanced_weights, roc_auc, stratified_folds};
use super::sampling::Reservoir;
use super::scaler::StandardScaler;
use super::{RiskModel, TrainedModel};
use crate::algorithm::features::FeatureSource;
use crate::config::{ModelFamily, TrainerConfig};
use crate::error::{Result, RiskEngineError};
use crate::models::{FEATURE_COUNT, FEATURE_NAMES, LabelSet};
use crate::utils::{log_operation_complete, log_operation_start, log_warning};

/// Fits a [`TrainedModel`] from a feature source and its labels
#[derive(Debug, Clone)]
pub struct Trainer<'a> {
    config: &'a TrainerConfig,
    chunk_size: usize,
    show_progress: bool,
}

impl<'a> Trainer<'a> {
    /// # Arguments
    /// * `config` - Regime threshold, sample sizes and hyper-parameters
    /// * `chunk_size` - Providers pulled from the source at a time
    /// * `show_progress` - Whether long fits draw a progress bar
    #[must_use]
    pub fn new(config: &'a TrainerConfig, chunk_size: usize, show_progress: bool) -> Self {
        Self {
            config,
            chunk_size: chunk_size.max(1),
            show_progress,
        }
    }

    /// Train on the whole population of `source`
    ///
    /// # Errors
    /// `TrainingFailure` if the training matrix is empty or, in the
    /// supervised regime, every sampled row has the same label
    pub fn train(&self, source: &dyn FeatureSource, labels: &LabelSet) -> Result<TrainedModel> {
        let start = Instant::now();
        log_operation_start("Training risk model", &format!("{} providers", source.len()));

        let model = if labels.positive_count() >= self.config.min_positive_labels {
            self.train_supervised(source, labels)?
        } else {
            log_warning(
                &format!(
                    "Only {} positive labels (minimum {}), using unsupervised anomaly scoring",
                    labels.positive_count(),
                    self.config.min_positive_labels
                ),
                None,
            );
            self.train_unsupervised(source)?
        };

        log_operation_complete(
            "Trained",
            &format!("{:?} model", model.kind()),
            model.training_rows(),
            Some(start.elapsed()),
        );
        Ok(model)
    }

    fn train_supervised(&self, source: &dyn FeatureSource, labels: &LabelSet) -> Result<TrainedModel> {
        let mut positives = Vec::new();
        let mut negatives = Reservoir::new(self.config.negative_sample_size, self.config.seed);
        self.for_each_row(source, |provider, row| {
            if labels.is_positive(provider) {
                positives.push(row);
            } else {
                negatives.offer(row);
            }
        });

        log::info!(
            "Supervised training set: {} positives, {} of {} negatives sampled",
            positives.len(),
            negatives.len(),
            negatives.seen()
        );
        if positives.is_empty() && negatives.is_empty() {
            return Err(RiskEngineError::TrainingFailure("empty feature matrix".into()));
        }
        if positives.is_empty() || negatives.is_empty() {
            return Err(RiskEngineError::TrainingFailure(
                "all training labels are identical".into(),
            ));
        }

        let y: Vec<bool> = std::iter::repeat_n(true, positives.len())
            .chain(std::iter::repeat_n(false, negatives.len()))
            .collect();
        positives.extend(negatives.into_items());
        let raw = to_matrix(&positives)?;
        let scaler = StandardScaler::fit(&raw);
        let x = scaler.transform(&raw);

        let mut best: Option<(ModelFamily, Option<f64>)> = None;
        for &family in &self.config.candidates {
            let auc = self.cross_validate(family, &x, &y);
            match auc {
                Some(value) => log::info!("{family:?}: cross-validated AUC {value:.4}"),
                None => log::info!("{family:?}: cross-validated AUC unavailable"),
            }
            let better = match (&best, auc) {
                (None, _) => true,
                (Some((_, None)), Some(_)) => true,
                (Some((_, Some(current))), Some(value)) => value > *current,
                _ => false,
            };
            if better {
                best = Some((family, auc));
            }
        }
        let (family, cv_auc) = best.ok_or_else(|| {
            RiskEngineError::TrainingFailure("no candidate model families configured".into())
        })?;

        let weights = balanced_weights(&y);
        let model = self.fit_family(family, &x, &y, &weights, self.show_progress);
        let importances = ranked_importances(&model.importances());
        Ok(TrainedModel::new(scaler, model, cv_auc, importances, y.len()))
    }

    fn train_unsupervised(&self, source: &dyn FeatureSource) -> Result<TrainedModel> {
        let mut sample = Reservoir::new(self.config.unsupervised_sample_size, self.config.seed);
        self.for_each_row(source, |_, row| sample.offer(row));
        if sample.is_empty() {
            return Err(RiskEngineError::TrainingFailure("empty feature matrix".into()));
        }
        log::info!(
            "Unsupervised training set: {} of {} providers sampled",
            sample.len(),
            sample.seen()
        );

        let rows = sample.into_items();
        let raw = to_matrix(&rows)?;
        let scaler = StandardScaler::fit(&raw);
        let x = scaler.transform(&raw);

        let model = RiskModel::Isolation(IsolationForest::fit(
            &x,
            &self.config.isolation,
            self.config.seed,
        ));
        let importances = ranked_importances(&model.importances());
        Ok(TrainedModel::new(scaler, model, None, importances, rows.len()))
    }

    /// Stream every provider of the source in chunks
    fn for_each_row(&self, source: &dyn FeatureSource, mut f: impl FnMut(&str, [f64; FEATURE_COUNT])) {
        for start in (0..source.len()).step_by(self.chunk_size) {
            for row in source.chunk(start..start + self.chunk_size) {
                f(&row.provider, row.features.to_array());
            }
        }
    }

    fn fit_family(
        &self,
        family: ModelFamily,
        x: &Array2<f64>,
        y: &[bool],
        weights: &[f64],
        show_progress: bool,
    ) -> RiskModel {
        match family {
            ModelFamily::LogisticRegression => {
                RiskModel::Logistic(LogisticRegression::fit(x, y, weights, &self.config.logistic))
            }
            ModelFamily::RandomForest => RiskModel::Forest(RandomForest::fit(
                x,
                y,
                weights,
                &self.config.forest,
                self.config.seed,
                show_progress,
            )),
        }
    }

    /// Mean AUC over stratified folds that contain both classes
    fn cross_validate(&self, family: ModelFamily, x: &Array2<f64>, y: &[bool]) -> Option<f64> {
        let positives = y.iter().filter(|&&l| l).count();
        let folds = self.config.folds.min(positives).min(y.len() - positives);
        if folds < 2 {
            return None;
        }

        let assignment = stratified_folds(y, folds, self.config.seed);
        let mut aucs = Vec::with_capacity(folds);
        for fold in 0..folds {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| assignment[i] == fold);

            let x_train = x.select(Axis(0), &train);
            let y_train: Vec<bool> = train.iter().map(|&i| y[i]).collect();
            let weights = balanced_weights(&y_train);
            let model = self.fit_family(family, &x_train, &y_train, &weights, false);

            let scores: Vec<f64> = test.iter().map(|&i| model.predict(x.row(i))).collect();
            let y_test: Vec<bool> = test.iter().map(|&i| y[i]).collect();
            if let Some(auc) = roc_auc(&scores, &y_test) {
                aucs.push(auc);
            }
        }

        (!aucs.is_empty()).then(|| aucs.iter().sum::<f64>() / aucs.len() as f64)
    }
}

fn to_matrix(rows: &[[f64; FEATURE_COUNT]]) -> Result<Array2<f64>> {
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), FEATURE_COUNT), flat)
        .map_err(|e| RiskEngineError::TrainingFailure(format!("feature matrix: {e}")))
}

/// Pair importances with feature names, most important first
fn ranked_importances(importances: &[f64]) -> Vec<(String, f64)> {
    FEATURE_NAMES
        .iter()
        .zip(importances)
        .map(|(name, &value)| ((*name).to_string(), value))
        .sorted_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::ops::Range;

    use super::*;
    use crate::algorithm::features::InMemoryFeatures;
    use crate::config::{ForestParams, IsolationParams};
    use crate::models::{ExclusionLabel, FeatureVector, MatchSource, ModelKind, ProviderFeatures};

    fn population(n: usize, risky_every: usize) -> (InMemoryFeatures, LabelSet) {
        let mut rows = Vec::new();
        let mut labels = LabelSet::default();
        for i in 0..n {
            let provider = format!("{:010}", i + 1);
            let risky = i % risky_every == 0;
            let features = FeatureVector {
                total_paid: if risky { 5_000_000.0 } else { 100_000.0 } + (i % 7) as f64 * 1_000.0,
                cost_per_claim: if risky { 900.0 } else { 40.0 } + (i % 5) as f64,
                code_count: (i % 11) as f64,
                ..FeatureVector::default()
            };
            if risky {
                labels.labels.insert(
                    provider.clone(),
                    ExclusionLabel {
                        provider: provider.clone(),
                        weight: 1.0,
                        matched_by: MatchSource::Exact,
                    },
                );
            }
            rows.push(ProviderFeatures { provider, features });
        }
        (InMemoryFeatures::new(rows), labels)
    }

    fn small_config() -> TrainerConfig {
        TrainerConfig {
            min_positive_labels: 5,
            negative_sample_size: 100,
            unsupervised_sample_size: 500,
            forest: ForestParams {
                n_estimators: 20,
                max_depth: 6,
                ..ForestParams::default()
            },
            isolation: IsolationParams {
                n_estimators: 50,
                max_samples: 64,
                contamination: 0.05,
            },
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn test_supervised_regime_separates_classes() {
        let (source, labels) = population(300, 10);
        let config = small_config();
        let model = Trainer::new(&config, 64, false).train(&source, &labels).unwrap();

        assert!(matches!(
            model.kind(),
            ModelKind::LogisticRegression | ModelKind::RandomForest
        ));
        assert!(model.cv_auc().unwrap() > 0.9);
        // 30 positives plus the full negative reservoir
        assert_eq!(model.training_rows(), 130);
        assert_eq!(model.importances().len(), FEATURE_COUNT);

        let rows = source.chunk(0..2);
        assert!(model.score(&rows[0].features.to_array()) > model.score(&rows[1].features.to_array()));
    }

    #[test]
    fn test_label_scarcity_switches_to_isolation_forest() {
        let (source, _) = population(200, 50);
        let config = small_config();
        let model = Trainer::new(&config, 64, false)
            .train(&source, &LabelSet::default())
            .unwrap();

        assert_eq!(model.kind(), ModelKind::IsolationForest);
        assert_eq!(model.cv_auc(), None);
        assert_eq!(model.training_rows(), 200);
        let score = model.score(&source.chunk(0..1)[0].features.to_array());
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_all_positive_is_training_failure() {
        let (source, labels) = population(20, 1);
        let config = small_config();
        let err = Trainer::new(&config, 8, false).train(&source, &labels).unwrap_err();
        assert!(matches!(err, RiskEngineError::TrainingFailure(_)));
    }

    struct Empty;

    impl FeatureSource for Empty {
        fn len(&self) -> usize {
            0
        }

        fn chunk(&self, _range: Range<usize>) -> Vec<ProviderFeatures> {
            Vec::new()
        }
    }

    #[test]
    fn test_empty_population_is_training_failure() {
        let config = small_config();
        let err = Trainer::new(&config, 8, false)
            .train(&Empty, &LabelSet::default())
            .unwrap_err();
        assert!(matches!(err, RiskEngineError::TrainingFailure(_)));
    }
}
