//! Risk models and their training
//!
//! A [`TrainedModel`] bundles the fitted scaler with one fitted estimator.
//! Scoring a row only reads both, so the artifact can be shared across
//! threads and applied chunk by chunk.

pub mod forest;
pub mod isolation;
pub mod logistic;
pub mod metrics;
pub mod sampling;
pub mod scaler;
pub mod trainer;

use ndarray::ArrayView1;

use crate::algorithm::stats::finite_or_zero;
use crate::models::{FEATURE_COUNT, ModelKind};

pub use forest::RandomForest;
pub use isolation::IsolationForest;
pub use logistic::LogisticRegression;
pub use sampling::Reservoir;
pub use scaler::StandardScaler;
pub use trainer::Trainer;

/// One fitted estimator
#[derive(Debug, Clone, PartialEq)]
pub enum RiskModel {
    Logistic(LogisticRegression),
    Forest(RandomForest),
    Isolation(IsolationForest),
}

impl RiskModel {
    #[must_use]
    pub const fn kind(&self) -> ModelKind {
        match self {
            Self::Logistic(_) => ModelKind::LogisticRegression,
            Self::Forest(_) => ModelKind::RandomForest,
            Self::Isolation(_) => ModelKind::IsolationForest,
        }
    }

    /// Risk of one standardized row; higher is riskier
    #[must_use]
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        match self {
            Self::Logistic(model) => model.predict_proba(row),
            Self::Forest(model) => model.predict_proba(row),
            Self::Isolation(model) => model.risk_score(row),
        }
    }

    /// Per-feature importances in column order, summing to 1 when non-zero
    #[must_use]
    pub fn importances(&self) -> Vec<f64> {
        match self {
            Self::Logistic(model) => model.importances(),
            Self::Forest(model) => model.importances().to_vec(),
            Self::Isolation(model) => model.importances().to_vec(),
        }
    }
}

/// Fitted scaler and estimator with training diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    scaler: StandardScaler,
    model: RiskModel,
    cv_auc: Option<f64>,
    importances: Vec<(String, f64)>,
    training_rows: usize,
}

impl TrainedModel {
    pub(crate) fn new(
        scaler: StandardScaler,
        model: RiskModel,
        cv_auc: Option<f64>,
        importances: Vec<(String, f64)>,
        training_rows: usize,
    ) -> Self {
        Self {
            scaler,
            model,
            cv_auc,
            importances,
            training_rows,
        }
    }

    /// Score one raw feature row into `[0, 1]`
    ///
    /// Non-finite inputs are zeroed before scaling. The model is never
    /// refitted here.
    #[must_use]
    pub fn score(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let row = features.map(finite_or_zero);
        let scaled = self.scaler.transform_row(ArrayView1::from(&row[..]));
        finite_or_zero(self.model.predict(scaled.view())).clamp(0.0, 1.0)
    }

    #[must_use]
    pub const fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    #[must_use]
    pub const fn cv_auc(&self) -> Option<f64> {
        self.cv_auc
    }

    /// Feature name and importance, most important first
    #[must_use]
    pub fn importances(&self) -> &[(String, f64)] {
        &self.importances
    }

    #[must_use]
    pub const fn training_rows(&self) -> usize {
        self.training_rows
    }

    #[must_use]
    pub const fn model(&self) -> &RiskModel {
        &self.model
    }

    #[must_use]
    pub const fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}
