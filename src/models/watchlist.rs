//! Run outputs: scores, the fused watchlist and the scoring summary

use std::collections::BTreeSet;

use serde::Serialize;

use super::flag::FlagKind;

/// Model score for one provider; higher is riskier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProvider {
    pub provider: String,
    pub score: f64,
}

/// One row of the fused watchlist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistEntry {
    /// 1-based position in the ranked list
    pub rank: usize,
    pub provider: String,
    /// Distinct detector kinds that fired
    pub flag_kinds: BTreeSet<FlagKind>,
    /// Lifetime paid, the secondary rank key
    pub total_paid: f64,
    pub risk_score: Option<f64>,
}

impl WatchlistEntry {
    #[must_use]
    pub fn flag_count(&self) -> usize {
        self.flag_kinds.len()
    }
}

/// Training regime and model family of the fitted artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
    IsolationForest,
}

/// Percentiles of the final score distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScorePercentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
}

/// Summary of one training and scoring pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringSummary {
    pub model_kind: ModelKind,
    /// Cross-validated AUC; absent for the unsupervised regime
    pub cv_auc: Option<f64>,
    /// Feature name and normalized importance, most important first
    pub feature_importances: Vec<(String, f64)>,
    pub score_percentiles: ScorePercentiles,
    pub providers_scored: usize,
    pub training_rows: usize,
    pub positive_labels: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
}
