//! Configuration for the risk engine.

pub mod detectors;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, RiskEngineError};

pub use detectors::{
    BillingSwingThresholds, CodeOutlierThresholds, ConcentrationThresholds, ConsistencyThresholds,
    DetectorConfig, DualBillingThresholds, GrowthThresholds, InstantVolumeThresholds,
    MigrationThresholds, NetworkThresholds, NewEntrantThresholds, RateOutlierThresholds,
    StuffingThresholds, month_start,
};

/// Top-level configuration for one engine run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for the rayon pool
    pub threads: usize,
    /// Draw progress bars for long loops
    pub show_progress: bool,
    /// Column names of the claims fact table
    pub columns: ClaimsColumns,
    pub benchmark: BenchmarkConfig,
    pub detectors: DetectorConfig,
    pub features: FeatureConfig,
    pub labels: LabelConfig,
    pub trainer: TrainerConfig,
    pub scoring: ScoringConfig,
    pub fusion: FusionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            show_progress: false,
            columns: ClaimsColumns::default(),
            benchmark: BenchmarkConfig::default(),
            detectors: DetectorConfig::default(),
            features: FeatureConfig::default(),
            labels: LabelConfig::default(),
            trainer: TrainerConfig::default(),
            scoring: ScoringConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            RiskEngineError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Reject values no run could use
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(RiskEngineError::Config("threads must be at least 1".into()));
        }
        if self.scoring.chunk_size == 0 {
            return Err(RiskEngineError::Config("scoring.chunk_size must be at least 1".into()));
        }
        if self.trainer.folds < 2 {
            return Err(RiskEngineError::Config("trainer.folds must be at least 2".into()));
        }
        if self.trainer.negative_sample_size == 0 || self.trainer.unsupervised_sample_size == 0 {
            return Err(RiskEngineError::Config("trainer sample sizes must be positive".into()));
        }
        if self.trainer.candidates.is_empty() {
            return Err(RiskEngineError::Config("trainer.candidates must not be empty".into()));
        }
        let contamination = self.trainer.isolation.contamination;
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(RiskEngineError::Config(format!(
                "trainer.isolation.contamination must be in (0, 0.5], got {contamination}"
            )));
        }
        let weights = self.labels.reason_weights.values().chain([&self.labels.default_weight]);
        for weight in weights {
            if !(0.0..=1.0).contains(weight) {
                return Err(RiskEngineError::Config(format!(
                    "label weights must be in [0, 1], got {weight}"
                )));
            }
        }
        let migration = &self.detectors.code_migration;
        if migration.early_window_end > migration.late_window_start {
            return Err(RiskEngineError::Config(
                "code_migration early window must end before the late window starts".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Engine Configuration:")?;
        writeln!(f, "  Threads: {}", self.threads)?;
        writeln!(f, "  Benchmark Min Providers: {}", self.benchmark.min_providers)?;
        writeln!(f, "  Min Positive Labels: {}", self.trainer.min_positive_labels)?;
        writeln!(f, "  Negative Sample Size: {}", self.trainer.negative_sample_size)?;
        writeln!(f, "  CV Folds: {}", self.trainer.folds)?;
        writeln!(f, "  Scoring Chunk Size: {}", self.scoring.chunk_size)?;
        Ok(())
    }
}

/// Column names in the claims fact table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClaimsColumns {
    pub billing: String,
    pub servicing: String,
    pub code: String,
    pub month: String,
    pub beneficiaries: String,
    pub claims: String,
    pub paid: String,
}

impl Default for ClaimsColumns {
    fn default() -> Self {
        Self {
            billing: "BILLING_PROVIDER_NPI_NUM".to_string(),
            servicing: "SERVICING_PROVIDER_NPI_NUM".to_string(),
            code: "HCPCS_CODE".to_string(),
            month: "CLAIM_FROM_MONTH".to_string(),
            beneficiaries: "TOTAL_UNIQUE_BENEFICIARIES".to_string(),
            claims: "TOTAL_CLAIMS".to_string(),
            paid: "TOTAL_PAID".to_string(),
        }
    }
}

/// Per-code benchmark construction
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Codes billed by fewer providers get no benchmark
    pub min_providers: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self { min_providers: 5 }
    }
}

/// Feature extraction thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Years at or below this paid are ignored by `max_growth_ratio`
    pub growth_floor: f64,
    pub short_burst_max_months: u64,
    pub short_burst_min_paid: f64,
    pub low_code_max_codes: u64,
    pub low_code_min_paid: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            growth_floor: 100.0,
            short_burst_max_months: 12,
            short_burst_min_paid: 1_000_000.0,
            low_code_max_codes: 2,
            low_code_min_paid: 500_000.0,
        }
    }
}

/// Weak-label construction from the exclusion registry
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Reason code to severity weight
    pub reason_weights: BTreeMap<String, f64>,
    /// Weight for reason codes missing from the table
    pub default_weight: f64,
    /// Normalized organization names shorter than this never match by name
    pub min_org_name_len: usize,
    /// Exact length of a valid identifier
    pub identifier_len: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        let reason_weights = [
            ("1128a1", 1.0),
            ("1128a3", 1.0),
            ("1128b1", 0.9),
            ("1128Aa", 0.9),
            ("1128b7", 0.8),
            ("1128b8", 0.7),
            ("1128b3", 0.7),
            ("1128b5", 0.6),
            ("1128b6", 0.6),
            ("1128a2", 0.5),
            ("1128b14", 0.5),
            ("1128a4", 0.4),
            ("1128b4", 0.3),
        ]
        .into_iter()
        .map(|(code, weight)| (code.to_string(), weight))
        .collect();

        Self {
            reason_weights,
            default_weight: 0.2,
            min_org_name_len: 6,
            identifier_len: 10,
        }
    }
}

/// Supervised model families the trainer may choose from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LogisticRegression,
    RandomForest,
}

/// Random forest hyper-parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 12,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Logistic regression hyper-parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub l2: f64,
    pub tolerance: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 1_000,
            l2: 1e-4,
            tolerance: 1e-7,
        }
    }
}

/// Isolation forest hyper-parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IsolationParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    /// Expected share of anomalies in the population
    pub contamination: f64,
}

impl Default for IsolationParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_samples: 256,
            contamination: 0.01,
        }
    }
}

/// Risk model training
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Fewer positive labels switches to the unsupervised regime
    pub min_positive_labels: usize,
    /// Reservoir size for the negative class
    pub negative_sample_size: usize,
    /// Reservoir size for the unsupervised training population
    pub unsupervised_sample_size: usize,
    pub folds: usize,
    pub seed: u64,
    pub candidates: Vec<ModelFamily>,
    pub forest: ForestParams,
    pub logistic: LogisticParams,
    pub isolation: IsolationParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            min_positive_labels: 20,
            negative_sample_size: 10_000,
            unsupervised_sample_size: 100_000,
            folds: 5,
            seed: 42,
            candidates: vec![ModelFamily::LogisticRegression, ModelFamily::RandomForest],
            forest: ForestParams::default(),
            logistic: LogisticParams::default(),
            isolation: IsolationParams::default(),
        }
    }
}

/// Batch scoring
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Providers scored per chunk
    pub chunk_size: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { chunk_size: 50_000 }
    }
}

/// Watchlist construction
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Unflagged providers scoring at or above this also join the watchlist
    pub score_only_threshold: Option<f64>,
}
