//! End-to-end risk scoring run
//!
//! A run goes snapshot, benchmarks, detectors, labels, training, scoring and
//! fusion. It either returns every output or an error; nothing partial is
//! ever handed back.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use crate::aggregation::AggregationProvider;
use crate::algorithm::detectors::{DetectorContext, DetectorSuite, NetworkSummary, summarize_network};
use crate::algorithm::{
    BatchScorer, BenchmarkTable, ClaimsSnapshot, ExclusionRegistry, FeatureExtractor,
    IdentityDirectory, LabelBuilder, Trainer, build_watchlist, score_percentiles,
};
use crate::config::EngineConfig;
use crate::error::{Result, RiskEngineError};
use crate::models::{
    CodeBenchmark, FlagKind, FlagRecord, ScoredProvider, ScoringSummary, WatchlistEntry,
};
use crate::utils::{log_operation_complete, log_operation_start};

/// Every output of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutputs {
    /// Per-code benchmarks, ordered by code
    pub benchmarks: Vec<CodeBenchmark>,
    /// Detector output, one list per kind
    pub flags: BTreeMap<FlagKind, Vec<FlagRecord>>,
    pub network_summary: NetworkSummary,
    /// Model scores, highest first
    pub scores: Vec<ScoredProvider>,
    pub watchlist: Vec<WatchlistEntry>,
    pub summary: ScoringSummary,
}

impl RunOutputs {
    /// Flags of one kind; empty when the detector found nothing
    #[must_use]
    pub fn flags_of(&self, kind: FlagKind) -> &[FlagRecord] {
        self.flags.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn flag_count(&self) -> usize {
        self.flags.values().map(Vec::len).sum()
    }
}

/// Runs the whole engine with one configuration
#[derive(Debug, Default)]
pub struct RiskPipeline {
    config: EngineConfig,
    detectors: DetectorSuite,
}

impl RiskPipeline {
    /// # Errors
    /// `Config` if the configuration does not validate
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            detectors: DetectorSuite::default(),
        })
    }

    /// Replace the default detector suite
    #[must_use]
    pub fn with_detectors(mut self, detectors: DetectorSuite) -> Self {
        self.detectors = detectors;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one run inside a dedicated thread pool
    ///
    /// # Arguments
    /// * `source` - Grouped queries over the claims fact table
    /// * `registry` - Exclusion registry snapshot
    /// * `directory` - Identity lookup for name matching
    ///
    /// # Errors
    /// `ExternalSourceUnavailable` or `Schema` from the aggregation provider,
    /// `TrainingFailure` from the trainer, `Config` if the pool cannot start
    pub fn run(
        &self,
        source: &dyn AggregationProvider,
        registry: &ExclusionRegistry,
        directory: &dyn IdentityDirectory,
    ) -> Result<RunOutputs> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| RiskEngineError::Config(format!("thread pool: {e}")))?;
        pool.install(|| self.run_stages(source, registry, directory))
    }

    fn run_stages(
        &self,
        source: &dyn AggregationProvider,
        registry: &ExclusionRegistry,
        directory: &dyn IdentityDirectory,
    ) -> Result<RunOutputs> {
        let start = Instant::now();
        log_operation_start("Risk scoring run with", &format!("{} threads", self.config.threads));
        log::debug!("{}", self.config);
        let config = &self.config;

        let snapshot = ClaimsSnapshot::build(source, config)?;
        let benchmarks = BenchmarkTable::build(snapshot.codes.rows(), &config.benchmark);
        log::info!("Benchmarked {} procedure codes", benchmarks.len());

        let ctx = DetectorContext {
            snapshot: &snapshot,
            benchmarks: &benchmarks,
            config: &config.detectors,
        };
        let (flags, network_summary) = rayon::join(
            || self.detectors.run(&ctx),
            || summarize_network(&snapshot, &config.detectors.network),
        );

        let extractor = FeatureExtractor::new(&snapshot, &config.features);
        let universe: Vec<String> = extractor.providers().map(str::to_string).collect();
        let labels = LabelBuilder::new(&config.labels).build(&universe, registry, directory);

        let chunk_size = config.scoring.chunk_size;
        let model = Trainer::new(&config.trainer, chunk_size, config.show_progress)
            .train(&extractor, &labels)?;
        let scores = BatchScorer::new(chunk_size, config.show_progress).score(&extractor, &model);

        let watchlist = build_watchlist(
            &flags,
            &scores,
            |provider| snapshot.total_paid(provider),
            &config.fusion,
        );

        let summary = ScoringSummary {
            model_kind: model.kind(),
            cv_auc: model.cv_auc(),
            feature_importances: model.importances().to_vec(),
            score_percentiles: score_percentiles(&scores),
            providers_scored: scores.len(),
            training_rows: model.training_rows(),
            positive_labels: labels.positive_count(),
            exact_matches: labels.exact_matches,
            fuzzy_matches: labels.fuzzy_matches,
        };

        let outputs = RunOutputs {
            benchmarks: benchmarks.into_vec(),
            flags,
            network_summary,
            scores,
            watchlist,
            summary,
        };
        log_operation_complete(
            "Completed",
            "risk scoring run; watchlist entries",
            outputs.watchlist.len(),
            Some(start.elapsed()),
        );
        Ok(outputs)
    }
}
