//! Rule-based detector suite
//!
//! Every detector is a pure function of the claims snapshot, the code
//! benchmarks and its own threshold block. Detectors share nothing mutable,
//! so the suite runs them in parallel and collects one flag list per kind.

pub mod billing_swing;
pub mod code_outlier;
pub mod concentration;
pub mod consistency;
pub mod dual_billing;
pub mod migration;
pub mod network;
pub mod new_entrant;
pub mod rate_outlier;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use rayon::prelude::*;

use super::benchmark::BenchmarkTable;
use super::snapshot::ClaimsSnapshot;
use crate::config::DetectorConfig;
use crate::models::{FlagKind, FlagRecord};
use crate::utils::{log_operation_complete, log_operation_start};

pub use billing_swing::{BillingSwingDetector, ExplosiveGrowthDetector};
pub use code_outlier::CodeOutlierDetector;
pub use concentration::{BeneficiaryStuffingDetector, ConcentrationDetector};
pub use consistency::ConsistencyDetector;
pub use dual_billing::DualBillingDetector;
pub use migration::CodeMigrationDetector;
pub use network::{NetworkDetector, NetworkSummary, summarize_network};
pub use new_entrant::{InstantVolumeDetector, NewEntrantDetector};
pub use rate_outlier::RateOutlierDetector;

/// Read-only inputs shared by all detectors
#[derive(Debug, Clone, Copy)]
pub struct DetectorContext<'a> {
    pub snapshot: &'a ClaimsSnapshot,
    pub benchmarks: &'a BenchmarkTable,
    pub config: &'a DetectorConfig,
}

/// A single anomaly detector
pub trait Detector: Send + Sync {
    /// Kind of every record this detector emits
    fn kind(&self) -> FlagKind;

    /// Run over the snapshot; output is ordered and capped
    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord>;
}

/// The full set of detectors
pub struct DetectorSuite {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for DetectorSuite {
    fn default() -> Self {
        Self {
            detectors: vec![
                Box::new(CodeOutlierDetector),
                Box::new(BillingSwingDetector),
                Box::new(NewEntrantDetector),
                Box::new(RateOutlierDetector),
                Box::new(ExplosiveGrowthDetector),
                Box::new(InstantVolumeDetector),
                Box::new(ConcentrationDetector),
                Box::new(ConsistencyDetector),
                Box::new(BeneficiaryStuffingDetector),
                Box::new(NetworkDetector),
                Box::new(CodeMigrationDetector),
                Box::new(DualBillingDetector),
            ],
        }
    }
}

impl fmt::Debug for DetectorSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.kind()))
            .finish()
    }
}

impl DetectorSuite {
    /// Suite with a custom detector list
    #[must_use]
    pub fn with_detectors(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector in parallel
    ///
    /// # Returns
    /// One flag list per kind; kinds that fired nothing map to an empty list
    #[must_use]
    pub fn run(&self, ctx: &DetectorContext<'_>) -> BTreeMap<FlagKind, Vec<FlagRecord>> {
        let start = Instant::now();
        log_operation_start("Running detectors over", "claims snapshot");

        let results: Vec<(FlagKind, Vec<FlagRecord>)> = self
            .detectors
            .par_iter()
            .map(|detector| {
                let kind = detector.kind();
                let flags = detector.detect(ctx);
                log::info!("Detector {kind} raised {} flags", flags.len());
                (kind, flags)
            })
            .collect();

        let mut by_kind: BTreeMap<FlagKind, Vec<FlagRecord>> = BTreeMap::new();
        for (kind, flags) in results {
            by_kind.entry(kind).or_default().extend(flags);
        }

        let total: usize = by_kind.values().map(Vec::len).sum();
        log_operation_complete("raised", "detector flags", total, Some(start.elapsed()));
        by_kind
    }
}

/// Sort descending by `metric`, break ties by ascending provider, keep `max`
pub(crate) fn rank_and_cap<T>(
    mut items: Vec<T>,
    max: usize,
    metric: impl Fn(&T) -> f64,
    provider: impl Fn(&T) -> &str,
) -> Vec<T> {
    items.sort_by(|a, b| {
        metric(b)
            .total_cmp(&metric(a))
            .then_with(|| provider(a).cmp(provider(b)))
    });
    items.truncate(max);
    items
}
