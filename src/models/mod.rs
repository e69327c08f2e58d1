//! Domain models for the risk engine
//!
//! Aggregates, benchmarks, flags, labels, features and the fused outputs. All
//! of them are plain immutable values built once per run.

pub mod benchmark;
pub mod claims;
pub mod features;
pub mod flag;
pub mod label;
pub mod watchlist;

pub use benchmark::{CodeBenchmark, CostTier};
pub use claims::{
    NetworkAggregate, ProviderAggregate, ProviderCodeAggregate, ProviderMonthAggregate,
    ProviderYearAggregate,
};
pub use features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector, ProviderFeatures};
pub use flag::{
    BillingSwingFlag, CodeOutlierFlag, ConcentrationFlag, ConsistencyFlag, ConsistencyPattern,
    DualBillingFlag, ExplosiveGrowthFlag, FlagKind, FlagRecord, InstantVolumeFlag, MigrationFlag,
    NetworkFlag, NetworkRole, NewEntrantFlag, OutlierCode, RateOutlierFlag, StuffingFlag,
};
pub use label::{DirectoryEntry, ExclusionLabel, LabelSet, MatchSource, RegistryEntry};
pub use watchlist::{ModelKind, ScorePercentiles, ScoredProvider, ScoringSummary, WatchlistEntry};
