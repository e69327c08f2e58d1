//! Risk analysis algorithms
//!
//! Everything downstream of the aggregation provider: the claims snapshot,
//! code benchmarks, detectors, features, labels, model training, scoring
//! and watchlist fusion.

pub mod benchmark;
pub mod detectors;
pub mod features;
pub mod fusion;
pub mod labels;
pub mod model;
pub mod scoring;
pub mod snapshot;
pub mod stats;

pub use benchmark::BenchmarkTable;
pub use detectors::{Detector, DetectorContext, DetectorSuite, NetworkSummary};
pub use features::{FeatureExtractor, FeatureSource, InMemoryFeatures};
pub use fusion::build_watchlist;
pub use labels::{ExclusionRegistry, IdentityDirectory, InMemoryDirectory, LabelBuilder};
pub use model::{TrainedModel, Trainer};
pub use scoring::{BatchScorer, score_percentiles};
pub use snapshot::ClaimsSnapshot;
