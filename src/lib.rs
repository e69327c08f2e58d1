//! Provider risk scoring over claims fact tables.
//!
//! The engine aggregates a claims table, benchmarks cost per claim per
//! procedure code, runs a suite of rule-based anomaly detectors, labels
//! providers against an exclusion registry, trains a risk model and fuses
//! flags and scores into a ranked watchlist.

pub mod aggregation;
pub mod algorithm;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod utils;

// Core types
pub use config::EngineConfig;
pub use error::{Result, RiskEngineError};
pub use pipeline::{RiskPipeline, RunOutputs};

// Collaborators
pub use aggregation::{
    AggregationProvider, ArrowClaimsProvider, InMemoryBatches, ParquetDirectorySource,
    load_claims_async,
};
pub use algorithm::{ExclusionRegistry, IdentityDirectory, InMemoryDirectory};

// Arrow types
pub use arrow::record_batch::RecordBatch;
