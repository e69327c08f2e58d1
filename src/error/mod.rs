//! Error handling for the risk engine.
//!
//! Only failures that abort a run are represented here. Zero denominators,
//! under-supported codes and label scarcity are recovered where they occur
//! and never surface as errors.

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the risk engine
#[derive(Debug, thiserror::Error)]
pub enum RiskEngineError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// A fact table or snapshot is missing a column or has an unsupported type
    #[error("Schema error: {0}")]
    Schema(String),

    /// The aggregation provider, registry or directory snapshot could not be read
    #[error("External source unavailable: {source_name}: {reason}")]
    ExternalSourceUnavailable {
        /// Name of the collaborator that failed
        source_name: String,
        /// What went wrong
        reason: String,
    },

    /// Training could not produce a model
    #[error("Training failure: {0}")]
    TrainingFailure(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// serde / serde_arrow conversion failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RiskEngineError {
    /// Shorthand for an unavailable external source
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalSourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means an upstream collaborator was missing
    #[must_use]
    pub const fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::ExternalSourceUnavailable { .. })
    }
}

impl From<serde_json::Error> for RiskEngineError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Result type for risk engine operations
pub type Result<T> = std::result::Result<T, RiskEngineError>;
