//! Severity weights of exclusion reason codes

use std::collections::BTreeMap;

use crate::config::LabelConfig;

/// Reason code to severity lookup with a default for unmapped codes
#[derive(Debug, Clone, PartialEq)]
pub struct ReasonWeights {
    weights: BTreeMap<String, f64>,
    default_weight: f64,
}

impl ReasonWeights {
    #[must_use]
    pub fn from_config(config: &LabelConfig) -> Self {
        Self {
            weights: config.reason_weights.clone(),
            default_weight: config.default_weight,
        }
    }

    /// Weight in `[0, 1]`; reason codes are matched after trimming
    #[must_use]
    pub fn weight(&self, reason_code: Option<&str>) -> f64 {
        reason_code
            .map(str::trim)
            .and_then(|code| self.weights.get(code))
            .copied()
            .unwrap_or(self.default_weight)
            .clamp(0.0, 1.0)
    }
}
