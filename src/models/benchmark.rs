//! National cost-per-claim benchmarks per procedure code

use std::fmt;

use serde::Serialize;

/// Distribution of provider cost per claim for one procedure code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeBenchmark {
    /// Procedure code
    pub code: String,
    /// Providers contributing a positive cost per claim
    pub providers: usize,
    pub total_spending: f64,
    pub total_claims: f64,
    pub mean_cpc: f64,
    pub median_cpc: f64,
    /// Sample standard deviation; 0 with a single contributor
    pub stddev_cpc: f64,
    pub min_cpc: f64,
    pub max_cpc: f64,
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl CodeBenchmark {
    /// Percentiles in ascending order: p10, p25, median, p75, p90, p95, p99
    #[must_use]
    pub const fn percentiles(&self) -> [f64; 7] {
        [
            self.p10,
            self.p25,
            self.median_cpc,
            self.p75,
            self.p90,
            self.p95,
            self.p99,
        ]
    }

    /// Tier of an observed cost per claim
    ///
    /// Thresholds are tested from the top down and the first one strictly
    /// exceeded wins, so a value sitting exactly on p95 is `AboveP90`.
    #[must_use]
    pub fn tier(&self, cost_per_claim: f64) -> CostTier {
        let thresholds = [
            (self.p99, CostTier::AboveP99),
            (self.p95, CostTier::AboveP95),
            (self.p90, CostTier::AboveP90),
            (self.p75, CostTier::AboveP75),
            (self.median_cpc, CostTier::AboveMedian),
        ];
        thresholds
            .into_iter()
            .find(|(threshold, _)| cost_per_claim > *threshold)
            .map_or(CostTier::BelowMedian, |(_, tier)| tier)
    }
}

/// Position of a cost per claim within a code's national distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    BelowMedian,
    AboveMedian,
    AboveP75,
    AboveP90,
    AboveP95,
    AboveP99,
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BelowMedian => "below_median",
            Self::AboveMedian => "above_median",
            Self::AboveP75 => "p75",
            Self::AboveP90 => "p90",
            Self::AboveP95 => "p95",
            Self::AboveP99 => "p99",
        };
        f.write_str(label)
    }
}
