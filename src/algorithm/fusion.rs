//! Fusion of detector flags and model scores into one watchlist
//!
//! Providers are ranked by the number of distinct detector kinds that
//! flagged them, then by lifetime paid, then by identifier. Lifetime paid is
//! the secondary key rather than the model score so that the watchlist is
//! stable across retraining.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::config::FusionConfig;
use crate::models::{FlagKind, FlagRecord, ScoredProvider, WatchlistEntry};

/// Build the full ranked watchlist
///
/// # Arguments
/// * `flags` - Detector output grouped by kind
/// * `scores` - Model scores; attached to entries when present
/// * `total_paid` - Lifetime paid lookup for the secondary rank key
/// * `config` - Optional inclusion of unflagged high scorers
///
/// # Returns
/// Every flagged provider (plus score-only inclusions) with 1-based ranks.
/// Truncation is left to the caller.
#[must_use]
pub fn build_watchlist(
    flags: &BTreeMap<FlagKind, Vec<FlagRecord>>,
    scores: &[ScoredProvider],
    total_paid: impl Fn(&str) -> f64,
    config: &FusionConfig,
) -> Vec<WatchlistEntry> {
    let mut kinds: BTreeMap<&str, BTreeSet<FlagKind>> = BTreeMap::new();
    for record in flags.values().flatten() {
        kinds.entry(record.provider()).or_default().insert(record.kind());
    }

    let score_of: FxHashMap<&str, f64> =
        scores.iter().map(|s| (s.provider.as_str(), s.score)).collect();

    if let Some(threshold) = config.score_only_threshold {
        for scored in scores.iter().filter(|s| s.score >= threshold) {
            kinds.entry(scored.provider.as_str()).or_default();
        }
    }

    let mut entries: Vec<WatchlistEntry> = kinds
        .into_iter()
        .map(|(provider, flag_kinds)| WatchlistEntry {
            rank: 0,
            provider: provider.to_string(),
            total_paid: total_paid(provider),
            risk_score: score_of.get(provider).copied(),
            flag_kinds,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.flag_count()
            .cmp(&a.flag_count())
            .then_with(|| b.total_paid.total_cmp(&a.total_paid))
            .then_with(|| a.provider.cmp(&b.provider))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }

    log::info!(
        "Watchlist: {} providers, {} with 3+ flag kinds",
        entries.len(),
        entries.iter().filter(|e| e.flag_count() >= 3).count()
    );
    entries
}
