//! Billing network analysis
//!
//! Hubs bill on behalf of many distinct servicing identities. Ghost billers
//! bill but never appear as a servicing identity anywhere in the table, and
//! ghost servicers are the reverse.

use rustc_hash::FxHashSet;
use serde::Serialize;

use super::{Detector, DetectorContext, rank_and_cap};
use crate::algorithm::snapshot::ClaimsSnapshot;
use crate::config::NetworkThresholds;
use crate::models::{FlagKind, FlagRecord, NetworkFlag, NetworkRole};

/// Population-level network counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub total_billers: usize,
    pub total_servicers: usize,
    /// Billers never seen as a servicing identity
    pub ghost_billers: usize,
    /// Servicing identities never seen billing
    pub ghost_servicers: usize,
    /// Billers at or above the hub threshold
    pub hubs: usize,
}

fn ghost_billers(snapshot: &ClaimsSnapshot) -> Vec<&str> {
    let servicers: FxHashSet<&str> = snapshot.servicers.iter().map(String::as_str).collect();
    snapshot
        .billers
        .iter()
        .map(String::as_str)
        .filter(|b| !servicers.contains(b))
        .collect()
}

/// Counts of billers, servicers and both ghost sets
#[must_use]
pub fn summarize_network(snapshot: &ClaimsSnapshot, t: &NetworkThresholds) -> NetworkSummary {
    let billers: FxHashSet<&str> = snapshot.billers.iter().map(String::as_str).collect();
    let ghost_servicers = snapshot
        .servicers
        .iter()
        .filter(|s| !billers.contains(s.as_str()))
        .count();

    NetworkSummary {
        total_billers: snapshot.billers.len(),
        total_servicers: snapshot.servicers.len(),
        ghost_billers: ghost_billers(snapshot).len(),
        ghost_servicers,
        hubs: snapshot
            .networks
            .iter()
            .filter(|n| n.servicing_count >= t.min_servicing)
            .count(),
    }
}

/// Hubs followed by high-value ghost billers
#[must_use]
pub fn detect_networks(snapshot: &ClaimsSnapshot, t: &NetworkThresholds) -> Vec<NetworkFlag> {
    let hubs = snapshot
        .networks
        .iter()
        .filter(|n| n.servicing_count >= t.min_servicing)
        .map(|n| NetworkFlag {
            provider: n.provider.clone(),
            role: NetworkRole::Hub,
            servicing_count: n.servicing_count,
            network_paid: n.paid,
            network_claims: n.claims,
            total_paid: snapshot.total_paid(&n.provider),
        })
        .collect();
    let mut flags = rank_and_cap(hubs, t.max_flags, |f| f.servicing_count as f64, |f| f.provider.as_str());

    let ghosts = ghost_billers(snapshot)
        .into_iter()
        .filter_map(|provider| {
            let total_paid = snapshot.total_paid(provider);
            (total_paid >= t.ghost_biller_min_paid).then(|| NetworkFlag {
                provider: provider.to_string(),
                role: NetworkRole::GhostBiller,
                servicing_count: 0,
                network_paid: 0.0,
                network_claims: 0.0,
                total_paid,
            })
        })
        .collect();
    flags.extend(rank_and_cap(ghosts, t.max_ghost_flags, |f| f.total_paid, |f| f.provider.as_str()));
    flags
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkDetector;

impl Detector for NetworkDetector {
    fn kind(&self) -> FlagKind {
        FlagKind::Network
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<FlagRecord> {
        detect_networks(ctx.snapshot, &ctx.config.network)
            .into_iter()
            .map(FlagRecord::Network)
            .collect()
    }
}
