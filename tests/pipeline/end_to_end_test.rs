use std::path::Path;

use provider_risk::config::ClaimsColumns;
use provider_risk::models::{FlagKind, ModelKind, RegistryEntry};
use provider_risk::{
    ArrowClaimsProvider, EngineConfig, ExclusionRegistry, InMemoryDirectory, ParquetDirectorySource,
    RiskPipeline, RunOutputs,
};

use crate::utils::{ClaimRow, claims_batch, init_logging, monthly, scratch_dir, ten_digit, write_parquet};

const NORMAL: usize = 50;
const SUSPICIOUS: usize = 25;

fn suspicious_id(k: usize) -> String {
    ten_digit(100 + k)
}

/// Fifty small practices and twenty-five single-code billers of 12M each
fn write_claims(dir: &Path) {
    let mut rows: Vec<ClaimRow> = Vec::new();
    for i in 0..NORMAL {
        let id = ten_digit(i);
        let base = 1_000.0 * (1 + i % 7) as f64;
        rows.extend(monthly(&id, "99213", 2022, 12, |m| base + 10.0 * f64::from(m)));
        rows.extend(monthly(&id, "99214", 2022, 6, |_| base / 2.0));
    }
    for k in 0..SUSPICIOUS {
        rows.extend(monthly(&suspicious_id(k), "J9999", 2022, 12, |_| 1_000_000.0));
    }

    for (part, chunk) in rows.chunks(rows.len() / 3 + 1).enumerate() {
        write_parquet(&dir.join(format!("part-{part}.parquet")), &[claims_batch(chunk)]);
    }
}

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.threads = 2;
    config.scoring.chunk_size = 16;
    config.trainer.forest.n_estimators = 20;
    config.trainer.isolation.n_estimators = 50;
    config
}

fn run(dir: &Path, registry: &ExclusionRegistry) -> RunOutputs {
    init_logging();
    let columns = ClaimsColumns::default();
    let source = ParquetDirectorySource::new(dir, &columns).unwrap();
    let provider = ArrowClaimsProvider::new(source, columns);
    RiskPipeline::new(config())
        .unwrap()
        .run(&provider, registry, &InMemoryDirectory::default())
        .unwrap()
}

fn assert_well_formed(outputs: &RunOutputs) {
    assert_eq!(outputs.scores.len(), NORMAL + SUSPICIOUS);
    assert_eq!(outputs.summary.providers_scored, NORMAL + SUSPICIOUS);
    assert!(outputs.scores.iter().all(|s| (0.0..=1.0).contains(&s.score)));
    assert!(outputs.scores.windows(2).all(|w| w[0].score >= w[1].score));

    let p = outputs.summary.score_percentiles;
    assert!(p.p50 <= p.p90 && p.p90 <= p.p95 && p.p95 <= p.p99 && p.p99 <= p.p999);

    for (i, entry) in outputs.watchlist.iter().enumerate() {
        assert_eq!(entry.rank, i + 1);
        assert!(!entry.flag_kinds.is_empty());
    }
    assert!(outputs.watchlist.windows(2).all(|w| w[0].flag_count() >= w[1].flag_count()));
}

#[test]
fn test_unsupervised_run() {
    let dir = scratch_dir("e2e-unsupervised");
    write_claims(&dir);

    let outputs = run(&dir, &ExclusionRegistry::default());
    assert_well_formed(&outputs);

    assert_eq!(outputs.summary.model_kind, ModelKind::IsolationForest);
    assert_eq!(outputs.summary.cv_auc, None);
    assert_eq!(outputs.summary.positive_labels, 0);

    let benchmarked: Vec<&str> = outputs.benchmarks.iter().map(|b| b.code.as_str()).collect();
    assert_eq!(benchmarked, ["99213", "99214", "J9999"]);

    assert_eq!(outputs.flags_of(FlagKind::ProcedureConcentration).len(), SUSPICIOUS);
    assert_eq!(outputs.flags_of(FlagKind::NewEntrant).len(), SUSPICIOUS);
    assert!(outputs.flags_of(FlagKind::CodeOutlier).is_empty());

    // every suspicious biller is flagged and nobody else is
    assert_eq!(outputs.watchlist.len(), SUSPICIOUS);
    assert_eq!(outputs.watchlist[0].provider, suspicious_id(0));
    assert_eq!(outputs.watchlist[0].total_paid, 12_000_000.0);
}

#[test]
fn test_supervised_run_ranks_labeled_providers_first() {
    let dir = scratch_dir("e2e-supervised");
    write_claims(&dir);

    let registry = ExclusionRegistry::new(
        (0..SUSPICIOUS)
            .map(|k| RegistryEntry {
                identifier: Some(suspicious_id(k)),
                reason_code: Some("1128a1".into()),
                ..RegistryEntry::default()
            })
            .collect(),
    );

    let outputs = run(&dir, &registry);
    assert_well_formed(&outputs);

    assert_ne!(outputs.summary.model_kind, ModelKind::IsolationForest);
    assert_eq!(outputs.summary.positive_labels, SUSPICIOUS);
    assert_eq!(outputs.summary.exact_matches, SUSPICIOUS);
    assert!(outputs.summary.cv_auc.is_some_and(|auc| auc > 0.9));

    let top: Vec<&str> = outputs.scores[..SUSPICIOUS].iter().map(|s| s.provider.as_str()).collect();
    assert!((0..SUSPICIOUS).all(|k| top.contains(&suspicious_id(k).as_str())));

    let importance_total: f64 = outputs.summary.feature_importances.iter().map(|(_, v)| v).sum();
    assert!((importance_total - 1.0).abs() < 1e-9);
}

#[test]
fn test_empty_claims_directory_fails_before_training() {
    let dir = scratch_dir("e2e-empty");
    let err = ParquetDirectorySource::new(&dir, &ClaimsColumns::default()).unwrap_err();
    assert!(err.is_source_unavailable());
}

#[test]
fn test_rerun_is_identical() {
    let dir = scratch_dir("e2e-rerun");
    write_claims(&dir);
    let registry = ExclusionRegistry::default();

    let first = run(&dir, &registry);
    let second = run(&dir, &registry);
    assert_eq!(first.scores, second.scores);
    assert_eq!(first.watchlist, second.watchlist);
    assert_eq!(first.benchmarks, second.benchmarks);
}
