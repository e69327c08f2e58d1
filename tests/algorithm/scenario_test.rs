use provider_risk::algorithm::detectors::code_outlier::detect_code_outliers;
use provider_risk::algorithm::detectors::consistency::detect_consistency;
use provider_risk::algorithm::{BenchmarkTable, ClaimsSnapshot, FeatureExtractor, FeatureSource};
use provider_risk::config::{ClaimsColumns, EngineConfig};
use provider_risk::models::{ConsistencyPattern, CostTier};
use provider_risk::{ArrowClaimsProvider, InMemoryBatches};

use crate::utils::{ClaimRow, claims_batch, monthly};

fn snapshot(rows: &[ClaimRow]) -> ClaimsSnapshot {
    let batches = rows.chunks(7).map(claims_batch).collect();
    let provider = ArrowClaimsProvider::new(InMemoryBatches::new(batches), ClaimsColumns::default());
    ClaimsSnapshot::build(&provider, &EngineConfig::default()).unwrap()
}

#[test]
fn test_code_far_above_median_lands_in_top_tier() {
    let mut rows: Vec<ClaimRow> = (0..20)
        .map(|i| ClaimRow::new(&format!("P{i:02}"), "X100", 2023, 1, 200, 200.0 * f64::from(1 + i)))
        .collect();
    rows.push(ClaimRow::new("A", "X100", 2023, 1, 200, 600_000.0));

    let snapshot = snapshot(&rows);
    let config = EngineConfig::default();
    let benchmarks = BenchmarkTable::build(snapshot.codes.rows(), &config.benchmark);
    let flags = detect_code_outliers(&snapshot, &benchmarks, &config.detectors.code_outlier);

    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0].provider, "A");
    assert_eq!(flags[0].cost_per_claim, 3_000.0);
    assert_eq!(flags[0].median_cpc, 11.0);
    assert_eq!(flags[0].tier, CostTier::AboveP99);
}

#[test]
fn test_benchmark_percentiles_are_monotone() {
    let rows: Vec<ClaimRow> = (0..200)
        .map(|i: u32| {
            let code = ["A", "B", "C"][(i % 3) as usize];
            let paid = f64::from((i * 7919) % 1_000 + 1) * 10.0;
            ClaimRow::new(&format!("P{i:03}"), code, 2022, 1 + i % 12, 10, paid)
        })
        .collect();
    let snapshot = snapshot(&rows);
    let benchmarks = BenchmarkTable::build(snapshot.codes.rows(), &EngineConfig::default().benchmark);

    assert_eq!(benchmarks.len(), 3);
    for benchmark in benchmarks.iter() {
        let p = benchmark.percentiles();
        assert!(p.windows(2).all(|w| w[0] <= w[1]), "{}: {p:?}", benchmark.code);
        assert!(benchmark.min_cpc <= p[0] && p[6] <= benchmark.max_cpc);
        // a value exactly on a threshold is not promoted
        assert!(benchmark.tier(benchmark.p90) <= CostTier::AboveP75);
        assert!(benchmark.tier(benchmark.p99) < CostTier::AboveP99);
    }
}

#[test]
fn test_flat_and_spiky_months() {
    let mut rows = monthly("B", "X", 2021, 24, |_| 100_000.0);
    rows.extend(monthly("C", "X", 2021, 24, |i| if i == 5 { 5_000_000.0 } else { 10_000.0 }));
    rows.extend(monthly("D", "X", 2021, 24, |i| if i % 2 == 0 { 10_000.0 } else { 500_000.0 }));

    let snapshot = snapshot(&rows);
    let flags = detect_consistency(&snapshot, &EngineConfig::default().detectors.consistency);

    let pattern_of = |id: &str| flags.iter().find(|f| f.provider == id).map(|f| f.pattern);
    assert_eq!(pattern_of("B"), Some(ConsistencyPattern::Smooth));
    assert_eq!(pattern_of("C"), Some(ConsistencyPattern::Volatile));
    assert_eq!(pattern_of("D"), None);
}

#[test]
fn test_self_billing_ratio_stays_in_unit_interval() {
    let rows = vec![
        ClaimRow::new("A", "X", 2022, 1, 0, 10.0),
        ClaimRow::new("A", "X", 2022, 2, 0, 10.0).servicing("S"),
        ClaimRow::new("B", "X", 2022, 1, 5, 10.0).beneficiaries(0),
    ];
    let snapshot = snapshot(&rows);
    let config = EngineConfig::default();
    let extractor = FeatureExtractor::new(&snapshot, &config.features);

    for row in extractor.chunk(0..extractor.len()) {
        let f = &row.features;
        assert!((0.0..=1.0).contains(&f.self_billing_ratio));
        assert!(row.features.to_array().iter().all(|v| v.is_finite()));
    }
    let a = &extractor.chunk(0..1)[0];
    assert_eq!(a.provider, "A");
    assert_eq!(a.features.cost_per_claim, 0.0);
    assert_eq!(a.features.self_billing_ratio, 0.5);
}
