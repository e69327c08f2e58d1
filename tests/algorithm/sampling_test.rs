use provider_risk::algorithm::model::Reservoir;

#[test]
fn test_inclusion_probability_is_uniform() {
    const STREAM: usize = 100;
    const CAPACITY: usize = 10;
    const TRIALS: u64 = 2_000;

    let mut hits = [0u32; STREAM];
    for seed in 0..TRIALS {
        let mut reservoir = Reservoir::new(CAPACITY, seed);
        reservoir.extend(0..STREAM);
        for item in reservoir.into_items() {
            hits[item] += 1;
        }
    }

    // expected 200 hits per item, standard deviation about 13.4
    let expected = TRIALS as f64 * CAPACITY as f64 / STREAM as f64;
    for (item, &count) in hits.iter().enumerate() {
        let deviation = (f64::from(count) - expected).abs();
        assert!(deviation < 60.0, "item {item} kept {count} times");
    }

    let early: u32 = hits[..STREAM / 2].iter().sum();
    let late: u32 = hits[STREAM / 2..].iter().sum();
    let total = f64::from(early + late);
    assert!((f64::from(early) / total - 0.5).abs() < 0.03);
}

#[test]
fn test_sample_is_a_subset_without_duplicates() {
    let mut reservoir = Reservoir::new(50, 9);
    reservoir.extend(0..10_000u32);
    let mut items = reservoir.into_items();
    items.sort_unstable();
    items.dedup();
    assert_eq!(items.len(), 50);
    assert!(items.iter().all(|&i| i < 10_000));
}
