use provider_risk::algorithm::{ExclusionRegistry, InMemoryDirectory, LabelBuilder};
use provider_risk::config::LabelConfig;
use provider_risk::models::MatchSource;

use crate::utils::{DirectoryRow, PublishedRegistryRow, scratch_dir, ten_digit, write_rows};

fn universe() -> Vec<String> {
    (0..6).map(ten_digit).collect()
}

fn load(name: &str) -> (ExclusionRegistry, InMemoryDirectory) {
    let dir = scratch_dir(name);
    let registry_path = dir.join("exclusions.parquet");
    let directory_path = dir.join("directory.parquet");

    write_rows(
        &registry_path,
        &[
            PublishedRegistryRow::organization("Acme Health LLC", "TX", "1128a1"),
            PublishedRegistryRow::person("Smith", "Jane", "NY", "1128b4"),
            PublishedRegistryRow::identifier(&ten_digit(4), "1128b7"),
            PublishedRegistryRow::organization("ACME", "TX", "1128a1"),
            PublishedRegistryRow::identifier(&ten_digit(99), "1128a1"),
        ],
    );
    write_rows(
        &directory_path,
        &[
            DirectoryRow::organization(&ten_digit(0), "ACME HEALTH, LLC", "tx"),
            DirectoryRow::organization(&ten_digit(1), "Acme Health LLC", "CA"),
            DirectoryRow::person(&ten_digit(2), "Smith", "Jane", "NY"),
            DirectoryRow::organization(&ten_digit(3), "ACME", "TX"),
            DirectoryRow::organization(&ten_digit(4), "Unrelated Clinic", "TX"),
        ],
    );

    (
        ExclusionRegistry::from_parquet(&registry_path).unwrap(),
        InMemoryDirectory::from_parquet(&directory_path).unwrap(),
    )
}

#[test]
fn test_labels_from_published_snapshots() {
    let (registry, directory) = load("labels");
    assert_eq!(registry.len(), 5);
    assert_eq!(directory.len(), 5);

    let labels = LabelBuilder::new(&LabelConfig::default()).build(&universe(), &registry, &directory);

    // organization name plus jurisdiction; punctuation does not matter
    let acme = &labels.labels[&ten_digit(0)];
    assert_eq!(acme.weight, 1.0);
    assert_eq!(acme.matched_by, MatchSource::Fuzzy);
    assert!(!labels.is_positive(&ten_digit(1)));

    let smith = &labels.labels[&ten_digit(2)];
    assert_eq!(smith.weight, 0.3);
    assert_eq!(smith.matched_by, MatchSource::Fuzzy);

    // four-letter organization names are too generic to match
    assert!(!labels.is_positive(&ten_digit(3)));

    let by_id = &labels.labels[&ten_digit(4)];
    assert_eq!(by_id.weight, 0.8);
    assert_eq!(by_id.matched_by, MatchSource::Exact);

    assert!(!labels.is_positive(&ten_digit(5)));
    assert_eq!(labels.positive_count(), 3);
    assert_eq!(labels.exact_matches, 1);
    assert_eq!(labels.fuzzy_matches, 2);
}

#[test]
fn test_missing_snapshots_are_unavailable() {
    let dir = scratch_dir("labels-missing");
    let registry = ExclusionRegistry::from_parquet(&dir.join("nope.parquet")).unwrap_err();
    assert!(registry.is_source_unavailable());
    let directory = InMemoryDirectory::from_parquet(&dir.join("nope.parquet")).unwrap_err();
    assert!(directory.is_source_unavailable());
}
