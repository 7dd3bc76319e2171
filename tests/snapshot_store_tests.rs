use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use signal_edge::scoring::{WeightName, Weights, WeightsConfig};
use signal_edge::snapshot_store::{
    load_trusted_patterns_from_path, load_weights_from_path, persist_trusted_patterns_to_path,
    persist_weights_to_path,
};

fn temp_path(test_name: &str) -> std::path::PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be monotonic")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("se-{}-{}", test_name, ts))
        .join("snapshot.json")
}

#[test]
/// Verifies weights persistence round-trip, including creation of the parent
/// directory.
fn weights_round_trip_persists_values() {
    let path = temp_path("weights-roundtrip");
    let cfg = WeightsConfig::default();
    let mut weights = Weights::from_config(&cfg);
    weights.set(WeightName::Pattern, 0.55, &cfg);
    weights.set(WeightName::EventLow, 0.0, &cfg);

    persist_weights_to_path(&path, &weights).expect("persist should succeed");
    let loaded = load_weights_from_path(&path, &cfg)
        .expect("load should succeed")
        .expect("persisted weights should exist");
    assert_eq!(loaded, weights);
}

#[test]
/// Verifies loaded weights are clamped to the current bounds, so a snapshot
/// written under looser bounds can not escape them.
fn loaded_weights_are_clamped_to_bounds() {
    let path = temp_path("weights-clamp");
    std::fs::create_dir_all(path.parent().expect("parent dir")).expect("mkdir should succeed");
    std::fs::write(
        &path,
        r#"{"updated_at_ms": 0, "weights": {"pattern": 5.0, "trend": -1.0, "bogus": 0.9}}"#,
    )
    .expect("write should succeed");
    let cfg = WeightsConfig::default();
    let loaded = load_weights_from_path(&path, &cfg)
        .expect("load should succeed")
        .expect("weights should exist");
    assert_eq!(loaded.get(WeightName::Pattern), cfg.pattern.cap);
    assert_eq!(loaded.get(WeightName::Trend), cfg.trend.floor);
    assert_eq!(loaded.get(WeightName::Direction), cfg.direction.base);
}

#[test]
/// Verifies missing-file behavior for both snapshots: Ok(None).
fn missing_snapshots_return_none() {
    let path = temp_path("snapshot-missing");
    assert!(load_weights_from_path(&path, &WeightsConfig::default())
        .expect("load should succeed")
        .is_none());
    assert!(load_trusted_patterns_from_path(&path)
        .expect("load should succeed")
        .is_none());
}

#[test]
fn trusted_patterns_round_trip() {
    let path = temp_path("trusted-roundtrip");
    let mut trusted = BTreeMap::new();
    trusted.insert("W-Pattern".to_string(), 0.75);
    persist_trusted_patterns_to_path(&path, &trusted).expect("persist should succeed");
    let loaded = load_trusted_patterns_from_path(&path)
        .expect("load should succeed")
        .expect("trusted patterns should exist");
    assert_eq!(loaded, trusted);
}
