use signal_edge::config::{parse_interval_ms, Config};
use signal_edge::scoring::WeightName;

#[test]
fn parse_default_toml() {
    let toml_str = r#"
[scoring]
long_back = 12
min_window = 24
logistic_steepness = 10.0

[weights]
pattern = { base = 0.45, floor = 0.1, cap = 0.6 }

[optimizer]
trigger_threshold = 25

[trust]
min_attempts = 30
min_success_rate = 0.65

[entry]
confidence_threshold = 0.75
evaluation_window = "6h"

[scheduler]
entry_scan = "15s"
simulation = "2h"

[storage]
learning_db_path = "var/learning.sqlite"

[logging]
level = "debug"
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    assert_eq!(config.scoring.min_window, 24);
    assert!((config.scoring.logistic_steepness - 10.0).abs() < f64::EPSILON);
    assert!((config.weights.bound(WeightName::Pattern).base - 0.45).abs() < f64::EPSILON);
    // Sections left out keep their defaults.
    assert!((config.weights.bound(WeightName::Trend).base - 0.3).abs() < f64::EPSILON);
    assert_eq!(config.optimizer.trigger_threshold, 25);
    assert_eq!(config.trust.min_attempts, 30);
    assert_eq!(config.trust.rolling_window, 50);
    assert!((config.entry.confidence_threshold - 0.75).abs() < f64::EPSILON);
    assert_eq!(config.storage.learning_db_path.to_str(), Some("var/learning.sqlite"));
    assert_eq!(config.logging.level, "debug");

    let intervals = config.scheduler.intervals_ms().unwrap();
    assert_eq!(intervals.entry_scan_ms, 15_000);
    assert_eq!(intervals.simulation_ms, 7_200_000);
    assert_eq!(intervals.price_refresh_ms, 60_000);
}

#[test]
fn bundled_default_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let config = Config::load_from_path(&path).unwrap();
    assert!((config.entry.confidence_threshold - 0.7).abs() < f64::EPSILON);
    assert_eq!(config.trust.min_attempts, 20);
    assert_eq!(config.events.default_duration_secs, 3_600);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(Config::from_toml_str("[entry]\nconfidence_threshold = 1.5\n").is_err());
    assert!(Config::from_toml_str("[entry]\nevaluation_window = \"3x\"\n").is_err());
    assert!(Config::from_toml_str("[scheduler]\nentry_scan = \"0s\"\n").is_err());
    assert!(Config::from_toml_str("[scoring]\nmin_window = 4\n").is_err());
    assert!(
        Config::from_toml_str("[weights]\nangle = { base = 0.1, floor = 0.3, cap = 0.2 }\n")
            .is_err()
    );
}

#[test]
fn parse_interval_ms_accepts_scheduler_units_only() {
    assert_eq!(parse_interval_ms("1s").unwrap(), 1_000);
    assert_eq!(parse_interval_ms("5m").unwrap(), 300_000);
    assert_eq!(parse_interval_ms("1d").unwrap(), 86_400_000);
    assert!(parse_interval_ms("1w").is_err());
    assert!(parse_interval_ms("-1m").is_err());
}
