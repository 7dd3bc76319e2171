use chrono::Utc;

use signal_edge::learning::{Category, LearningStore};
use signal_edge::model::entry::TradeResult;
use signal_edge::model::signal::ChartPattern;
use signal_edge::trust::{PatternTrustFilter, TrustConfig};

fn record_pattern(store: &LearningStore, pattern: &str, results: &[bool]) {
    for ok in results {
        let result = if *ok {
            TradeResult::Success
        } else {
            TradeResult::Fail
        };
        store
            .record_outcome(Category::Pattern, pattern, result, Utc::now())
            .expect("record should succeed");
    }
}

#[test]
/// Verifies trust is derived from the store's rolling history:
/// 15 of 20 W-Patterns succeeded (0.75, trusted), 10 of 20 M-Patterns did
/// not clear the rate.
fn refresh_from_store_trusts_only_reliable_patterns() {
    let store = LearningStore::open_in_memory(50).expect("store should open");
    let mut w = vec![true; 15];
    w.extend(vec![false; 5]);
    record_pattern(&store, "W-Pattern", &w);
    let mut m = vec![true; 10];
    m.extend(vec![false; 10]);
    record_pattern(&store, "M-Pattern", &m);

    let mut filter = PatternTrustFilter::new(TrustConfig::default());
    filter
        .refresh_from_store(&store)
        .expect("refresh should succeed");

    assert_eq!(filter.trusted().len(), 1);
    assert_eq!(filter.trusted()["W-Pattern"], 0.75);
    assert_eq!(
        filter.admit(Some(ChartPattern::WPattern)),
        Some(ChartPattern::WPattern)
    );
    assert_eq!(filter.admit(Some(ChartPattern::MPattern)), None);
    assert_eq!(filter.admit(None), None);
}

#[test]
/// Verifies an empty history trusts nothing, and too few attempts never
/// qualify no matter the rate.
fn new_patterns_start_untrusted() {
    let store = LearningStore::open_in_memory(50).expect("store should open");
    let mut filter = PatternTrustFilter::new(TrustConfig::default());
    filter
        .refresh_from_store(&store)
        .expect("refresh should succeed");
    assert!(filter.trusted().is_empty());

    record_pattern(&store, "W-Pattern", &[true; 19]);
    filter
        .refresh_from_store(&store)
        .expect("refresh should succeed");
    assert!(!filter.is_trusted("W-Pattern"));

    record_pattern(&store, "W-Pattern", &[true]);
    filter
        .refresh_from_store(&store)
        .expect("refresh should succeed");
    assert_eq!(filter.trusted()["W-Pattern"], 1.0);
}
