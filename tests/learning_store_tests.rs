use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;

use signal_edge::learning::{Category, LearningStore};
use signal_edge::model::entry::TradeResult;

fn temp_db_path(test_name: &str) -> std::path::PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("se-{}-{}.sqlite", test_name, ts))
}

#[test]
/// Verifies restart recovery:
/// counters, pattern history and event durations written through one handle
/// are rebuilt identically by a fresh handle on the same file.
fn learning_store_round_trip_persistence() {
    let path = temp_db_path("learning-roundtrip");
    {
        let store = LearningStore::open(&path, 50).expect("store should open");
        let now = Utc::now();
        for _ in 0..3 {
            store
                .record_outcome(Category::Pattern, "W-Pattern", TradeResult::Success, now)
                .expect("record should succeed");
        }
        store
            .record_outcome(Category::Pattern, "W-Pattern", TradeResult::Fail, now)
            .expect("record should succeed");
        store
            .record_outcome(Category::Trend, "up", TradeResult::Success, now)
            .expect("record should succeed");
        store
            .record_event_duration("CPI:us", 1_800.0, now)
            .expect("duration should be recorded");
        store
            .record_event_duration("CPI:us", 5_400.0, now)
            .expect("duration should be recorded");
        assert_eq!(store.mutation_count().expect("count should read"), 5);
    }

    let reopened = LearningStore::open(&path, 50).expect("store should reopen");
    let pattern = reopened
        .get(Category::Pattern, "W-Pattern")
        .expect("get should succeed")
        .expect("pattern counters should exist");
    assert_eq!((pattern.success, pattern.fail), (3, 1));
    assert_eq!(pattern.win_rate(), Some(0.75));
    assert!(reopened
        .get(Category::Trend, "down")
        .expect("get should succeed")
        .is_none());

    let history = reopened.pattern_history().expect("history should load");
    assert_eq!(history["W-Pattern"], vec![true, true, true, false]);
    let avg = reopened
        .average_event_duration("CPI:us", 3_600)
        .expect("average should load");
    assert!((avg - 3_600.0).abs() < 1e-9);
    assert_eq!(
        reopened
            .average_event_duration("NFP:us", 3_600)
            .expect("average should load"),
        3_600.0
    );
    // A fresh handle starts its mutation counter at zero.
    assert_eq!(reopened.mutation_count().expect("count should read"), 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
/// Verifies the rolling pattern history keeps only the newest results.
fn pattern_history_is_bounded_by_rolling_window() {
    let store = LearningStore::open_in_memory(3).expect("store should open");
    let now = Utc::now();
    for result in [
        TradeResult::Fail,
        TradeResult::Fail,
        TradeResult::Success,
        TradeResult::Success,
        TradeResult::Success,
    ] {
        store
            .record_outcome(Category::Pattern, "M-Pattern", result, now)
            .expect("record should succeed");
    }
    let history = store.pattern_history().expect("history should load");
    assert_eq!(history["M-Pattern"], vec![true, true, true]);
    // Aggregate counters are not windowed.
    let counts = store
        .get(Category::Pattern, "M-Pattern")
        .expect("get should succeed")
        .expect("counters should exist");
    assert_eq!(counts.total(), 5);
}

#[test]
/// Verifies concurrent writers do not lose updates.
fn concurrent_outcomes_are_all_counted() {
    let store = Arc::new(LearningStore::open_in_memory(50).expect("store should open"));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let result = if i % 2 == 0 {
                    TradeResult::Success
                } else {
                    TradeResult::Fail
                };
                for _ in 0..25 {
                    store
                        .record_outcome(Category::Direction, "long", result, Utc::now())
                        .expect("record should succeed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread should finish");
    }
    let counts = store
        .get(Category::Direction, "long")
        .expect("get should succeed")
        .expect("counters should exist");
    assert_eq!((counts.success, counts.fail), (50, 50));
    assert_eq!(store.mutation_count().expect("count should read"), 100);
}

#[test]
/// Verifies negative or non-finite durations are ignored.
fn invalid_event_durations_are_ignored() {
    let store = LearningStore::open_in_memory(50).expect("store should open");
    store
        .record_event_duration("CPI:us", -5.0, Utc::now())
        .expect("call should succeed");
    store
        .record_event_duration("CPI:us", f64::NAN, Utc::now())
        .expect("call should succeed");
    let book = store.duration_book(3_600).expect("book should load");
    assert_eq!(book.estimate_secs("CPI:us"), 3_600);
}

#[test]
/// Verifies batched outcomes:
/// every key of one entry lands in the same commit and survives a reopen.
fn batched_outcomes_are_written_together() {
    let path = temp_db_path("learning-batch");
    let keys = vec![
        (Category::Direction, "short".to_string()),
        (Category::Pattern, "M-Pattern".to_string()),
        (Category::Event, "FOMC:us".to_string()),
    ];
    {
        let store = LearningStore::open(&path, 50).expect("store should open");
        let written = store
            .record_outcomes(&keys, TradeResult::Fail, Utc::now())
            .expect("batch should succeed");
        assert_eq!(written, 3);
        assert_eq!(
            store
                .record_outcomes(&[], TradeResult::Fail, Utc::now())
                .expect("empty batch should succeed"),
            0
        );
        assert_eq!(store.mutation_count().expect("count should read"), 3);
    }

    let reopened = LearningStore::open(&path, 50).expect("store should reopen");
    for (category, key) in &keys {
        let counts = reopened
            .get(*category, key)
            .expect("get should succeed")
            .expect("counters should exist");
        assert_eq!((counts.success, counts.fail), (0, 1));
    }
    assert_eq!(
        reopened.pattern_history().expect("history should load")["M-Pattern"],
        vec![false]
    );
    let _ = std::fs::remove_file(&path);
}
