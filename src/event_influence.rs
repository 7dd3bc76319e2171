use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::learning::DurationBook;
use crate::model::macro_event::{EventRecord, DEFAULT_EVENT_DURATION_SECS};
use crate::model::sample::PriceSample;
use crate::scoring::weights::Weights;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Duration assumed for event keys that have never been measured.
    pub default_duration_secs: i64,
    /// Relative move from the announcement price that still counts as impact.
    pub significance: f64,
    /// How far after the announcement impact measurement looks.
    pub max_check_hours: i64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_EVENT_DURATION_SECS,
            significance: 0.005,
            max_check_hours: 6,
        }
    }
}

/// Fraction of the event's lifetime still ahead, `(0, 1]` while active and 0
/// otherwise. Events announced in the future have not started yet.
pub fn remaining_fraction(event: &EventRecord, now: DateTime<Utc>) -> f64 {
    let duration = event.duration_estimate_secs as f64;
    if duration <= 0.0 {
        return 0.0;
    }
    let elapsed = event.elapsed_secs(now);
    if elapsed < 0.0 || elapsed >= duration {
        return 0.0;
    }
    1.0 - elapsed / duration
}

pub fn event_influence(event: &EventRecord, now: DateTime<Utc>, weights: &Weights) -> f64 {
    weights.tier(event.impact_tier) * remaining_fraction(event, now)
}

/// Sum of the influence of every still-active event.
pub fn total_event_influence(events: &[EventRecord], now: DateTime<Utc>, weights: &Weights) -> f64 {
    events
        .iter()
        .map(|e| event_influence(e, now, weights))
        .sum()
}

/// Replace each event's duration estimate with the learned average for its key.
pub fn apply_learned_durations(events: &mut [EventRecord], book: &DurationBook) {
    for event in events.iter_mut() {
        event.duration_estimate_secs = book.estimate_secs(&event.learning_key());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventImpact {
    pub initial_price: f64,
    pub max_price: f64,
    pub min_price: f64,
    pub up_move_pct: f64,
    pub down_move_pct: f64,
    /// Time from the announcement until the move last stayed significant.
    pub duration_secs: f64,
}

/// Measure how long the market kept moving after an announcement.
///
/// Starts from the first sample at or after `announced_at` and walks forward
/// while the relative move from that price stays at or above
/// `significance`. Samples beyond `max_check` are ignored.
pub fn measure_event_impact(
    samples: &[PriceSample],
    announced_at: DateTime<Utc>,
    max_check: Duration,
    significance: f64,
) -> Option<EventImpact> {
    let horizon = announced_at + max_check;
    let window: Vec<&PriceSample> = samples
        .iter()
        .filter(|s| s.timestamp >= announced_at && s.timestamp <= horizon)
        .collect();
    let first = window.first()?;
    let initial_price = first.price;
    if initial_price <= 0.0 {
        return None;
    }

    let mut last_significant = announced_at;
    for sample in window.iter().skip(1) {
        let change = (sample.price - initial_price).abs() / initial_price;
        if change >= significance {
            last_significant = sample.timestamp;
        } else {
            break;
        }
    }

    let max_price = window.iter().map(|s| s.price).fold(f64::MIN, f64::max);
    let min_price = window.iter().map(|s| s.price).fold(f64::MAX, f64::min);
    Some(EventImpact {
        initial_price,
        max_price,
        min_price,
        up_move_pct: (max_price - initial_price) / initial_price * 100.0,
        down_move_pct: (initial_price - min_price) / initial_price * 100.0,
        duration_secs: (last_significant - announced_at).num_milliseconds() as f64 / 1_000.0,
    })
}
