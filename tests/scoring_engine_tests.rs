use chrono::{DateTime, Duration, Utc};

use signal_edge::learning::{Category, LearningSnapshot, WinLoss};
use signal_edge::model::macro_event::{EventDirection, EventRecord, ImpactTier};
use signal_edge::model::sample::PriceSample;
use signal_edge::model::signal::{ChartPattern, Direction};
use signal_edge::scoring::{ConfidenceEngine, ConfidenceScore, ScoreInput, Weights};

fn samples(prices: &[f64]) -> Vec<PriceSample> {
    prices
        .iter()
        .enumerate()
        .map(|(i, p)| PriceSample::at_secs(1_700_000_000 + i as i64 * 60, *p))
        .collect()
}

fn now_of(samples: &[PriceSample]) -> DateTime<Utc> {
    samples.last().map(|s| s.timestamp).unwrap_or_else(Utc::now)
}

fn score_with(
    prices: &[f64],
    direction: Direction,
    pattern: Option<ChartPattern>,
    events: &[EventRecord],
    stats: &LearningSnapshot,
) -> ConfidenceScore {
    let samples = samples(prices);
    let engine = ConfidenceEngine::default();
    engine.score(
        &ScoreInput {
            samples: &samples,
            pattern,
            trend_hint: None,
            direction,
            events,
            now: now_of(&samples),
            risk_multiplier: 1.0,
        },
        &Weights::default(),
        stats,
    )
}

fn score(prices: &[f64], direction: Direction) -> ConfidenceScore {
    score_with(prices, direction, None, &[], &LearningSnapshot::default())
}

fn cpi_event(announced_at: DateTime<Utc>) -> EventRecord {
    EventRecord {
        event_type: "CPI".to_string(),
        source_key: "us".to_string(),
        announced_at,
        direction: EventDirection::Hot,
        impact_tier: ImpactTier::High,
        duration_estimate_secs: 3_600,
    }
}

#[test]
/// Verifies the short-window guard:
/// ten samples are below the minimum and must return the neutral default.
fn short_window_returns_neutral_default() {
    let result = score(&[100.0; 10], Direction::Long);
    assert!(result.is_neutral_default());
    assert_eq!(result.confidence, 0.5);
}

#[test]
/// Verifies the flat baseline:
/// twelve identical prices carry no information and land exactly on 0.5.
fn flat_series_scores_half() {
    let result = score(&[100.0; 12], Direction::Long);
    assert!(!result.is_neutral_default());
    assert!((result.confidence - 0.5).abs() < 1e-12);
}

#[test]
/// Verifies the momentum spike path:
/// a +3% final jump lifts the base, adds the directional kicker and pushes
/// confidence well above the flat baseline.
fn upward_spike_boosts_long_confidence() {
    let mut prices = vec![100.0; 11];
    prices.push(103.0);
    let result = score(&prices, Direction::Long);
    let breakdown = result.breakdown.expect("breakdown should exist");
    assert!((breakdown.rates.short - 3.0).abs() < 1e-9);
    assert!((breakdown.base - 0.8).abs() < 1e-9);
    assert!((breakdown.kicker - 0.05).abs() < 1e-12);
    assert!(result.confidence > 0.97);

    // The same spike earns no kicker for a short entry.
    let short = score(&prices, Direction::Short);
    assert_eq!(short.breakdown.expect("breakdown should exist").kicker, 0.0);
    assert!(short.confidence < result.confidence);
}

#[test]
/// Verifies the learned-adjustment cold start:
/// keys with at most five outcomes contribute nothing, and two categories
/// both sitting at an exact 0.5 win rate contribute nothing even with plenty
/// of data.
fn learned_adjustment_respects_floor_and_neutral_rate() {
    let prices = [100.0; 12];
    let pattern = Some(ChartPattern::WPattern);
    let mut stats = LearningSnapshot::default();
    stats.insert(Category::Direction, "long", WinLoss::new(5, 0));
    stats.insert(Category::Pattern, "W-Pattern", WinLoss::new(0, 5));
    let cold = score_with(&prices, Direction::Long, pattern, &[], &stats);
    assert_eq!(cold.breakdown.expect("breakdown should exist").learned, 0.0);

    stats.insert(Category::Direction, "long", WinLoss::new(10, 10));
    stats.insert(Category::Pattern, "W-Pattern", WinLoss::new(10, 10));
    let even = score_with(&prices, Direction::Long, pattern, &[], &stats);
    assert_eq!(even.breakdown.expect("breakdown should exist").learned, 0.0);

    // The pattern key is consulted: moving it off 0.5 shows up immediately.
    stats.insert(Category::Pattern, "W-Pattern", WinLoss::new(15, 5));
    let skewed = score_with(&prices, Direction::Long, pattern, &[], &stats);
    let learned = skewed.breakdown.expect("breakdown should exist").learned;
    assert!((learned - 0.1).abs() < 1e-12);
}

#[test]
/// Verifies learned win rates move confidence monotonically:
/// a perfect pattern record adds (1.0 - 0.5) x pattern weight.
fn learned_pattern_rate_raises_confidence() {
    let prices = [100.0; 12];
    let baseline = score_with(
        &prices,
        Direction::Long,
        Some(ChartPattern::WPattern),
        &[],
        &LearningSnapshot::default(),
    );

    let mut stats = LearningSnapshot::default();
    stats.insert(Category::Pattern, "W-Pattern", WinLoss::new(20, 0));
    let learned = score_with(&prices, Direction::Long, Some(ChartPattern::WPattern), &[], &stats);
    let breakdown = learned.breakdown.clone().expect("breakdown should exist");
    assert!((breakdown.learned - 0.2).abs() < 1e-12);
    assert!(learned.confidence > baseline.confidence);
}

#[test]
/// Verifies event decay:
/// a fresh high-impact event adds its full weight, a half-elapsed one half
/// of it, and an expired or future one nothing.
fn event_influence_decays_over_its_duration() {
    let prices = [100.0; 12];
    let now = now_of(&samples(&prices));
    let stats = LearningSnapshot::default();

    let fresh = score_with(&prices, Direction::Long, None, &[cpi_event(now)], &stats);
    let half = score_with(
        &prices,
        Direction::Long,
        None,
        &[cpi_event(now - Duration::minutes(30))],
        &stats,
    );
    let expired = score_with(
        &prices,
        Direction::Long,
        None,
        &[cpi_event(now - Duration::hours(2))],
        &stats,
    );
    let future = score_with(
        &prices,
        Direction::Long,
        None,
        &[cpi_event(now + Duration::minutes(10))],
        &stats,
    );

    let term = |s: &ConfidenceScore| s.breakdown.as_ref().map(|b| b.event_term).unwrap_or(-1.0);
    assert!((term(&fresh) - 0.2).abs() < 1e-9);
    assert!((term(&half) - 0.1).abs() < 1e-9);
    assert_eq!(term(&expired), 0.0);
    assert_eq!(term(&future), 0.0);
    assert!(fresh.confidence > half.confidence && half.confidence > expired.confidence);
}

#[test]
/// Verifies the output range on volatile, noisy input:
/// confidence stays inside [0, 1] for both directions.
fn confidence_stays_in_unit_interval() {
    let prices: Vec<f64> = (0..200)
        .map(|i| 100.0 + ((i * 37 % 23) as f64 - 11.0) * 1.7 + (i as f64 * 0.3).sin() * 9.0)
        .collect();
    let samples = samples(&prices);
    let engine = ConfidenceEngine::default();
    let mut stats = LearningSnapshot::default();
    stats.insert(Category::Direction, "short", WinLoss::new(0, 40));
    for end in 1..=samples.len() {
        for direction in [Direction::Long, Direction::Short] {
            let result = engine.score(
                &ScoreInput {
                    samples: &samples[..end],
                    pattern: Some(ChartPattern::MPattern),
                    trend_hint: None,
                    direction,
                    events: &[],
                    now: now_of(&samples[..end]),
                    risk_multiplier: 3.0,
                },
                &Weights::default(),
                &stats,
            );
            assert!(
                (0.0..=1.0).contains(&result.confidence),
                "end={} confidence={}",
                end,
                result.confidence
            );
        }
    }
}

#[test]
/// Verifies invalid prices are ignored rather than poisoning the score.
fn non_positive_prices_are_filtered_before_scoring() {
    let mut prices = vec![100.0; 12];
    prices.insert(3, -1.0);
    prices.insert(7, f64::NAN);
    let result = score(&prices, Direction::Long);
    assert!(!result.is_neutral_default());
    assert!((result.confidence - 0.5).abs() < 1e-12);
}
