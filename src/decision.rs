use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::indicator::pattern::detect_chart_pattern;
use crate::indicator::trend::detect_trend_band;
use crate::learning::LearningSnapshot;
use crate::model::entry::{EntryDecision, EntryRecord};
use crate::model::macro_event::EventRecord;
use crate::model::sample::PriceSample;
use crate::model::signal::{ChartPattern, Direction};
use crate::scoring::engine::{ConfidenceEngine, ConfidenceScore, ScoreInput};
use crate::scoring::weights::Weights;
use crate::trust::PatternTrustFilter;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    pub confidence_threshold: f64,
    pub stop_distance_pct: f64,
    pub take_distance_pct: f64,
    /// How long an entry may stay open before it is discarded unevaluated.
    pub evaluation_window: String,
    /// The direction compares the last price with the one this many positions back.
    pub direction_lookback: usize,
    /// Samples handed to the scoring engine.
    pub scoring_window: usize,
    /// Samples kept in memory by the scheduler.
    pub history_len: usize,
    pub risk_multiplier: f64,
    pub trend_short_window: usize,
    pub trend_long_window: usize,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            stop_distance_pct: 2.0,
            take_distance_pct: 2.0,
            evaluation_window: "3h".to_string(),
            direction_lookback: 12,
            scoring_window: 120,
            history_len: 500,
            risk_multiplier: 1.0,
            trend_short_window: 5,
            trend_long_window: 20,
        }
    }
}

pub fn propose_direction(prices: &[f64], lookback: usize) -> Option<Direction> {
    if lookback < 2 || prices.len() < lookback {
        return None;
    }
    let last = *prices.last()?;
    if last > prices[prices.len() - lookback] {
        Some(Direction::Long)
    } else {
        Some(Direction::Short)
    }
}

/// Stop loss and take profit around `entry_price`, as `(stop, take)`.
pub fn exit_levels(direction: Direction, entry_price: f64, cfg: &EntryConfig) -> (f64, f64) {
    let stop = cfg.stop_distance_pct / 100.0;
    let take = cfg.take_distance_pct / 100.0;
    match direction {
        Direction::Long => (entry_price * (1.0 - stop), entry_price * (1.0 + take)),
        Direction::Short => (entry_price * (1.0 + stop), entry_price * (1.0 - take)),
    }
}

#[derive(Debug, Clone)]
pub struct EntryPlan {
    pub decision: EntryDecision,
    pub record: EntryRecord,
    pub score: ConfidenceScore,
    /// Pattern as detected, before the trust filter.
    pub detected_pattern: Option<ChartPattern>,
    /// Whether the confidence cleared the threshold.
    pub actionable: bool,
}

/// Glue between the extractors, the trust filter and the scoring engine.
#[derive(Debug, Clone, Default)]
pub struct EntryPlanner {
    engine: ConfidenceEngine,
    cfg: EntryConfig,
}

impl EntryPlanner {
    pub fn new(engine: ConfidenceEngine, cfg: EntryConfig) -> Self {
        Self { engine, cfg }
    }

    pub fn config(&self) -> &EntryConfig {
        &self.cfg
    }

    pub fn engine(&self) -> &ConfidenceEngine {
        &self.engine
    }

    /// Score the most recent window and build an entry at its last price.
    ///
    /// `None` when there is not enough history to propose a direction. An
    /// untrusted pattern is dropped before scoring but still recorded on the
    /// entry so its outcomes keep feeding the trust history.
    pub fn plan(
        &self,
        samples: &[PriceSample],
        events: &[EventRecord],
        now: DateTime<Utc>,
        weights: &Weights,
        stats: &LearningSnapshot,
        trust: &PatternTrustFilter,
    ) -> Option<EntryPlan> {
        let window = &samples[samples.len().saturating_sub(self.cfg.scoring_window)..];
        let prices: Vec<f64> = window.iter().map(|s| s.price).collect();
        let direction = propose_direction(&prices, self.cfg.direction_lookback)?;
        let entry_price = *prices.last()?;

        let detected_pattern = detect_chart_pattern(&prices);
        let pattern = trust.admit(detected_pattern);
        if detected_pattern.is_some() && pattern.is_none() {
            tracing::debug!(pattern = ?detected_pattern, "Suppressing untrusted pattern");
        }
        let trend_hint = detect_trend_band(
            &prices,
            self.cfg.trend_short_window,
            self.cfg.trend_long_window,
        );

        let score = self.engine.score(
            &ScoreInput {
                samples: window,
                pattern,
                trend_hint,
                direction,
                events,
                now,
                risk_multiplier: self.cfg.risk_multiplier,
            },
            weights,
            stats,
        );

        let (stop_loss, take_profit) = exit_levels(direction, entry_price, &self.cfg);
        let decision = EntryDecision {
            direction,
            confidence: score.confidence,
            entry_price,
            stop_loss,
            take_profit,
        };

        let mut record = EntryRecord::new(now, &decision);
        record.pattern = detected_pattern.map(|p| p.as_str().to_string());
        let recorded_trend = match score.moving_averages.trend().key() {
            Some(key) => Some(key),
            None => trend_hint.and_then(|t| t.key()),
        };
        record.trend = recorded_trend.map(str::to_string);
        record.moving_averages = score.moving_averages;
        record.event_keys = events
            .iter()
            .filter(|e| e.is_active(now))
            .map(|e| e.learning_key())
            .collect();

        Some(EntryPlan {
            actionable: score.confidence >= self.cfg.confidence_threshold,
            decision,
            record,
            score,
            detected_pattern,
        })
    }
}
