use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::event_influence::total_event_influence;
use crate::indicator::angle::{
    analyze_trend_angle, TrendAngle, DEFAULT_ANGLE_WINDOW, DEFAULT_INFLECTION_ORDER,
};
use crate::indicator::momentum::{price_speed, MomentumRates};
use crate::indicator::sma::MovingAverages;
use crate::indicator::volume::{volume_factor, VolumeFactorConfig};
use crate::learning::{Category, LearningSnapshot};
use crate::model::macro_event::EventRecord;
use crate::model::sample::PriceSample;
use crate::model::signal::{ChartPattern, Direction, Signal, SignalKind, Trend};
use crate::scoring::terms::{
    angle_correction, base_probability, clamp01, compound_spike_bonus, directional_kicker,
    inflection_bonus, learned_adjustment, logistic,
};
use crate::scoring::weights::Weights;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Momentum horizons, counted as positions from the end of the window
    /// (2 = previous sample).
    pub short_back: usize,
    pub medium_back: usize,
    pub long_back: usize,
    /// Shorter windows score as neutral.
    pub min_window: usize,
    pub change_rate_divisor: f64,
    pub trend_step: f64,
    pub pattern_step: f64,
    pub spike_threshold_pct: f64,
    pub spike_bonus: f64,
    /// A learned category needs strictly more outcomes than this to count.
    pub learned_min_samples: u64,
    pub angle_window: usize,
    pub inflection_order: usize,
    pub angle_spike_multiplier: f64,
    pub steep_angle_deg: f64,
    pub flat_angle_deg: f64,
    pub compound_volume_threshold: f64,
    pub compound_bonus: f64,
    pub logistic_steepness: f64,
    pub neutral_confidence: f64,
    pub volume_threshold: f64,
    pub volume_recent: usize,
    pub volume_step: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            short_back: 2,
            medium_back: 6,
            long_back: 12,
            min_window: 12,
            change_rate_divisor: 10.0,
            trend_step: 0.2,
            pattern_step: 0.2,
            spike_threshold_pct: 2.0,
            spike_bonus: 0.05,
            learned_min_samples: 5,
            angle_window: DEFAULT_ANGLE_WINDOW,
            inflection_order: DEFAULT_INFLECTION_ORDER,
            angle_spike_multiplier: 1.5,
            steep_angle_deg: 50.0,
            flat_angle_deg: 20.0,
            compound_volume_threshold: 1.2,
            compound_bonus: 0.03,
            logistic_steepness: 12.0,
            neutral_confidence: 0.5,
            volume_threshold: 1.5,
            volume_recent: 5,
            volume_step: 0.1,
        }
    }
}

impl ScoringConfig {
    pub fn volume(&self) -> VolumeFactorConfig {
        VolumeFactorConfig {
            threshold: self.volume_threshold,
            recent: self.volume_recent,
            step: self.volume_step,
        }
    }
}

/// Everything one scoring call looks at besides weights and learned stats.
#[derive(Debug, Clone)]
pub struct ScoreInput<'a> {
    pub samples: &'a [PriceSample],
    pub pattern: Option<ChartPattern>,
    pub trend_hint: Option<Trend>,
    pub direction: Direction,
    pub events: &'a [EventRecord],
    pub now: DateTime<Utc>,
    pub risk_multiplier: f64,
}

/// Intermediate values of a scoring call, kept for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub rates: MomentumRates,
    pub speed: Option<f64>,
    pub trend: Trend,
    pub base: f64,
    pub kicker: f64,
    pub learned: f64,
    pub volume_factor: f64,
    pub after_multipliers: f64,
    pub angle: Option<TrendAngle>,
    pub angle_term: f64,
    pub inflection_term: f64,
    pub compound_term: f64,
    pub event_term: f64,
    pub pre_logistic: f64,
}

impl ScoreBreakdown {
    pub fn signals(&self, pattern: Option<ChartPattern>) -> Vec<Signal> {
        let mut out = vec![
            Signal::number(SignalKind::Momentum, self.rates.primary()),
            Signal::label(SignalKind::Trend, format!("{:?}", self.trend).to_lowercase()),
            Signal::number(SignalKind::VolumeFactor, self.volume_factor),
        ];
        if let Some(p) = pattern {
            out.push(Signal::label(SignalKind::Pattern, p.as_str()));
        }
        if let Some(a) = self.angle {
            out.push(Signal::number(SignalKind::Angle, a.degrees));
        }
        if self.inflection_term != 0.0 {
            out.push(Signal::number(SignalKind::Inflection, self.inflection_term));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceScore {
    pub confidence: f64,
    pub moving_averages: MovingAverages,
    /// `None` when the window was too short and the neutral default was returned.
    pub breakdown: Option<ScoreBreakdown>,
}

impl ConfidenceScore {
    pub fn is_neutral_default(&self) -> bool {
        self.breakdown.is_none()
    }

    pub fn ma5(&self) -> Option<f64> {
        self.moving_averages.ma5
    }

    pub fn ma20(&self) -> Option<f64> {
        self.moving_averages.ma20
    }

    pub fn ma60(&self) -> Option<f64> {
        self.moving_averages.ma60
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfidenceEngine {
    cfg: ScoringConfig,
}

impl ConfidenceEngine {
    pub fn new(cfg: ScoringConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.cfg
    }

    /// Fuse momentum, trend, pattern, learned win rates, volume, slope and
    /// event context into one confidence in `[0, 1]`.
    ///
    /// Pure: reads `weights` and `stats` but never mutates anything. A window
    /// shorter than `min_window` short-circuits to the neutral default.
    pub fn score(
        &self,
        input: &ScoreInput<'_>,
        weights: &Weights,
        stats: &LearningSnapshot,
    ) -> ConfidenceScore {
        let cfg = &self.cfg;
        let samples: Vec<PriceSample> = input
            .samples
            .iter()
            .filter(|s| s.price.is_finite() && s.price > 0.0)
            .cloned()
            .collect();
        let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
        let moving_averages = MovingAverages::compute(&prices);

        if prices.len() < cfg.min_window.max(2) {
            return ConfidenceScore {
                confidence: clamp01(cfg.neutral_confidence),
                moving_averages,
                breakdown: None,
            };
        }

        let rates = MomentumRates::compute(&prices, cfg.short_back, cfg.medium_back, cfg.long_back);
        let speed = price_speed(&samples, cfg.long_back);

        let ma_trend = moving_averages.trend();
        let learned_trend = match ma_trend {
            Trend::Neutral => input.trend_hint.unwrap_or(Trend::Neutral),
            t => t,
        };

        let base = base_probability(rates.primary(), ma_trend, input.pattern, cfg);
        let kicker = directional_kicker(input.direction, rates.short, cfg);

        let learned = learned_adjustment(
            &[
                (Category::Pattern, input.pattern.map(|p| p.as_str())),
                (Category::Trend, learned_trend.key()),
                (Category::Direction, Some(input.direction.as_str())),
            ],
            stats,
            weights,
            cfg,
        );

        let volumes: Vec<f64> = samples.iter().map(|s| s.volume.unwrap_or(0.0)).collect();
        let vf = if samples.iter().all(|s| s.volume.is_some()) {
            volume_factor(&volumes, &cfg.volume())
        } else {
            1.0
        };
        let risk = if input.risk_multiplier.is_finite() && input.risk_multiplier >= 0.0 {
            input.risk_multiplier
        } else {
            1.0
        };
        let after_multipliers = clamp01((base + kicker + learned) * vf * risk);

        let analysis = analyze_trend_angle(&prices, cfg.angle_window, cfg.inflection_order);
        let angle_term = angle_correction(
            analysis.angle.as_ref(),
            input.direction,
            rates.short,
            weights,
            cfg,
        );
        let mut adjusted = clamp01(after_multipliers + angle_term);

        let inflection_term = inflection_bonus(&analysis, prices.len(), input.direction, weights);
        adjusted = clamp01(adjusted + inflection_term);

        let compound_term = compound_spike_bonus(vf, rates.short, cfg);
        adjusted = clamp01(adjusted + compound_term);

        let event_term = total_event_influence(input.events, input.now, weights);
        adjusted = clamp01(adjusted + event_term);

        let confidence = logistic(adjusted, cfg.logistic_steepness);

        ConfidenceScore {
            confidence,
            moving_averages,
            breakdown: Some(ScoreBreakdown {
                rates,
                speed,
                trend: ma_trend,
                base,
                kicker,
                learned,
                volume_factor: vf,
                after_multipliers,
                angle: analysis.angle,
                angle_term,
                inflection_term,
                compound_term,
                event_term,
                pre_logistic: adjusted,
            }),
        }
    }
}
