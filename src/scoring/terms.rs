//! The individual adjustments that make up a confidence score. Each one is a
//! pure function so it can be checked on its own.

use crate::indicator::angle::{AngleAnalysis, TrendAngle};
use crate::learning::{Category, LearningSnapshot};
use crate::model::signal::{ChartPattern, Direction, Trend};
use crate::scoring::engine::ScoringConfig;
use crate::scoring::weights::{WeightName, Weights};

pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

/// `0.5 + change_rate / divisor + trend x step + pattern`, clamped.
pub fn base_probability(
    change_rate: f64,
    trend: Trend,
    pattern: Option<ChartPattern>,
    cfg: &ScoringConfig,
) -> f64 {
    let momentum = if cfg.change_rate_divisor.abs() > f64::EPSILON {
        change_rate / cfg.change_rate_divisor
    } else {
        0.0
    };
    clamp01(0.5 + momentum + trend.score() * cfg.trend_step + pattern_score(pattern, cfg))
}

pub fn pattern_score(pattern: Option<ChartPattern>, cfg: &ScoringConfig) -> f64 {
    match pattern {
        Some(p) if p.is_bullish() => cfg.pattern_step,
        Some(_) => -cfg.pattern_step,
        None => 0.0,
    }
}

pub fn is_spike(short_rate: f64, cfg: &ScoringConfig) -> bool {
    short_rate.abs() > cfg.spike_threshold_pct
}

/// Bonus when the short-horizon move already runs in the proposed direction.
pub fn directional_kicker(direction: Direction, short_rate: f64, cfg: &ScoringConfig) -> f64 {
    let hit = match direction {
        Direction::Long => short_rate > cfg.spike_threshold_pct,
        Direction::Short => short_rate < -cfg.spike_threshold_pct,
    };
    if hit {
        cfg.spike_bonus
    } else {
        0.0
    }
}

/// Sum of `(win_rate - 0.5) x weight` over the categories that have more than
/// `learned_min_samples` recorded outcomes.
pub fn learned_adjustment(
    lookups: &[(Category, Option<&str>)],
    stats: &LearningSnapshot,
    weights: &Weights,
    cfg: &ScoringConfig,
) -> f64 {
    let mut acc = 0.0;
    for (category, key) in lookups {
        let Some(key) = key else { continue };
        let Some(counts) = stats.get(*category, key) else {
            continue;
        };
        if counts.total() <= cfg.learned_min_samples {
            continue;
        }
        let Some(win_rate) = counts.win_rate() else {
            continue;
        };
        let Some(weight) = weight_for(*category) else {
            continue;
        };
        acc += (win_rate - 0.5) * weights.get(weight);
    }
    acc
}

fn weight_for(category: Category) -> Option<WeightName> {
    match category {
        Category::Pattern => Some(WeightName::Pattern),
        Category::Trend => Some(WeightName::Trend),
        Category::Direction => Some(WeightName::Direction),
        Category::Event => None,
    }
}

/// Reward a steep slope that agrees with the direction, penalise a flat one.
/// The angle weight is amplified while the short horizon is spiking.
pub fn angle_correction(
    angle: Option<&TrendAngle>,
    direction: Direction,
    short_rate: f64,
    weights: &Weights,
    cfg: &ScoringConfig,
) -> f64 {
    let Some(angle) = angle else {
        return 0.0;
    };
    let mut weight = weights.get(WeightName::Angle);
    if is_spike(short_rate, cfg) {
        weight *= cfg.angle_spike_multiplier;
    }
    if angle.degrees > cfg.steep_angle_deg && angle.agrees_with(direction) {
        weight
    } else if angle.degrees < cfg.flat_angle_deg {
        -weight
    } else {
        0.0
    }
}

/// Small bonus when the series sits right after an inflection whose implied
/// reversal matches the direction.
pub fn inflection_bonus(
    analysis: &AngleAnalysis,
    series_len: usize,
    direction: Direction,
    weights: &Weights,
) -> f64 {
    match analysis.near_inflection(series_len) {
        Some(point) if point.implied_direction() == direction => {
            weights.get(WeightName::Inflection)
        }
        _ => 0.0,
    }
}

/// Joint volume and momentum spike confirmation.
pub fn compound_spike_bonus(volume_factor: f64, short_rate: f64, cfg: &ScoringConfig) -> f64 {
    if volume_factor > cfg.compound_volume_threshold && is_spike(short_rate, cfg) {
        cfg.compound_bonus
    } else {
        0.0
    }
}

/// `1 / (1 + e^(-k (x - 0.5)))`, clamped.
pub fn logistic(x: f64, steepness: f64) -> f64 {
    clamp01(1.0 / (1.0 + (-steepness * (x - 0.5)).exp()))
}
