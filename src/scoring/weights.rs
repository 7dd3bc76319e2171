use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::macro_event::ImpactTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WeightName {
    Pattern,
    Trend,
    Direction,
    Angle,
    Inflection,
    EventHigh,
    EventMedium,
    EventLow,
}

impl WeightName {
    pub const ALL: [WeightName; 8] = [
        WeightName::Pattern,
        WeightName::Trend,
        WeightName::Direction,
        WeightName::Angle,
        WeightName::Inflection,
        WeightName::EventHigh,
        WeightName::EventMedium,
        WeightName::EventLow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightName::Pattern => "pattern",
            WeightName::Trend => "trend",
            WeightName::Direction => "direction",
            WeightName::Angle => "angle",
            WeightName::Inflection => "inflection",
            WeightName::EventHigh => "event_high",
            WeightName::EventMedium => "event_medium",
            WeightName::EventLow => "event_low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        WeightName::ALL.into_iter().find(|w| w.as_str() == s)
    }

    pub fn for_tier(tier: ImpactTier) -> Self {
        match tier {
            ImpactTier::High => WeightName::EventHigh,
            ImpactTier::Medium => WeightName::EventMedium,
            ImpactTier::Low => WeightName::EventLow,
        }
    }
}

/// Default value and admissible range of one weight.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct WeightBound {
    pub base: f64,
    pub floor: f64,
    pub cap: f64,
}

impl WeightBound {
    pub const fn new(base: f64, floor: f64, cap: f64) -> Self {
        Self { base, floor, cap }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.base.clamp(self.floor, self.cap);
        }
        value.clamp(self.floor, self.cap)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub pattern: WeightBound,
    pub trend: WeightBound,
    pub direction: WeightBound,
    pub angle: WeightBound,
    pub inflection: WeightBound,
    pub event_high: WeightBound,
    pub event_medium: WeightBound,
    pub event_low: WeightBound,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            pattern: WeightBound::new(0.4, 0.1, 0.6),
            trend: WeightBound::new(0.3, 0.1, 0.6),
            direction: WeightBound::new(0.3, 0.1, 0.6),
            angle: WeightBound::new(0.05, 0.0, 0.2),
            inflection: WeightBound::new(0.03, 0.0, 0.1),
            event_high: WeightBound::new(0.2, 0.0, 0.4),
            event_medium: WeightBound::new(0.1, 0.0, 0.3),
            event_low: WeightBound::new(0.05, 0.0, 0.2),
        }
    }
}

impl WeightsConfig {
    pub fn bound(&self, name: WeightName) -> WeightBound {
        match name {
            WeightName::Pattern => self.pattern,
            WeightName::Trend => self.trend,
            WeightName::Direction => self.direction,
            WeightName::Angle => self.angle,
            WeightName::Inflection => self.inflection,
            WeightName::EventHigh => self.event_high,
            WeightName::EventMedium => self.event_medium,
            WeightName::EventLow => self.event_low,
        }
    }
}

/// Current coefficients read by the scoring engine. Every value sits inside
/// its configured `[floor, cap]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    values: BTreeMap<WeightName, f64>,
}

impl Default for Weights {
    fn default() -> Self {
        Self::from_config(&WeightsConfig::default())
    }
}

impl Weights {
    pub fn from_config(cfg: &WeightsConfig) -> Self {
        let values = WeightName::ALL
            .into_iter()
            .map(|name| {
                let bound = cfg.bound(name);
                (name, bound.clamp(bound.base))
            })
            .collect();
        Self { values }
    }

    /// Build from a persisted name -> value map. Unknown names are ignored and
    /// missing ones fall back to their configured base.
    pub fn from_map(map: &BTreeMap<String, f64>, cfg: &WeightsConfig) -> Self {
        let mut weights = Self::from_config(cfg);
        for (key, value) in map {
            if let Some(name) = WeightName::parse(key) {
                weights.set(name, *value, cfg);
            }
        }
        weights
    }

    pub fn get(&self, name: WeightName) -> f64 {
        self.values.get(&name).copied().unwrap_or(0.0)
    }

    /// Store `value` clamped into the bound for `name`.
    pub fn set(&mut self, name: WeightName, value: f64, cfg: &WeightsConfig) {
        self.values.insert(name, cfg.bound(name).clamp(value));
    }

    pub fn tier(&self, tier: ImpactTier) -> f64 {
        self.get(WeightName::for_tier(tier))
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), *value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_into_bound() {
        let cfg = WeightsConfig::default();
        let mut w = Weights::from_config(&cfg);
        w.set(WeightName::Pattern, 5.0, &cfg);
        assert_eq!(w.get(WeightName::Pattern), 0.6);
        w.set(WeightName::Pattern, -1.0, &cfg);
        assert_eq!(w.get(WeightName::Pattern), 0.1);
        w.set(WeightName::Trend, f64::NAN, &cfg);
        assert_eq!(w.get(WeightName::Trend), 0.3);
    }

    #[test]
    fn map_round_trip_ignores_unknown_names() {
        let cfg = WeightsConfig::default();
        let mut map = BTreeMap::new();
        map.insert("angle".to_string(), 0.12);
        map.insert("bogus".to_string(), 9.0);
        let w = Weights::from_map(&map, &cfg);
        assert_eq!(w.get(WeightName::Angle), 0.12);
        assert_eq!(w.get(WeightName::Direction), 0.3);
        assert_eq!(w.to_map().len(), WeightName::ALL.len());
    }
}
