use anyhow::Result;
use serde::Deserialize;

use crate::learning::{Category, LearningSnapshot, LearningStore, WinLoss};
use crate::scoring::weights::{WeightBound, WeightName, Weights, WeightsConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Learning-store mutations that trigger a full recompute.
    pub trigger_threshold: u64,
    /// Categories with fewer aggregate outcomes keep their base weight.
    pub min_samples: u64,
    pub upper_band: f64,
    pub lower_band: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            trigger_threshold: 10,
            min_samples: 10,
            upper_band: 0.6,
            lower_band: 0.4,
        }
    }
}

/// Recomputes the category weights from the learning store once enough new
/// outcomes have accumulated.
#[derive(Debug, Clone, Default)]
pub struct WeightOptimizer {
    cfg: OptimizerConfig,
    pending: u64,
}

impl WeightOptimizer {
    pub fn new(cfg: OptimizerConfig) -> Self {
        Self { cfg, pending: 0 }
    }

    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Count `mutations` new store updates; when the trigger threshold is
    /// reached, recompute every weight and reset the counter.
    pub fn on_store_mutated(
        &mut self,
        mutations: u64,
        store: &LearningStore,
        weights_cfg: &WeightsConfig,
    ) -> Result<Option<Weights>> {
        self.pending = self.pending.saturating_add(mutations);
        if self.pending < self.cfg.trigger_threshold.max(1) {
            return Ok(None);
        }
        let snapshot = store.snapshot()?;
        let weights = self.recompute(&snapshot, weights_cfg);
        self.pending = 0;
        tracing::info!(weights = ?weights.to_map(), "Weights recomputed from learning store");
        Ok(Some(weights))
    }

    /// Full recompute from defaults; nothing carries over from earlier runs.
    pub fn recompute(&self, snapshot: &LearningSnapshot, weights_cfg: &WeightsConfig) -> Weights {
        let mut weights = Weights::from_config(weights_cfg);

        for (category, name) in [
            (Category::Pattern, WeightName::Pattern),
            (Category::Trend, WeightName::Trend),
            (Category::Direction, WeightName::Direction),
        ] {
            let counts = snapshot.category_total(category);
            let value = self.nudge(weights_cfg.bound(name), counts);
            weights.set(name, value, weights_cfg);
        }

        let event_counts = snapshot.category_total(Category::Event);
        for name in [
            WeightName::EventHigh,
            WeightName::EventMedium,
            WeightName::EventLow,
        ] {
            let value = self.nudge(weights_cfg.bound(name), event_counts);
            weights.set(name, value, weights_cfg);
        }

        weights
    }

    fn nudge(&self, bound: WeightBound, counts: WinLoss) -> f64 {
        if counts.total() < self.cfg.min_samples {
            return bound.clamp(bound.base);
        }
        let Some(win_rate) = counts.win_rate() else {
            return bound.clamp(bound.base);
        };
        let value = if win_rate > self.cfg.upper_band {
            bound.base + (win_rate - 0.5)
        } else if win_rate < self.cfg.lower_band {
            bound.base - (0.5 - win_rate)
        } else {
            bound.base
        };
        bound.clamp(value)
    }
}
