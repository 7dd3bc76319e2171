use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use serde::Deserialize;

use crate::learning::LearningStore;
use crate::model::signal::ChartPattern;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    pub min_attempts: usize,
    pub min_success_rate: f64,
    /// Results kept per pattern when computing the rolling rate.
    pub rolling_window: usize,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            min_attempts: 20,
            min_success_rate: 0.7,
            rolling_window: 50,
        }
    }
}

/// Patterns whose rolling history has at least `min_attempts` results and a
/// success rate of at least `min_success_rate`, mapped to that rate rounded to
/// three decimals.
pub fn trusted_patterns(
    history: &HashMap<String, Vec<bool>>,
    cfg: &TrustConfig,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (pattern, results) in history {
        let window = cfg.rolling_window.max(1);
        let recent = &results[results.len().saturating_sub(window)..];
        if recent.is_empty() || recent.len() < cfg.min_attempts {
            continue;
        }
        let wins = recent.iter().filter(|r| **r).count();
        let rate = wins as f64 / recent.len() as f64;
        if rate >= cfg.min_success_rate {
            out.insert(pattern.clone(), (rate * 1_000.0).round() / 1_000.0);
        }
    }
    out
}

/// Gate between the pattern detector and the scoring engine.
#[derive(Debug, Clone, Default)]
pub struct PatternTrustFilter {
    cfg: TrustConfig,
    trusted: BTreeMap<String, f64>,
}

impl PatternTrustFilter {
    pub fn new(cfg: TrustConfig) -> Self {
        Self {
            cfg,
            trusted: BTreeMap::new(),
        }
    }

    pub fn with_trusted(cfg: TrustConfig, trusted: BTreeMap<String, f64>) -> Self {
        Self { cfg, trusted }
    }

    pub fn refresh(&mut self, history: &HashMap<String, Vec<bool>>) {
        self.trusted = trusted_patterns(history, &self.cfg);
    }

    pub fn refresh_from_store(&mut self, store: &LearningStore) -> Result<()> {
        let history = store.pattern_history()?;
        self.refresh(&history);
        tracing::info!(count = self.trusted.len(), trusted = ?self.trusted, "Trusted patterns refreshed");
        Ok(())
    }

    pub fn trusted(&self) -> &BTreeMap<String, f64> {
        &self.trusted
    }

    pub fn is_trusted(&self, pattern: &str) -> bool {
        self.trusted.contains_key(pattern)
    }

    /// Pass a detected pattern through only if it is trusted.
    pub fn admit(&self, pattern: Option<ChartPattern>) -> Option<ChartPattern> {
        pattern.filter(|p| self.is_trusted(p.as_str()))
    }

    pub fn filter_labels<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        labels.into_iter().filter(|l| self.is_trusted(l)).collect()
    }
}
