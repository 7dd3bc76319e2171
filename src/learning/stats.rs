use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::model::entry::TradeResult;
use crate::model::macro_event::DEFAULT_EVENT_DURATION_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Pattern,
    Trend,
    Direction,
    Event,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Pattern,
        Category::Trend,
        Category::Direction,
        Category::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pattern => "pattern",
            Category::Trend => "trend",
            Category::Direction => "direction",
            Category::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pattern" | "patterns" => Some(Category::Pattern),
            "trend" => Some(Category::Trend),
            "direction" => Some(Category::Direction),
            "event" => Some(Category::Event),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success/fail counters. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinLoss {
    pub success: u64,
    pub fail: u64,
}

impl WinLoss {
    pub fn new(success: u64, fail: u64) -> Self {
        Self { success, fail }
    }

    pub fn total(&self) -> u64 {
        self.success.saturating_add(self.fail)
    }

    pub fn win_rate(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.success as f64 / total as f64)
    }

    pub fn record(&mut self, result: TradeResult) {
        match result {
            TradeResult::Success => self.success = self.success.saturating_add(1),
            TradeResult::Fail => self.fail = self.fail.saturating_add(1),
        }
    }

    pub fn merge(&mut self, other: WinLoss) {
        self.success = self.success.saturating_add(other.success);
        self.fail = self.fail.saturating_add(other.fail);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningStat {
    pub category: Category,
    pub key: String,
    pub success: u64,
    pub fail: u64,
}

/// Read-only copy of the learned counters handed to the scoring engine and
/// the optimizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningSnapshot {
    stats: HashMap<Category, BTreeMap<String, WinLoss>>,
}

impl LearningSnapshot {
    pub fn get(&self, category: Category, key: &str) -> Option<WinLoss> {
        self.stats.get(&category)?.get(key).copied()
    }

    pub fn record(&mut self, category: Category, key: &str, result: TradeResult) {
        self.stats
            .entry(category)
            .or_default()
            .entry(key.to_string())
            .or_default()
            .record(result);
    }

    /// Insert counters directly; used when seeding from another source.
    pub fn insert(&mut self, category: Category, key: &str, counts: WinLoss) {
        self.stats
            .entry(category)
            .or_default()
            .insert(key.to_string(), counts);
    }

    pub fn category(&self, category: Category) -> impl Iterator<Item = (&str, WinLoss)> {
        self.stats
            .get(&category)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Counters summed over every key of `category`.
    pub fn category_total(&self, category: Category) -> WinLoss {
        let mut total = WinLoss::default();
        for (_, counts) in self.category(category) {
            total.merge(counts);
        }
        total
    }

    pub fn to_stats(&self) -> Vec<LearningStat> {
        let mut out = Vec::new();
        for category in Category::ALL {
            for (key, counts) in self.category(category) {
                out.push(LearningStat {
                    category,
                    key: key.to_string(),
                    success: counts.success,
                    fail: counts.fail,
                });
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DurationStat {
    pub total_secs: f64,
    pub count: u64,
}

impl DurationStat {
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_secs / self.count as f64)
    }
}

/// Learned average impact duration per event key.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationBook {
    durations: HashMap<String, DurationStat>,
    default_secs: i64,
}

impl Default for DurationBook {
    fn default() -> Self {
        Self::new(HashMap::new(), DEFAULT_EVENT_DURATION_SECS)
    }
}

impl DurationBook {
    pub fn new(durations: HashMap<String, DurationStat>, default_secs: i64) -> Self {
        Self {
            durations,
            default_secs,
        }
    }

    pub fn estimate_secs(&self, key: &str) -> i64 {
        self.durations
            .get(key)
            .and_then(DurationStat::average)
            .map(|avg| avg.round() as i64)
            .unwrap_or(self.default_secs)
    }
}
