use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EVENT_DURATION_SECS: i64 = 3_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventDirection {
    Hot,
    Cool,
    Inline,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactTier {
    High,
    Medium,
    Low,
}

impl ImpactTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactTier::High => "high",
            ImpactTier::Medium => "medium",
            ImpactTier::Low => "low",
        }
    }
}

/// A macro announcement (CPI print, index move, ...) supplied by the event
/// collectors. `duration_estimate_secs` is filled from the learned duration
/// book before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source_key: String,
    pub announced_at: DateTime<Utc>,
    pub direction: EventDirection,
    pub impact_tier: ImpactTier,
    #[serde(default = "default_duration")]
    pub duration_estimate_secs: i64,
}

fn default_duration() -> i64 {
    DEFAULT_EVENT_DURATION_SECS
}

impl EventRecord {
    /// Key used for duration learning and the `event` learning category.
    pub fn learning_key(&self) -> String {
        format!("{}:{}", self.event_type, self.source_key)
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        (now - self.announced_at).num_milliseconds() as f64 / 1_000.0
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let elapsed = self.elapsed_secs(now);
        elapsed >= 0.0 && elapsed < self.duration_estimate_secs as f64
    }
}
