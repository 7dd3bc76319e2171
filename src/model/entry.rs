use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indicator::sma::MovingAverages;
use crate::model::signal::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Success,
    Fail,
}

impl TradeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Success => "success",
            TradeResult::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(TradeResult::Success),
            "fail" => Some(TradeResult::Fail),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TradeResult::Success)
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller hands to the notifier/executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryDecision {
    pub direction: Direction,
    pub confidence: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// A proposed entry awaiting its outcome.
///
/// `result` is write-once: [`EntryRecord::settle`] refuses to touch a record
/// that is already evaluated. An evaluated record without a result was
/// discarded because neither level was touched inside the evaluation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub pattern: Option<String>,
    pub trend: Option<String>,
    #[serde(default)]
    pub moving_averages: MovingAverages,
    #[serde(default)]
    pub event_keys: Vec<String>,
    pub confidence: f64,
    pub evaluated: bool,
    pub result: Option<TradeResult>,
}

impl EntryRecord {
    pub fn new(created_at: DateTime<Utc>, decision: &EntryDecision) -> Self {
        Self {
            id: format!("ent-{}", &uuid::Uuid::new_v4().to_string()[..8]),
            created_at,
            direction: decision.direction,
            entry_price: decision.entry_price,
            stop_loss: decision.stop_loss,
            take_profit: decision.take_profit,
            pattern: None,
            trend: None,
            moving_averages: MovingAverages::default(),
            event_keys: Vec::new(),
            confidence: decision.confidence.clamp(0.0, 1.0),
            evaluated: false,
            result: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.evaluated
    }

    /// Mark the record terminal. Returns `false` (and changes nothing) when the
    /// record was already evaluated.
    pub fn settle(&mut self, result: Option<TradeResult>) -> bool {
        if self.evaluated {
            return false;
        }
        self.evaluated = true;
        self.result = result;
        true
    }

    pub fn hit_stop(&self, price: f64) -> bool {
        match self.direction {
            Direction::Long => price <= self.stop_loss,
            Direction::Short => price >= self.stop_loss,
        }
    }

    pub fn hit_take(&self, price: f64) -> bool {
        match self.direction {
            Direction::Long => price >= self.take_profit,
            Direction::Short => price <= self.take_profit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(direction: Direction) -> EntryRecord {
        let decision = EntryDecision {
            direction,
            confidence: 0.8,
            entry_price: 100.0,
            stop_loss: if direction == Direction::Long { 98.0 } else { 102.0 },
            take_profit: if direction == Direction::Long { 102.0 } else { 98.0 },
        };
        EntryRecord::new(Utc::now(), &decision)
    }

    #[test]
    fn settle_is_write_once() {
        let mut rec = record(Direction::Long);
        assert!(rec.settle(Some(TradeResult::Success)));
        assert!(!rec.settle(Some(TradeResult::Fail)));
        assert_eq!(rec.result, Some(TradeResult::Success));
        assert!(rec.evaluated);
    }

    #[test]
    fn short_levels_are_mirrored() {
        let rec = record(Direction::Short);
        assert!(rec.hit_stop(102.5));
        assert!(!rec.hit_stop(101.0));
        assert!(rec.hit_take(97.9));
        assert!(!rec.hit_take(99.0));
    }
}
