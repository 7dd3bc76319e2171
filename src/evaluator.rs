use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::config::parse_interval_ms;
use crate::entry_ledger::EntryLedger;
use crate::learning::{Category, LearningStore};
use crate::model::entry::{EntryRecord, TradeResult};
use crate::model::sample::PriceSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    Settled(TradeResult),
    /// Window elapsed without touching either level; the record is discarded.
    Expired,
    /// Not enough price data yet.
    Pending,
    AlreadyEvaluated,
}

/// Walk the samples after the entry and report which level was touched first.
///
/// Each sample is checked against the stop before the take-profit, so a
/// sample that crosses both counts as a failure. Samples beyond
/// `created_at + window` are ignored.
pub fn evaluate_entry(
    record: &EntryRecord,
    samples: &[PriceSample],
    window: Duration,
    now: DateTime<Utc>,
) -> EvaluationOutcome {
    if !record.is_pending() {
        return EvaluationOutcome::AlreadyEvaluated;
    }
    let bound = record.created_at + window;
    for sample in samples
        .iter()
        .filter(|s| s.timestamp > record.created_at && s.timestamp <= bound)
    {
        if record.hit_stop(sample.price) {
            return EvaluationOutcome::Settled(TradeResult::Fail);
        }
        if record.hit_take(sample.price) {
            return EvaluationOutcome::Settled(TradeResult::Success);
        }
    }
    let covered = samples.iter().any(|s| s.timestamp >= bound);
    if covered || now >= bound {
        EvaluationOutcome::Expired
    } else {
        EvaluationOutcome::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationReport {
    pub outcome: EvaluationOutcome,
    /// Learning-store updates made for this record.
    pub mutations: u64,
}

/// Settles pending entries and feeds their results back into the learning store.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeEvaluator {
    window: Duration,
}

impl Default for OutcomeEvaluator {
    fn default() -> Self {
        Self::new(Duration::hours(3))
    }
}

impl OutcomeEvaluator {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn from_interval(window: &str) -> Result<Self> {
        let ms = parse_interval_ms(window)?;
        Ok(Self::new(Duration::milliseconds(ms as i64)))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Evaluate `record` and, if it settles, mark it and record the result.
    /// Calling this again on a settled record does nothing.
    pub fn evaluate(
        &self,
        record: &mut EntryRecord,
        samples: &[PriceSample],
        now: DateTime<Utc>,
        store: &LearningStore,
    ) -> Result<EvaluationReport> {
        let outcome = evaluate_entry(record, samples, self.window, now);
        let mutations = match outcome {
            EvaluationOutcome::Settled(result) => {
                if !record.settle(Some(result)) {
                    0
                } else {
                    record_result(store, record, result, now)?
                }
            }
            EvaluationOutcome::Expired => {
                record.settle(None);
                tracing::debug!(id = %record.id, "Entry expired without touching a level");
                0
            }
            EvaluationOutcome::Pending | EvaluationOutcome::AlreadyEvaluated => 0,
        };
        Ok(EvaluationReport { outcome, mutations })
    }

    /// Evaluate a record held in `ledger`. The ledger row is settled before
    /// the learning store is touched, and the store is only written when that
    /// settle changed the row, so a record is counted at most once even when
    /// a previous attempt failed halfway.
    pub fn evaluate_in_ledger(
        &self,
        record: &mut EntryRecord,
        samples: &[PriceSample],
        now: DateTime<Utc>,
        ledger: &EntryLedger,
        store: &LearningStore,
    ) -> Result<EvaluationReport> {
        let outcome = evaluate_entry(record, samples, self.window, now);
        let result = match outcome {
            EvaluationOutcome::Settled(result) => Some(result),
            EvaluationOutcome::Expired => None,
            EvaluationOutcome::Pending | EvaluationOutcome::AlreadyEvaluated => {
                return Ok(EvaluationReport {
                    outcome,
                    mutations: 0,
                });
            }
        };

        if !ledger.settle(&record.id, result)? {
            tracing::warn!(id = %record.id, "Entry already settled in the ledger");
            return Ok(EvaluationReport {
                outcome: EvaluationOutcome::AlreadyEvaluated,
                mutations: 0,
            });
        }
        record.settle(result);

        let mutations = match result {
            Some(result) => record_result(store, record, result, now)?,
            None => {
                tracing::debug!(id = %record.id, "Entry expired without touching a level");
                0
            }
        };
        Ok(EvaluationReport { outcome, mutations })
    }
}

/// Every learning key an entry carries: direction, pattern, trend (from the
/// moving averages, else the recorded hint) and active events.
pub fn learning_keys(record: &EntryRecord) -> Vec<(Category, String)> {
    let mut keys = vec![(Category::Direction, record.direction.as_str().to_string())];
    if let Some(pattern) = record.pattern.as_deref() {
        keys.push((Category::Pattern, pattern.to_string()));
    }
    let trend = match record.moving_averages.trend().key() {
        Some(key) => Some(key.to_string()),
        None => record.trend.clone(),
    };
    if let Some(trend) = trend {
        keys.push((Category::Trend, trend));
    }
    keys.extend(
        record
            .event_keys
            .iter()
            .map(|key| (Category::Event, key.clone())),
    );
    keys
}

/// Record one result under every key the entry carried, atomically. Returns
/// the number of counters updated.
pub fn record_result(
    store: &LearningStore,
    record: &EntryRecord,
    result: TradeResult,
    at: DateTime<Utc>,
) -> Result<u64> {
    let mutations = store.record_outcomes(&learning_keys(record), result, at)?;
    tracing::info!(
        id = %record.id,
        direction = %record.direction,
        result = %result,
        mutations,
        "Entry outcome recorded"
    );
    Ok(mutations)
}
