use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::learning::stats::{Category, DurationBook, DurationStat, LearningSnapshot, WinLoss};
use crate::model::entry::TradeResult;

pub const DEFAULT_ROLLING_WINDOW: usize = 50;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS learning_outcomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    key TEXT NOT NULL,
    result TEXT NOT NULL,
    recorded_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS event_durations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_key TEXT NOT NULL,
    duration_secs REAL NOT NULL,
    recorded_at_ms INTEGER NOT NULL
);
"#;

struct Inner {
    conn: Connection,
    snapshot: LearningSnapshot,
    durations: HashMap<String, DurationStat>,
    pattern_history: HashMap<String, VecDeque<bool>>,
    mutations: u64,
}

/// Sole owner of the learned counters.
///
/// Every outcome is appended to `learning_outcomes` and folded into the
/// in-memory aggregate under one lock, so concurrent writers can not lose
/// updates. Counters are rebuilt from the log on open.
pub struct LearningStore {
    inner: Mutex<Inner>,
    rolling_window: usize,
}

impl std::fmt::Debug for LearningStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningStore")
            .field("rolling_window", &self.rolling_window)
            .finish_non_exhaustive()
    }
}

impl LearningStore {
    pub fn open(path: &Path, rolling_window: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, rolling_window)
    }

    pub fn open_in_memory(rolling_window: usize) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, rolling_window)
    }

    fn from_connection(conn: Connection, rolling_window: usize) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        let rolling_window = rolling_window.max(1);
        let mut inner = Inner {
            conn,
            snapshot: LearningSnapshot::default(),
            durations: HashMap::new(),
            pattern_history: HashMap::new(),
            mutations: 0,
        };
        replay(&mut inner, rolling_window)?;
        Ok(Self {
            inner: Mutex::new(inner),
            rolling_window,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::LockPoisoned("learning store"))
    }

    /// Append one outcome and bump the matching counter.
    pub fn record_outcome(
        &self,
        category: Category,
        key: &str,
        result: TradeResult,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut guard = self.lock()?;
        guard.conn.execute(
            r#"
            INSERT INTO learning_outcomes (category, key, result, recorded_at_ms)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![category.as_str(), key, result.as_str(), at.timestamp_millis()],
        )?;
        apply(&mut guard, category, key, result, self.rolling_window);
        guard.mutations = guard.mutations.saturating_add(1);
        Ok(())
    }

    /// Append one result under several keys in a single transaction. Either
    /// every key is counted or none is. Returns the number of keys written.
    pub fn record_outcomes(
        &self,
        keys: &[(Category, String)],
        result: TradeResult,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut guard = self.lock()?;
        {
            let tx = guard.conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO learning_outcomes (category, key, result, recorded_at_ms)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                )?;
                for (category, key) in keys {
                    stmt.execute(params![
                        category.as_str(),
                        key,
                        result.as_str(),
                        at.timestamp_millis()
                    ])?;
                }
            }
            tx.commit()?;
        }
        for (category, key) in keys {
            apply(&mut guard, *category, key, result, self.rolling_window);
        }
        let written = keys.len() as u64;
        guard.mutations = guard.mutations.saturating_add(written);
        Ok(written)
    }

    pub fn snapshot(&self) -> Result<LearningSnapshot> {
        Ok(self.lock()?.snapshot.clone())
    }

    pub fn get(&self, category: Category, key: &str) -> Result<Option<WinLoss>> {
        Ok(self.lock()?.snapshot.get(category, key))
    }

    /// Total number of mutations applied since the store was opened.
    pub fn mutation_count(&self) -> Result<u64> {
        Ok(self.lock()?.mutations)
    }

    pub fn record_event_duration(
        &self,
        event_key: &str,
        duration_secs: f64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Ok(());
        }
        let mut guard = self.lock()?;
        guard.conn.execute(
            r#"
            INSERT INTO event_durations (event_key, duration_secs, recorded_at_ms)
            VALUES (?1, ?2, ?3)
            "#,
            params![event_key, duration_secs, at.timestamp_millis()],
        )?;
        let stat = guard.durations.entry(event_key.to_string()).or_default();
        stat.total_secs += duration_secs;
        stat.count += 1;
        Ok(())
    }

    pub fn average_event_duration(&self, event_key: &str, default_secs: i64) -> Result<f64> {
        let guard = self.lock()?;
        Ok(guard
            .durations
            .get(event_key)
            .and_then(DurationStat::average)
            .unwrap_or(default_secs as f64))
    }

    pub fn duration_book(&self, default_secs: i64) -> Result<DurationBook> {
        Ok(DurationBook::new(self.lock()?.durations.clone(), default_secs))
    }

    /// Most recent pattern results (oldest first), at most `rolling_window` each.
    pub fn pattern_history(&self) -> Result<HashMap<String, Vec<bool>>> {
        let guard = self.lock()?;
        Ok(guard
            .pattern_history
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().copied().collect()))
            .collect())
    }
}

fn apply(inner: &mut Inner, category: Category, key: &str, result: TradeResult, window: usize) {
    inner.snapshot.record(category, key, result);
    if category == Category::Pattern {
        let history = inner.pattern_history.entry(key.to_string()).or_default();
        history.push_back(result.is_success());
        while history.len() > window {
            history.pop_front();
        }
    }
}

fn replay(inner: &mut Inner, window: usize) -> Result<()> {
    let outcomes = {
        let mut stmt = inner.conn.prepare(
            r#"
            SELECT category, key, result
            FROM learning_outcomes
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        out
    };

    for (category, key, result) in outcomes {
        match (Category::parse(&category), TradeResult::parse(&result)) {
            (Some(category), Some(result)) => apply(inner, category, &key, result, window),
            _ => tracing::warn!(%category, %key, %result, "Skipping unreadable learning outcome row"),
        }
    }

    let durations = {
        let mut stmt = inner.conn.prepare(
            r#"
            SELECT event_key, SUM(duration_secs), COUNT(*)
            FROM event_durations
            GROUP BY event_key
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        out
    };
    for (key, total_secs, count) in durations {
        inner.durations.insert(
            key,
            DurationStat {
                total_secs,
                count: count.max(0) as u64,
            },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_history_is_bounded() {
        let store = LearningStore::open_in_memory(3).unwrap();
        let now = Utc::now();
        for result in [
            TradeResult::Fail,
            TradeResult::Success,
            TradeResult::Success,
            TradeResult::Fail,
        ] {
            store
                .record_outcome(Category::Pattern, "W-Pattern", result, now)
                .unwrap();
        }
        let history = store.pattern_history().unwrap();
        assert_eq!(history["W-Pattern"], vec![true, true, false]);
        // Counters are lifetime totals, not windowed.
        assert_eq!(
            store.get(Category::Pattern, "W-Pattern").unwrap(),
            Some(WinLoss::new(2, 2))
        );
        assert_eq!(store.mutation_count().unwrap(), 4);
    }

    #[test]
    fn negative_durations_are_ignored() {
        let store = LearningStore::open_in_memory(DEFAULT_ROLLING_WINDOW).unwrap();
        store
            .record_event_duration("cpi:us", -5.0, Utc::now())
            .unwrap();
        assert_eq!(store.average_event_duration("cpi:us", 3_600).unwrap(), 3_600.0);
    }
}
