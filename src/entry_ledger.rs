use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::indicator::sma::MovingAverages;
use crate::model::entry::{EntryRecord, TradeResult};
use crate::model::signal::Direction;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    created_at_ms INTEGER NOT NULL,
    direction TEXT NOT NULL,
    entry_price REAL NOT NULL,
    stop_loss REAL NOT NULL,
    take_profit REAL NOT NULL,
    pattern TEXT,
    trend TEXT,
    ma5 REAL,
    ma20 REAL,
    ma60 REAL,
    event_keys TEXT NOT NULL,
    confidence REAL NOT NULL,
    evaluated INTEGER NOT NULL,
    result TEXT,
    updated_at_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS entries_pending ON entries(evaluated, created_at_ms);
"#;

const SELECT_COLUMNS: &str = r#"
    SELECT id, created_at_ms, direction, entry_price, stop_loss, take_profit,
           pattern, trend, ma5, ma20, ma60, event_keys, confidence, evaluated, result
    FROM entries
"#;

/// Proposed entries and their terminal results.
pub struct EntryLedger {
    conn: Connection,
}

impl std::fmt::Debug for EntryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryLedger").finish_non_exhaustive()
    }
}

impl EntryLedger {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert a new record. An existing pending record with the same id is
    /// updated; an evaluated one is left untouched.
    pub fn upsert(&self, record: &EntryRecord) -> Result<()> {
        let event_keys = serde_json::to_string(&record.event_keys)?;
        self.conn.execute(
            r#"
            INSERT INTO entries (
                id, created_at_ms, direction, entry_price, stop_loss, take_profit,
                pattern, trend, ma5, ma20, ma60, event_keys, confidence,
                evaluated, result, updated_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(id) DO UPDATE SET
                entry_price = excluded.entry_price,
                stop_loss = excluded.stop_loss,
                take_profit = excluded.take_profit,
                pattern = excluded.pattern,
                trend = excluded.trend,
                ma5 = excluded.ma5,
                ma20 = excluded.ma20,
                ma60 = excluded.ma60,
                event_keys = excluded.event_keys,
                confidence = excluded.confidence,
                evaluated = excluded.evaluated,
                result = excluded.result,
                updated_at_ms = excluded.updated_at_ms
            WHERE entries.evaluated = 0
            "#,
            params![
                record.id,
                record.created_at.timestamp_millis(),
                record.direction.as_str(),
                record.entry_price,
                record.stop_loss,
                record.take_profit,
                record.pattern,
                record.trend,
                record.moving_averages.ma5,
                record.moving_averages.ma20,
                record.moving_averages.ma60,
                event_keys,
                record.confidence,
                record.evaluated as i64,
                record.result.map(|r| r.as_str()),
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Mark a pending record terminal. Returns `false` when the record is
    /// unknown or already evaluated.
    pub fn settle(&self, id: &str, result: Option<TradeResult>) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE entries
            SET evaluated = 1, result = ?2, updated_at_ms = ?3
            WHERE id = ?1 AND evaluated = 0
            "#,
            params![id, result.map(|r| r.as_str()), Utc::now().timestamp_millis()],
        )?;
        Ok(changed == 1)
    }

    pub fn get(&self, id: &str) -> Result<Option<EntryRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id], read_row)
            .optional()?;
        row.map(|r| r.into_record()).transpose()
    }

    /// Pending records, oldest first.
    pub fn pending(&self) -> Result<Vec<EntryRecord>> {
        self.query(&format!(
            "{SELECT_COLUMNS} WHERE evaluated = 0 ORDER BY created_at_ms ASC, id ASC"
        ))
    }

    pub fn load_all(&self) -> Result<Vec<EntryRecord>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY created_at_ms ASC, id ASC"))
    }

    fn query(&self, sql: &str) -> Result<Vec<EntryRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], read_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }
}

struct RawEntry {
    id: String,
    created_at_ms: i64,
    direction: String,
    entry_price: f64,
    stop_loss: f64,
    take_profit: f64,
    pattern: Option<String>,
    trend: Option<String>,
    moving_averages: MovingAverages,
    event_keys: String,
    confidence: f64,
    evaluated: bool,
    result: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        id: row.get(0)?,
        created_at_ms: row.get(1)?,
        direction: row.get(2)?,
        entry_price: row.get(3)?,
        stop_loss: row.get(4)?,
        take_profit: row.get(5)?,
        pattern: row.get(6)?,
        trend: row.get(7)?,
        moving_averages: MovingAverages {
            ma5: row.get(8)?,
            ma20: row.get(9)?,
            ma60: row.get(10)?,
        },
        event_keys: row.get(11)?,
        confidence: row.get(12)?,
        evaluated: row.get::<_, i64>(13)? != 0,
        result: row.get(14)?,
    })
}

impl RawEntry {
    fn into_record(self) -> Result<EntryRecord> {
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_at_ms)
            .ok_or_else(|| anyhow!("entry {} has an invalid timestamp", self.id))?;
        let direction = Direction::parse(&self.direction)
            .ok_or_else(|| anyhow!("entry {} has unknown direction {}", self.id, self.direction))?;
        let result = match self.result.as_deref() {
            Some(raw) => Some(
                TradeResult::parse(raw)
                    .ok_or_else(|| anyhow!("entry {} has unknown result {}", self.id, raw))?,
            ),
            None => None,
        };
        Ok(EntryRecord {
            id: self.id,
            created_at,
            direction,
            entry_price: self.entry_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            pattern: self.pattern,
            trend: self.trend,
            moving_averages: self.moving_averages,
            event_keys: serde_json::from_str(&self.event_keys)?,
            confidence: self.confidence,
            evaluated: self.evaluated,
            result,
        })
    }
}
