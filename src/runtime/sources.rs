use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::ingest::{coerce_price_entries, CoercionOptions};
use crate::model::macro_event::EventRecord;
use crate::model::sample::PriceSample;

/// Anything that can hand the scheduler the latest price history.
pub trait PriceSource: Send {
    fn fetch_prices(&mut self) -> Result<Vec<PriceSample>>;
}

/// Anything that can hand the scheduler the current list of announced events.
pub trait EventSource: Send {
    fn fetch_events(&mut self) -> Result<Vec<EventRecord>>;
}

/// Reads a JSON array of price entries written by an external collector.
#[derive(Debug, Clone)]
pub struct JsonFilePriceSource {
    path: PathBuf,
    opts: CoercionOptions,
}

impl JsonFilePriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            opts: CoercionOptions::default(),
        }
    }
}

impl PriceSource for JsonFilePriceSource {
    fn fetch_prices(&mut self) -> Result<Vec<PriceSample>> {
        let Some(entries) = read_json_array(&self.path)? else {
            return Ok(Vec::new());
        };
        Ok(coerce_price_entries(&entries, &self.opts))
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileEventSource {
    path: PathBuf,
}

impl JsonFileEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EventSource for JsonFileEventSource {
    fn fetch_events(&mut self) -> Result<Vec<EventRecord>> {
        let Some(entries) = read_json_array(&self.path)? else {
            return Ok(Vec::new());
        };
        let mut events = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<EventRecord>(entry) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(index, error = %e, "Skipping malformed event entry"),
            }
        }
        Ok(events)
    }
}

/// Fixed in-memory feeds, used by the backtest and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub prices: Vec<PriceSample>,
    pub events: Vec<EventRecord>,
}

impl PriceSource for StaticSource {
    fn fetch_prices(&mut self) -> Result<Vec<PriceSample>> {
        Ok(self.prices.clone())
    }
}

impl EventSource for StaticSource {
    fn fetch_events(&mut self) -> Result<Vec<EventRecord>> {
        Ok(self.events.clone())
    }
}

fn read_json_array(path: &Path) -> Result<Option<Vec<Value>>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Feed file not present yet");
        return Ok(None);
    }
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&payload)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    match value {
        Value::Array(entries) => Ok(Some(entries)),
        Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("prices")) {
            Some(Value::Array(entries)) => Ok(Some(entries)),
            _ => anyhow::bail!("{} does not contain a JSON array", path.display()),
        },
        _ => anyhow::bail!("{} does not contain a JSON array", path.display()),
    }
}
