use std::collections::VecDeque;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::AppError;
use crate::model::sample::PriceSample;

pub const DEFAULT_HISTORY_LEN: usize = 500;

#[derive(Debug, Clone, Copy)]
pub struct CoercionOptions {
    /// Timestamp given to entries that carry none: `origin + index x spacing`.
    pub origin: DateTime<Utc>,
    pub spacing_secs: i64,
}

impl Default for CoercionOptions {
    fn default() -> Self {
        Self {
            origin: DateTime::<Utc>::default(),
            spacing_secs: 60,
        }
    }
}

/// Turn loosely shaped feed entries into typed samples sorted by timestamp.
///
/// Accepts bare numbers, numeric strings and objects with `price`/`close`,
/// optional `timestamp`/`time` and optional `volume`. Entries that cannot be
/// read are skipped and logged.
pub fn coerce_price_entries(values: &[Value], opts: &CoercionOptions) -> Vec<PriceSample> {
    let mut out = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        match coerce_price_entry(index, value, opts) {
            Ok(sample) => out.push(sample),
            Err(e) => tracing::warn!(error = %e, "Skipping malformed price entry"),
        }
    }
    out.sort_by_key(|s| s.timestamp);
    out
}

pub fn coerce_price_entry(
    index: usize,
    value: &Value,
    opts: &CoercionOptions,
) -> Result<PriceSample, AppError> {
    let malformed = |reason: &str| AppError::MalformedSample {
        index,
        reason: reason.to_string(),
    };
    let synthetic_ts = || {
        opts.origin + chrono::Duration::seconds(opts.spacing_secs.saturating_mul(index as i64))
    };

    let (price, timestamp, volume) = match value {
        Value::Number(_) | Value::String(_) => {
            let price = number_like(value).ok_or_else(|| malformed("price is not numeric"))?;
            (price, synthetic_ts(), None)
        }
        Value::Object(map) => {
            let price = map
                .get("price")
                .or_else(|| map.get("close"))
                .ok_or_else(|| malformed("missing price/close field"))?;
            let price = number_like(price).ok_or_else(|| malformed("price is not numeric"))?;
            let timestamp = match map.get("timestamp").or_else(|| map.get("time")) {
                Some(raw) => timestamp_like(raw).ok_or_else(|| malformed("unreadable timestamp"))?,
                None => synthetic_ts(),
            };
            let volume = map.get("volume").and_then(number_like).filter(|v| *v >= 0.0);
            (price, timestamp, volume)
        }
        _ => return Err(malformed("unsupported entry shape")),
    };

    if !price.is_finite() || price <= 0.0 {
        return Err(malformed("price must be a positive finite number"));
    }
    Ok(PriceSample::new(timestamp, price, volume))
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn timestamp_like(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(n) = number_like(value) {
        let n = n as i64;
        // Anything this large is already milliseconds.
        return if n.abs() >= 1_000_000_000_000 {
            DateTime::<Utc>::from_timestamp_millis(n)
        } else {
            DateTime::<Utc>::from_timestamp(n, 0)
        };
    }
    let s = value.as_str()?.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Bounded, time-ordered price history owned by the scheduler.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    capacity: usize,
    samples: VecDeque<PriceSample>,
}

impl Default for PriceWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::new(),
        }
    }

    /// Append a sample and report whether it extended the window. Samples older
    /// than the last one are dropped; one with the same timestamp replaces it.
    pub fn push(&mut self, sample: PriceSample) -> bool {
        if let Some(last) = self.samples.back_mut() {
            if sample.timestamp < last.timestamp {
                return false;
            }
            if sample.timestamp == last.timestamp {
                *last = sample;
                return false;
            }
        }
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        true
    }

    pub fn extend(&mut self, samples: impl IntoIterator<Item = PriceSample>) -> usize {
        samples.into_iter().filter(|s| self.push(s.clone())).count()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&PriceSample> {
        self.samples.back()
    }

    pub fn recent(&self, n: usize) -> Vec<PriceSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).cloned().collect()
    }

    pub fn samples_after(&self, t: DateTime<Utc>) -> Vec<PriceSample> {
        self.samples
            .iter()
            .filter(|s| s.timestamp > t)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<PriceSample> {
        self.samples.iter().cloned().collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.price).collect()
    }

    /// Volumes in order, `None` where the feed reported none.
    pub fn volumes(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.volume).collect()
    }
}
