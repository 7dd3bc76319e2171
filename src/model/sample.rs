use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation from the price poller. Volume is optional because some
/// feeds only report the last trade price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl PriceSample {
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume: Option<f64>) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }

    /// Create a sample at `secs` seconds after the unix epoch.
    pub fn at_secs(secs: i64, price: f64) -> Self {
        Self {
            timestamp: DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default(),
            price,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn timestamp_secs_f64(&self) -> f64 {
        self.timestamp.timestamp_millis() as f64 / 1_000.0
    }
}
