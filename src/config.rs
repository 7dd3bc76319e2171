use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::decision::EntryConfig;
use crate::event_influence::EventsConfig;
use crate::optimizer::OptimizerConfig;
use crate::scoring::engine::ScoringConfig;
use crate::scoring::weights::WeightsConfig;
use crate::trust::TrustConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub weights: WeightsConfig,
    pub optimizer: OptimizerConfig,
    pub trust: TrustConfig,
    pub events: EventsConfig,
    pub entry: EntryConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub price_refresh: String,
    pub entry_scan: String,
    pub simulation: String,
    pub outcome_evaluation: String,
    pub event_poll: String,
    pub trust_refresh: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            price_refresh: "1m".to_string(),
            entry_scan: "30s".to_string(),
            simulation: "3h".to_string(),
            outcome_evaluation: "5m".to_string(),
            event_poll: "1m".to_string(),
            trust_refresh: "1h".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn intervals_ms(&self) -> Result<SchedulerIntervals> {
        Ok(SchedulerIntervals {
            price_refresh_ms: parse_interval_ms(&self.price_refresh)
                .context("scheduler.price_refresh is invalid")?,
            entry_scan_ms: parse_interval_ms(&self.entry_scan)
                .context("scheduler.entry_scan is invalid")?,
            simulation_ms: parse_interval_ms(&self.simulation)
                .context("scheduler.simulation is invalid")?,
            outcome_evaluation_ms: parse_interval_ms(&self.outcome_evaluation)
                .context("scheduler.outcome_evaluation is invalid")?,
            event_poll_ms: parse_interval_ms(&self.event_poll)
                .context("scheduler.event_poll is invalid")?,
            trust_refresh_ms: parse_interval_ms(&self.trust_refresh)
                .context("scheduler.trust_refresh is invalid")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerIntervals {
    pub price_refresh_ms: u64,
    pub entry_scan_ms: u64,
    pub simulation_ms: u64,
    pub outcome_evaluation_ms: u64,
    pub event_poll_ms: u64,
    pub trust_refresh_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub learning_db_path: PathBuf,
    pub entries_db_path: PathBuf,
    pub weights_path: PathBuf,
    pub trusted_patterns_path: PathBuf,
    pub price_feed_path: PathBuf,
    pub event_feed_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            learning_db_path: PathBuf::from("data/learning.sqlite"),
            entries_db_path: PathBuf::from("data/entries.sqlite"),
            weights_path: PathBuf::from("data/weights.json"),
            trusted_patterns_path: PathBuf::from("data/trusted_patterns.json"),
            price_feed_path: PathBuf::from("data/price_history.json"),
            event_feed_path: PathBuf::from("data/event_log.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Scheduler and evaluation-window durations: a positive integer followed by
/// `s`, `m`, `h` or `d`.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    let s = s.trim();
    let Some(unit) = s.chars().last() else {
        bail!("empty interval");
    };
    let unit_ms: u64 = match unit {
        's' => 1_000,
        'm' => 60_000,
        'h' => 3_600_000,
        'd' => 86_400_000,
        _ => bail!("interval '{}' must end in s, m, h or d", s),
    };
    let count: u64 = s[..s.len() - unit.len_utf8()]
        .parse()
        .with_context(|| format!("interval '{}' needs a whole number before the unit", s))?;
    if count == 0 {
        bail!("interval '{}' must be longer than zero", s);
    }
    count
        .checked_mul(unit_ms)
        .with_context(|| format!("interval '{}' overflows", s))
}

fn config_path() -> PathBuf {
    std::env::var("SIGNAL_EDGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from_path(&config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str).with_context(|| format!("invalid {}", path.display()))
    }

    /// Like [`Config::load`] but a missing file yields the built-in defaults.
    pub fn load_or_default() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.intervals_ms()?;
        parse_interval_ms(&self.entry.evaluation_window)
            .context("entry.evaluation_window is invalid")?;
        if !(0.0..=1.0).contains(&self.entry.confidence_threshold) {
            bail!(
                "entry.confidence_threshold must be within [0, 1], got {}",
                self.entry.confidence_threshold
            );
        }
        if self.scoring.min_window < self.scoring.long_back {
            bail!(
                "scoring.min_window ({}) must cover scoring.long_back ({})",
                self.scoring.min_window,
                self.scoring.long_back
            );
        }
        for name in crate::scoring::weights::WeightName::ALL {
            let bound = self.weights.bound(name);
            if bound.floor > bound.cap {
                bail!(
                    "weights.{}: floor {} exceeds cap {}",
                    name.as_str(),
                    bound.floor,
                    bound.cap
                );
            }
        }
        Ok(())
    }
}
