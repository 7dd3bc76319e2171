use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scoring::weights::{Weights, WeightsConfig};

#[derive(Debug, Serialize, Deserialize)]
struct PersistedWeights {
    updated_at_ms: i64,
    weights: BTreeMap<String, f64>,
}

/// Load the weights snapshot. A missing file is `Ok(None)` so callers can fall
/// back to the configured defaults.
pub fn load_weights_from_path(path: &Path, cfg: &WeightsConfig) -> Result<Option<Weights>> {
    if !path.exists() {
        return Ok(None);
    }

    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let persisted: PersistedWeights =
        serde_json::from_str(&payload).context("failed to parse persisted weights json")?;
    Ok(Some(Weights::from_map(&persisted.weights, cfg)))
}

pub fn persist_weights_to_path(path: &Path, weights: &Weights) -> Result<()> {
    let payload = PersistedWeights {
        updated_at_ms: chrono::Utc::now().timestamp_millis(),
        weights: weights.to_map(),
    };
    let json = serde_json::to_string_pretty(&payload)
        .context("failed to serialize persisted weights json")?;
    write_file(path, &json)
}

pub fn load_trusted_patterns_from_path(path: &Path) -> Result<Option<BTreeMap<String, f64>>> {
    if !path.exists() {
        return Ok(None);
    }

    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let trusted: BTreeMap<String, f64> =
        serde_json::from_str(&payload).context("failed to parse trusted patterns json")?;
    Ok(Some(trusted))
}

pub fn persist_trusted_patterns_to_path(
    path: &Path,
    trusted: &BTreeMap<String, f64>,
) -> Result<()> {
    let json = serde_json::to_string_pretty(trusted)
        .context("failed to serialize trusted patterns json")?;
    write_file(path, &json)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
