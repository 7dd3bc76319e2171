pub const MIN_VOLUME_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeFactorConfig {
    /// A sample spikes when it exceeds `threshold x trailing average`.
    pub threshold: f64,
    /// Number of most recent samples inspected for spikes.
    pub recent: usize,
    /// Added to the factor for each spiking sample.
    pub step: f64,
}

impl Default for VolumeFactorConfig {
    fn default() -> Self {
        Self {
            threshold: 1.5,
            recent: 5,
            step: 0.1,
        }
    }
}

/// Indices (into `volumes`) of the recent samples whose volume exceeds the
/// trailing average. The average covers everything before the recent block.
pub fn volume_spike_indices(volumes: &[f64], cfg: &VolumeFactorConfig) -> Vec<usize> {
    let recent = cfg.recent.max(1);
    if volumes.len() < MIN_VOLUME_SAMPLES || volumes.len() <= recent {
        return Vec::new();
    }
    let split = volumes.len() - recent;
    let trailing = &volumes[..split];
    let avg = trailing.iter().sum::<f64>() / trailing.len() as f64;
    if avg <= 0.0 || !avg.is_finite() {
        return Vec::new();
    }
    (split..volumes.len())
        .filter(|&i| volumes[i] > avg * cfg.threshold)
        .collect()
}

/// Multiplicative volume factor, 1.0 when there is nothing unusual (or not
/// enough data to tell).
pub fn volume_factor(volumes: &[f64], cfg: &VolumeFactorConfig) -> f64 {
    1.0 + volume_spike_indices(volumes, cfg).len() as f64 * cfg.step
}
