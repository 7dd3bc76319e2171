use crate::model::sample::PriceSample;

/// Percentage change from the price `back` positions from the end
/// (`back = 2` compares against the previous sample) to the last price.
///
/// `None` when the window is too short or the reference price is not positive.
pub fn change_rate(prices: &[f64], back: usize) -> Option<f64> {
    if back < 2 || prices.len() < back {
        return None;
    }
    let reference = prices[prices.len() - back];
    let last = *prices.last()?;
    if reference <= 0.0 || !reference.is_finite() {
        return None;
    }
    Some((last - reference) / reference * 100.0)
}

/// Momentum at the three configured horizons. Missing horizons read as zero
/// so a short window degrades to "no momentum".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MomentumRates {
    pub short: f64,
    pub medium: f64,
    pub long: f64,
}

impl MomentumRates {
    pub fn compute(prices: &[f64], short_back: usize, medium_back: usize, long_back: usize) -> Self {
        Self {
            short: change_rate(prices, short_back).unwrap_or(0.0),
            medium: change_rate(prices, medium_back).unwrap_or(0.0),
            long: change_rate(prices, long_back).unwrap_or(0.0),
        }
    }

    /// The long horizon doubles as the primary change rate.
    pub fn primary(&self) -> f64 {
        self.long
    }
}

/// Absolute price speed in price units per second between the last sample and
/// the one `back` positions from the end. A zero time delta yields `None`.
pub fn price_speed(samples: &[PriceSample], back: usize) -> Option<f64> {
    if back < 2 || samples.len() < back {
        return None;
    }
    let first = &samples[samples.len() - back];
    let last = samples.last()?;
    let dt = last.timestamp_secs_f64() - first.timestamp_secs_f64();
    if dt.abs() < f64::EPSILON {
        return None;
    }
    Some((last.price - first.price).abs() / dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_rate_uses_offset_from_end() {
        let prices = [100.0, 101.0, 102.0, 110.0];
        let r = change_rate(&prices, 2).unwrap();
        assert!((r - (110.0 - 102.0) / 102.0 * 100.0).abs() < 1e-9);
        let r = change_rate(&prices, 4).unwrap();
        assert!((r - 10.0).abs() < 1e-9);
        assert_eq!(change_rate(&prices, 5), None);
    }

    #[test]
    fn zero_reference_is_skipped() {
        assert_eq!(change_rate(&[0.0, 1.0], 2), None);
    }

    #[test]
    fn speed_guards_zero_time_delta() {
        let samples = vec![PriceSample::at_secs(10, 100.0), PriceSample::at_secs(10, 105.0)];
        assert_eq!(price_speed(&samples, 2), None);

        let samples = vec![PriceSample::at_secs(0, 100.0), PriceSample::at_secs(10, 105.0)];
        let speed = price_speed(&samples, 2).unwrap();
        assert!((speed - 0.5).abs() < 1e-9);
    }
}
