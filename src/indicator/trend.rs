use super::sma::moving_average;
use crate::model::signal::Trend;

/// Band around the long average inside which the market counts as sideways.
pub const SIDEWAYS_BAND: f64 = 0.01;

/// Two-average trend hint: short average more than 1% above the long one is
/// `Up`, more than 1% below is `Down`, otherwise `Neutral`. `None` until the
/// long window is filled.
pub fn detect_trend_band(prices: &[f64], short_window: usize, long_window: usize) -> Option<Trend> {
    if prices.len() < long_window {
        return None;
    }
    let short_ma = moving_average(prices, short_window)?;
    let long_ma = moving_average(prices, long_window)?;

    if short_ma > long_ma * (1.0 + SIDEWAYS_BAND) {
        Some(Trend::Up)
    } else if short_ma < long_ma * (1.0 - SIDEWAYS_BAND) {
        Some(Trend::Down)
    } else {
        Some(Trend::Neutral)
    }
}
