use serde::{Deserialize, Serialize};

use crate::model::signal::Trend;

pub const SHORT_PERIOD: usize = 5;
pub const MEDIUM_PERIOD: usize = 20;
pub const LONG_PERIOD: usize = 60;

/// Simple moving average of the last `period` values.
///
/// Returns `None` when fewer than `period` values are available so callers can
/// tell "not enough data" apart from a genuine zero average.
pub fn moving_average(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let tail = &values[values.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

/// The 5/20/60 averages the scoring engine reports alongside its confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
}

impl MovingAverages {
    pub fn compute(prices: &[f64]) -> Self {
        Self {
            ma5: moving_average(prices, SHORT_PERIOD),
            ma20: moving_average(prices, MEDIUM_PERIOD),
            ma60: moving_average(prices, LONG_PERIOD),
        }
    }

    /// Strictly ascending short > medium > long is `Up`, strictly descending is
    /// `Down`; anything else, including a missing average, is `Neutral`.
    pub fn trend(&self) -> Trend {
        match (self.ma5, self.ma20, self.ma60) {
            (Some(s), Some(m), Some(l)) if s > m && m > l => Trend::Up,
            (Some(s), Some(m), Some(l)) if s < m && m < l => Trend::Down,
            _ => Trend::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_average() {
        assert_eq!(moving_average(&[1.0, 2.0], 3), None);
        let v = moving_average(&[1.0, 2.0, 3.0], 3).unwrap();
        assert!((v - 2.0).abs() < f64::EPSILON);
        let v = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert!((v - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_average_is_not_insufficient() {
        assert_eq!(moving_average(&[0.0, 0.0], 2), Some(0.0));
        assert_eq!(moving_average(&[], 1), None);
        assert_eq!(moving_average(&[1.0], 0), None);
    }

    #[test]
    fn trend_requires_strict_ordering() {
        let up = MovingAverages {
            ma5: Some(3.0),
            ma20: Some(2.0),
            ma60: Some(1.0),
        };
        assert_eq!(up.trend(), Trend::Up);

        let tie = MovingAverages {
            ma5: Some(2.0),
            ma20: Some(2.0),
            ma60: Some(1.0),
        };
        assert_eq!(tie.trend(), Trend::Neutral);

        let partial = MovingAverages {
            ma5: Some(1.0),
            ma20: Some(2.0),
            ma60: None,
        };
        assert_eq!(partial.trend(), Trend::Neutral);
    }
}
