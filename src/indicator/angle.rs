use crate::model::signal::{AngleClass, Direction};

pub const DEFAULT_ANGLE_WINDOW: usize = 20;
pub const DEFAULT_INFLECTION_ORDER: usize = 5;
/// How many positions from the last sample still count as "near" an inflection.
pub const INFLECTION_PROXIMITY: usize = 2;

/// Slope of the straight line joining the first and last point of the recent
/// window, x measured in sample positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendAngle {
    /// Absolute angle in degrees, `[0, 90]`.
    pub degrees: f64,
    pub class: AngleClass,
    /// Sign of the price delta: +1 rising, -1 falling, 0 unchanged.
    pub slope_sign: f64,
}

impl TrendAngle {
    pub fn agrees_with(&self, direction: Direction) -> bool {
        self.slope_sign != 0.0 && self.slope_sign == direction.sign()
    }
}

pub fn segment_angle(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let dx = p2.0 - p1.0;
    let dy = p2.1 - p1.1;
    if dx == 0.0 {
        return 90.0;
    }
    dy.atan2(dx).to_degrees().abs()
}

pub fn trend_angle(prices: &[f64], window: usize) -> Option<TrendAngle> {
    if window < 2 || prices.len() < window {
        return None;
    }
    let recent = &prices[prices.len() - window..];
    let first = recent[0];
    let last = recent[recent.len() - 1];
    let degrees = segment_angle((0.0, first), ((recent.len() - 1) as f64, last));
    let dy = last - first;
    let slope_sign = if dy > 0.0 {
        1.0
    } else if dy < 0.0 {
        -1.0
    } else {
        0.0
    };
    Some(TrendAngle {
        degrees,
        class: AngleClass::from_degrees(degrees),
        slope_sign,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InflectionKind {
    Peak,
    Trough,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InflectionPoint {
    pub index: usize,
    pub price: f64,
    pub kind: InflectionKind,
}

impl InflectionPoint {
    /// The move a reversal at this point would start: up after a trough,
    /// down after a peak.
    pub fn implied_direction(&self) -> Direction {
        match self.kind {
            InflectionKind::Trough => Direction::Long,
            InflectionKind::Peak => Direction::Short,
        }
    }
}

/// Strict local extrema over `order` neighbours on each side. Neighbour
/// indices are clipped to the series bounds, so the first and last sample can
/// never qualify.
pub fn inflection_points(prices: &[f64], order: usize) -> Vec<InflectionPoint> {
    let n = prices.len();
    if n < 3 || order == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for i in 0..n {
        let p = prices[i];
        let mut is_peak = true;
        let mut is_trough = true;
        for k in 1..=order {
            let left = prices[i.saturating_sub(k)];
            let right = prices[(i + k).min(n - 1)];
            if !(p > left && p > right) {
                is_peak = false;
            }
            if !(p < left && p < right) {
                is_trough = false;
            }
            if !is_peak && !is_trough {
                break;
            }
        }
        if is_peak {
            out.push(InflectionPoint {
                index: i,
                price: p,
                kind: InflectionKind::Peak,
            });
        } else if is_trough {
            out.push(InflectionPoint {
                index: i,
                price: p,
                kind: InflectionKind::Trough,
            });
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct AngleAnalysis {
    pub angle: Option<TrendAngle>,
    pub inflections: Vec<InflectionPoint>,
}

impl AngleAnalysis {
    /// The most recent inflection if the last sample sits within
    /// [`INFLECTION_PROXIMITY`] positions of it.
    pub fn near_inflection(&self, series_len: usize) -> Option<&InflectionPoint> {
        let last = self.inflections.last()?;
        let last_index = series_len.checked_sub(1)?;
        (last_index.abs_diff(last.index) <= INFLECTION_PROXIMITY).then_some(last)
    }
}

/// Angle over the recent window, inflections over the full history.
pub fn analyze_trend_angle(prices: &[f64], angle_window: usize, order: usize) -> AngleAnalysis {
    AngleAnalysis {
        angle: trend_angle(prices, angle_window),
        inflections: inflection_points(prices, order),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_is_absolute_and_classified() {
        let rising: Vec<f64> = (0..20).map(|i| i as f64 * 2.0).collect();
        let a = trend_angle(&rising, 20).unwrap();
        assert!((a.degrees - 2.0_f64.atan().to_degrees()).abs() < 1e-9);
        assert_eq!(a.class, AngleClass::Sharp);
        assert!(a.agrees_with(Direction::Long));

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        let b = trend_angle(&falling, 20).unwrap();
        assert!((a.degrees - b.degrees).abs() < 1e-9);
        assert!(b.agrees_with(Direction::Short));
        assert!(!b.agrees_with(Direction::Long));
    }

    #[test]
    fn vertical_segment_is_ninety_degrees() {
        assert_eq!(segment_angle((1.0, 0.0), (1.0, 5.0)), 90.0);
    }

    #[test]
    fn short_window_has_no_angle() {
        assert!(trend_angle(&[1.0, 2.0, 3.0], 20).is_none());
    }

    #[test]
    fn detects_peak_and_trough() {
        let prices = [1.0, 2.0, 3.0, 2.0, 1.0, 0.5, 1.0, 2.0];
        let points = inflection_points(&prices, 2);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].index, 2);
        assert_eq!(points[0].kind, InflectionKind::Peak);
        assert_eq!(points[1].index, 5);
        assert_eq!(points[1].kind, InflectionKind::Trough);
        assert_eq!(points[1].implied_direction(), Direction::Long);
    }

    #[test]
    fn proximity_uses_last_inflection() {
        let prices = [1.0, 2.0, 3.0, 2.0, 1.0, 0.5, 1.0, 2.0];
        let analysis = analyze_trend_angle(&prices, 20, 2);
        assert!(analysis.angle.is_none());
        let near = analysis.near_inflection(prices.len()).unwrap();
        assert_eq!(near.index, 5);
        assert!(analysis.near_inflection(prices.len() + 5).is_none());
    }
}
