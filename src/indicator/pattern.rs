use crate::model::signal::ChartPattern;

pub const PATTERN_WINDOW: usize = 5;

/// Match a W (down-up-down-up) or M (up-down-up-down) zig-zag over the last
/// five prices. Equal neighbours break the shape.
pub fn detect_chart_pattern(prices: &[f64]) -> Option<ChartPattern> {
    if prices.len() < PATTERN_WINDOW {
        return None;
    }
    let p = &prices[prices.len() - PATTERN_WINDOW..];
    if p[0] > p[1] && p[1] < p[2] && p[2] > p[3] && p[3] < p[4] {
        return Some(ChartPattern::WPattern);
    }
    if p[0] < p[1] && p[1] > p[2] && p[2] < p[3] && p[3] > p[4] {
        return Some(ChartPattern::MPattern);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w_and_m_shapes() {
        assert_eq!(
            detect_chart_pattern(&[50.0, 10.0, 8.0, 9.0, 7.0, 9.5]),
            Some(ChartPattern::WPattern)
        );
        assert_eq!(
            detect_chart_pattern(&[1.0, 2.0, 1.5, 2.5, 2.0]),
            Some(ChartPattern::MPattern)
        );
    }

    #[test]
    fn flat_or_short_series_has_no_pattern() {
        assert_eq!(detect_chart_pattern(&[1.0; 5]), None);
        assert_eq!(detect_chart_pattern(&[1.0, 0.5, 1.0]), None);
    }
}
