//! Shared thresholds and comparisons for the daily candlestick rules

use crate::{OHLCVExt, OHLCV};

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Indecision: body / range below this ratio
pub const DOJI_MAX_BODY_RATIO: f64 = 0.15;
/// Reversal shapes: the long wick must exceed body * this factor
pub const REVERSAL_SHADOW_FACTOR: f64 = 2.2;
/// Trailing daily window inspected for shapes and bias
pub const PATTERN_WINDOW: usize = 10;
/// Extra bars required beyond the window
pub const PATTERN_MARGIN: usize = 2;
/// Up-closes within the window that mark a bull bias
pub const BULL_BIAS_MIN: usize = 8;
/// Up-closes within the window at or below which a bear bias is marked
pub const BEAR_BIAS_MAX: usize = 3;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// Body is small relative to a non-zero range
#[inline]
pub fn is_indecision(body: f64, range: f64, max_body_ratio: f64) -> bool {
    range > 0.0 && body / range < max_body_ratio
}

/// Wick dominates the body by `factor`
#[inline]
pub fn wick_dominates(wick: f64, body: f64, factor: f64) -> bool {
    wick > body * factor
}

/// Number of bars closing above their open
#[inline]
pub fn count_up_closes<T: OHLCV>(bars: &[T]) -> usize {
    bars.iter().filter(|b| b.is_bullish()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    #[test]
    fn test_indecision_needs_range() {
        assert!(is_indecision(0.1, 1.0, DOJI_MAX_BODY_RATIO));
        assert!(!is_indecision(0.15, 1.0, DOJI_MAX_BODY_RATIO));
        assert!(!is_indecision(0.0, 0.0, DOJI_MAX_BODY_RATIO));
    }

    #[test]
    fn test_wick_dominates_is_strict() {
        assert!(wick_dominates(2.3, 1.0, REVERSAL_SHADOW_FACTOR));
        assert!(!wick_dominates(2.2, 1.0, REVERSAL_SHADOW_FACTOR));
        // zero body: any wick dominates
        assert!(wick_dominates(0.01, 0.0, REVERSAL_SHADOW_FACTOR));
    }

    #[test]
    fn test_count_up_closes() {
        let bars = [
            Bar::new(0, 1.0, 2.0, 0.5, 1.5, 0.0),
            Bar::new(1, 1.5, 2.0, 0.5, 1.0, 0.0),
            Bar::new(2, 1.0, 1.0, 1.0, 1.0, 0.0),
        ];
        assert_eq!(count_up_closes(&bars), 1);
    }
}
