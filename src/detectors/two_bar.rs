//! Two-bar engulfing reversal
//!
//! Stricter than the textbook body-over-body form: the latest close has to
//! clear the previous bar's whole range, not just its open.

#![allow(clippy::default_constructed_unit_structs)]

use super::{PatternDetector, PatternId, PatternMatch};
use crate::{Direction, OHLCVExt, OHLCV};

impl_with_defaults!(EngulfingDetector);

/// Bullish or bearish engulfing of the previous bar
#[derive(Debug, Clone, Copy, Default)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn id(&self) -> PatternId {
        PatternId("ENGULFING")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        // Up bar closing above the prior high after opening below a down bar's close
        let bullish = curr.close() > prev.high()
            && curr.open() < prev.close()
            && curr.is_bullish()
            && prev.is_bearish();

        // Down bar closing below the prior low after opening above an up bar's close
        let bearish = curr.close() < prev.low()
            && curr.open() > prev.close()
            && curr.is_bearish()
            && prev.is_bullish();

        let direction = if bullish {
            Direction::Bullish
        } else if bearish {
            Direction::Bearish
        } else {
            return None;
        };

        Some(PatternMatch {
            pattern_id: PatternDetector::id(self),
            direction,
            start_index: index - 1,
            end_index: index,
        })
    }
}
