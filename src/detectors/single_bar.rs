//! Single-bar reversal shapes: doji, hammer, shooting star
//!
//! The recognizer evaluates these in order and keeps only the first match, so
//! a doji with a long lower wick is reported as a doji, never as a hammer.

use std::collections::HashMap;

use super::helpers::{self, is_indecision, wick_dominates};
use super::{PatternDetector, PatternId, PatternMatch};
use crate::{
    params::{check_params, get_multiplier, get_ratio, ParamMeta, ParameterizedDetector},
    Direction, Multiplier, OHLCVExt, Ratio, Result, OHLCV,
};

impl_with_defaults!(DojiDetector, HammerDetector, ShootingStarDetector);

// ============================================================
// DOJI
// ============================================================

/// Indecision bar: tiny body inside a real range
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub max_body_ratio: Ratio,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: Ratio::new_const(helpers::DOJI_MAX_BODY_RATIO),
        }
    }
}

impl PatternDetector for DojiDetector {
    fn id(&self) -> PatternId {
        PatternId("DOJI")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        if !is_indecision(bar.body(), bar.range(), self.max_body_ratio.get()) {
            return None;
        }

        Some(PatternMatch {
            pattern_id: PatternDetector::id(self),
            direction: Direction::Neutral,
            start_index: index,
            end_index: index,
        })
    }
}

// ============================================================
// HAMMER / SHOOTING STAR
// ============================================================

/// Long lower wick on an up-closing bar
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub shadow_factor: Multiplier,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            shadow_factor: Multiplier::new_const(helpers::REVERSAL_SHADOW_FACTOR),
        }
    }
}

impl PatternDetector for HammerDetector {
    fn id(&self) -> PatternId {
        PatternId("HAMMER")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        if !(wick_dominates(bar.lower_wick(), bar.body(), self.shadow_factor.get())
            && bar.is_bullish())
        {
            return None;
        }

        Some(PatternMatch {
            pattern_id: PatternDetector::id(self),
            direction: Direction::Bullish,
            start_index: index,
            end_index: index,
        })
    }
}

/// Long upper wick on a down-closing bar
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarDetector {
    pub shadow_factor: Multiplier,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            shadow_factor: Multiplier::new_const(helpers::REVERSAL_SHADOW_FACTOR),
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn id(&self) -> PatternId {
        PatternId("SHOOTING_STAR")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        if !(wick_dominates(bar.upper_wick(), bar.body(), self.shadow_factor.get())
            && bar.is_bearish())
        {
            return None;
        }

        Some(PatternMatch {
            pattern_id: PatternDetector::id(self),
            direction: Direction::Bearish,
            start_index: index,
            end_index: index,
        })
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static DOJI_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "max_body_ratio",
    helpers::DOJI_MAX_BODY_RATIO,
    (0.01, 0.5, 0.01),
    "Body/range ratio below which a bar is indecisive",
)];

static REVERSAL_PARAMS: &[ParamMeta] = &[ParamMeta::multiplier(
    "shadow_factor",
    helpers::REVERSAL_SHADOW_FACTOR,
    (0.5, 10.0, 0.1),
    "Wick must exceed body times this factor",
)];

impl ParameterizedDetector for DojiDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOJI_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_params(DOJI_PARAMS, params)?;
        Ok(Self {
            max_body_ratio: get_ratio(params, "max_body_ratio", helpers::DOJI_MAX_BODY_RATIO)?,
        })
    }

    fn pattern_id_str() -> &'static str {
        "DOJI"
    }
}

impl ParameterizedDetector for HammerDetector {
    fn param_meta() -> &'static [ParamMeta] {
        REVERSAL_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_params(REVERSAL_PARAMS, params)?;
        Ok(Self {
            shadow_factor: get_multiplier(
                params,
                "shadow_factor",
                helpers::REVERSAL_SHADOW_FACTOR,
            )?,
        })
    }

    fn pattern_id_str() -> &'static str {
        "HAMMER"
    }
}

impl ParameterizedDetector for ShootingStarDetector {
    fn param_meta() -> &'static [ParamMeta] {
        REVERSAL_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_params(REVERSAL_PARAMS, params)?;
        Ok(Self {
            shadow_factor: get_multiplier(
                params,
                "shadow_factor",
                helpers::REVERSAL_SHADOW_FACTOR,
            )?,
        })
    }

    fn pattern_id_str() -> &'static str {
        "SHOOTING_STAR"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(0, o, h, l, c, 1000.0)
    }

    #[test]
    fn test_doji() {
        let d = DojiDetector::with_defaults();
        assert!(d.detect(&[bar(10.0, 11.0, 9.0, 10.1)], 0).is_some());
        assert!(d.detect(&[bar(10.0, 11.0, 9.0, 10.5)], 0).is_none());
        // zero range is never a doji
        assert!(d.detect(&[bar(10.0, 10.0, 10.0, 10.0)], 0).is_none());
    }

    #[test]
    fn test_hammer_requires_up_close() {
        let h = HammerDetector::with_defaults();
        let m = h.detect(&[bar(10.0, 11.0, 7.0, 11.0)], 0).unwrap();
        assert_eq!(m.direction, Direction::Bullish);
        assert_eq!(m.pattern_id.as_str(), "HAMMER");
        // same geometry closing down
        assert!(h.detect(&[bar(11.0, 11.0, 7.0, 10.0)], 0).is_none());
    }

    #[test]
    fn test_shooting_star_requires_down_close() {
        let s = ShootingStarDetector::with_defaults();
        let m = s.detect(&[bar(11.0, 14.0, 10.0, 10.0)], 0).unwrap();
        assert_eq!(m.direction, Direction::Bearish);
        assert!(s.detect(&[bar(10.0, 14.0, 10.0, 11.0)], 0).is_none());
    }

    #[test]
    fn test_wick_factor_boundary() {
        let h = HammerDetector::with_defaults();
        // lower wick exactly 2.2 * body does not qualify
        assert!(h.detect(&[bar(10.0, 11.0, 7.8, 11.0)], 0).is_none());
    }

    #[test]
    fn test_with_params() {
        let mut params = HashMap::new();
        params.insert("max_body_ratio", 0.05);
        let d = DojiDetector::with_params(&params).unwrap();
        assert_eq!(d.max_body_ratio.get(), 0.05);
        assert!(d.detect(&[bar(10.0, 11.0, 9.0, 10.2)], 0).is_none());

        params.insert("max_body_ratio", 0.9);
        assert!(DojiDetector::with_params(&params).is_err());

        let mut unknown = HashMap::new();
        unknown.insert("body", 0.1);
        assert!(HammerDetector::with_params(&unknown).is_err());
    }
}
