//! Directional bias over a trailing window of daily bars

use std::collections::HashMap;

use super::helpers::{self, count_up_closes};
use super::{PatternDetector, PatternId, PatternMatch};
use crate::{
    params::{check_params, get_period, ParamMeta, ParameterizedDetector},
    Direction, Period, ResonanceError, Result, OHLCV,
};

impl_with_defaults!(DirectionalBiasDetector);

/// Counts up-closing bars in the window ending at `index`
#[derive(Debug, Clone, Copy)]
pub struct DirectionalBiasDetector {
    pub window: Period,
    /// Up-closes at or above which the bias is bullish
    pub bull_min: Period,
    /// Up-closes at or below which the bias is bearish
    pub bear_max: Period,
}

impl Default for DirectionalBiasDetector {
    fn default() -> Self {
        Self {
            window: Period::new_const(helpers::PATTERN_WINDOW),
            bull_min: Period::new_const(helpers::BULL_BIAS_MIN),
            bear_max: Period::new_const(helpers::BEAR_BIAS_MAX),
        }
    }
}

impl PatternDetector for DirectionalBiasDetector {
    fn id(&self) -> PatternId {
        PatternId("DIRECTIONAL_BIAS")
    }

    fn min_bars(&self) -> usize {
        self.window.get()
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let window = self.window.get();
        if index + 1 < window || index >= bars.len() {
            return None;
        }
        let start = index + 1 - window;
        let ups = count_up_closes(&bars[start..=index]);

        let direction = if ups >= self.bull_min.get() {
            Direction::Bullish
        } else if ups <= self.bear_max.get() {
            Direction::Bearish
        } else {
            return None;
        };

        Some(PatternMatch {
            pattern_id: PatternDetector::id(self),
            direction,
            start_index: start,
            end_index: index,
        })
    }

    fn validate_config(&self) -> Result<()> {
        if self.bull_min.get() > self.window.get() {
            return Err(ResonanceError::InvalidConfig(format!(
                "bull_min ({}) exceeds window ({})",
                self.bull_min.get(),
                self.window.get()
            )));
        }
        if self.bear_max >= self.bull_min {
            return Err(ResonanceError::InvalidConfig(format!(
                "bear_max ({}) must be below bull_min ({})",
                self.bear_max.get(),
                self.bull_min.get()
            )));
        }
        Ok(())
    }
}

static BIAS_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 10.0, (3.0, 60.0, 1.0), "Trailing bars inspected"),
    ParamMeta::period("bull_min", 8.0, (1.0, 60.0, 1.0), "Up-closes marking a bull bias"),
    ParamMeta::period("bear_max", 3.0, (1.0, 60.0, 1.0), "Up-closes marking a bear bias"),
];

impl ParameterizedDetector for DirectionalBiasDetector {
    fn param_meta() -> &'static [ParamMeta] {
        BIAS_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_params(BIAS_PARAMS, params)?;
        let detector = Self {
            window: get_period(params, "window", helpers::PATTERN_WINDOW)?,
            bull_min: get_period(params, "bull_min", helpers::BULL_BIAS_MIN)?,
            bear_max: get_period(params, "bear_max", helpers::BEAR_BIAS_MAX)?,
        };
        detector.validate_config()?;
        Ok(detector)
    }

    fn pattern_id_str() -> &'static str {
        "DIRECTIONAL_BIAS"
    }
}
