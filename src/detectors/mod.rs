//! Candlestick Pattern Recognizer
//!
//! Summarizes the most recent daily window as a set of tags.
//!
//! # Rule Groups
//!
//! - **Single-bar**: doji, hammer, shooting star. Ordered; only the first match is kept.
//! - **Two-bar**: engulfing. Checked independently of the single-bar group.
//! - **Multi-bar**: directional bias over the whole window.
//!
//! A window where nothing fires is reported as neutral consolidation, which is
//! distinct from a series too short to inspect.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use crate::{
    params::ParameterizedDetector, Direction, Period, ResonanceError, Result, OHLCV,
};

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod multi_bar;
pub mod single_bar;
pub mod two_bar;

pub use multi_bar::*;
pub use single_bar::*;
pub use two_bar::*;

// ============================================================
// PATTERN MATCH
// ============================================================

/// Unique identifier for a pattern type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub &'static str);

impl PatternId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Result of a single rule firing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMatch {
    pub pattern_id: PatternId,
    pub direction: Direction,
    pub start_index: usize,
    pub end_index: usize,
}

impl PatternMatch {
    /// Human-readable tag
    pub fn label(&self) -> &'static str {
        match (self.pattern_id.as_str(), self.direction) {
            ("DOJI", _) => "doji (possible reversal)",
            ("HAMMER", _) => "hammer (strong bullish)",
            ("SHOOTING_STAR", _) => "shooting star (strong bearish)",
            ("ENGULFING", Direction::Bullish) => "bullish engulfing (strong reversal)",
            ("ENGULFING", _) => "bearish engulfing (strong reversal)",
            ("DIRECTIONAL_BIAS", Direction::Bullish) => "strong recent bull bias",
            ("DIRECTIONAL_BIAS", _) => "strong recent bear bias",
            (other, _) => other,
        }
    }
}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// A single candlestick rule evaluated at one bar
pub trait PatternDetector: Send + Sync {
    fn id(&self) -> PatternId;
    fn min_bars(&self) -> usize;
    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors, dispatched by enum
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index)),*
                }
            }

            #[inline]
            pub fn id(&self) -> PatternId {
                match self {
                    $(Self::$variant(d) => PatternDetector::id(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    Doji(DojiDetector),
    Hammer(HammerDetector),
    ShootingStar(ShootingStarDetector),
    Engulfing(EngulfingDetector),
    DirectionalBias(DirectionalBiasDetector),
}

// ============================================================
// REPORT
// ============================================================

/// Summary of the latest daily window
#[derive(Debug, Clone, PartialEq)]
pub enum PatternReport {
    /// Fewer bars than window + margin
    Insufficient { need: usize, got: usize },
    /// The daily series could not be retrieved
    Unavailable(String),
    /// Enough data, no rule fired
    Neutral,
    Detected(Vec<PatternMatch>),
}

impl PatternReport {
    pub fn matches(&self) -> &[PatternMatch] {
        match self {
            PatternReport::Detected(m) => m,
            _ => &[],
        }
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.matches().iter().map(PatternMatch::label).collect()
    }

    pub fn has(&self, pattern_id: &str, direction: Direction) -> bool {
        self.matches()
            .iter()
            .any(|m| m.pattern_id.as_str() == pattern_id && m.direction == direction)
    }
}

impl fmt::Display for PatternReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternReport::Insufficient { .. } => f.write_str("insufficient data"),
            PatternReport::Unavailable(_) => f.write_str("analysis unavailable"),
            PatternReport::Neutral => f.write_str("neutral consolidation"),
            PatternReport::Detected(_) => f.write_str(&self.tags().join(" | ")),
        }
    }
}

// ============================================================
// RECOGNIZER
// ============================================================

/// Runs the rule groups over the latest bar of a daily series
#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    window: Period,
    single_bar: Vec<BuiltinDetector>,
    two_bar: Vec<BuiltinDetector>,
    multi_bar: Vec<BuiltinDetector>,
}

impl Default for PatternRecognizer {
    fn default() -> Self {
        Self {
            window: Period::new_const(helpers::PATTERN_WINDOW),
            single_bar: vec![
                BuiltinDetector::Doji(DojiDetector::default()),
                BuiltinDetector::Hammer(HammerDetector::default()),
                BuiltinDetector::ShootingStar(ShootingStarDetector::default()),
            ],
            two_bar: vec![BuiltinDetector::Engulfing(EngulfingDetector)],
            multi_bar: vec![BuiltinDetector::DirectionalBias(
                DirectionalBiasDetector::default(),
            )],
        }
    }
}

impl PatternRecognizer {
    /// Bars required for a full report
    #[inline]
    pub fn min_bars(&self) -> usize {
        self.window.get() + helpers::PATTERN_MARGIN
    }

    #[inline]
    pub fn window(&self) -> Period {
        self.window
    }

    /// Build the default rule set with per-pattern parameter overrides.
    ///
    /// Keys of `overrides` are pattern ids (`DOJI`, `HAMMER`, `SHOOTING_STAR`,
    /// `DIRECTIONAL_BIAS`); values map parameter names to numbers.
    pub fn from_overrides(overrides: &BTreeMap<String, BTreeMap<String, f64>>) -> Result<Self> {
        const KNOWN: [&str; 4] = ["DOJI", "HAMMER", "SHOOTING_STAR", "DIRECTIONAL_BIAS"];
        if let Some(unknown) = overrides.keys().find(|k| !KNOWN.contains(&k.as_str())) {
            return Err(ResonanceError::InvalidConfig(format!(
                "no tunable pattern named '{unknown}'"
            )));
        }

        fn params_for<'a>(
            overrides: &'a BTreeMap<String, BTreeMap<String, f64>>,
            id: &str,
        ) -> HashMap<&'a str, f64> {
            overrides
                .get(id)
                .map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)).collect())
                .unwrap_or_default()
        }

        let doji = DojiDetector::with_params(&params_for(overrides, DojiDetector::pattern_id_str()))?;
        let hammer =
            HammerDetector::with_params(&params_for(overrides, HammerDetector::pattern_id_str()))?;
        let star = ShootingStarDetector::with_params(&params_for(
            overrides,
            ShootingStarDetector::pattern_id_str(),
        ))?;
        let bias = DirectionalBiasDetector::with_params(&params_for(
            overrides,
            DirectionalBiasDetector::pattern_id_str(),
        ))?;

        RecognizerBuilder::new()
            .window(bias.window)
            .single_bar(BuiltinDetector::Doji(doji))
            .single_bar(BuiltinDetector::Hammer(hammer))
            .single_bar(BuiltinDetector::ShootingStar(star))
            .two_bar(BuiltinDetector::Engulfing(EngulfingDetector))
            .multi_bar(BuiltinDetector::DirectionalBias(bias))
            .build()
    }

    /// Inspect the last `window` bars of `bars`
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> PatternReport {
        let need = self.min_bars();
        if bars.len() < need {
            return PatternReport::Insufficient {
                need,
                got: bars.len(),
            };
        }

        let recent = &bars[bars.len() - self.window.get()..];
        let index = recent.len() - 1;
        let mut found = Vec::new();

        if let Some(m) = self.single_bar.iter().find_map(|d| d.detect(recent, index)) {
            found.push(m);
        }
        found.extend(self.two_bar.iter().filter_map(|d| d.detect(recent, index)));
        found.extend(self.multi_bar.iter().filter_map(|d| d.detect(recent, index)));

        if found.is_empty() {
            PatternReport::Neutral
        } else {
            PatternReport::Detected(found)
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for custom rule sets
#[derive(Debug, Clone)]
pub struct RecognizerBuilder {
    window: Period,
    single_bar: Vec<BuiltinDetector>,
    two_bar: Vec<BuiltinDetector>,
    multi_bar: Vec<BuiltinDetector>,
}

impl Default for RecognizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognizerBuilder {
    pub fn new() -> Self {
        Self {
            window: Period::new_const(helpers::PATTERN_WINDOW),
            single_bar: Vec::new(),
            two_bar: Vec::new(),
            multi_bar: Vec::new(),
        }
    }

    pub fn window(mut self, window: Period) -> Self {
        self.window = window;
        self
    }

    /// Append a rule to the ordered single-bar group
    pub fn single_bar(mut self, detector: BuiltinDetector) -> Self {
        self.single_bar.push(detector);
        self
    }

    pub fn two_bar(mut self, detector: BuiltinDetector) -> Self {
        self.two_bar.push(detector);
        self
    }

    pub fn multi_bar(mut self, detector: BuiltinDetector) -> Self {
        self.multi_bar.push(detector);
        self
    }

    pub fn build(self) -> Result<PatternRecognizer> {
        let all = self
            .single_bar
            .iter()
            .chain(&self.two_bar)
            .chain(&self.multi_bar);
        for detector in all {
            detector.validate_config()?;
            if detector.min_bars() > self.window.get() {
                return Err(ResonanceError::InvalidConfig(format!(
                    "{} needs {} bars but the window is {}",
                    detector.id().as_str(),
                    detector.min_bars(),
                    self.window.get()
                )));
            }
        }

        Ok(PatternRecognizer {
            window: self.window,
            single_bar: self.single_bar,
            two_bar: self.two_bar,
            multi_bar: self.multi_bar,
        })
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    /// Alternating up/down bars: 5 up-closes in any 10-bar window
    fn choppy(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Bar::new(i as i64, 10.0, 11.0, 9.0, 10.8, 0.0)
                } else {
                    Bar::new(i as i64, 10.8, 11.0, 9.0, 10.0, 0.0)
                }
            })
            .collect()
    }

    #[test]
    fn test_insufficient_is_distinct_from_neutral() {
        let r = PatternRecognizer::default();
        let report = r.analyze(&choppy(11));
        assert_eq!(report, PatternReport::Insufficient { need: 12, got: 11 });
        assert_eq!(report.to_string(), "insufficient data");
        assert_ne!(report, PatternReport::Neutral);
    }

    #[test]
    fn test_neutral_window() {
        let report = PatternRecognizer::default().analyze(&choppy(12));
        assert_eq!(report, PatternReport::Neutral);
        assert_eq!(report.to_string(), "neutral consolidation");
    }

    #[test]
    fn test_single_bar_first_match_wins() {
        let mut bars = choppy(12);
        // doji body with a long lower wick, closing up: doji outranks hammer
        bars[11] = Bar::new(11, 10.0, 10.2, 8.0, 10.1, 0.0);
        let report = PatternRecognizer::default().analyze(&bars);
        assert_eq!(report.tags(), vec!["doji (possible reversal)"]);
    }

    #[test]
    fn test_tags_joined() {
        let mut bars = choppy(12);
        bars[10] = Bar::new(10, 14.0, 14.0, 10.0, 11.0, 0.0);
        // hammer-shaped engulfing bar: long lower wick, closes above prev high
        bars[11] = Bar::new(11, 10.5, 15.0, 0.0, 15.0, 0.0);
        let report = PatternRecognizer::default().analyze(&bars);
        assert_eq!(
            report.to_string(),
            "hammer (strong bullish) | bullish engulfing (strong reversal)"
        );
    }

    #[test]
    fn test_from_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "DIRECTIONAL_BIAS".to_string(),
            BTreeMap::from([("window".to_string(), 6.0), ("bull_min".to_string(), 5.0)]),
        );
        let r = PatternRecognizer::from_overrides(&overrides).unwrap();
        assert_eq!(r.window().get(), 6);
        assert_eq!(r.min_bars(), 8);

        overrides.insert("MARUBOZU".to_string(), BTreeMap::new());
        assert!(PatternRecognizer::from_overrides(&overrides).is_err());
    }

    #[test]
    fn test_builder_rejects_detector_wider_than_window() {
        let bias = DirectionalBiasDetector {
            window: Period::new_const(20),
            ..DirectionalBiasDetector::default()
        };
        let result = RecognizerBuilder::new()
            .window(Period::new_const(10))
            .multi_bar(BuiltinDetector::DirectionalBias(bias))
            .build();
        assert!(matches!(result, Err(ResonanceError::InvalidConfig(_))));
    }
}
