//! # MTFR - Multi-Timeframe Resonance
//!
//! Signal-detection engine that watches a set of instruments across several
//! sampling intervals and flags moments where trend, momentum and volume line up.
//!
//! ## Quick Start
//!
//! ```rust
//! use mtf_resonance::prelude::*;
//!
//! // 260 bars of a steady climb, then a high-volume thrust
//! let mut bars: Vec<Bar> = (0..260)
//!     .map(|i| {
//!         let c = 100.0 + i as f64 * 0.5;
//!         Bar::new(i as i64 * 60_000, c - 0.2, c + 0.3, c - 0.4, c, 1_000.0)
//!     })
//!     .collect();
//! let last = bars.last().copied().unwrap();
//! bars.push(Bar::new(last.timestamp + 60_000, last.close, last.close * 1.03, last.close, last.close * 1.025, 3_000.0));
//!
//! let frame = IndicatorEngine::default().compute(&bars).unwrap();
//! let result = ResonanceClassifier::new(SignalParams::default()).classify(&frame);
//! assert_eq!(result.signal, Signal::Bull);
//! assert_eq!(result.trend, TrendLabel::Bull);
//! ```

pub mod config;
pub mod context;
pub mod detectors;
pub mod indicators;
pub mod levels;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod params;
pub mod provider;
pub mod resonance;

pub mod prelude {
    pub use crate::{
        // Configuration
        config::{parse_symbols, ConfigError, MonitorConfig},
        // Market context
        context::{ContextSnapshot, MarketContextGauge, VolatilityRegime},
        // Detectors
        detectors::*,
        // Indicators
        indicators::{ema, macd_histogram, rolling_mean, IndicatorEngine, IndicatorFrame, IndicatorRow},
        // Levels
        levels::{adr_usage_pct, PivotLevels},
        // Driver
        monitor::{CycleReport, Monitor, Quote, SymbolReport, Verdict},
        // Notifications
        notify::{
            deliver, AlertMessage, IntervalDetail, JsonLinesNotifier, LogNotifier, Notifier, NotifyError,
        },
        // Parameters
        params::{get_multiplier, get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
        // Data source
        provider::{InMemoryProvider, JsonFileProvider, MarketDataProvider, ProviderError},
        // Classification
        resonance::{
            Classification, ResonanceClassifier, Signal, SignalParams, SignalResult, TrendLabel,
            UnavailableReason,
        },
        // Core types
        normalize_bars,
        Bar,
        Direction,
        FetchRange,
        Interval,
        Multiplier,
        OHLCVExt,
        Period,
        Ratio,
        ResonanceError,
        Result,
        OHLCV,
    };
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ResonanceError>;

/// Errors that can occur while deriving signals
#[derive(Debug, thiserror::Error)]
pub enum ResonanceError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error(transparent)]
    Provider(#[from] provider::ProviderError),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(ResonanceError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ResonanceError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

/// Non-negative finite scale factor (volume multiple, wick-to-body factor)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Multiplier(f64);

impl Multiplier {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(ResonanceError::InvalidValue(
                "Multiplier cannot be NaN or infinite",
            ));
        }
        if value < 0.0 {
            return Err(ResonanceError::OutOfRange {
                field: "Multiplier",
                value,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ResonanceError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

macro_rules! impl_validated_serde {
    ($ty:ty, $inner:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
                self.0.serialize(s)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                let value = <$inner>::deserialize(d)?;
                <$ty>::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_validated_serde!(Ratio, f64);
impl_validated_serde!(Multiplier, f64);
impl_validated_serde!(Period, usize);

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Bar open time in epoch milliseconds, when known
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed candle geometry
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_wick(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_wick(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None for a zero-range bar
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.body() / range)
    }

    /// Validate OHLCV data consistency
    fn validate(&self, index: usize) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(ResonanceError::InvalidOHLCV {
                index,
                reason: "NaN in OHLCV",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) || !self.volume().is_finite() {
            return Err(ResonanceError::InvalidOHLCV {
                index,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(ResonanceError::InvalidOHLCV {
                index,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// One recorded sampling interval of an instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Epoch milliseconds of the bar open
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

/// Bring a fetched series into chronological, de-duplicated, finite form.
///
/// Rows failing [`OHLCVExt::validate`] are dropped; for repeated timestamps the
/// last row wins. An empty result is reported as [`ResonanceError::DataUnavailable`].
pub fn normalize_bars(bars: Vec<Bar>) -> Result<Vec<Bar>> {
    let mut valid: Vec<Bar> = bars
        .into_iter()
        .enumerate()
        .filter(|(i, bar)| bar.validate(*i).is_ok())
        .map(|(_, bar)| bar)
        .collect();

    valid.sort_by_key(|bar| bar.timestamp);

    let mut out: Vec<Bar> = Vec::with_capacity(valid.len());
    for bar in valid {
        match out.last_mut() {
            Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
            _ => out.push(bar),
        }
    }

    if out.is_empty() {
        return Err(ResonanceError::DataUnavailable(
            "series contains no valid bars".to_string(),
        ));
    }
    Ok(out)
}

// ============================================================
// DIRECTION
// ============================================================

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

// ============================================================
// SAMPLING INTERVALS
// ============================================================

/// Sampling interval of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "10m")]
    M10,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    /// Intervals that may be selected for resonance evaluation
    pub const INTRADAY: [Interval; 6] = [
        Interval::M1,
        Interval::M5,
        Interval::M10,
        Interval::M15,
        Interval::M30,
        Interval::H1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M10 => "10m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::D1 => "1d",
        }
    }

    #[inline]
    pub fn is_intraday(self) -> bool {
        !matches!(self, Interval::D1)
    }

    /// History window requested when building an indicator frame.
    ///
    /// 15m and 30m bars need 60 days to clear the 200-bar EMA warmup; finer
    /// intervals get there within a week.
    pub fn default_fetch_range(self) -> FetchRange {
        match self {
            Interval::M15 | Interval::M30 => FetchRange::days(60),
            Interval::D1 => FetchRange::days(20),
            _ => FetchRange::days(7),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ResonanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Interval::M1),
            "5m" => Ok(Interval::M5),
            "10m" => Ok(Interval::M10),
            "15m" => Ok(Interval::M15),
            "30m" => Ok(Interval::M30),
            "1h" | "60m" => Ok(Interval::H1),
            "1d" => Ok(Interval::D1),
            other => Err(ResonanceError::InvalidConfig(format!(
                "unknown interval '{other}'"
            ))),
        }
    }
}

/// Historical range requested from a provider, in calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchRange {
    pub days: u32,
}

impl FetchRange {
    pub const fn days(days: u32) -> Self {
        Self { days }
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        i64::from(self.days) * 86_400_000
    }
}

impl fmt::Display for FetchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(0.15).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
    }

    #[test]
    fn test_multiplier_validation() {
        assert!(Multiplier::new(0.0).is_ok());
        assert!(Multiplier::new(2.2).is_ok());
        assert!(Multiplier::new(-1.0).is_err());
        assert!(Multiplier::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(0).is_err());
        assert_eq!(Period::new(7).unwrap().get(), 7);
    }

    #[test]
    fn test_validated_deserialize() {
        let ok: Ratio = serde_json::from_str("0.5").unwrap();
        assert_eq!(ok.get(), 0.5);
        assert!(serde_json::from_str::<Ratio>("1.5").is_err());
        assert!(serde_json::from_str::<Period>("0").is_err());
        assert!(serde_json::from_str::<Multiplier>("-2.0").is_err());
    }

    #[test]
    fn test_candle_geometry() {
        let bar = Bar::new(0, 100.0, 110.0, 90.0, 105.0, 1000.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.upper_wick(), 5.0);
        assert_eq!(bar.lower_wick(), 10.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
        assert_eq!(bar.body_ratio(), Some(0.25));

        let flat = Bar::new(0, 5.0, 5.0, 5.0, 5.0, 0.0);
        assert_eq!(flat.body_ratio(), None);
    }

    #[test]
    fn test_validate_rejects_bad_bars() {
        assert!(Bar::new(0, 1.0, 0.5, 1.0, 1.0, 1.0).validate(3).is_err());
        assert!(Bar::new(0, f64::NAN, 2.0, 1.0, 1.0, 1.0).validate(0).is_err());
        assert!(Bar::new(0, 1.0, 2.0, 1.0, 1.5, f64::INFINITY).validate(0).is_err());
        assert!(Bar::new(0, 1.0, 2.0, 1.0, 1.5, 10.0).validate(0).is_ok());
    }

    #[test]
    fn test_normalize_sorts_dedups_and_drops() {
        let bars = vec![
            Bar::new(3, 1.0, 2.0, 0.5, 1.5, 10.0),
            Bar::new(1, 1.0, 2.0, 0.5, 1.5, 10.0),
            Bar::new(2, f64::NAN, 2.0, 0.5, 1.5, 10.0),
            Bar::new(3, 1.0, 2.0, 0.5, 1.8, 20.0),
        ];
        let out = normalize_bars(bars).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, 1);
        assert_eq!(out[1].timestamp, 3);
        assert_eq!(out[1].close, 1.8);
    }

    #[test]
    fn test_normalize_empty_is_unavailable() {
        let err = normalize_bars(Vec::new()).unwrap_err();
        assert!(matches!(err, ResonanceError::DataUnavailable(_)));
    }

    #[test]
    fn test_interval_parse_and_ranges() {
        assert_eq!("15m".parse::<Interval>().unwrap(), Interval::M15);
        assert_eq!(" 1H ".parse::<Interval>().unwrap(), Interval::H1);
        assert!("2w".parse::<Interval>().is_err());
        assert_eq!(Interval::M30.default_fetch_range(), FetchRange::days(60));
        assert_eq!(Interval::M5.default_fetch_range(), FetchRange::days(7));
        assert_eq!(Interval::D1.default_fetch_range(), FetchRange::days(20));
        assert_eq!(serde_json::to_string(&Interval::H1).unwrap(), "\"1h\"");
    }
}
