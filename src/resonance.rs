//! Resonance Classifier
//!
//! Reads the two most recent rows of an [`IndicatorFrame`] and decides whether
//! ribbon alignment, MACD momentum, a price trigger and volume agree.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    indicators::{IndicatorFrame, IndicatorRow},
    params::ParamMeta,
    Multiplier, Period, ResonanceError, Result,
};

// ============================================================
// PARAMETERS
// ============================================================

/// Tunable inputs of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    /// Minimum close-to-close move, in percent
    pub price_threshold_pct: f64,
    /// Minimum `volume / volume_avg`
    pub volume_ratio_threshold: Multiplier,
    /// Let a breakout of the recent range stand in for the price move
    pub breakout: bool,
    /// Accepted for configuration compatibility. Currently inert: the momentum
    /// pulse is always required regardless of this flag.
    pub momentum_gate: bool,
    /// Rows required beyond the two compared bars
    pub lookback: Period,
    /// Bars before the latest one whose extremes define a breakout
    pub breakout_window: Period,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            price_threshold_pct: 0.8,
            volume_ratio_threshold: Multiplier::new_const(1.2),
            breakout: true,
            momentum_gate: true,
            lookback: Period::new_const(7),
            breakout_window: Period::new_const(5),
        }
    }
}

pub const SIGNAL_PARAMS: &[ParamMeta] = &[
    ParamMeta::percent(
        "price_threshold_pct",
        0.8,
        (0.0, 20.0, 0.1),
        "Minimum close-to-close move in percent",
    ),
    ParamMeta::multiplier(
        "volume_ratio_threshold",
        1.2,
        (0.0, 10.0, 0.1),
        "Minimum volume multiple of the 20-bar average",
    ),
    ParamMeta::period("lookback", 7.0, (1.0, 50.0, 1.0), "Rows required beyond the compared pair"),
    ParamMeta::period("breakout_window", 5.0, (1.0, 50.0, 1.0), "Breakout range length in bars"),
];

impl SignalParams {
    /// Check every numeric field against [`SIGNAL_PARAMS`]
    pub fn validate(&self) -> Result<()> {
        if !self.price_threshold_pct.is_finite() {
            return Err(ResonanceError::InvalidValue(
                "price_threshold_pct cannot be NaN or infinite",
            ));
        }
        let values = [
            self.price_threshold_pct,
            self.volume_ratio_threshold.get(),
            self.lookback.get() as f64,
            self.breakout_window.get() as f64,
        ];
        for (meta, value) in SIGNAL_PARAMS.iter().zip(values) {
            meta.validate(value)?;
        }
        if self.breakout_window.get() > self.lookback.get() {
            return Err(ResonanceError::InvalidConfig(format!(
                "breakout_window ({}) cannot exceed lookback ({})",
                self.breakout_window.get(),
                self.lookback.get()
            )));
        }
        Ok(())
    }

    /// Usable rows needed before classification runs
    #[inline]
    pub fn min_rows(&self) -> usize {
        self.lookback.get() + 2
    }
}

// ============================================================
// RESULT TYPES
// ============================================================

/// Directional resonance signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Bull,
    Bear,
    #[default]
    None,
}

impl Signal {
    #[inline]
    pub fn is_some(self) -> bool {
        !matches!(self, Signal::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Bull => "BULL",
            Signal::Bear => "BEAR",
            Signal::None => "NONE",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prevailing trend: close relative to EMA60
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendLabel {
    Bull,
    Bear,
    #[default]
    Side,
}

impl TrendLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendLabel::Bull => "BULL",
            TrendLabel::Bear => "BEAR",
            TrendLabel::Side => "SIDE",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one classification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub signal: Signal,
    /// Empty unless a signal fired
    pub rationale: String,
    pub trend: TrendLabel,
}

impl SignalResult {
    /// `(NONE, "", SIDE)`
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// Why no classification could be made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Retrieval failed or returned unusable data
    Fetch { message: String },
    /// Too few usable rows after warmup
    InsufficientHistory { need: usize, got: usize },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::Fetch { message } => write!(f, "data unavailable: {message}"),
            UnavailableReason::InsufficientHistory { need, got } => {
                write!(f, "insufficient history: need {need} rows, got {got}")
            },
        }
    }
}

/// Evidence-based result, or an explicit marker that the data was not there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Evaluated(SignalResult),
    Unavailable(UnavailableReason),
}

impl Classification {
    /// The evaluated result, with unavailable data collapsing to neutral
    pub fn result(&self) -> SignalResult {
        match self {
            Classification::Evaluated(r) => r.clone(),
            Classification::Unavailable(_) => SignalResult::neutral(),
        }
    }

    #[inline]
    pub fn signal(&self) -> Signal {
        match self {
            Classification::Evaluated(r) => r.signal,
            Classification::Unavailable(_) => Signal::None,
        }
    }

    #[inline]
    pub fn trend(&self) -> TrendLabel {
        match self {
            Classification::Evaluated(r) => r.trend,
            Classification::Unavailable(_) => TrendLabel::Side,
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Classification::Evaluated(_))
    }
}

// ============================================================
// RULES
// ============================================================

/// Strict EMA5 > EMA10 > EMA20 > EMA60
#[inline]
fn ribbon_bullish(row: &IndicatorRow) -> bool {
    row.ema5 > row.ema10 && row.ema10 > row.ema20 && row.ema20 > row.ema60
}

/// Strict EMA5 < EMA10 < EMA20 < EMA60
#[inline]
fn ribbon_bearish(row: &IndicatorRow) -> bool {
    row.ema5 < row.ema10 && row.ema10 < row.ema20 && row.ema20 < row.ema60
}

/// Positive and rising histogram
#[inline]
fn pulse_bullish(prev: &IndicatorRow, last: &IndicatorRow) -> bool {
    last.histogram > 0.0 && last.histogram > prev.histogram
}

/// Negative and falling histogram
#[inline]
fn pulse_bearish(prev: &IndicatorRow, last: &IndicatorRow) -> bool {
    last.histogram < 0.0 && last.histogram < prev.histogram
}

fn trend_of(row: &IndicatorRow) -> TrendLabel {
    if row.close > row.ema60 {
        TrendLabel::Bull
    } else if row.close < row.ema60 {
        TrendLabel::Bear
    } else {
        TrendLabel::Side
    }
}

/// Upward / downward breakout of the `window` bars ending at the previous row
fn breakout(rows: &[IndicatorRow], window: usize) -> (bool, bool) {
    let n = rows.len();
    let Some(last) = rows.last() else {
        return (false, false);
    };
    let start = n.saturating_sub(window + 1);
    let range = &rows[start..n - 1];
    if range.is_empty() {
        return (false, false);
    }

    let max_high = range.iter().map(|r| r.high).fold(f64::NEG_INFINITY, f64::max);
    let min_low = range.iter().map(|r| r.low).fold(f64::INFINITY, f64::min);
    (last.close > max_high, last.close < min_low)
}

// ============================================================
// CLASSIFIER
// ============================================================

/// Applies [`SignalParams`] to indicator frames
#[derive(Debug, Clone, Default)]
pub struct ResonanceClassifier {
    params: SignalParams,
}

impl ResonanceClassifier {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Classify the latest bar of `frame`.
    ///
    /// Frames shorter than `lookback + 2` rows give `(NONE, "", SIDE)`.
    pub fn classify(&self, frame: &IndicatorFrame) -> SignalResult {
        let rows = frame.rows();
        if rows.len() < self.params.min_rows() {
            return SignalResult::neutral();
        }
        let (prev, last) = match rows {
            [.., prev, last] => (prev, last),
            _ => return SignalResult::neutral(),
        };

        let pc = (last.close - prev.close) / prev.close * 100.0;
        let vr = last.volume_ratio();
        let p = &self.params;
        let volume_ok = vr >= p.volume_ratio_threshold.get();

        let (brk_up, brk_down) = if p.breakout {
            breakout(rows, p.breakout_window.get())
        } else {
            (false, false)
        };

        let (signal, rationale) = if ribbon_bullish(last)
            && pulse_bullish(prev, last)
            && (pc >= p.price_threshold_pct || brk_up)
            && volume_ok
        {
            (
                Signal::Bull,
                format!("ribbon-divergence+MACD-momentum(vr:{vr:.1})"),
            )
        } else if ribbon_bearish(last)
            && pulse_bearish(prev, last)
            && (pc <= -p.price_threshold_pct || brk_down)
            && volume_ok
        {
            (
                Signal::Bear,
                format!("bear-alignment+MACD-selling-pressure(vr:{vr:.1})"),
            )
        } else {
            (Signal::None, String::new())
        };

        let trend = trend_of(last);
        debug!(
            %signal,
            %trend,
            pc,
            vr,
            brk_up,
            brk_down,
            "resonance classified"
        );
        SignalResult {
            signal,
            rationale,
            trend,
        }
    }

    /// Classify a fetched frame, keeping "no data" distinct from "no signal"
    pub fn assess(&self, frame: std::result::Result<&IndicatorFrame, &ResonanceError>) -> Classification {
        match frame {
            Err(e) => Classification::Unavailable(UnavailableReason::Fetch {
                message: e.to_string(),
            }),
            Ok(frame) if frame.len() < self.params.min_rows() => {
                Classification::Unavailable(UnavailableReason::InsufficientHistory {
                    need: self.params.min_rows(),
                    got: frame.len(),
                })
            },
            Ok(frame) => Classification::Evaluated(self.classify(frame)),
        }
    }
}

// ============================================================
// TESTS
// ============================================================
