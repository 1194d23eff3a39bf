//! Indicator Engine
//!
//! Derives the columns the resonance classifier reads from a raw OHLCV series:
//! an EMA ribbon (5/10/20/40/60/200), the MACD histogram (12/26/9) and a
//! 20-bar trailing volume mean. Every refresh recomputes from the full window;
//! there is no streaming update.

use tracing::debug;

use crate::{OHLCVExt, Period, ResonanceError, Result, OHLCV};

/// EMA periods carried on every row
pub const RIBBON_PERIODS: [usize; 6] = [5, 10, 20, 40, 60, 200];

/// Fast / slow / signal spans of the MACD histogram
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Trailing window of the volume baseline
pub const VOLUME_AVG_PERIOD: usize = 20;

// ============================================================
// PRIMITIVES
// ============================================================

/// Exponential moving average with smoothing factor `2 / (period + 1)`.
///
/// Seeded from the first value (no SMA warmup), so the output has the same
/// length as the input.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return out;
    };

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = first;
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// MACD histogram: `(EMA12 - EMA26) - EMA9(EMA12 - EMA26)`
pub fn macd_histogram(closes: &[f64]) -> Vec<f64> {
    let fast = ema(closes, MACD_FAST);
    let slow = ema(closes, MACD_SLOW);
    let macd_line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, MACD_SIGNAL);
    macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect()
}

/// Trailing simple mean; `None` until `period` values are available
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    // Each window is summed afresh so an all-zero window averages to exactly 0
    (0..values.len())
        .map(|i| {
            (i + 1 >= period)
                .then(|| values[i + 1 - period..=i].iter().sum::<f64>() / period as f64)
        })
        .collect()
}

// ============================================================
// FRAME
// ============================================================

/// One usable row of an indicator frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRow {
    pub timestamp: Option<i64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ema5: f64,
    pub ema10: f64,
    pub ema20: f64,
    pub ema40: f64,
    pub ema60: f64,
    pub ema200: f64,
    /// Trailing volume mean; 0 while the averaging window is incomplete
    pub volume_avg: f64,
    pub histogram: f64,
}

impl IndicatorRow {
    /// `volume / volume_avg`, or 1 when the baseline is not positive
    #[inline]
    pub fn volume_ratio(&self) -> f64 {
        if self.volume_avg > 0.0 {
            self.volume / self.volume_avg
        } else {
            1.0
        }
    }
}

impl OHLCV for IndicatorRow {
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
        self.timestamp
    }
}

/// A series augmented with derived columns, warmup rows removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorFrame {
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn from_rows(rows: Vec<IndicatorRow>) -> Self {
        Self { rows }
    }

    #[inline]
    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent row
    #[inline]
    pub fn last(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// Last two rows as `(prev, last)`
    pub fn last_pair(&self) -> Option<(&IndicatorRow, &IndicatorRow)> {
        match self.rows.as_slice() {
            [.., prev, last] => Some((prev, last)),
            _ => None,
        }
    }

    /// Close-to-close percent change of the last row
    pub fn last_change_pct(&self) -> Option<f64> {
        let (prev, last) = self.last_pair()?;
        Some((last.close - prev.close) / prev.close * 100.0)
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Builds [`IndicatorFrame`]s from raw series
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    /// Leading rows dropped before the slowest EMA is considered warmed up
    pub warmup: Period,
    pub volume_period: Period,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            warmup: Period::new_const(200),
            volume_period: Period::new_const(VOLUME_AVG_PERIOD),
        }
    }
}

impl IndicatorEngine {
    /// Minimum series length for a non-empty frame
    #[inline]
    pub fn min_bars(&self) -> usize {
        self.warmup.get()
    }

    /// Compute the usable frame for `bars`.
    ///
    /// An empty series or one containing invalid bars is an error; a valid
    /// series shorter than the warmup yields an empty frame.
    pub fn compute<T: OHLCV>(&self, bars: &[T]) -> Result<IndicatorFrame> {
        if bars.is_empty() {
            return Err(ResonanceError::DataUnavailable("empty series".to_string()));
        }
        for (i, bar) in bars.iter().enumerate() {
            bar.validate(i)?;
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume()).collect();

        let [e5, e10, e20, e40, e60, e200] = RIBBON_PERIODS.map(|p| ema(&closes, p));
        let hist = macd_histogram(&closes);
        let vol_avg = rolling_mean(&volumes, self.volume_period.get());

        let skip = self.warmup.get() - 1;
        let rows: Vec<IndicatorRow> = bars
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, bar)| IndicatorRow {
                timestamp: bar.timestamp(),
                open: bar.open(),
                high: bar.high(),
                low: bar.low(),
                close: bar.close(),
                volume: bar.volume(),
                ema5: e5[i],
                ema10: e10[i],
                ema20: e20[i],
                ema40: e40[i],
                ema60: e60[i],
                ema200: e200[i],
                volume_avg: vol_avg[i].unwrap_or(0.0),
                histogram: hist[i],
            })
            .collect();

        debug!(
            bars = bars.len(),
            usable = rows.len(),
            "indicator frame computed"
        );
        Ok(IndicatorFrame { rows })
    }
}

// ============================================================
// TESTS
// ============================================================
