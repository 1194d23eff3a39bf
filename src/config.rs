//! Monitor configuration
//!
//! Loaded from JSON; any omitted field takes its default.
//!
//! ```json
//! {
//!   "symbols": ["NVDA", "TSLA"],
//!   "intervals": ["5m", "15m"],
//!   "refresh_secs": 60,
//!   "signal": { "price_threshold_pct": 0.8, "volume_ratio_threshold": 1.2 },
//!   "pattern_params": { "DOJI": { "max_body_ratio": 0.1 } }
//! }
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    detectors::PatternRecognizer, params::ParamMeta, resonance::SignalParams, Interval,
    ResonanceError,
};

pub const DEFAULT_SYMBOLS: &str =
    "TSLA, NIO, TSLL, XPEV, QQQ, VOO, META, GOOGL, AAPL, NVDA, AMZN, MSFT, TSM, GLD, BTC-USD";

static REFRESH_META: ParamMeta =
    ParamMeta::period("refresh_secs", 60.0, (30.0, 300.0, 1.0), "Seconds between cycles");

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Validation(#[from] ResonanceError),
}

/// Everything one monitor instance needs to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub symbols: Vec<String>,
    /// Evaluated in order; the first fires the signal, the last confirms the trend
    pub intervals: Vec<Interval>,
    pub refresh_secs: u64,
    pub signal: SignalParams,
    /// Per-pattern detector overrides keyed by pattern id
    pub pattern_params: BTreeMap<String, BTreeMap<String, f64>>,
    pub volatility_symbol: String,
    pub market_symbol: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            symbols: parse_symbols(DEFAULT_SYMBOLS),
            intervals: vec![Interval::M5, Interval::M15],
            refresh_secs: 60,
            signal: SignalParams::default(),
            pattern_params: BTreeMap::new(),
            volatility_symbol: "^VIX".to_string(),
            market_symbol: "SPY".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Read, normalize and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(text)?;
        config.symbols = parse_symbols(&config.symbols.join(","));
        config.validate()?;
        Ok(config)
    }

    /// Replace the watch list from comma-separated text
    pub fn with_symbols(mut self, input: &str) -> Self {
        self.symbols = parse_symbols(input);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ResonanceError::InvalidConfig("no symbols to watch".to_string()).into());
        }
        if self.intervals.is_empty() {
            return Err(ResonanceError::InvalidConfig("no intervals selected".to_string()).into());
        }
        if let Some(daily) = self.intervals.iter().find(|i| !i.is_intraday()) {
            return Err(ResonanceError::InvalidConfig(format!(
                "interval {daily} cannot be used for resonance"
            ))
            .into());
        }
        for (i, interval) in self.intervals.iter().enumerate() {
            if self.intervals[..i].contains(interval) {
                return Err(
                    ResonanceError::InvalidConfig(format!("interval {interval} listed twice")).into(),
                );
            }
        }
        REFRESH_META.validate(self.refresh_secs as f64)?;
        self.signal.validate()?;
        self.recognizer()?;
        Ok(())
    }

    pub fn recognizer(&self) -> crate::Result<PatternRecognizer> {
        PatternRecognizer::from_overrides(&self.pattern_params)
    }
}

/// Split a comma-separated list into trimmed, upper-cased, unique symbols
pub fn parse_symbols(input: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for symbol in input.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}
