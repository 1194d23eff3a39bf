//! Market Context Gauge
//!
//! Coarse regime label from a volatility index and the daily return of a broad
//! market index. Best-effort: any failure yields [`ContextSnapshot::fallback`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    provider::MarketDataProvider, FetchRange, Interval, ResonanceError, Result, OHLCV,
};

pub const EXTREME_FEAR_LEVEL: f64 = 28.0;
pub const ELEVATED_LEVEL: f64 = 20.0;

/// Volatility regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    ExtremeFear,
    Elevated,
    Calm,
    /// Context could not be gathered this cycle
    DataLoading,
}

impl VolatilityRegime {
    pub fn label(self) -> &'static str {
        match self {
            VolatilityRegime::ExtremeFear => "extreme-fear",
            VolatilityRegime::Elevated => "elevated",
            VolatilityRegime::Calm => "calm",
            VolatilityRegime::DataLoading => "data loading",
        }
    }
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared per-cycle market backdrop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Latest volatility-index close
    pub volatility: f64,
    /// Broad-market close-to-close change, percent
    pub market_change_pct: f64,
    pub regime: VolatilityRegime,
}

impl ContextSnapshot {
    /// `{20.0, 0.0, "data loading"}`
    pub const fn fallback() -> Self {
        Self {
            volatility: 20.0,
            market_change_pct: 0.0,
            regime: VolatilityRegime::DataLoading,
        }
    }
}

impl fmt::Display for ContextSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | VOL: {:.2} | MKT: {:+.2}%",
            self.regime, self.volatility, self.market_change_pct
        )
    }
}

/// Classifies the volatility level and measures the market's daily move
#[derive(Debug, Clone)]
pub struct MarketContextGauge {
    pub volatility_symbol: String,
    pub market_symbol: String,
    pub extreme_level: f64,
    pub elevated_level: f64,
}

impl Default for MarketContextGauge {
    fn default() -> Self {
        Self::new("^VIX", "SPY")
    }
}

impl MarketContextGauge {
    pub fn new(volatility_symbol: impl Into<String>, market_symbol: impl Into<String>) -> Self {
        Self {
            volatility_symbol: volatility_symbol.into(),
            market_symbol: market_symbol.into(),
            extreme_level: EXTREME_FEAR_LEVEL,
            elevated_level: ELEVATED_LEVEL,
        }
    }

    /// Strictly above each level moves up one regime
    pub fn regime(&self, level: f64) -> VolatilityRegime {
        if level > self.extreme_level {
            VolatilityRegime::ExtremeFear
        } else if level > self.elevated_level {
            VolatilityRegime::Elevated
        } else {
            VolatilityRegime::Calm
        }
    }

    /// Summarize already-fetched daily series
    pub fn assess<V: OHLCV, M: OHLCV>(&self, volatility: &[V], market: &[M]) -> Result<ContextSnapshot> {
        let level = volatility
            .last()
            .map(|b| b.close())
            .ok_or(ResonanceError::InsufficientData { need: 1, got: 0 })?;

        let [.., prior, latest] = market else {
            return Err(ResonanceError::InsufficientData {
                need: 2,
                got: market.len(),
            });
        };
        let prior_close = prior.close();
        if !level.is_finite() || !prior_close.is_finite() || prior_close == 0.0 {
            return Err(ResonanceError::DataUnavailable(
                "non-finite or zero context close".to_string(),
            ));
        }

        Ok(ContextSnapshot {
            volatility: level,
            market_change_pct: (latest.close() - prior_close) / prior_close * 100.0,
            regime: self.regime(level),
        })
    }

    /// Fetch both series and summarize, degrading to the fallback snapshot
    pub fn capture<P: MarketDataProvider + ?Sized>(&self, provider: &P) -> ContextSnapshot {
        let range = FetchRange::days(5);
        let fetched = provider
            .fetch(&self.volatility_symbol, Interval::D1, range)
            .and_then(|v| {
                provider
                    .fetch(&self.market_symbol, Interval::D1, range)
                    .map(|m| (v, m))
            });

        let snapshot = fetched
            .map_err(ResonanceError::from)
            .and_then(|(v, m)| self.assess(&v, &m));

        match snapshot {
            Ok(s) => {
                debug!(volatility = s.volatility, change = s.market_change_pct, regime = %s.regime, "market context");
                s
            },
            Err(e) => {
                warn!(error = %e, "market context unavailable, using fallback");
                ContextSnapshot::fallback()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{provider::InMemoryProvider, Bar};

    fn closes(values: &[f64]) -> Vec<Bar> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 86_400_000, c, c, c, c, 0.0))
            .collect()
    }

    #[test]
    fn test_regime_levels() {
        let g = MarketContextGauge::default();
        assert_eq!(g.regime(30.0), VolatilityRegime::ExtremeFear);
        assert_eq!(g.regime(28.0), VolatilityRegime::Elevated);
        assert_eq!(g.regime(22.0), VolatilityRegime::Elevated);
        assert_eq!(g.regime(20.0), VolatilityRegime::Calm);
        assert_eq!(g.regime(10.0), VolatilityRegime::Calm);
    }

    #[test]
    fn test_assess() {
        let g = MarketContextGauge::default();
        let s = g.assess(&closes(&[18.0, 30.0]), &closes(&[400.0, 404.0])).unwrap();
        assert_eq!(s.volatility, 30.0);
        assert!((s.market_change_pct - 1.0).abs() < 1e-12);
        assert_eq!(s.regime, VolatilityRegime::ExtremeFear);
    }

    #[test]
    fn test_assess_needs_two_market_bars() {
        let g = MarketContextGauge::default();
        assert!(matches!(
            g.assess(&closes(&[15.0]), &closes(&[400.0])),
            Err(ResonanceError::InsufficientData { need: 2, got: 1 })
        ));
        assert!(g.assess(&closes(&[]), &closes(&[400.0, 401.0])).is_err());
    }

    #[test]
    fn test_capture_falls_back() {
        let provider = InMemoryProvider::new();
        let s = MarketContextGauge::default().capture(&provider);
        assert_eq!(s, ContextSnapshot::fallback());
        assert_eq!(s.volatility, 20.0);
        assert_eq!(s.market_change_pct, 0.0);
        assert_eq!(s.regime.label(), "data loading");
    }

    #[test]
    fn test_capture_from_provider() {
        let mut provider = InMemoryProvider::new();
        provider.insert("^VIX", Interval::D1, closes(&[21.0, 22.0]));
        provider.insert("SPY", Interval::D1, closes(&[500.0, 495.0]));
        let s = MarketContextGauge::default().capture(&provider);
        assert_eq!(s.regime, VolatilityRegime::Elevated);
        assert!((s.market_change_pct + 1.0).abs() < 1e-12);
        assert_eq!(s.to_string(), "elevated | VOL: 22.00 | MKT: -1.00%");
    }
}
