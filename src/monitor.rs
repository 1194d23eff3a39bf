//! Refresh-cycle driver
//!
//! Each cycle captures the market context once, then for every symbol:
//! the daily series feeds ADR usage, pivot levels and candle patterns, and
//! each configured interval is classified in order. The first interval's
//! signal and the last interval's trend decide the verdict; acceleration
//! verdicts are sent to the notifier.

use std::{fmt, thread, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::{ConfigError, MonitorConfig},
    context::{ContextSnapshot, MarketContextGauge},
    detectors::{PatternRecognizer, PatternReport},
    indicators::{IndicatorEngine, IndicatorFrame},
    levels::{adr_usage_pct, PivotLevels},
    notify::{deliver, AlertMessage, IntervalDetail, Notifier},
    provider::MarketDataProvider,
    resonance::{Classification, ResonanceClassifier, Signal, TrendLabel},
    Interval,
};

/// Per-symbol conclusion of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    BullAcceleration,
    BearAcceleration,
    Watch,
    /// The confirming interval had no usable data
    Unavailable,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::BullAcceleration => "bull acceleration",
            Verdict::BearAcceleration => "bear acceleration",
            Verdict::Watch => "watch",
            Verdict::Unavailable => "unavailable",
        }
    }

    #[inline]
    pub fn is_alert(self) -> bool {
        matches!(self, Verdict::BullAcceleration | Verdict::BearAcceleration)
    }

    /// First interval fires, last interval confirms
    pub fn decide(first_signal: Signal, last_trend: TrendLabel) -> Self {
        match (first_signal, last_trend) {
            (Signal::Bull, TrendLabel::Bull) => Verdict::BullAcceleration,
            (Signal::Bear, TrendLabel::Bear) => Verdict::BearAcceleration,
            _ => Verdict::Watch,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Latest price snapshot from the confirming interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub change_pct: f64,
    pub volume_ratio: f64,
}

impl Quote {
    pub fn from_frame(frame: &IndicatorFrame) -> Option<Self> {
        let (_, last) = frame.last_pair()?;
        let change_pct = frame.last_change_pct().filter(|pc| pc.is_finite())?;
        Some(Self {
            price: last.close,
            change_pct,
            volume_ratio: last.volume_ratio(),
        })
    }
}

/// Everything derived for one symbol in one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolReport {
    pub symbol: String,
    pub verdict: Verdict,
    /// In configured order
    pub intervals: Vec<(Interval, Classification)>,
    pub quote: Option<Quote>,
    pub adr_usage_pct: f64,
    pub levels: Option<PivotLevels>,
    pub patterns: PatternReport,
}

impl SymbolReport {
    /// Rationale of every interval that fired
    pub fn details(&self) -> Vec<IntervalDetail> {
        self.intervals
            .iter()
            .filter_map(|(interval, c)| match c {
                Classification::Evaluated(r) if r.signal.is_some() => Some(IntervalDetail {
                    interval: *interval,
                    rationale: r.rationale.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Alert payload for acceleration verdicts
    pub fn alert(&self, context: ContextSnapshot, at: DateTime<Utc>) -> Option<AlertMessage> {
        if !self.verdict.is_alert() {
            return None;
        }
        let quote = self.quote?;
        Some(AlertMessage {
            verdict: self.verdict,
            symbol: self.symbol.clone(),
            price: quote.price,
            change_pct: quote.change_pct,
            volume_ratio: quote.volume_ratio,
            adr_usage_pct: self.adr_usage_pct,
            levels: self.levels,
            context,
            details: self.details(),
            patterns: self.patterns.to_string(),
            timestamp: at,
        })
    }
}

/// Outcome of one refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub at: DateTime<Utc>,
    pub context: ContextSnapshot,
    pub symbols: Vec<SymbolReport>,
    /// Alerts the notifier accepted
    pub delivered: usize,
}

impl CycleReport {
    pub fn alerts(&self) -> Vec<AlertMessage> {
        self.symbols
            .iter()
            .filter_map(|s| s.alert(self.context, self.at))
            .collect()
    }
}

/// Watches a symbol list on a fixed refresh cadence
pub struct Monitor<P, N> {
    config: MonitorConfig,
    provider: P,
    notifier: N,
    engine: IndicatorEngine,
    classifier: ResonanceClassifier,
    recognizer: PatternRecognizer,
    gauge: MarketContextGauge,
}

impl<P: MarketDataProvider, N: Notifier> Monitor<P, N> {
    pub fn new(config: MonitorConfig, provider: P, notifier: N) -> Result<Self, ConfigError> {
        config.validate()?;
        let recognizer = config.recognizer()?;
        Ok(Self {
            classifier: ResonanceClassifier::new(config.signal),
            gauge: MarketContextGauge::new(&config.volatility_symbol, &config.market_symbol),
            engine: IndicatorEngine::default(),
            recognizer,
            config,
            provider,
            notifier,
        })
    }

    #[inline]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    #[inline]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn frame(&self, symbol: &str, interval: Interval) -> crate::Result<IndicatorFrame> {
        let bars = self
            .provider
            .fetch(symbol, interval, interval.default_fetch_range())?;
        self.engine.compute(&bars)
    }

    /// Evaluate one symbol against the configured intervals
    pub fn evaluate_symbol(&self, symbol: &str) -> SymbolReport {
        let (adr, levels, patterns) = match self
            .provider
            .fetch(symbol, Interval::D1, Interval::D1.default_fetch_range())
        {
            Ok(daily) => (
                adr_usage_pct(&daily),
                PivotLevels::from_daily(&daily),
                self.recognizer.analyze(&daily),
            ),
            Err(e) => {
                warn!(symbol, error = %e, "daily series unavailable");
                (0.0, None, PatternReport::Unavailable(e.to_string()))
            },
        };

        let mut intervals = Vec::with_capacity(self.config.intervals.len());
        let mut last_frame: Option<IndicatorFrame> = None;
        for &interval in &self.config.intervals {
            let frame = self.frame(symbol, interval);
            let classification = self.classifier.assess(frame.as_ref());
            match &classification {
                Classification::Evaluated(r) => {
                    debug!(symbol, %interval, signal = %r.signal, trend = %r.trend, "interval classified")
                },
                Classification::Unavailable(reason) => {
                    warn!(symbol, %interval, %reason, "interval unavailable")
                },
            }
            intervals.push((interval, classification));
            last_frame = frame.ok();
        }

        let quote = last_frame.as_ref().and_then(Quote::from_frame);
        let verdict = match (intervals.first(), quote) {
            (Some((_, first)), Some(_)) => {
                let last_trend = intervals
                    .last()
                    .map(|(_, c)| c.trend())
                    .unwrap_or(TrendLabel::Side);
                Verdict::decide(first.signal(), last_trend)
            },
            _ => Verdict::Unavailable,
        };

        SymbolReport {
            symbol: symbol.to_string(),
            verdict,
            intervals,
            quote,
            adr_usage_pct: adr,
            levels,
            patterns,
        }
    }

    /// Evaluate every symbol without notifying
    pub fn evaluate_cycle(&self, at: DateTime<Utc>) -> CycleReport {
        let context = self.gauge.capture(&self.provider);
        let symbols = self
            .config
            .symbols
            .iter()
            .map(|s| self.evaluate_symbol(s))
            .collect();
        CycleReport {
            at,
            context,
            symbols,
            delivered: 0,
        }
    }

    /// Evaluate every symbol and notify acceleration verdicts
    pub fn run_cycle(&self, at: DateTime<Utc>) -> CycleReport {
        let mut report = self.evaluate_cycle(at);
        let alerts = report.alerts();
        for alert in &alerts {
            info!(symbol = %alert.symbol, verdict = %alert.verdict, price = alert.price, "acceleration");
            if deliver(&self.notifier, alert) {
                report.delivered += 1;
            }
        }
        info!(
            symbols = report.symbols.len(),
            alerts = alerts.len(),
            delivered = report.delivered,
            regime = %report.context.regime,
            "cycle complete"
        );
        report
    }

    /// Run cycles every `refresh_secs` until `max_cycles` (forever when `None`)
    pub fn run(&self, max_cycles: Option<usize>) {
        let pause = Duration::from_secs(self.config.refresh_secs);
        let mut completed = 0usize;
        loop {
            self.run_cycle(Utc::now());
            completed += 1;
            if max_cycles.is_some_and(|max| completed >= max) {
                break;
            }
            thread::sleep(pause);
        }
    }
}

impl<P, N> fmt::Debug for Monitor<P, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("classifier", &self.classifier)
            .field("gauge", &self.gauge)
            .finish_non_exhaustive()
    }
}
