//! End-to-end cycle tests over an in-memory provider.

use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use mtf_resonance::prelude::*;

const DAY: i64 = 86_400_000;

fn trend(n: usize, step: f64, spacing: i64) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let c = 200.0 + i as f64 * step;
            Bar::new(i as i64 * spacing, c - 0.2, c + 0.4, c - 0.4, c, 1_000.0)
        })
        .collect()
}

fn with_thrust(mut bars: Vec<Bar>, pct: f64, spacing: i64) -> Vec<Bar> {
    let last = *bars.last().unwrap();
    let close = last.close * (1.0 + pct / 100.0);
    bars.push(Bar::new(
        last.timestamp + spacing,
        last.close,
        last.close.max(close),
        last.close.min(close),
        close,
        3_000.0,
    ));
    bars
}

/// Fifteen daily bars, the prior session spanning 110 / 90 around a 100 close
fn daily() -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..13)
        .map(|i| {
            let o = if i % 2 == 0 { 99.0 } else { 101.0 };
            Bar::new(i * DAY, o, 105.0, 95.0, 100.0, 5_000.0)
        })
        .collect();
    bars.push(Bar::new(13 * DAY, 100.0, 110.0, 90.0, 100.0, 5_000.0));
    bars.push(Bar::new(14 * DAY, 100.0, 102.0, 98.0, 101.0, 5_000.0));
    bars
}

fn context(provider: &mut InMemoryProvider) {
    provider.insert("^VIX", Interval::D1, vec![
        Bar::new(0, 18.0, 18.0, 18.0, 18.0, 0.0),
        Bar::new(DAY, 31.0, 31.0, 31.0, 31.0, 0.0),
    ]);
    provider.insert("SPY", Interval::D1, vec![
        Bar::new(0, 500.0, 500.0, 500.0, 500.0, 0.0),
        Bar::new(DAY, 490.0, 490.0, 490.0, 490.0, 0.0),
    ]);
}

/// M5 fires, M15 confirms the trend
fn add_bull(provider: &mut InMemoryProvider, symbol: &str) {
    provider.insert(symbol, Interval::M5, with_thrust(trend(260, 0.5, 300_000), 2.5, 300_000));
    provider.insert(symbol, Interval::M15, trend(260, 0.5, 900_000));
    provider.insert(symbol, Interval::D1, daily());
}

fn add_bear(provider: &mut InMemoryProvider, symbol: &str) {
    provider.insert(symbol, Interval::M5, with_thrust(trend(260, -0.5, 300_000), -2.5, 300_000));
    provider.insert(symbol, Interval::M15, trend(260, -0.5, 900_000));
    provider.insert(symbol, Interval::D1, daily());
}

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<AlertMessage>>,
}

impl Notifier for Recorder {
    fn send(&self, alert: &AlertMessage) -> std::result::Result<(), NotifyError> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct Offline;

impl Notifier for Offline {
    fn send(&self, _: &AlertMessage) -> std::result::Result<(), NotifyError> {
        Err(NotifyError::Rejected("offline".to_string()))
    }
}

fn at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 15, 45, 0).unwrap()
}

#[test]
fn test_bull_acceleration_is_notified() {
    let mut provider = InMemoryProvider::new();
    context(&mut provider);
    add_bull(&mut provider, "NVDA");

    let config = MonitorConfig::default().with_symbols("nvda");
    let monitor = Monitor::new(config, provider, Recorder::default()).unwrap();
    let report = monitor.run_cycle(at());

    assert_eq!(report.context.regime, VolatilityRegime::ExtremeFear);
    assert!((report.context.market_change_pct + 2.0).abs() < 1e-9);

    let nvda = &report.symbols[0];
    assert_eq!(nvda.verdict, Verdict::BullAcceleration);
    assert_eq!(nvda.intervals[0].1.signal(), Signal::Bull);
    assert_eq!(nvda.intervals[1].1.signal(), Signal::None);
    assert_eq!(nvda.intervals[1].1.trend(), TrendLabel::Bull);
    assert_eq!(report.delivered, 1);

    let sent = monitor.notifier().sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let alert = &sent[0];
    assert_eq!(alert.symbol, "NVDA");
    assert_eq!(alert.timestamp, at());
    assert_eq!(
        alert.details,
        vec![IntervalDetail {
            interval: Interval::M5,
            rationale: "ribbon-divergence+MACD-momentum(vr:2.7)".to_string(),
        }]
    );
    // quote comes from the last interval, which did not thrust
    assert!((alert.change_pct - 0.5 / 329.0 * 100.0).abs() < 1e-9);
    assert_eq!(alert.volume_ratio, 1.0);

    let levels = alert.levels.unwrap();
    assert!((levels.r1 - 110.0).abs() < 1e-9);
    assert!((levels.s1 - 90.0).abs() < 1e-9);
    // last range 4 over a mean range of (13 * 10 + 20 + 4) / 15
    assert!((alert.adr_usage_pct - 4.0 / (154.0 / 15.0) * 100.0).abs() < 1e-9);
    assert!(alert.to_string().starts_with("bull acceleration: NVDA"));
}

#[test]
fn test_bear_acceleration_is_notified() {
    let mut provider = InMemoryProvider::new();
    context(&mut provider);
    add_bear(&mut provider, "XPEV");

    let config = MonitorConfig::default().with_symbols("XPEV");
    let monitor = Monitor::new(config, provider, Recorder::default()).unwrap();
    let report = monitor.run_cycle(at());

    assert_eq!(report.symbols[0].verdict, Verdict::BearAcceleration);
    let sent = monitor.notifier().sent.lock().unwrap();
    assert_eq!(sent[0].details[0].rationale, "bear-alignment+MACD-selling-pressure(vr:2.7)");
}

#[test]
fn test_signal_without_confirming_trend_is_watch() {
    let mut provider = InMemoryProvider::new();
    add_bull(&mut provider, "TSM");
    // confirming interval trends down
    provider.insert("TSM", Interval::M15, trend(260, -0.5, 900_000));

    let config = MonitorConfig::default().with_symbols("TSM");
    let monitor = Monitor::new(config, provider, Recorder::default()).unwrap();
    let report = monitor.run_cycle(at());

    assert_eq!(report.symbols[0].verdict, Verdict::Watch);
    assert_eq!(report.symbols[0].details().len(), 1);
    assert_eq!(report.delivered, 0);
    assert!(monitor.notifier().sent.lock().unwrap().is_empty());
}

#[test]
fn test_missing_context_uses_fallback() {
    let mut provider = InMemoryProvider::new();
    add_bull(&mut provider, "NVDA");

    let config = MonitorConfig::default().with_symbols("NVDA");
    let monitor = Monitor::new(config, provider, Recorder::default()).unwrap();
    let report = monitor.evaluate_cycle(at());

    assert_eq!(report.context, ContextSnapshot::fallback());
    assert_eq!(report.symbols[0].verdict, Verdict::BullAcceleration);
    // evaluation alone never notifies
    assert!(monitor.notifier().sent.lock().unwrap().is_empty());
    assert_eq!(report.alerts().len(), 1);
}

#[test]
fn test_unavailable_symbol_does_not_stop_cycle() {
    let mut provider = InMemoryProvider::new();
    context(&mut provider);
    add_bull(&mut provider, "NVDA");
    provider.fail("BTC-USD", Interval::M5);

    let config = MonitorConfig::default().with_symbols("BTC-USD, NVDA");
    let monitor = Monitor::new(config, provider, Recorder::default()).unwrap();
    let report = monitor.run_cycle(at());

    let btc = &report.symbols[0];
    assert_eq!(btc.symbol, "BTC-USD");
    assert_eq!(btc.verdict, Verdict::Unavailable);
    assert!(btc.quote.is_none());
    assert!(btc.intervals.iter().all(|(_, c)| !c.is_available()));
    assert!(matches!(btc.patterns, PatternReport::Unavailable(_)));
    assert_eq!(btc.adr_usage_pct, 0.0);
    assert!(btc.levels.is_none());

    assert_eq!(report.symbols[1].verdict, Verdict::BullAcceleration);
    assert_eq!(report.delivered, 1);
}

#[test]
fn test_failed_first_interval_is_watch() {
    let mut provider = InMemoryProvider::new();
    add_bull(&mut provider, "AAPL");
    provider.fail("AAPL", Interval::M5);

    let config = MonitorConfig::default().with_symbols("AAPL");
    let monitor = Monitor::new(config, provider, Recorder::default()).unwrap();
    let report = monitor.evaluate_cycle(at());

    assert!(!report.symbols[0].intervals[0].1.is_available());
    assert_eq!(report.symbols[0].verdict, Verdict::Watch);
}

#[test]
fn test_delivery_failure_is_swallowed() {
    let mut provider = InMemoryProvider::new();
    context(&mut provider);
    add_bull(&mut provider, "NVDA");
    add_bear(&mut provider, "GLD");

    let config = MonitorConfig::default().with_symbols("NVDA,GLD");
    let monitor = Monitor::new(config, provider, Offline).unwrap();
    let report = monitor.run_cycle(at());

    assert_eq!(report.alerts().len(), 2);
    assert_eq!(report.delivered, 0);
}

#[test]
fn test_run_honours_cycle_cap() {
    let mut provider = InMemoryProvider::new();
    add_bull(&mut provider, "NVDA");

    let config = MonitorConfig::default().with_symbols("NVDA");
    let monitor = Monitor::new(config, provider, Recorder::default()).unwrap();
    monitor.run(Some(1));
    assert_eq!(monitor.notifier().sent.lock().unwrap().len(), 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = MonitorConfig {
        refresh_secs: 5,
        ..MonitorConfig::default()
    };
    let result = Monitor::new(config, InMemoryProvider::new(), Recorder::default());
    assert!(matches!(result, Err(ConfigError::Validation(_))));

    let empty = MonitorConfig::default().with_symbols(" , ");
    assert!(Monitor::new(empty, InMemoryProvider::new(), Recorder::default()).is_err());
}

#[test]
fn test_single_interval_fires_and_confirms() {
    let mut provider = InMemoryProvider::new();
    add_bull(&mut provider, "META");

    let config = MonitorConfig {
        intervals: vec![Interval::M5],
        ..MonitorConfig::default().with_symbols("META")
    };
    let monitor = Monitor::new(config, provider, Recorder::default()).unwrap();
    let report = monitor.evaluate_cycle(at());

    let meta = &report.symbols[0];
    assert_eq!(meta.verdict, Verdict::BullAcceleration);
    let quote = meta.quote.unwrap();
    assert!((quote.change_pct - 2.5).abs() < 1e-9);
}
