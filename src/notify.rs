//! Alert payloads and delivery channels
//!
//! Delivery is fire-and-forget: [`deliver`] logs a failed send and moves on.

use std::{fmt, io::Write, sync::Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{context::ContextSnapshot, levels::PivotLevels, monitor::Verdict, Interval};

/// Errors raised by a notification channel
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("channel rejected alert: {0}")]
    Rejected(String),
}

/// Rationale of one interval that fired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalDetail {
    pub interval: Interval,
    pub rationale: String,
}

/// Everything a reader needs to act on an acceleration verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub verdict: Verdict,
    pub symbol: String,
    pub price: f64,
    pub change_pct: f64,
    pub volume_ratio: f64,
    pub adr_usage_pct: f64,
    pub levels: Option<PivotLevels>,
    pub context: ContextSnapshot,
    pub details: Vec<IntervalDetail>,
    pub patterns: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for AlertMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.verdict, self.symbol)?;
        writeln!(f, "price: {:.2} ({:+.2}%)", self.price, self.change_pct)?;
        writeln!(
            f,
            "volume: {:.1}x | ADR: {:.1}%",
            self.volume_ratio, self.adr_usage_pct
        )?;
        match &self.levels {
            Some(levels) => writeln!(f, "levels: {levels}")?,
            None => writeln!(f, "levels: N/A")?,
        }
        writeln!(f, "market: {}", self.context)?;
        let details: Vec<String> = self
            .details
            .iter()
            .map(|d| format!("{}: {}", d.interval, d.rationale))
            .collect();
        writeln!(f, "details: {}", details.join("; "))?;
        writeln!(f, "candles: {}", self.patterns)?;
        write!(f, "at: {}", self.timestamp.format("%H:%M:%S"))
    }
}

/// An outbound alert channel
pub trait Notifier {
    fn send(&self, alert: &AlertMessage) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn send(&self, alert: &AlertMessage) -> Result<(), NotifyError> {
        (**self).send(alert)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn send(&self, alert: &AlertMessage) -> Result<(), NotifyError> {
        (**self).send(alert)
    }
}

/// Send one alert, logging rather than propagating failure.
///
/// Returns whether the channel accepted it.
pub fn deliver<N: Notifier + ?Sized>(notifier: &N, alert: &AlertMessage) -> bool {
    match notifier.send(alert) {
        Ok(()) => true,
        Err(e) => {
            warn!(symbol = %alert.symbol, verdict = %alert.verdict, error = %e, "alert delivery failed");
            false
        },
    }
}

/// Emits alerts through `tracing` at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, alert: &AlertMessage) -> Result<(), NotifyError> {
        info!(
            target: "alerts",
            symbol = %alert.symbol,
            verdict = %alert.verdict,
            price = alert.price,
            "\n{alert}"
        );
        Ok(())
    }
}

/// Writes one JSON object per alert per line
#[derive(Debug)]
pub struct JsonLinesNotifier<W> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLinesNotifier<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, NotifyError> {
        self.writer
            .into_inner()
            .map_err(|_| NotifyError::Rejected("writer lock poisoned".to_string()))
    }
}

impl<W: Write> Notifier for JsonLinesNotifier<W> {
    fn send(&self, alert: &AlertMessage) -> Result<(), NotifyError> {
        let line = serde_json::to_string(alert)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| NotifyError::Rejected("writer lock poisoned".to_string()))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
