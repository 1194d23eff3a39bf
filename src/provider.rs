//! Market data sources
//!
//! A provider returns one instrument's bars for one interval over a trailing
//! range of calendar days. Whatever shape the payload arrives in, callers only
//! ever see chronological, de-duplicated, finite [`Bar`]s.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{normalize_bars, Bar, FetchRange, Interval};

/// Errors raised while retrieving a series
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed for {symbol} {interval}: {message}")]
    Request {
        symbol: String,
        interval: Interval,
        message: String,
    },

    #[error("no data for {symbol} {interval}")]
    NotFound { symbol: String, interval: Interval },

    #[error("empty series for {symbol} {interval}")]
    Empty { symbol: String, interval: Interval },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of historical bars
pub trait MarketDataProvider {
    fn fetch(&self, symbol: &str, interval: Interval, range: FetchRange) -> Result<Vec<Bar>, ProviderError>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for &P {
    fn fetch(&self, symbol: &str, interval: Interval, range: FetchRange) -> Result<Vec<Bar>, ProviderError> {
        (**self).fetch(symbol, interval, range)
    }
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for Box<P> {
    fn fetch(&self, symbol: &str, interval: Interval, range: FetchRange) -> Result<Vec<Bar>, ProviderError> {
        (**self).fetch(symbol, interval, range)
    }
}

/// Keep bars within `range` of the latest timestamp
fn trim_to_range(bars: Vec<Bar>, range: FetchRange) -> Vec<Bar> {
    let Some(latest) = bars.last().map(|b| b.timestamp) else {
        return bars;
    };
    let cutoff = latest.saturating_sub(range.as_millis());
    bars.into_iter().filter(|b| b.timestamp >= cutoff).collect()
}

// ============================================================
// IN-MEMORY
// ============================================================

/// Fixed series held in memory, keyed by symbol and interval
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<(String, Interval), Vec<Bar>>,
    failing: HashSet<(String, Interval)>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, interval: Interval, bars: Vec<Bar>) {
        self.series.insert((symbol.into(), interval), bars);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_series(mut self, symbol: impl Into<String>, interval: Interval, bars: Vec<Bar>) -> Self {
        self.insert(symbol, interval, bars);
        self
    }

    /// Make every fetch of `symbol`/`interval` fail with a request error
    pub fn fail(&mut self, symbol: impl Into<String>, interval: Interval) {
        self.failing.insert((symbol.into(), interval));
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn fetch(&self, symbol: &str, interval: Interval, range: FetchRange) -> Result<Vec<Bar>, ProviderError> {
        let key = (symbol.to_string(), interval);
        if self.failing.contains(&key) {
            return Err(ProviderError::Request {
                symbol: symbol.to_string(),
                interval,
                message: "injected failure".to_string(),
            });
        }
        let bars = self
            .series
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                symbol: symbol.to_string(),
                interval,
            })?;
        if bars.is_empty() {
            return Err(ProviderError::Empty {
                symbol: symbol.to_string(),
                interval,
            });
        }
        let bars = normalize_bars(bars).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(trim_to_range(bars, range))
    }
}

// ============================================================
// JSON FILES
// ============================================================

/// Reads `{root}/{SYMBOL}/{interval}.json`.
///
/// Payloads may be row-oriented (`[{"time": .., "open": ..}, ..]`) or
/// column-oriented (`{"Date": [..], "Open": [..], ..}`). Field names are
/// case-insensitive; the time field may be `timestamp`, `time`, `date`,
/// `datetime` or `t`, holding epoch milliseconds, RFC 3339 text or a
/// `YYYY-MM-DD` date.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    root: PathBuf,
}

impl JsonFileProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.root.join(symbol).join(format!("{interval}.json"))
    }
}

impl MarketDataProvider for JsonFileProvider {
    fn fetch(&self, symbol: &str, interval: Interval, range: FetchRange) -> Result<Vec<Bar>, ProviderError> {
        let path = self.path_for(symbol, interval);
        if !path.exists() {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
                interval,
            });
        }
        let text = fs::read_to_string(&path)?;
        let raw = parse_payload(&text)?;
        if raw.is_empty() {
            return Err(ProviderError::Empty {
                symbol: symbol.to_string(),
                interval,
            });
        }
        let total = raw.len();
        let bars = normalize_bars(raw).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let bars = trim_to_range(bars, range);
        debug!(symbol, %interval, %range, rows = bars.len(), dropped = total - bars.len(), "loaded series");
        Ok(bars)
    }
}

const TIME_KEYS: [&str; 5] = ["timestamp", "time", "date", "datetime", "t"];
const PRICE_KEYS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Decode a row- or column-oriented payload into unnormalized bars
pub fn parse_payload(text: &str) -> Result<Vec<Bar>, ProviderError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(rows) => rows.iter().map(parse_row).collect(),
        Value::Object(columns) => parse_columns(&columns),
        _ => Err(ProviderError::Malformed(
            "expected an array of rows or an object of columns".to_string(),
        )),
    }
}

fn lowercase_keys(map: &Map<String, Value>) -> HashMap<String, &Value> {
    map.iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect()
}

fn find_time<'a>(fields: &HashMap<String, &'a Value>) -> Result<&'a Value, ProviderError> {
    TIME_KEYS
        .iter()
        .find_map(|k| fields.get(*k).copied())
        .ok_or_else(|| ProviderError::Malformed("missing time field".to_string()))
}

fn parse_row(row: &Value) -> Result<Bar, ProviderError> {
    let Value::Object(map) = row else {
        return Err(ProviderError::Malformed("row is not an object".to_string()));
    };
    let fields = lowercase_keys(map);
    let timestamp = parse_time(find_time(&fields)?)?;

    let mut values = [0.0; 5];
    for (slot, key) in values.iter_mut().zip(PRICE_KEYS) {
        let value = fields
            .get(key)
            .ok_or_else(|| ProviderError::Malformed(format!("missing field '{key}'")))?;
        *slot = parse_number(*value);
    }
    let [open, high, low, close, volume] = values;
    Ok(Bar::new(timestamp, open, high, low, close, volume))
}

fn parse_columns(columns: &Map<String, Value>) -> Result<Vec<Bar>, ProviderError> {
    let fields = lowercase_keys(columns);
    let column = |value: &Value, name: &str| -> Result<Vec<Value>, ProviderError> {
        match value {
            Value::Array(items) => Ok(items.clone()),
            _ => Err(ProviderError::Malformed(format!("column '{name}' is not an array"))),
        }
    };

    let times = column(find_time(&fields)?, "time")?;
    let mut series = Vec::with_capacity(PRICE_KEYS.len());
    for key in PRICE_KEYS {
        let value = fields
            .get(key)
            .ok_or_else(|| ProviderError::Malformed(format!("missing column '{key}'")))?;
        let items = column(*value, key)?;
        if items.len() != times.len() {
            return Err(ProviderError::Malformed(format!(
                "column '{key}' has {} rows, time has {}",
                items.len(),
                times.len()
            )));
        }
        series.push(items);
    }

    times
        .iter()
        .enumerate()
        .map(|(i, t)| {
            Ok(Bar::new(
                parse_time(t)?,
                parse_number(&series[0][i]),
                parse_number(&series[1][i]),
                parse_number(&series[2][i]),
                parse_number(&series[3][i]),
                parse_number(&series[4][i]),
            ))
        })
        .collect()
}

/// Numbers pass through; anything else becomes NaN and is dropped on normalization
fn parse_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn parse_time(value: &Value) -> Result<i64, ProviderError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| ProviderError::Malformed(format!("bad timestamp {n}"))),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.timestamp_millis());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp_millis())
                .ok_or_else(|| ProviderError::Malformed(format!("bad timestamp '{s}'")))
        },
        other => Err(ProviderError::Malformed(format!("bad timestamp {other}"))),
    }
}
