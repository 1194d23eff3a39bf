//! Daily reference levels carried on alerts

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{OHLCVExt, OHLCV};

/// Classic floor-pivot first resistance and support
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub s1: f64,
}

impl PivotLevels {
    /// Levels from one session's high, low and close
    pub fn from_bar<T: OHLCV>(bar: &T) -> Self {
        let pivot = (bar.high() + bar.low() + bar.close()) / 3.0;
        Self {
            pivot,
            r1: 2.0 * pivot - bar.low(),
            s1: 2.0 * pivot - bar.high(),
        }
    }

    /// Levels from the session before the latest one
    pub fn from_daily<T: OHLCV>(daily: &[T]) -> Option<Self> {
        match daily {
            [.., prior, _] => Some(Self::from_bar(prior)),
            _ => None,
        }
    }
}

impl fmt::Display for PivotLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R1:{:.2} | S1:{:.2}", self.r1, self.s1)
    }
}

/// Latest session's range as a percent of the average daily range.
///
/// Zero when the series is empty or the average range is not positive.
pub fn adr_usage_pct<T: OHLCV>(daily: &[T]) -> f64 {
    let Some(last) = daily.last() else {
        return 0.0;
    };
    let adr = daily.iter().map(|b| b.range()).sum::<f64>() / daily.len() as f64;
    if adr > 0.0 {
        last.range() / adr * 100.0
    } else {
        0.0
    }
}
