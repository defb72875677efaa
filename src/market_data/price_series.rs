use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single closing price observation.
///
/// `close` is `None` when the data provider returned a gap for this bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Bar open time, UNIX seconds.
    pub timestamp: i64,
    pub close: Option<f64>,
}

impl PricePoint {
    #[cfg(test)]
    pub fn new(timestamp: i64, close: f64) -> Self {
        Self {
            timestamp,
            close: Some(close),
        }
    }

    #[cfg(test)]
    pub fn missing(timestamp: i64) -> Self {
        Self {
            timestamp,
            close: None,
        }
    }

    /// The close, if present and finite.
    pub fn valid_close(&self) -> Option<f64> {
        self.close.filter(|c| c.is_finite())
    }
}

/// An ordered run of closes for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    /// Build a series from bare closes, assigning consecutive timestamps.
    #[cfg(test)]
    pub fn from_closes(closes: &[f64]) -> Self {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(i as i64, c))
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A copy of the points sorted by timestamp ascending.
    pub fn sorted_points(&self) -> Vec<PricePoint> {
        let mut points = self.points.clone();
        points.sort_by_key(|p| p.timestamp);
        points
    }

    /// The last two valid closes in time order as `(prev, last)`.
    pub fn last_two_closes(&self) -> Option<(f64, f64)> {
        let mut valid = self
            .sorted_points()
            .into_iter()
            .rev()
            .filter_map(|p| p.valid_close());
        let last = valid.next()?;
        let prev = valid.next()?;
        Some((prev, last))
    }
}

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// Bar size accepted by the chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl Default for Interval {
    fn default() -> Self {
        Self::FiveMinutes
    }
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }

    /// Parse either an interval code (`"15m"`) or a menu choice (`"3"`).
    ///
    /// Empty input selects the default. Anything unrecognised also falls back
    /// to the default with a warning rather than failing.
    pub fn from_choice(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "1" | "1m" => Self::OneMinute,
            "" | "2" | "5m" => Self::FiveMinutes,
            "3" | "15m" => Self::FifteenMinutes,
            "4" | "30m" => Self::ThirtyMinutes,
            "5" | "1h" | "60m" => Self::OneHour,
            "6" | "1d" => Self::OneDay,
            other => {
                warn!(choice = other, "unknown interval, using 5m");
                Self::default()
            }
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
