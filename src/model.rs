use std::fmt;
use std::ops::Range;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Bar interval of a data file.
///
/// String representations match the default data file names
/// (e.g. `"3min"` selects `Nifty_Fut_3min.csv`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    Min1,
    Min3,
    Min5,
    Min15,
    Min30,
    Hour1,
}

impl TimeFrame {
    /// Parse a config-format string into a `TimeFrame`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1min" => Some(Self::Min1),
            "3min" => Some(Self::Min3),
            "5min" => Some(Self::Min5),
            "15min" => Some(Self::Min15),
            "30min" => Some(Self::Min30),
            "1hour" => Some(Self::Hour1),
            _ => None,
        }
    }

    /// Return the config-format string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min1 => "1min",
            Self::Min3 => "3min",
            Self::Min5 => "5min",
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Hour1 => "1hour",
        }
    }

    /// Name of the default data file for this timeframe.
    pub fn default_file_name(self) -> String {
        format!("Nifty_Fut_{}.csv", self.as_str())
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One OHLCV observation, timestamped in the session timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Tz>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
    pub vwap: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
}

impl Bar {
    /// Local calendar date of the bar.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// A flat bar (`close == open`) counts as up.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Untyped tabular input as read from a data file: a header row and
/// string cells. Rows may be shorter than the header.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of the first column whose trimmed, lowercased header
    /// equals one of `names`.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        self.headers.iter().position(|h| {
            let h = h.trim().to_ascii_lowercase();
            names.iter().any(|n| *n == h)
        })
    }
}

/// Session-filtered, deduplicated, ascending bars with their uniform
/// x-coordinates.
///
/// Built once per load and never mutated; a reload replaces it.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSeries {
    bars: Vec<Bar>,
    continuous_index: Vec<i64>,
    bar_step: i64,
}

impl NormalizedSeries {
    /// Assign `continuous_index = ordinal * bar_step` to already
    /// sorted, unique bars.
    pub(crate) fn from_sorted(bars: Vec<Bar>, bar_step: i64) -> Self {
        let continuous_index = (0..bars.len() as i64).map(|i| i * bar_step).collect();
        Self {
            bars,
            continuous_index,
            bar_step,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn continuous_index(&self) -> &[i64] {
        &self.continuous_index
    }

    pub fn bar_step(&self) -> i64 {
        self.bar_step
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Bars and x-coordinates for `range`. Panics if out of bounds.
    pub fn slice(&self, range: Range<usize>) -> (&[Bar], &[i64]) {
        (
            &self.bars[range.clone()],
            &self.continuous_index[range],
        )
    }

    /// Position of the first bar whose local date is `>= date`.
    pub fn first_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.bars.partition_point(|b| b.date() < date);
        (idx < self.bars.len()).then_some(idx)
    }
}
