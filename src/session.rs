use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use error_stack::{Report, bail};
use tracing::{debug, info, warn};

use crate::error::DataError;
use crate::model::{Bar, NormalizedSeries, RawTable};

/// Default x-distance between consecutive bars.
pub const DEFAULT_BAR_STEP: i64 = 3;

const TIME_COLUMNS: &[&str] = &["datetime", "timestamp"];

/// Accepted timestamp layouts, day-first before ISO.
const DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Trading hours and timezone that bars are localized to and filtered by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionWindow {
    pub timezone: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub bar_step: i64,
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Kolkata,
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN),
            bar_step: DEFAULT_BAR_STEP,
        }
    }
}

impl SessionWindow {
    /// Whether the local time-of-day of `ts` lies in `[open, close]`.
    pub fn contains(&self, ts: &DateTime<Tz>) -> bool {
        let t = ts.time();
        t >= self.open && t <= self.close
    }

    /// Localize a naive wall-clock time to the session timezone.
    ///
    /// Ambiguous times resolve to the earlier instant; times inside a DST
    /// gap do not exist and yield `None`.
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<Tz>> {
        self.timezone.from_local_datetime(naive).earliest()
    }
}

/// Parse a timestamp cell with the day-first convention.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Build a [`NormalizedSeries`] from raw rows.
///
/// Timestamps are parsed day-first and localized, then rows are sorted,
/// filtered to the session hours and deduplicated keeping the first
/// occurrence. Prices are only read from the rows that survive.
///
/// Fails when a required column is missing, when no timestamp parses,
/// or when nothing is left after session filtering. A surviving row with
/// a non-numeric price or inconsistent OHLC values also fails the load.
pub fn normalize(
    table: &RawTable,
    session: &SessionWindow,
) -> Result<NormalizedSeries, Report<DataError>> {
    let columns = Columns::resolve(table)?;

    // (timestamp, row position) for every row whose timestamp resolves
    let mut stamped: Vec<(DateTime<Tz>, usize)> = Vec::with_capacity(table.rows.len());
    let mut unparsable = 0usize;
    for (i, row) in table.rows.iter().enumerate() {
        match cell(row, columns.time)
            .and_then(parse_datetime)
            .and_then(|naive| session.localize(&naive))
        {
            Some(timestamp) => stamped.push((timestamp, i)),
            None => unparsable += 1,
        }
    }

    if stamped.is_empty() && unparsable > 0 {
        bail!(DataError::UnparsableTimestamps);
    }
    if unparsable > 0 {
        warn!(dropped = unparsable, "rows with unparsable timestamps dropped");
    }

    // Stable sort keeps file order among equal timestamps so dedup keeps the first.
    stamped.sort_by_key(|&(ts, _)| ts);
    let parsed = stamped.len();
    stamped.retain(|(ts, _)| session.contains(ts));
    let in_session = stamped.len();
    stamped.dedup_by_key(|&mut (ts, _)| ts);

    if stamped.is_empty() {
        bail!(DataError::EmptyAfterFilter);
    }

    let bars = stamped
        .into_iter()
        .map(|(timestamp, i)| columns.bar(&table.rows[i], i + 1, timestamp))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        parsed,
        outside_session = parsed - in_session,
        duplicates = in_session - bars.len(),
        "session filter applied"
    );
    info!(
        bars = bars.len(),
        first = %bars[0].timestamp,
        last = %bars[bars.len() - 1].timestamp,
        "series normalized"
    );

    Ok(NormalizedSeries::from_sorted(bars, session.bar_step))
}

fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
}

struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    vwap: Option<usize>,
    day_high: Option<usize>,
    day_low: Option<usize>,
}

impl Columns {
    fn resolve(table: &RawTable) -> Result<Self, Report<DataError>> {
        let required = |names: &[&str]| {
            table.column(names).ok_or_else(|| {
                Report::new(DataError::MissingColumn {
                    column: names[0].to_string(),
                })
            })
        };
        Ok(Self {
            time: required(TIME_COLUMNS)?,
            open: required(&["open"])?,
            high: required(&["high"])?,
            low: required(&["low"])?,
            close: required(&["close"])?,
            volume: table.column(&["volume"]),
            vwap: table.column(&["vwap"]),
            day_high: table.column(&["day_high"]),
            day_low: table.column(&["day_low"]),
        })
    }

    fn bar(
        &self,
        row: &[String],
        row_no: usize,
        timestamp: DateTime<Tz>,
    ) -> Result<Bar, Report<DataError>> {
        let price = |idx: usize, name: &str| -> Result<f64, Report<DataError>> {
            cell(row, idx)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    Report::new(DataError::InvalidValue {
                        row: row_no,
                        column: name.to_string(),
                    })
                })
        };
        let optional = |idx: Option<usize>, name: &str| -> Result<Option<f64>, Report<DataError>> {
            match idx.and_then(|i| cell(row, i)) {
                None => Ok(None),
                Some(s) => s
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(Some)
                    .ok_or_else(|| {
                        Report::new(DataError::InvalidValue {
                            row: row_no,
                            column: name.to_string(),
                        })
                    }),
            }
        };

        let open = price(self.open, "open")?;
        let high = price(self.high, "high")?;
        let low = price(self.low, "low")?;
        let close = price(self.close, "close")?;
        if high < open.max(close) || low > open.min(close) {
            bail!(DataError::InconsistentBar { row: row_no });
        }

        let volume = match optional(self.volume, "volume")? {
            Some(v) if v < 0.0 => bail!(DataError::InvalidValue {
                row: row_no,
                column: "volume".into(),
            }),
            Some(v) => Some(v.round() as u64),
            None => None,
        };

        Ok(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            vwap: optional(self.vwap, "vwap")?,
            day_high: optional(self.day_high, "day_high")?,
            day_low: optional(self.day_low, "day_low")?,
        })
    }
}
