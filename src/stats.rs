use chrono::NaiveDate;
use serde::Serialize;

use crate::model::NormalizedSeries;

/// Summary of a loaded dataset, computed once per load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub count: usize,
    pub min_low: f64,
    pub max_high: f64,
    /// Absent when no bar carries a volume or the sum overflows `u64`.
    pub total_volume: Option<u64>,
    /// Mean over the bars that carry a volume.
    pub avg_volume: Option<f64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SessionStats {
    /// `None` for an empty series.
    pub fn compute(series: &NormalizedSeries) -> Option<Self> {
        let bars = series.bars();
        let first = bars.first()?;
        let last = bars.last()?;

        let min_low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let max_high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

        let volumes: Vec<u64> = bars.iter().filter_map(|b| b.volume).collect();
        let (total_volume, avg_volume) = if volumes.is_empty() {
            (None, None)
        } else {
            let total = volumes.iter().try_fold(0u64, |acc, &v| acc.checked_add(v));
            let mean = volumes.iter().map(|&v| v as f64).sum::<f64>() / volumes.len() as f64;
            (total, Some(mean))
        };

        Some(Self {
            count: bars.len(),
            min_low,
            max_high,
            total_volume,
            avg_volume,
            start_date: first.date(),
            end_date: last.date(),
        })
    }

    /// Date range as `dd-mm-YYYY to dd-mm-YYYY`.
    pub fn date_range_label(&self) -> String {
        format!(
            "{} to {}",
            self.start_date.format("%d-%m-%Y"),
            self.end_date.format("%d-%m-%Y")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::bar_at;

    fn series() -> NormalizedSeries {
        let mut bars = vec![
            bar_at(3, 9, 15, 10.0),
            bar_at(3, 9, 18, 12.0),
            bar_at(4, 9, 15, 11.0),
        ];
        bars[0].low = 9.5;
        bars[1].high = 12.75;
        bars[0].volume = Some(100);
        bars[1].volume = Some(300);
        bars[2].volume = None;
        NormalizedSeries::from_sorted(bars, 3)
    }

    #[test]
    fn computes_extremes_and_volume() {
        let stats = SessionStats::compute(&series()).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min_low, 9.5);
        assert_eq!(stats.max_high, 12.75);
        assert_eq!(stats.total_volume, Some(400));
        assert_eq!(stats.avg_volume, Some(200.0));
    }

    #[test]
    fn computes_date_range() {
        let stats = SessionStats::compute(&series()).unwrap();
        assert_eq!(stats.start_date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(stats.end_date, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
        assert_eq!(stats.date_range_label(), "03-06-2024 to 04-06-2024");
    }

    #[test]
    fn no_volume_column_gives_absent_totals() {
        let bars = vec![bar_at(3, 9, 15, 10.0)]
            .into_iter()
            .map(|mut b| {
                b.volume = None;
                b
            })
            .collect();
        let stats = SessionStats::compute(&NormalizedSeries::from_sorted(bars, 3)).unwrap();
        assert_eq!(stats.total_volume, None);
        assert_eq!(stats.avg_volume, None);
    }

    #[test]
    fn overflowing_total_volume_is_absent() {
        let mut bars = vec![bar_at(3, 9, 15, 10.0), bar_at(3, 9, 18, 10.0)];
        bars[0].volume = Some(u64::MAX);
        bars[1].volume = Some(1);
        let stats = SessionStats::compute(&NormalizedSeries::from_sorted(bars, 3)).unwrap();
        assert_eq!(stats.total_volume, None);
        assert!(stats.avg_volume.unwrap() > 9.0e18);
    }

    #[test]
    fn empty_series_has_no_stats() {
        assert!(SessionStats::compute(&NormalizedSeries::default()).is_none());
    }
}
