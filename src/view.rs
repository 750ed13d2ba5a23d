use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::IndicatorResult;
use crate::indicator::volume::{VolumeBar, max_volume, volume_bars};
use crate::model::Bar;
use crate::replay::ReplayController;

/// Horizontal padding on each side of the window, in bar steps.
pub const X_PADDING_STEPS: i64 = 5;
/// Vertical padding as a fraction of the price range.
pub const Y_BUFFER_RATIO: f64 = 0.05;
/// Maximum x-distance between the cursor and a bar for a hover hit.
pub const HOVER_TOLERANCE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Top of the volume pane (10 % headroom), when volume is known.
    pub volume_max: Option<f64>,
}

impl Viewport {
    /// Range that fits every bar of the window.
    pub fn fit(bars: &[Bar], xs: &[i64], bar_step: i64) -> Option<Self> {
        let (first_x, last_x) = (*xs.first()?, *xs.last()?);
        let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let buffer = (high - low) * Y_BUFFER_RATIO;
        let pad = (X_PADDING_STEPS * bar_step) as f64;
        Some(Self {
            x_min: first_x as f64 - pad,
            x_max: last_x as f64 + pad,
            y_min: low - buffer,
            y_max: high + buffer,
            volume_max: max_volume(bars)
                .filter(|&v| v > 0)
                .map(|v| v as f64 * 1.1),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tick {
    pub x: i64,
    pub label: String,
}

/// Date labels at the first bar of each day, time labels at every bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AxisTicks {
    pub major: Vec<Tick>,
    pub minor: Vec<Tick>,
}

pub fn axis_ticks(bars: &[Bar], xs: &[i64]) -> AxisTicks {
    let mut ticks = AxisTicks::default();
    let mut last_day = None;
    for (bar, &x) in bars.iter().zip(xs) {
        let day = bar.date();
        if last_day != Some(day) {
            ticks.major.push(Tick {
                x,
                label: day.format("%d-%m-%Y").to_string(),
            });
            last_day = Some(day);
        }
        ticks.minor.push(Tick {
            x,
            label: bar.timestamp.format("%H:%M").to_string(),
        });
    }
    ticks
}

/// Window position of the bar under cursor x-coordinate `x`: the first bar
/// at or right of `x` (clamped to the last bar), if close enough.
pub fn hover_index(xs: &[i64], x: f64) -> Option<usize> {
    if xs.is_empty() || x.is_nan() {
        return None;
    }
    let idx = xs.partition_point(|&v| (v as f64) < x).min(xs.len() - 1);
    ((xs[idx] as f64 - x).abs() < HOVER_TOLERANCE).then_some(idx)
}

/// Everything known about one bar of the visible window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverInfo {
    pub x: i64,
    pub date: String,
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub vwap: Option<f64>,
    /// Defined indicator values at this bar.
    pub indicators: BTreeMap<String, f64>,
}

pub fn hover<S>(controller: &ReplayController<S>, x: f64) -> Option<HoverInfo> {
    let frame = controller.frame()?;
    let (bars, xs) = controller.visible_window();
    let idx = hover_index(xs, x)?;
    let bar = &bars[idx];
    Some(HoverInfo {
        x: xs[idx],
        date: bar.timestamp.format("%d-%m-%Y").to_string(),
        time: bar.timestamp.format("%H:%M:%S").to_string(),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        volume: bar.volume,
        day_high: bar.day_high,
        day_low: bar.day_low,
        vwap: bar.vwap,
        indicators: values_at(&frame.indicators, idx),
    })
}

fn values_at(result: &IndicatorResult, idx: usize) -> BTreeMap<String, f64> {
    result
        .series
        .keys()
        .filter_map(|name| Some((name.clone(), result.value_at(name, idx)?)))
        .collect()
}

/// Status line for the bar under the playhead, e.g.
/// `Candle 3/250: Date: 03-06-2024 09:21:00 IST O: ..., Vol: 12,500`.
pub fn info_line(position: usize, total: usize, bar: &Bar) -> String {
    let mut line = format!(
        "Candle {}/{}: Date: {} O: {:.2}, H: {:.2}, L: {:.2}, C: {:.2}",
        position + 1,
        total,
        bar.timestamp.format("%d-%m-%Y %H:%M:%S %Z"),
        bar.open,
        bar.high,
        bar.low,
        bar.close,
    );
    if let Some(volume) = bar.volume {
        line.push_str(&format!(", Vol: {}", group_thousands(volume)));
    }
    line
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarView {
    pub x: i64,
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub up: bool,
}

/// Render-ready view of the current frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// 0-based playhead.
    pub position: usize,
    pub total: usize,
    pub playing: bool,
    pub info: String,
    pub bars: Vec<BarView>,
    pub volume: Vec<VolumeBar>,
    pub indicators: IndicatorResult,
    pub viewport: Option<Viewport>,
    pub ticks: AxisTicks,
}

impl Snapshot {
    /// `None` until a dataset is loaded.
    pub fn capture<S>(controller: &ReplayController<S>) -> Option<Self> {
        let frame = controller.frame()?;
        let current = controller.current_bar()?;
        let state = controller.state();
        let series = controller.series();
        let (bars, xs) = controller.visible_window();

        Some(Self {
            position: state.current_index,
            total: series.len(),
            playing: state.is_playing(),
            info: info_line(state.current_index, series.len(), current),
            bars: bars
                .iter()
                .zip(xs)
                .map(|(b, &x)| BarView {
                    x,
                    timestamp: b.timestamp.to_rfc3339(),
                    open: b.open,
                    high: b.high,
                    low: b.low,
                    close: b.close,
                    up: b.is_up(),
                })
                .collect(),
            volume: volume_bars(bars),
            indicators: frame.indicators.clone(),
            viewport: Viewport::fit(bars, xs, series.bar_step()),
            ticks: axis_ticks(bars, xs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EMA, IndicatorConfig};
    use crate::model::test_support::{bar_at, bars_from_closes};
    use crate::replay::tests::{RecordingScheduler, controller_with};
    use crate::session::SessionWindow;

    #[test]
    fn viewport_pads_both_axes() {
        let mut bars = bars_from_closes(&[10.0, 20.0]);
        bars[0].low = 10.0;
        bars[1].high = 30.0;
        bars[1].volume = Some(1000);
        let vp = Viewport::fit(&bars, &[0, 3], 3).unwrap();
        assert_eq!(vp.x_min, -15.0);
        assert_eq!(vp.x_max, 18.0);
        assert!((vp.y_min - 9.0).abs() < 1e-9);
        assert!((vp.y_max - 31.0).abs() < 1e-9);
        assert!((vp.volume_max.unwrap() - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn viewport_empty_window() {
        assert!(Viewport::fit(&[], &[], 3).is_none());
    }

    #[test]
    fn ticks_mark_day_starts() {
        let bars = vec![
            bar_at(3, 15, 27, 1.0),
            bar_at(3, 15, 30, 1.0),
            bar_at(4, 9, 15, 1.0),
        ];
        let ticks = axis_ticks(&bars, &[0, 3, 6]);
        assert_eq!(
            ticks.major,
            vec![
                Tick {
                    x: 0,
                    label: "03-06-2024".into()
                },
                Tick {
                    x: 6,
                    label: "04-06-2024".into()
                },
            ]
        );
        let labels: Vec<&str> = ticks.minor.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["15:27", "15:30", "09:15"]);
    }

    #[test]
    fn hover_index_picks_bar_at_or_after_cursor() {
        let xs = [0, 3, 6, 9];
        assert_eq!(hover_index(&xs, 0.0), Some(0));
        assert_eq!(hover_index(&xs, 4.0), Some(2));
        assert_eq!(hover_index(&xs, 25.0), None);
        assert_eq!(hover_index(&xs, 15.0), Some(3));
        assert_eq!(hover_index(&xs, -12.0), None);
        assert_eq!(hover_index(&[], 1.0), None);
    }

    #[test]
    fn info_line_formats_current_bar() {
        let mut bar = bar_at(3, 9, 21, 101.5);
        bar.volume = Some(1_234_567);
        let line = info_line(2, 250, &bar);
        assert_eq!(
            line,
            "Candle 3/250: Date: 03-06-2024 09:21:00 IST O: 101.50, H: 101.50, L: 101.50, C: 101.50, Vol: 1,234,567"
        );
    }

    #[test]
    fn group_thousands_small_numbers() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
    }

    #[test]
    fn hover_reports_indicator_values() {
        let mut c = controller_with(30);
        c.jump_to_index(29);
        let (_, xs) = c.visible_window();
        let x = xs[20] as f64;
        let info = hover(&c, x).unwrap();
        assert_eq!(info.x, xs[20]);
        assert!(info.indicators.contains_key(EMA));
    }

    #[test]
    fn snapshot_tracks_controller() {
        let mut c = controller_with(30);
        c.jump_to_index(9);
        let snap = Snapshot::capture(&c).unwrap();
        assert_eq!(snap.position, 9);
        assert_eq!(snap.total, 30);
        assert_eq!(snap.bars.len(), 10);
        assert_eq!(snap.volume.len(), 10);
        assert_eq!(snap.indicators.len, 10);
        assert!(snap.info.starts_with("Candle 10/30"));
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["position"], 9);
    }

    #[test]
    fn snapshot_requires_data() {
        let c = crate::replay::ReplayController::new(
            RecordingScheduler::default(),
            SessionWindow::default(),
            IndicatorConfig::default(),
        );
        assert!(Snapshot::capture(&c).is_none());
        assert!(hover(&c, 0.0).is_none());
    }
}
