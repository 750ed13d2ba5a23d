use crate::engine::{EMA, MACD, RSI, SMA, VWAP};
use crate::sink::FrameSink;
use crate::stats::SessionStats;
use crate::view::Snapshot;

/// Writes frames to the log instead of drawing them.
pub struct TerminalSink;

impl FrameSink for TerminalSink {
    fn present(&self, snapshot: &Snapshot) {
        let last = snapshot.indicators.len.saturating_sub(1);
        let value = |name: &str| snapshot.indicators.value_at(name, last);
        tracing::info!(
            position = snapshot.position,
            window = snapshot.indicators.len,
            vwap = value(VWAP),
            ema = value(EMA),
            sma = value(SMA),
            rsi = value(RSI),
            macd = value(MACD),
            "{}",
            snapshot.info,
        );
    }

    fn summary(&self, stats: &SessionStats) {
        tracing::info!(
            bars = stats.count,
            high = stats.max_high,
            low = stats.min_low,
            total_volume = stats.total_volume,
            avg_volume = stats.avg_volume,
            "data range {}",
            stats.date_range_label(),
        );
    }
}
