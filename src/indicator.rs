pub mod bollinger;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod volume;
pub mod vwap;

use crate::model::Bar;

/// Indicator output aligned one-to-one with the input bars; `None` marks
/// positions where the value is undefined (warm-up or missing input).
pub type Series = Vec<Option<f64>>;

/// A technical analysis indicator that operates on a slice of bars.
///
/// Bars must be in ascending chronological order (oldest first).
pub trait Indicator: Send {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Number of bars below which the whole output is absent.
    fn required_bars(&self) -> usize;

    /// Calculate indicator values from bars.
    ///
    /// Always returns exactly one value per input bar. Too little input is
    /// not an error: the result is simply all `None`.
    fn calculate(&self, bars: &[Bar]) -> Series;
}

/// Extract close prices from a slice of bars.
pub fn close_prices(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// An all-absent series of length `len`.
pub fn absent(len: usize) -> Series {
    vec![None; len]
}
