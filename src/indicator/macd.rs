use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::ema_values;
use crate::indicator::{Indicator, Series, close_prices};
use crate::model::Bar;

/// MACD line, signal and histogram, all built from first-price-seeded EMAs.
///
/// Values are defined from the first bar on once the input reaches
/// `max(fast, slow)` bars; the first few are numerically unsettled.
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            signal_period,
        })
    }

    /// Calculate (macd_line, signal_line, histogram) tuples, one per bar.
    pub fn calculate_full(&self, bars: &[Bar]) -> Vec<Option<(f64, f64, f64)>> {
        let prices = close_prices(bars);
        if prices.len() < self.required_bars() {
            return vec![None; prices.len()];
        }

        let fast_ema = ema_values(&prices, self.fast_period);
        let slow_ema = ema_values(&prices, self.slow_period);
        let macd_line: Vec<f64> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();
        let signal_line = ema_values(&macd_line, self.signal_period);

        macd_line
            .iter()
            .zip(signal_line.iter())
            .map(|(&m, &s)| Some((m, s, m - s)))
            .collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn required_bars(&self) -> usize {
        self.fast_period.max(self.slow_period)
    }

    /// Returns MACD line values only.
    fn calculate(&self, bars: &[Bar]) -> Series {
        self.calculate_full(bars)
            .into_iter()
            .map(|v| v.map(|(m, _, _)| m))
            .collect()
    }
}
