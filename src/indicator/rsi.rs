use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Series, absent, close_prices};
use crate::model::Bar;

/// RSI (Relative Strength Index) over simple trailing means of gains and
/// losses.
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn required_bars(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, bars: &[Bar]) -> Series {
        let prices = close_prices(bars);
        if prices.len() < self.required_bars() {
            return absent(prices.len());
        }

        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        // Position i needs deltas i-period+1..=i (delta k sits at price k+1).
        let mut results = absent(self.period);
        results.extend(deltas.windows(self.period).map(|w| {
            let avg_gain = w.iter().map(|&d| d.max(0.0)).sum::<f64>() / self.period as f64;
            let avg_loss = w.iter().map(|&d| (-d).max(0.0)).sum::<f64>() / self.period as f64;
            Some(rsi_value(avg_gain, avg_loss))
        }));

        results
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
