use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Series, absent, close_prices};
use crate::model::Bar;

/// Simple Moving Average.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    /// Trailing mean of `period` prices, absent for the first `period - 1`
    /// positions.
    pub fn calculate_prices(&self, prices: &[f64]) -> Series {
        sma_values(prices, self.period)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn required_bars(&self) -> usize {
        self.period
    }

    fn calculate(&self, bars: &[Bar]) -> Series {
        self.calculate_prices(&close_prices(bars))
    }
}

/// Exponential Moving Average, seeded with the first price
/// (`α = 2 / (period + 1)`, no SMA warm-up).
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    /// EMA over `prices`; all absent when fewer than `period` prices.
    pub fn calculate_prices(&self, prices: &[f64]) -> Series {
        if prices.len() < self.period {
            return absent(prices.len());
        }
        ema_values(prices, self.period).into_iter().map(Some).collect()
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn required_bars(&self) -> usize {
        self.period
    }

    fn calculate(&self, bars: &[Bar]) -> Series {
        self.calculate_prices(&close_prices(bars))
    }
}

/// Trailing simple mean; `period` must be non-zero.
pub(crate) fn sma_values(prices: &[f64], period: usize) -> Series {
    if prices.len() < period {
        return absent(prices.len());
    }
    let mut out = absent(period - 1);
    out.extend(
        prices
            .windows(period)
            .map(|w| Some(w.iter().sum::<f64>() / period as f64)),
    );
    out
}

/// Recursive EMA defined from the first element on, regardless of length.
pub fn ema_values(prices: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());
    let mut iter = prices.iter();
    if let Some(&first) = iter.next() {
        let mut ema = first;
        out.push(ema);
        for &price in iter {
            ema = price * k + ema * (1.0 - k);
            out.push(ema);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::bars_from_closes;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let v = actual.expect("value should be defined");
        assert!((v - expected).abs() < 1e-9, "expected {expected}, got {v}");
    }

    #[test]
    fn sma_period_zero_invalid() {
        assert!(Sma::new(0).is_err());
    }

    #[test]
    fn sma_short_input_is_all_absent() {
        let sma = Sma::new(5).unwrap();
        let values = sma.calculate(&bars_from_closes(&[1.0; 4]));
        assert_eq!(values, vec![None; 4]);
    }

    #[test]
    fn sma_known_values() {
        let sma = Sma::new(3).unwrap();
        let values = sma.calculate(&bars_from_closes(&[10.0, 11.0, 12.0, 11.0, 10.0]));
        assert_eq!(values.len(), 5);
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert_close(values[2], 11.0);
        assert_close(values[3], 34.0 / 3.0);
        assert_close(values[4], 11.0);
    }

    #[test]
    fn sma_matches_trailing_mean() {
        let closes: Vec<f64> = (0..30).map(|i| ((i * 7) % 11) as f64 + 100.0).collect();
        let period = 6;
        let values = Sma::new(period).unwrap().calculate_prices(&closes);
        for (i, v) in values.iter().enumerate() {
            if i + 1 < period {
                assert_eq!(*v, None);
            } else {
                let mean = closes[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
                assert_close(*v, mean);
            }
        }
    }

    #[test]
    fn ema_period_zero_invalid() {
        assert!(Ema::new(0).is_err());
    }

    #[test]
    fn ema_short_input_is_all_absent() {
        let ema = Ema::new(5).unwrap();
        assert_eq!(ema.calculate(&bars_from_closes(&[1.0; 4])), vec![None; 4]);
    }

    #[test]
    fn ema_constant_series_is_constant() {
        for period in [1, 3, 14] {
            let ema = Ema::new(period).unwrap();
            let values = ema.calculate(&bars_from_closes(&[42.0; 20]));
            assert_eq!(values.len(), 20);
            for v in values {
                assert_close(v, 42.0);
            }
        }
    }

    #[test]
    fn ema_seeded_with_first_close() {
        let ema = Ema::new(3).unwrap();
        let values = ema.calculate(&bars_from_closes(&[1.0, 2.0, 3.0, 4.0]));
        // k = 0.5: 1, 1.5, 2.25, 3.125
        assert_close(values[0], 1.0);
        assert_close(values[1], 1.5);
        assert_close(values[2], 2.25);
        assert_close(values[3], 3.125);
    }

    #[test]
    fn ema_values_empty_input() {
        assert!(ema_values(&[], 5).is_empty());
    }
}
