use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::sma_values;
use crate::indicator::{Indicator, Series, close_prices};
use crate::model::Bar;

/// Bollinger Bands around an SMA, using the sample standard deviation.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        if period < 2 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be >= 2".into(),
            });
        }
        if std_dev_multiplier <= 0.0 {
            bail!(IndicatorError::InvalidParameter {
                name: "std_dev_multiplier must be > 0".into(),
            });
        }
        Ok(Self {
            period,
            std_dev_multiplier,
        })
    }

    /// Returns (upper, middle, lower) band values, one per bar.
    pub fn calculate_bands(&self, bars: &[Bar]) -> Vec<Option<(f64, f64, f64)>> {
        let prices = close_prices(bars);
        let sma = sma_values(&prices, self.period);

        sma.iter()
            .enumerate()
            .map(|(i, middle)| {
                let middle = (*middle)?;
                let window = &prices[i + 1 - self.period..=i];
                let variance = window.iter().map(|&p| (p - middle).powi(2)).sum::<f64>()
                    / (self.period - 1) as f64;
                let std_dev = variance.sqrt();
                let upper = middle + self.std_dev_multiplier * std_dev;
                let lower = middle - self.std_dev_multiplier * std_dev;
                Some((upper, middle, lower))
            })
            .collect()
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "bb"
    }

    fn required_bars(&self) -> usize {
        self.period
    }

    /// Returns middle band (SMA) values only.
    fn calculate(&self, bars: &[Bar]) -> Series {
        self.calculate_bands(bars)
            .into_iter()
            .map(|b| b.map(|(_, m, _)| m))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::bars_from_closes;

    #[test]
    fn bollinger_period_below_two_invalid() {
        assert!(BollingerBands::new(0, 2.0).is_err());
        assert!(BollingerBands::new(1, 2.0).is_err());
    }

    #[test]
    fn bollinger_negative_multiplier_invalid() {
        assert!(BollingerBands::new(20, -1.0).is_err());
    }

    #[test]
    fn bollinger_short_input_is_all_absent() {
        let bb = BollingerBands::new(5, 2.0).unwrap();
        let bands = bb.calculate_bands(&bars_from_closes(&[1.0; 4]));
        assert_eq!(bands.len(), 4);
        assert!(bands.iter().all(Option::is_none));
    }

    #[test]
    fn bollinger_flat_prices_zero_width() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let bands = bb.calculate_bands(&bars_from_closes(&[10.0_f64; 5]));
        assert_eq!(bands[0], None);
        assert_eq!(bands[1], None);
        for (upper, middle, lower) in bands.iter().flatten() {
            assert!((upper - 10.0).abs() < 1e-9);
            assert!((middle - 10.0).abs() < 1e-9);
            assert!((lower - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn bollinger_uses_sample_std_dev() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let bands = bb.calculate_bands(&bars_from_closes(&[1.0, 2.0, 3.0]));
        // mean 2, sample variance (1 + 0 + 1) / 2 = 1
        let (upper, middle, lower) = bands[2].unwrap();
        assert!((middle - 2.0).abs() < 1e-9);
        assert!((upper - 4.0).abs() < 1e-9);
        assert!((lower - 0.0).abs() < 1e-9);
    }

    #[test]
    fn bollinger_bands_symmetry() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let bands = bb.calculate_bands(&bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        for (upper, middle, lower) in bands.iter().flatten() {
            assert!((upper - middle - (middle - lower)).abs() < 1e-9);
        }
    }

    #[test]
    fn bollinger_calculate_returns_middle() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let values = bb.calculate(&bars_from_closes(&[10.0, 11.0, 12.0]));
        assert_eq!(values[..2], [None, None]);
        assert!((values[2].unwrap() - 11.0).abs() < 1e-9);
    }
}
