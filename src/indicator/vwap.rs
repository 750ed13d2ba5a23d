use crate::indicator::{Indicator, Series};
use crate::model::Bar;

/// Passes through the per-bar VWAP already present in the data.
pub struct Vwap;

impl Vwap {
    /// Whether any bar carries a VWAP value at all.
    pub fn available(bars: &[Bar]) -> bool {
        bars.iter().any(|b| b.vwap.is_some())
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn required_bars(&self) -> usize {
        1
    }

    fn calculate(&self, bars: &[Bar]) -> Series {
        bars.iter().map(|b| b.vwap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::bars_from_closes;

    #[test]
    fn vwap_passes_values_through() {
        let mut bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        bars[0].vwap = Some(1.5);
        bars[2].vwap = Some(2.5);
        assert!(Vwap::available(&bars));
        assert_eq!(Vwap.calculate(&bars), vec![Some(1.5), None, Some(2.5)]);
    }

    #[test]
    fn vwap_unavailable_without_column() {
        let bars = bars_from_closes(&[1.0, 2.0]);
        assert!(!Vwap::available(&bars));
        assert_eq!(Vwap.calculate(&bars), vec![None, None]);
    }
}
