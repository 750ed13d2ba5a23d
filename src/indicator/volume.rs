use serde::Serialize;

use crate::model::Bar;

/// One volume histogram bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeBar {
    pub height: Option<u64>,
    /// `close >= open`; flat bars count as up.
    pub up: bool,
}

/// Volume histogram for `bars`, colored by bar direction.
pub fn volume_bars(bars: &[Bar]) -> Vec<VolumeBar> {
    bars.iter()
        .map(|b| VolumeBar {
            height: b.volume,
            up: b.is_up(),
        })
        .collect()
}

/// Largest volume in `bars`, if any bar has one.
pub fn max_volume(bars: &[Bar]) -> Option<u64> {
    bars.iter().filter_map(|b| b.volume).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::bars_from_closes;

    #[test]
    fn direction_follows_close_vs_open() {
        let mut bars = bars_from_closes(&[10.0, 10.0, 10.0]);
        bars[0].open = 9.0; // up
        bars[1].open = 11.0; // down
        let vb = volume_bars(&bars);
        assert!(vb[0].up);
        assert!(!vb[1].up);
        assert!(vb[2].up, "flat bar should count as up");
    }

    #[test]
    fn missing_volume_has_no_height() {
        let mut bars = bars_from_closes(&[1.0, 2.0]);
        bars[1].volume = None;
        let vb = volume_bars(&bars);
        assert_eq!(vb[0].height, Some(100));
        assert_eq!(vb[1].height, None);
    }

    #[test]
    fn max_volume_ignores_missing() {
        let mut bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        bars[0].volume = Some(5);
        bars[1].volume = None;
        bars[2].volume = Some(7);
        assert_eq!(max_volume(&bars), Some(7));
        bars.iter_mut().for_each(|b| b.volume = None);
        assert_eq!(max_volume(&bars), None);
    }
}
