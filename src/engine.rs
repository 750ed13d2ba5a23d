use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicator::bollinger::BollingerBands;
use crate::indicator::ma::{Ema, Sma};
use crate::indicator::macd::Macd;
use crate::indicator::rsi::Rsi;
use crate::indicator::vwap::Vwap;
use crate::indicator::{Indicator, Series};
use crate::model::Bar;

pub const EMA: &str = "ema";
pub const SMA: &str = "sma";
pub const VWAP: &str = "vwap";
pub const BB_UPPER: &str = "bb_upper";
pub const BB_MIDDLE: &str = "bb_middle";
pub const BB_LOWER: &str = "bb_lower";
pub const RSI: &str = "rsi";
pub const MACD: &str = "macd";
pub const MACD_SIGNAL: &str = "macd_signal";
pub const MACD_HISTOGRAM: &str = "macd_histogram";

/// Indicator families that can be toggled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Ema,
    Sma,
    Vwap,
    Bollinger,
    Rsi,
    Macd,
}

impl IndicatorKind {
    pub fn all() -> [Self; 6] {
        [
            Self::Ema,
            Self::Sma,
            Self::Vwap,
            Self::Bollinger,
            Self::Rsi,
            Self::Macd,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ema => "ema",
            Self::Sma => "sma",
            Self::Vwap => "vwap",
            Self::Bollinger => "bollinger",
            Self::Rsi => "rsi",
            Self::Macd => "macd",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_true() -> bool {
    true
}

fn default_ema_period() -> usize {
    14
}

fn default_sma_period() -> usize {
    20
}

fn default_bb_period() -> usize {
    20
}

fn default_bb_multiplier() -> f64 {
    2.0
}

fn default_rsi_period() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EmaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ema_period")]
    pub period: usize,
}

impl Default for EmaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: default_ema_period(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SmaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sma_period")]
    pub period: usize,
}

impl Default for SmaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            period: default_sma_period(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VwapConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for VwapConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BollingerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bb_period")]
    pub period: usize,
    #[serde(default = "default_bb_multiplier")]
    pub std_dev_multiplier: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            period: default_bb_period(),
            std_dev_multiplier: default_bb_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RsiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_rsi_period")]
    pub period: usize,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            period: default_rsi_period(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MacdConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_macd_fast")]
    pub fast_period: usize,
    #[serde(default = "default_macd_slow")]
    pub slow_period: usize,
    #[serde(default = "default_macd_signal")]
    pub signal_period: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fast_period: default_macd_fast(),
            slow_period: default_macd_slow(),
            signal_period: default_macd_signal(),
        }
    }
}

/// Enable flags and parameters for every indicator family.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default)]
    pub ema: EmaConfig,
    #[serde(default)]
    pub sma: SmaConfig,
    #[serde(default)]
    pub vwap: VwapConfig,
    #[serde(default)]
    pub bollinger: BollingerConfig,
    #[serde(default)]
    pub rsi: RsiConfig,
    #[serde(default)]
    pub macd: MacdConfig,
}

impl IndicatorConfig {
    /// Copy with every parameter clamped into its accepted range.
    pub fn clamped(&self) -> Self {
        let clamped = Self {
            ema: EmaConfig {
                period: self.ema.period.clamp(5, 200),
                ..self.ema
            },
            sma: SmaConfig {
                period: self.sma.period.clamp(5, 200),
                ..self.sma
            },
            vwap: self.vwap,
            bollinger: BollingerConfig {
                period: self.bollinger.period.clamp(5, 100),
                std_dev_multiplier: clamp_multiplier(self.bollinger.std_dev_multiplier),
                ..self.bollinger
            },
            rsi: RsiConfig {
                period: self.rsi.period.clamp(5, 50),
                ..self.rsi
            },
            macd: MacdConfig {
                fast_period: self.macd.fast_period.clamp(5, 50),
                slow_period: self.macd.slow_period.clamp(10, 100),
                signal_period: self.macd.signal_period.clamp(5, 30),
                ..self.macd
            },
        };
        if clamped != *self {
            debug!(?clamped, "indicator parameters clamped");
        }
        clamped
    }

    pub fn is_enabled(&self, kind: IndicatorKind) -> bool {
        match kind {
            IndicatorKind::Ema => self.ema.enabled,
            IndicatorKind::Sma => self.sma.enabled,
            IndicatorKind::Vwap => self.vwap.enabled,
            IndicatorKind::Bollinger => self.bollinger.enabled,
            IndicatorKind::Rsi => self.rsi.enabled,
            IndicatorKind::Macd => self.macd.enabled,
        }
    }

    pub fn set_enabled(&mut self, kind: IndicatorKind, enabled: bool) {
        match kind {
            IndicatorKind::Ema => self.ema.enabled = enabled,
            IndicatorKind::Sma => self.sma.enabled = enabled,
            IndicatorKind::Vwap => self.vwap.enabled = enabled,
            IndicatorKind::Bollinger => self.bollinger.enabled = enabled,
            IndicatorKind::Rsi => self.rsi.enabled = enabled,
            IndicatorKind::Macd => self.macd.enabled = enabled,
        }
    }
}

// NaN compares false against both bounds, so map it to the default.
fn clamp_multiplier(m: f64) -> f64 {
    if m.is_nan() {
        default_bb_multiplier()
    } else {
        m.clamp(0.5, 5.0)
    }
}

/// Indicator series for one visible window, keyed by series name.
///
/// Every series has exactly `len` entries. Disabled families have no
/// entry; an enabled family over too short a window has an all-`None`
/// entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorResult {
    pub len: usize,
    pub series: BTreeMap<String, Series>,
}

impl IndicatorResult {
    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    /// Value of series `name` at window position `idx`.
    pub fn value_at(&self, name: &str, idx: usize) -> Option<f64> {
        self.series.get(name).and_then(|s| s.get(idx).copied().flatten())
    }

    fn insert(&mut self, name: &str, values: Series) {
        debug_assert_eq!(values.len(), self.len);
        self.series.insert(name.to_string(), values);
    }

    /// Run a single-series indicator and store it under its own name.
    fn insert_from(&mut self, indicator: &dyn Indicator, window: &[Bar]) {
        self.insert(indicator.name(), indicator.calculate(window));
    }
}

/// Recompute every enabled indicator over `window` from scratch. No
/// state is carried between windows.
///
/// Parameters are expected to be clamped already; a parameter the
/// indicator itself rejects leaves that family out of the result.
pub fn compute(window: &[Bar], config: &IndicatorConfig) -> IndicatorResult {
    let mut result = IndicatorResult {
        len: window.len(),
        series: BTreeMap::new(),
    };

    if config.vwap.enabled && Vwap::available(window) {
        result.insert_from(&Vwap, window);
    }

    if config.ema.enabled
        && let Ok(ema) = Ema::new(config.ema.period)
    {
        result.insert_from(&ema, window);
    }

    if config.sma.enabled
        && let Ok(sma) = Sma::new(config.sma.period)
    {
        result.insert_from(&sma, window);
    }

    if config.bollinger.enabled
        && let Ok(bb) =
            BollingerBands::new(config.bollinger.period, config.bollinger.std_dev_multiplier)
    {
        let bands = bb.calculate_bands(window);
        let name = bb.name();
        result.insert(
            &format!("{name}_upper"),
            bands.iter().map(|b| b.map(|(u, _, _)| u)).collect(),
        );
        result.insert(
            &format!("{name}_middle"),
            bands.iter().map(|b| b.map(|(_, m, _)| m)).collect(),
        );
        result.insert(
            &format!("{name}_lower"),
            bands.iter().map(|b| b.map(|(_, _, l)| l)).collect(),
        );
    }

    if config.rsi.enabled
        && let Ok(rsi) = Rsi::new(config.rsi.period)
    {
        result.insert_from(&rsi, window);
    }

    if config.macd.enabled
        && let Ok(macd) = Macd::new(
            config.macd.fast_period,
            config.macd.slow_period,
            config.macd.signal_period,
        )
    {
        let full = macd.calculate_full(window);
        let name = macd.name();
        result.insert(name, full.iter().map(|v| v.map(|(m, _, _)| m)).collect());
        result.insert(
            &format!("{name}_signal"),
            full.iter().map(|v| v.map(|(_, s, _)| s)).collect(),
        );
        result.insert(
            &format!("{name}_histogram"),
            full.iter().map(|v| v.map(|(_, _, h)| h)).collect(),
        );
    }

    result
}
