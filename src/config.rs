use std::path::Path;

use chrono::NaiveTime;
use chrono_tz::Tz;
use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::engine::IndicatorConfig;
use crate::error::ConfigError;
use crate::model::TimeFrame;
use crate::replay::{DEFAULT_SPEED_MS, DEFAULT_WINDOW_SIZE};
use crate::session::{DEFAULT_BAR_STEP, SessionWindow};

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_data_dir() -> String {
    "data".into()
}

fn default_timeframe() -> String {
    "3min".into()
}

fn default_timezone() -> String {
    "Asia/Kolkata".into()
}

fn default_open() -> String {
    "09:15:00".into()
}

fn default_close() -> String {
    "15:30:00".into()
}

fn default_bar_step() -> i64 {
    DEFAULT_BAR_STEP
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_speed_ms() -> u64 {
    DEFAULT_SPEED_MS
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            data_dir: default_data_dir(),
            timeframe: default_timeframe(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// IANA timezone name the data is recorded in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_open")]
    pub open: String,
    #[serde(default = "default_close")]
    pub close: String,
    #[serde(default = "default_bar_step")]
    pub bar_step: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            open: default_open(),
            close: default_close(),
            bar_step: default_bar_step(),
        }
    }
}

/// Initial replay settings; clamped when applied to the controller.
#[derive(Debug, Deserialize)]
pub struct ReplayConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_speed_ms")]
    pub speed_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            speed_ms: default_speed_ms(),
        }
    }
}

impl AppConfig {
    /// The validated session window. Call after [`validate`] succeeded.
    pub fn session_window(&self) -> Result<SessionWindow, Report<ConfigError>> {
        let session = &self.session;
        Ok(SessionWindow {
            timezone: parse_timezone(&session.timezone)?,
            open: parse_time("session.open", &session.open)?,
            close: parse_time("session.close", &session.close)?,
            bar_step: session.bar_step,
        })
    }

    pub fn timeframe(&self) -> Option<TimeFrame> {
        TimeFrame::from_str(&self.general.timeframe)
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

pub fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_session(config)?;
    Ok(())
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.timeframe().is_none() {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.timeframe: unknown timeframe \"{}\"",
                config.general.timeframe
            ),
        }));
    }
    if !VALID_LOG_FORMATS.contains(&config.general.log_format.as_str()) {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.log_format \"{}\" is not valid",
                config.general.log_format
            ),
        }));
    }
    Ok(())
}

fn validate_session(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let window = config.session_window()?;
    if window.open >= window.close {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "session.open ({}) must be before session.close ({})",
                window.open, window.close
            ),
        }));
    }
    if window.bar_step <= 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "session.bar_step must be > 0".into(),
        }));
    }
    Ok(())
}

fn parse_timezone(name: &str) -> Result<Tz, Report<ConfigError>> {
    name.parse::<Tz>().map_err(|_| {
        Report::new(ConfigError::Validation {
            field: format!("session.timezone: unknown timezone \"{name}\""),
        })
    })
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, Report<ConfigError>> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| {
            Report::new(ConfigError::Validation {
                field: format!("{field}: \"{value}\" is not HH:MM[:SS]"),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        toml::from_str(toml).expect("parse failed")
    }

    #[test]
    fn valid_full_config_parses() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"
data_dir = "/tmp/data"
timeframe = "5min"

[session]
timezone = "America/New_York"
open = "09:30"
close = "16:00:00"
bar_step = 5

[replay]
window_size = 250
speed_ms = 1000

[indicators.ema]
period = 21

[indicators.rsi]
enabled = true
period = 7

[indicators.macd]
enabled = true
fast_period = 8
slow_period = 21
signal_period = 5
"#;
        let config = parse(toml);
        assert!(validate(&config).is_ok());
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.timeframe(), Some(TimeFrame::Min5));
        assert_eq!(config.replay.window_size, 250);
        assert_eq!(config.replay.speed_ms, 1000);
        assert!(config.indicators.ema.enabled);
        assert_eq!(config.indicators.ema.period, 21);
        assert!(config.indicators.rsi.enabled);
        assert_eq!(config.indicators.macd.slow_period, 21);

        let window = config.session_window().unwrap();
        assert_eq!(window.timezone, chrono_tz::America::New_York);
        assert_eq!(window.open, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(window.bar_step, 5);
    }

    #[test]
    fn defaults_applied_when_sections_omitted() {
        let config = parse("");
        assert!(validate(&config).is_ok());
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "text");
        assert_eq!(config.general.data_dir, "data");
        assert_eq!(config.timeframe(), Some(TimeFrame::Min3));
        assert_eq!(config.replay.window_size, 100);
        assert_eq!(config.replay.speed_ms, 500);
        assert_eq!(config.indicators, IndicatorConfig::default());
        assert_eq!(config.session_window().unwrap(), SessionWindow::default());
    }

    #[test]
    fn default_impl_matches_empty_file() {
        let config = AppConfig::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.session_window().unwrap(), SessionWindow::default());
    }

    #[test]
    fn unknown_timezone_rejected() {
        let config = parse(
            r#"
[session]
timezone = "Mars/Olympus"
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn inverted_session_hours_rejected() {
        let config = parse(
            r#"
[session]
open = "15:30"
close = "09:15"
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn malformed_session_time_rejected() {
        let config = parse(
            r#"
[session]
open = "quarter past nine"
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn non_positive_bar_step_rejected() {
        let config = parse(
            r#"
[session]
bar_step = 0
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn invalid_timeframe_rejected() {
        let config = parse(
            r#"
[general]
timeframe = "2min"
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn invalid_log_format_rejected() {
        let config = parse(
            r#"
[general]
log_format = "xml"
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = load(Path::new("/nonexistent/candle-replay.toml")).unwrap_err();
        assert!(matches!(err.current_context(), ConfigError::ReadFile));
    }
}
