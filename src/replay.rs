use std::ops::Range;
use std::time::Duration;

use chrono::NaiveDate;
use error_stack::Report;
use tracing::{debug, info};

use crate::engine::{self, IndicatorConfig, IndicatorKind, IndicatorResult};
use crate::error::DataError;
use crate::model::{Bar, NormalizedSeries, RawTable};
use crate::session::{self, SessionWindow};
use crate::stats::SessionStats;

pub const MIN_WINDOW_SIZE: usize = 20;
pub const MAX_WINDOW_SIZE: usize = 1000;
pub const DEFAULT_WINDOW_SIZE: usize = 100;

pub const MIN_SPEED_MS: u64 = 100;
pub const MAX_SPEED_MS: u64 = 2000;
pub const DEFAULT_SPEED_MS: u64 = 500;

/// Periodic timer owned by the host.
///
/// While started, the host calls [`ReplayController::tick`] roughly every
/// `interval`.
pub trait Scheduler {
    /// Start ticking every `interval`, replacing any running schedule.
    fn start(&mut self, interval: Duration);

    /// Cancel ticking. Must be a no-op when nothing is scheduled.
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// What a single [`ReplayController::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The playhead moved forward one bar.
    Advanced,
    /// The playhead was already on the last bar; playback stopped.
    Finished,
    /// Not playing; nothing happened.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayState {
    pub current_index: usize,
    pub window_size: usize,
    pub playback: PlaybackState,
    pub speed_ms: u64,
}

impl Default for ReplayState {
    fn default() -> Self {
        Self {
            current_index: 0,
            window_size: DEFAULT_WINDOW_SIZE,
            playback: PlaybackState::Stopped,
            speed_ms: DEFAULT_SPEED_MS,
        }
    }
}

impl ReplayState {
    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackState::Playing
    }

    /// Trailing window ending at the playhead.
    pub fn window_range(&self) -> Range<usize> {
        let end = self.current_index + 1;
        end.saturating_sub(self.window_size)..end
    }

    pub fn speed(&self) -> Duration {
        Duration::from_millis(self.speed_ms)
    }
}

/// Indicator output for the current visible window.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Positions of the window within the full series.
    pub range: Range<usize>,
    pub indicators: IndicatorResult,
}

/// Owns the loaded series, the playhead and the visible-window size, and
/// recomputes the indicator frame for the trailing window after every
/// transition. Periodic playback is driven by the host through `S`.
pub struct ReplayController<S> {
    series: NormalizedSeries,
    stats: Option<SessionStats>,
    session: SessionWindow,
    indicators: IndicatorConfig,
    state: ReplayState,
    frame: Option<Frame>,
    scheduler: S,
}

impl<S: Scheduler> ReplayController<S> {
    /// A controller with no data loaded.
    pub fn new(scheduler: S, session: SessionWindow, indicators: IndicatorConfig) -> Self {
        Self {
            series: NormalizedSeries::default(),
            stats: None,
            session,
            indicators: indicators.clamped(),
            state: ReplayState::default(),
            frame: None,
            scheduler,
        }
    }

    /// Normalize `table` and replace the loaded series with it.
    ///
    /// On failure the previous series, playhead and frame are untouched.
    pub fn load(&mut self, table: &RawTable) -> Result<(), Report<DataError>> {
        let series = session::normalize(table, &self.session)?;
        self.replace_series(series);
        Ok(())
    }

    /// Install an already normalized series, stopping playback and moving
    /// the playhead to the first bar.
    pub fn replace_series(&mut self, series: NormalizedSeries) {
        self.scheduler.stop();
        self.stats = SessionStats::compute(&series);
        self.series = series;
        self.state.playback = PlaybackState::Stopped;
        self.state.current_index = 0;
        info!(bars = self.series.len(), "dataset loaded");
        self.recompute();
    }

    pub fn play(&mut self) {
        if self.series.is_empty() || self.state.is_playing() {
            return;
        }
        self.state.playback = PlaybackState::Playing;
        self.scheduler.start(self.state.speed());
        debug!(index = self.state.current_index, speed_ms = self.state.speed_ms, "play");
    }

    pub fn pause(&mut self) {
        self.scheduler.stop();
        if self.state.is_playing() {
            self.state.playback = PlaybackState::Stopped;
            debug!(index = self.state.current_index, "pause");
        }
    }

    pub fn reset(&mut self) {
        self.scheduler.stop();
        self.state.playback = PlaybackState::Stopped;
        self.state.current_index = 0;
        debug!("reset");
        self.recompute();
    }

    /// Advance one bar while playing; stop at the last bar.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.is_playing() {
            return TickOutcome::Idle;
        }
        if self.state.current_index + 1 < self.series.len() {
            self.state.current_index += 1;
            self.recompute();
            TickOutcome::Advanced
        } else {
            self.scheduler.stop();
            self.state.playback = PlaybackState::Stopped;
            info!(index = self.state.current_index, "end of data reached");
            TickOutcome::Finished
        }
    }

    /// Move the playhead to `index`, clamped to the series. Playback state
    /// is unchanged. Returns the resulting playhead.
    pub fn jump_to_index(&mut self, index: usize) -> usize {
        if self.series.is_empty() {
            return self.state.current_index;
        }
        self.state.current_index = index.min(self.series.len() - 1);
        debug!(requested = index, index = self.state.current_index, "jump");
        self.recompute();
        self.state.current_index
    }

    /// Jump to the first bar dated on or after `date`. Returns `false`
    /// (and leaves the playhead alone) when every bar is earlier.
    pub fn jump_to_date(&mut self, date: NaiveDate) -> bool {
        match self.series.first_on_or_after(date) {
            Some(index) => {
                self.jump_to_index(index);
                true
            }
            None => {
                debug!(%date, "no bar on or after date");
                false
            }
        }
    }

    pub fn set_window_size(&mut self, size: usize) {
        self.state.window_size = size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE);
        if self.state.window_size != size {
            debug!(requested = size, window_size = self.state.window_size, "window size clamped");
        }
        self.recompute();
    }

    /// Change the tick interval; a running schedule restarts immediately.
    pub fn set_speed(&mut self, speed_ms: u64) {
        self.state.speed_ms = speed_ms.clamp(MIN_SPEED_MS, MAX_SPEED_MS);
        if self.state.speed_ms != speed_ms {
            debug!(requested = speed_ms, speed_ms = self.state.speed_ms, "speed clamped");
        }
        if self.state.is_playing() {
            self.scheduler.start(self.state.speed());
        }
    }

    pub fn set_indicator_config(&mut self, config: IndicatorConfig) {
        self.indicators = config.clamped();
        self.recompute();
    }

    pub fn set_enabled(&mut self, kind: IndicatorKind, enabled: bool) {
        self.indicators.set_enabled(kind, enabled);
        self.recompute();
    }

    fn recompute(&mut self) {
        if self.series.is_empty() {
            self.frame = None;
            return;
        }
        let range = self.state.window_range();
        let (bars, _) = self.series.slice(range.clone());
        let indicators = engine::compute(bars, &self.indicators);
        self.frame = Some(Frame { range, indicators });
    }
}

impl<S> ReplayController<S> {
    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    pub fn series(&self) -> &NormalizedSeries {
        &self.series
    }

    pub fn stats(&self) -> Option<&SessionStats> {
        self.stats.as_ref()
    }

    pub fn indicator_config(&self) -> &IndicatorConfig {
        &self.indicators
    }

    pub fn session(&self) -> &SessionWindow {
        &self.session
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn current_bar(&self) -> Option<&Bar> {
        self.series.get(self.state.current_index)
    }

    /// Bars and x-coordinates of the current visible window.
    pub fn visible_window(&self) -> (&[Bar], &[i64]) {
        match &self.frame {
            Some(frame) => self.series.slice(frame.range.clone()),
            None => self.series.slice(0..0),
        }
    }
}
