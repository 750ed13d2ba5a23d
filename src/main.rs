use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::EnvFilter;

use candle_replay::config::{self, AppConfig};
use candle_replay::loader;
use candle_replay::replay::{ReplayController, Scheduler, TickOutcome};
use candle_replay::sink::FrameSink;
use candle_replay::sink::terminal::TerminalSink;
use candle_replay::view::Snapshot;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("data error")]
    Data,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(
    name = "candle-replay",
    about = "Replay intraday futures candles with technical indicators"
)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV data file; otherwise the timeframe's default file is searched for
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Timeframe of the default data file (1min, 3min, 5min, 15min, 30min, 1hour)
    #[arg(short, long)]
    timeframe: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play the dataset forward one candle per tick
    Play(PlayArgs),
    /// Print dataset statistics as JSON
    Stats,
    /// Print the frame at a candle index as JSON
    Snapshot {
        /// 0-based candle index, clamped to the dataset
        index: usize,
    },
}

#[derive(clap::Args, Default)]
struct PlayArgs {
    /// Start at the first candle on or after this date (dd-mm-YYYY or YYYY-mm-dd)
    #[arg(long, value_parser = parse_date)]
    from_date: Option<NaiveDate>,

    /// Start at this 0-based candle index
    #[arg(long)]
    from_index: Option<usize>,

    /// Milliseconds between candles
    #[arg(long)]
    speed_ms: Option<u64>,

    /// Number of visible candles
    #[arg(long)]
    window: Option<usize>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| format!("\"{s}\" is not a date (dd-mm-YYYY or YYYY-mm-dd)"))
}

/// Forwards start/stop requests from the controller to the playback loop.
struct WatchScheduler {
    tx: watch::Sender<Option<Duration>>,
}

impl WatchScheduler {
    fn channel() -> (Self, watch::Receiver<Option<Duration>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl Scheduler for WatchScheduler {
    fn start(&mut self, interval: Duration) {
        self.tx.send_replace(Some(interval));
    }

    fn stop(&mut self) {
        self.tx.send_replace(None);
    }
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load(path).change_context(AppError::Config)?,
        None => AppConfig::default(),
    };
    if let Some(timeframe) = cli.timeframe {
        config.general.timeframe = timeframe;
        config::validate(&config).change_context(AppError::Config)?;
    }

    init_tracing(&config);

    // ── Data ──────────────────────────────────────────────────────────────────
    let session = config.session_window().change_context(AppError::Config)?;
    let path = match cli.file {
        Some(path) => path,
        None => {
            let timeframe = config.timeframe().ok_or_else(|| {
                Report::new(AppError::Config)
                    .attach(format!("timeframe: {}", config.general.timeframe))
            })?;
            loader::discover(Path::new(&config.general.data_dir), timeframe)
                .change_context(AppError::Data)?
        }
    };
    let table = loader::read_csv(&path).change_context(AppError::Data)?;

    // ── Controller ────────────────────────────────────────────────────────────
    let (scheduler, schedule) = WatchScheduler::channel();
    let mut controller = ReplayController::new(scheduler, session, config.indicators);
    controller
        .load(&table)
        .change_context(AppError::Data)
        .attach_with(|| format!("path: {}", path.display()))?;
    controller.set_window_size(config.replay.window_size);
    controller.set_speed(config.replay.speed_ms);

    let sink: Arc<dyn FrameSink> = Arc::new(TerminalSink);
    if let Some(stats) = controller.stats() {
        sink.summary(stats);
    }

    match cli.command.unwrap_or(Command::Play(PlayArgs::default())) {
        Command::Play(args) => play(controller, schedule, sink.as_ref(), args).await,
        Command::Stats => {
            let stats = controller
                .stats()
                .ok_or_else(|| Report::new(AppError::Data))?;
            print_json(stats)
        }
        Command::Snapshot { index } => {
            controller.jump_to_index(index);
            let snapshot =
                Snapshot::capture(&controller).ok_or_else(|| Report::new(AppError::Data))?;
            print_json(&snapshot)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Report<AppError>> {
    let json = serde_json::to_string_pretty(value).change_context(AppError::Runtime)?;
    println!("{json}");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

enum LoopEvent {
    Reschedule,
    Tick,
    Interrupt,
}

async fn play(
    mut controller: ReplayController<WatchScheduler>,
    mut schedule: watch::Receiver<Option<Duration>>,
    sink: &dyn FrameSink,
    args: PlayArgs,
) -> Result<(), Report<AppError>> {
    if let Some(window) = args.window {
        controller.set_window_size(window);
    }
    if let Some(speed_ms) = args.speed_ms {
        controller.set_speed(speed_ms);
    }
    if let Some(index) = args.from_index {
        controller.jump_to_index(index);
    }
    if let Some(date) = args.from_date
        && !controller.jump_to_date(date)
    {
        tracing::warn!(%date, "no candle on or after date; starting from current position");
    }

    if let Some(snapshot) = Snapshot::capture(&controller) {
        sink.present(&snapshot);
    }

    controller.play();
    let mut interval = build_interval(*schedule.borrow_and_update());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let event = tokio::select! {
            changed = schedule.changed() => {
                changed.change_context(AppError::Runtime)?;
                LoopEvent::Reschedule
            }
            _ = next_tick(&mut interval) => LoopEvent::Tick,
            result = &mut ctrl_c => {
                result.change_context(AppError::Runtime)?;
                LoopEvent::Interrupt
            }
        };

        match event {
            LoopEvent::Reschedule => {
                interval = build_interval(*schedule.borrow_and_update());
            }
            LoopEvent::Tick => match controller.tick() {
                TickOutcome::Advanced => {
                    if let Some(snapshot) = Snapshot::capture(&controller) {
                        sink.present(&snapshot);
                    }
                }
                TickOutcome::Finished => {
                    info!("replay finished");
                    break;
                }
                TickOutcome::Idle => {}
            },
            LoopEvent::Interrupt => {
                controller.pause();
                info!(
                    index = controller.state().current_index,
                    "ctrl+c received, paused"
                );
                break;
            }
        }
    }

    Ok(())
}

fn build_interval(period: Option<Duration>) -> Option<Interval> {
    period.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    })
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
