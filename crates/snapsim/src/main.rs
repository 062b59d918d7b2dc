//! snapsim - snapshot retention simulator
//!
//! Reads snapshot names (one per line) from stdin or `--input`, then replays
//! a bucketed retention policy over a synthetic timeline, printing the
//! survivors of every run.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::{Duration, NaiveDateTime};
use clap::Parser;
use tracing::{debug, warn};

use snapsim_core::config::{Config, LogFormat};
use snapsim_core::error::{InputError, format_error_with_remediation};
use snapsim_core::interval::list_valid_intervals;
use snapsim_core::logging::{LogConfig, init_logging};
use snapsim_core::simulation::{LinePacer, NoPause, Simulation, SimulationParams};
use snapsim_core::snapshot_dates::{parse_snapshot_date, parse_snapshot_dates, validate_format};
use snapsim_core::{FilterOptions, RetentionSpec};

/// Simulate a snapshot retention policy over a hypothetical timeline
#[derive(Parser, Debug)]
#[command(name = "snapsim", version, about, long_about = None)]
#[command(after_help = "Snapshot names are read one per line from stdin unless --input is given.\n\
Example:\n  ls /snapshots | snapsim -f %Y-%m-%d_%H.%M.%S -r hour:24,day:7 -i 3600")]
struct Cli {
    /// strftime pattern of snapshot names [default: %Y-%m-%d_%H.%M.%S]
    #[arg(short = 'f', long = "format", value_name = "FMT")]
    format: Option<String>,

    /// Retention spec, e.g. hour:24,day:7,week:4
    #[arg(short = 'r', long = "retention", value_name = "SPEC")]
    retention: Option<String>,

    /// Seconds to advance the clock per run
    #[arg(short = 'i', long = "interval", value_name = "SECONDS")]
    interval: Option<String>,

    /// Create a snapshot at each new simulated time
    #[arg(short = 'c', long)]
    create: bool,

    /// Always keep the most recent snapshot
    #[arg(short = 'l', long)]
    keep_latest: bool,

    /// Keep snapshots younger than the smallest interval in the spec
    #[arg(short = 'y', long)]
    keep_younger: bool,

    /// Wait for Enter between runs
    #[arg(short = 'p', long)]
    prompt: bool,

    /// Print valid interval names with their length in seconds and exit
    #[arg(short = 'R', long)]
    list_valid_intervals: bool,

    /// Initial simulated time, in the snapshot date format [default: newest snapshot]
    #[arg(long, value_name = "TIMESTAMP")]
    now: Option<String>,

    /// Stop after this many runs
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    runs: Option<u64>,

    /// Read snapshot names from a file instead of stdin
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, env = "SNAPSIM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

/// Fully resolved settings after layering flags over the config file.
#[derive(Debug)]
struct Settings {
    date_format: String,
    spec: RetentionSpec,
    step: Duration,
    now: Option<NaiveDateTime>,
    params: SimulationParams,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<snapsim_core::Error>() {
        Some(core) => format_error_with_remediation(core).trim_end().to_string(),
        None => format!("Error: {err:#}"),
    }
}

/// Run the command and return the closing line for stdout.
fn run(cli: Cli) -> anyhow::Result<String> {
    if cli.list_valid_intervals {
        return Ok(list_valid_intervals());
    }

    let config = Config::load(cli.config.as_deref())?;
    init_logging(&log_config(&cli, &config)).context("failed to initialize logging")?;

    let settings = resolve_settings(&cli, &config)?;
    let text = read_snapshot_names(cli.input.as_deref())?;

    let snapshots = parse_snapshot_dates(text.lines(), &settings.date_format);
    if snapshots.is_empty() {
        return Err(snapsim_core::Error::from(InputError::EmptySnapshotList).into());
    }
    debug!(
        snapshots = snapshots.len(),
        spec = %settings.spec,
        step_secs = settings.step.num_seconds(),
        "Starting simulation"
    );

    let prompt = settings.params.prompt;
    let mut simulation = Simulation::new(snapshots, settings.spec, settings.params, settings.now)?;
    let mut out = io::stdout().lock();
    let outcome = if prompt {
        if cli.input.is_none() {
            warn!("snapshot names were read from stdin; --prompt will not wait for Enter");
        }
        simulation.run(&mut out, &mut LinePacer::new(io::stdin().lock()))?
    } else {
        simulation.run(&mut out, &mut NoPause)?
    };
    Ok(outcome.reason.message().to_string())
}

fn log_config(cli: &Cli, config: &Config) -> LogConfig {
    let mut log = config.logging.clone();
    if let Some(level) = &cli.log_level {
        log.level.clone_from(level);
    }
    if let Some(format) = cli.log_format {
        log.format = format;
    }
    log
}

fn read_snapshot_names(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot list {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read snapshot names from stdin")?;
            Ok(text)
        }
    }
}

fn resolve_settings(cli: &Cli, config: &Config) -> snapsim_core::Result<Settings> {
    let sim = &config.simulation;

    let date_format = cli.format.clone().unwrap_or_else(|| sim.date_format.clone());
    validate_format(&date_format)?;

    let spec = match &cli.retention {
        Some(text) => RetentionSpec::parse(text)?,
        None => sim
            .retention
            .clone()
            .ok_or(InputError::MissingArgument("-r/--retention"))?,
    };

    let step = match &cli.interval {
        Some(text) => parse_step(text)?,
        None => {
            let secs = sim
                .interval_secs
                .ok_or(InputError::MissingArgument("-i/--interval"))?;
            step_from_secs(secs).ok_or_else(|| InputError::InvalidInterval(secs.to_string()))?
        }
    };

    let now = match &cli.now {
        Some(text) => Some(parse_snapshot_date(text, &date_format).ok_or_else(|| {
            InputError::InvalidNow {
                value: text.clone(),
                format: date_format.clone(),
            }
        })?),
        None => None,
    };

    let mut params = SimulationParams::new(step);
    params.date_format.clone_from(&date_format);
    params.create = cli.create || sim.create;
    params.prompt = cli.prompt || sim.prompt;
    params.max_runs = cli.runs.or(sim.max_runs);
    params.options = FilterOptions {
        keep_latest: cli.keep_latest || sim.keep_latest,
        keep_younger: cli.keep_younger || sim.keep_younger,
    };

    Ok(Settings {
        date_format,
        spec,
        step,
        now,
        params,
    })
}

/// Parse the `-i` value: a positive whole number of seconds.
fn parse_step(text: &str) -> Result<Duration, InputError> {
    text.trim()
        .parse::<u64>()
        .ok()
        .and_then(step_from_secs)
        .ok_or_else(|| InputError::InvalidInterval(text.to_string()))
}

fn step_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        return None;
    }
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}
