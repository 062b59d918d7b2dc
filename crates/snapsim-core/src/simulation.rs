//! Retention policy simulation over a synthetic timeline.
//!
//! Each run prints the current simulated time, filters the snapshot set,
//! prints the survivors, then advances the clock by a fixed step and
//! optionally creates a snapshot at the new time. The loop ends when the set
//! runs empty or an optional run limit is reached.
//!
//! Output per run:
//!
//! ```text
//! RUN 0  NOW 2024-06-01_12.00.00
//! 2024-05-31_12.00.00
//! 2024-06-01_12.00.00
//!
//! ```

use std::io::{self, BufRead, Write};

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

use crate::error::{InputError, Result};
use crate::retention_filter::{FilterMode, FilterOptions, filter};
use crate::retention_spec::RetentionSpec;
use crate::snapshot_dates::{DEFAULT_DATE_FORMAT, format_snapshot_date};

// ---------------------------------------------------------------------------
// Parameters and results
// ---------------------------------------------------------------------------

/// Knobs for one simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationParams {
    /// How far the clock jumps between runs.
    pub step: Duration,
    /// Pattern used to print surviving snapshots.
    pub date_format: String,
    /// Create a snapshot at each new "now".
    pub create: bool,
    /// Pause between runs.
    pub prompt: bool,
    /// Stop after this many runs.
    pub max_runs: Option<u64>,
    pub options: FilterOptions,
}

impl SimulationParams {
    /// Parameters advancing by `step` with everything else off.
    #[must_use]
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            create: false,
            prompt: false,
            max_runs: None,
            options: FilterOptions::default(),
        }
    }
}

/// Why the loop stopped. Both are successful terminations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The snapshot set became empty.
    Exhausted,
    /// `max_runs` runs completed.
    RunLimit,
}

impl StopReason {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Exhausted => "No more snapshots",
            Self::RunLimit => "Run limit reached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Runs that filtered a non-empty set.
    pub runs: u64,
    /// Snapshots left when the loop stopped.
    pub remaining: Vec<NaiveDateTime>,
    pub reason: StopReason,
}

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

/// Waits for the operator between runs.
pub trait Pacer {
    fn pause(&mut self) -> io::Result<()>;
}

/// Never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

impl Pacer for NoPause {
    fn pause(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Waits for one line (Enter) on a reader. End of input does not block.
#[derive(Debug)]
pub struct LinePacer<R> {
    reader: R,
}

impl<R: BufRead> LinePacer<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Pacer for LinePacer<R> {
    fn pause(&mut self) -> io::Result<()> {
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Simulation state: the surviving snapshots and the simulated clock.
#[derive(Debug, Clone)]
pub struct Simulation {
    snapshots: Vec<NaiveDateTime>,
    spec: RetentionSpec,
    params: SimulationParams,
    now: NaiveDateTime,
}

impl Simulation {
    /// Start a simulation. Without an explicit `now` the clock starts at the
    /// newest snapshot, which requires at least one snapshot.
    pub fn new(
        snapshots: Vec<NaiveDateTime>,
        spec: RetentionSpec,
        params: SimulationParams,
        now: Option<NaiveDateTime>,
    ) -> Result<Self> {
        let now = match now {
            Some(now) => now,
            None => snapshots
                .iter()
                .max()
                .copied()
                .ok_or(InputError::EmptySnapshotList)?,
        };
        Ok(Self {
            snapshots,
            spec,
            params,
            now,
        })
    }

    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    #[must_use]
    pub fn snapshots(&self) -> &[NaiveDateTime] {
        &self.snapshots
    }

    /// Run until the set is exhausted or the run limit is hit.
    pub fn run<W: Write, P: Pacer>(&mut self, out: &mut W, pacer: &mut P) -> Result<SimulationOutcome> {
        let mut run: u64 = 0;
        loop {
            if self.params.max_runs.is_some_and(|max| run >= max) {
                return Ok(self.finish(run, StopReason::RunLimit));
            }

            writeln!(
                out,
                "RUN {run}  NOW {}",
                format_snapshot_date(&self.now, DEFAULT_DATE_FORMAT)?
            )?;
            if self.snapshots.is_empty() {
                return Ok(self.finish(run, StopReason::Exhausted));
            }

            let mut kept = filter(
                FilterMode::Keep,
                &self.snapshots,
                &self.spec,
                self.now,
                self.params.options,
            );
            debug!(
                run,
                now = %self.now,
                snapshots = self.snapshots.len(),
                kept = kept.len(),
                "Simulation run"
            );
            for ts in &kept {
                writeln!(out, "{}", format_snapshot_date(ts, &self.params.date_format)?)?;
            }

            if self.params.prompt {
                out.flush()?;
                pacer.pause()?;
            }
            writeln!(out)?;

            self.now = self
                .now
                .checked_add_signed(self.params.step)
                .ok_or(InputError::ClockOverflow)?;
            if self.params.create {
                debug!(now = %self.now, "Creating snapshot");
                kept.push(self.now);
            }
            self.snapshots = kept;
            run += 1;
        }
    }

    fn finish(&self, runs: u64, reason: StopReason) -> SimulationOutcome {
        info!(runs, reason = reason.message(), "Simulation finished");
        SimulationOutcome {
            runs,
            remaining: self.snapshots.clone(),
            reason,
        }
    }
}
