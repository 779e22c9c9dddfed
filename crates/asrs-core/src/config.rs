//! Engine configuration.
//!
//! Typically loaded from a JSON file by the application crate (with the
//! `serde` feature) and passed to the scheduler builder.  Defaults reproduce
//! the reference warehouse: 25 columns × 30 rows × 6 levels with the dock in
//! the last row, column 0.

use crate::{Cell, CoreError, CoreResult, Extents, SimClock, Tick};

// ── MoveCosts ─────────────────────────────────────────────────────────────────

/// Integer move costs used by the pathfinder.
///
/// Costs are scaled so diagonals can be expressed exactly: the default
/// orthogonal step is 10 and a diagonal 14 (≈ 10·√2).  A non-zero `turn`
/// is added whenever a move changes direction, biasing routes toward
/// straight runs.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MoveCosts {
    pub orthogonal: u32,
    pub diagonal:   u32,
    pub turn:       u32,
}

impl Default for MoveCosts {
    fn default() -> Self {
        Self { orthogonal: 10, diagonal: 14, turn: 0 }
    }
}

// ── GridConfig ────────────────────────────────────────────────────────────────

/// Warehouse geometry and movement rules.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GridConfig {
    pub extents: Extents,

    /// Where boxes enter and leave the warehouse.  Store jobs pick up here,
    /// retrieve jobs drop off here, and slotting distances are measured from
    /// here.
    pub dock: Cell,

    /// Permit in-plane diagonal moves (x and y together).
    pub allow_diagonal: bool,

    pub costs: MoveCosts,

    /// When `false`, rack cells are walls for every path except the one that
    /// starts or ends at that rack.
    pub rack_cells_passable: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            extents:             Extents::new(25, 30, 6),
            dock:                Cell::new(0, 29, 0),
            allow_diagonal:      false,
            costs:               MoveCosts::default(),
            rack_cells_passable: true,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> CoreResult<()> {
        let e = self.extents;
        if e.width == 0 || e.depth == 0 || e.levels == 0 {
            return Err(CoreError::Config(format!("grid extents {e} must be non-zero")));
        }
        if !e.contains(self.dock) {
            return Err(CoreError::Config(format!("dock {} lies outside extents {e}", self.dock)));
        }
        let c = self.costs;
        if c.orthogonal == 0 {
            return Err(CoreError::Config("orthogonal move cost must be positive".into()));
        }
        // Octile heuristic stays consistent only inside this band.
        if self.allow_diagonal && (c.diagonal < c.orthogonal || c.diagonal > 2 * c.orthogonal) {
            return Err(CoreError::Config(format!(
                "diagonal cost {} must lie in [{}, {}]",
                c.diagonal,
                c.orthogonal,
                2 * c.orthogonal
            )));
        }
        Ok(())
    }
}

// ── SchedulerConfig ───────────────────────────────────────────────────────────

/// Job lifecycle budgets and retry policy, all in ticks.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// Dwell at the pickup cell while the box is loaded.
    pub load_ticks: u64,
    /// Dwell at the drop-off cell while the box is unloaded.
    pub unload_ticks: u64,

    /// Maximum ticks a job may spend between assignment and departure
    /// (Assigned, Planning and Reserved together).
    pub planning_budget_ticks: u64,

    /// Ticks an executing job may run past its planned arrival before its
    /// vehicle is declared `Blocked`.
    pub executing_slack_ticks: u64,

    /// Reservation conflicts tolerated before the job fails with `Conflict`.
    pub max_conflict_retries: u32,
    /// Failed planning attempts tolerated before the job fails `Unreachable`.
    pub max_unreachable_retries: u32,
    /// Wait between planning retries.
    pub retry_backoff_ticks: u64,

    /// Write attempts per commit before `PersistenceFailure` is surfaced.
    pub persistence_attempts: u32,
    /// Take a full snapshot after this many committed events (0 = never).
    pub snapshot_every_events: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            load_ticks:              1,
            unload_ticks:            1,
            planning_budget_ticks:   30,
            executing_slack_ticks:   10,
            max_conflict_retries:    3,
            max_unreachable_retries: 5,
            retry_backoff_ticks:     2,
            persistence_attempts:    3,
            snapshot_every_events:   50,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.persistence_attempts == 0 {
            return Err(CoreError::Config("persistence_attempts must be at least 1".into()));
        }
        if self.retry_backoff_ticks == 0 {
            return Err(CoreError::Config("retry_backoff_ticks must be at least 1".into()));
        }
        Ok(())
    }
}

// ── RunConfig ─────────────────────────────────────────────────────────────────

/// Top-level run parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    /// Unix timestamp for tick 0.
    pub start_unix_secs: i64,

    /// Seconds per tick (time to cross one cell).
    pub tick_duration_secs: u32,

    /// Total ticks to simulate.
    pub total_ticks: u64,

    /// Master RNG seed for workload generation.
    pub seed: u64,

    /// Emit vehicle snapshots every N ticks.  0 disables snapshots.
    pub output_interval_ticks: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_unix_secs:       0,
            tick_duration_secs:    1,
            total_ticks:           1_000,
            seed:                  42,
            output_interval_ticks: 1,
        }
    }
}

impl RunConfig {
    /// The tick at which the run ends (exclusive upper bound).
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.total_ticks)
    }

    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.start_unix_secs, self.tick_duration_secs)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.tick_duration_secs == 0 {
            return Err(CoreError::Config("tick_duration_secs must be positive".into()));
        }
        Ok(())
    }
}

// ── AsrsConfig ────────────────────────────────────────────────────────────────

/// Everything needed to stand up a warehouse engine.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AsrsConfig {
    pub grid:      GridConfig,
    pub scheduler: SchedulerConfig,
    pub run:       RunConfig,
}

impl AsrsConfig {
    pub fn validate(&self) -> CoreResult<()> {
        self.grid.validate()?;
        self.scheduler.validate()?;
        self.run.validate()
    }
}
