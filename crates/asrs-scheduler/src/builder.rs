//! Fluent builder for constructing a [`Scheduler`], fresh or from a store.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::{info, warn};

use asrs_core::{AsrsConfig, Cell, ErrorKind, SimClock, Tick};
use asrs_fleet::Fleet;
use asrs_grid::{Grid, GridError, Pathfinder};
use asrs_registry::{RackLayout, Registry, SlottingPolicy};
use asrs_reservation::ReservationTable;
use asrs_store::PersistenceGateway;

use crate::{
    JOB_ID_BLOCK, Job, JobState, JobTransition, RetryQueue, Scheduler, SchedulerError, SchedulerResult,
    SchedulerStats,
};

/// Fluent builder for [`Scheduler<P, G>`].
///
/// # Required inputs
///
/// - [`AsrsConfig`]: grid shape, dock, budgets, run length
/// - `P: Pathfinder`: the route planner (e.g. [`asrs_grid::AStarPlanner`])
/// - `G: PersistenceGateway`: the durable store
///
/// # Optional inputs (have defaults)
///
/// | Method           | Default                              |
/// |------------------|--------------------------------------|
/// | `.grid(g)`       | `Grid::from_config(&config.grid)`    |
/// | `.layout(l)`     | No racks                             |
/// | `.policy(p)`     | `SlottingPolicy::Nearest`            |
/// | `.vehicles(v)`   | One vehicle parked at the dock       |
///
/// # Example
///
/// ```rust,ignore
/// let layout = RackLayout::aisles(extents, dock, 4, 8, SizeClass::Bulk, 500.0);
/// let mut scheduler = SchedulerBuilder::new(config, AStarPlanner::new(costs), MemoryGateway::new())
///     .layout(layout)
///     .vehicles(vec![dock])
///     .build()?;
/// scheduler.run(&mut NoopObserver)?;
/// ```
pub struct SchedulerBuilder<P: Pathfinder, G: PersistenceGateway> {
    config:   AsrsConfig,
    planner:  P,
    gateway:  G,
    grid:     Option<Grid>,
    layout:   RackLayout,
    policy:   SlottingPolicy,
    vehicles: Option<Vec<Cell>>,
}

impl<P: Pathfinder, G: PersistenceGateway> SchedulerBuilder<P, G> {
    pub fn new(config: AsrsConfig, planner: P, gateway: G) -> Self {
        Self {
            config,
            planner,
            gateway,
            grid:     None,
            layout:   RackLayout::new(),
            policy:   SlottingPolicy::default(),
            vehicles: None,
        }
    }

    /// Supply a grid with walls.  Its extents should match `config.grid`.
    pub fn grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Racks to stand up on a fresh start.  Ignored by
    /// [`recover`](Self::recover), which takes racks from the store.
    pub fn layout(mut self, layout: RackLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn policy(mut self, policy: SlottingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Starting cell of each vehicle; `VehicleId(i)` starts at `cells[i]`.
    pub fn vehicles(mut self, cells: Vec<Cell>) -> Self {
        self.vehicles = Some(cells);
        self
    }

    /// Start from an empty store: stand up the layout and write the initial
    /// snapshot (`seq` 0).
    ///
    /// # Errors
    ///
    /// `StoreNotEmpty` if the gateway already holds state, plus any config,
    /// layout or store error.
    pub fn build(self) -> SchedulerResult<Scheduler<P, G>> {
        self.config.validate()?;
        let recovered = self.gateway.recover()?;
        if !recovered.is_empty() {
            return Err(SchedulerError::StoreNotEmpty);
        }
        self.fresh()
    }

    fn fresh(mut self) -> SchedulerResult<Scheduler<P, G>> {
        let grid = self.grid.take().unwrap_or_else(|| Grid::from_config(&self.config.grid));
        let registry = Registry::from_layout(grid, self.config.grid.dock, &self.layout)?
            .with_policy(self.policy.clone());
        self.gateway.snapshot(0, &registry.snapshot())?;
        self.gateway.reserve_job_ids(JOB_ID_BLOCK)?;
        info!(
            racks = registry.rack_count(),
            capacity = registry.total_capacity(),
            "warehouse initialised"
        );

        let clock = self.config.run.make_clock();
        let mut scheduler = self.assemble(registry, clock, 1, 0)?;
        scheduler.job_ids_through = JOB_ID_BLOCK;
        Ok(scheduler)
    }

    /// Rebuild from the gateway's latest snapshot plus every event
    /// journalled after it.
    ///
    /// `in_flight` are the jobs that were still active when the previous
    /// process stopped (see [`Scheduler::abort`]).  None of them committed,
    /// so each is archived as `Failed(Interrupted)` for the caller to
    /// resubmit.  Job ids continue after the last block the store reserved,
    /// so ids of rejected or cancelled jobs, which leave no event, are never
    /// reused.
    ///
    /// An empty store falls back to [`build`](Self::build)'s fresh start.
    pub fn recover(mut self, in_flight: Vec<Job>) -> SchedulerResult<Scheduler<P, G>> {
        self.config.validate()?;
        let recovered = self.gateway.recover()?;
        if recovered.is_empty() {
            info!("store is empty; starting fresh");
            let mut scheduler = self.fresh()?;
            scheduler.archive_interrupted(in_flight);
            return Ok(scheduler);
        }

        let grid = self.grid.take().unwrap_or_else(|| Grid::from_config(&self.config.grid));
        let registry = Registry::restore(
            grid,
            self.config.grid.dock,
            self.policy.clone(),
            &recovered.snapshot,
            recovered.changes(),
        )?;

        // Resume after the last tick anything happened on.
        let last_event = recovered.events.last().map_or(Tick(0), |e| e.tick);
        let last_job = in_flight.iter().map(|j| j.updated).max().unwrap_or(Tick(0));
        let resume = if recovered.events.is_empty() && in_flight.is_empty() {
            Tick(0)
        } else {
            last_event.max(last_job) + 1
        };
        let run = &self.config.run;
        let clock = SimClock::starting_at(run.start_unix_secs, run.tick_duration_secs, resume);

        let next_seq = recovered.next_seq();
        info!(
            snapshot_seq = recovered.snapshot_seq,
            replayed = recovered.events.len(),
            next_seq,
            stored = registry.stored_count(),
            resume = %resume,
            "recovered from store"
        );

        let mut scheduler = self.assemble(registry, clock, next_seq, recovered.snapshot_seq)?;
        let after_events = recovered.events.iter().map(|e| e.job.0 + 1).max().unwrap_or(0);
        scheduler.next_job = after_events.max(recovered.job_ids_through);
        scheduler.archive_interrupted(in_flight);
        let through = scheduler.next_job + JOB_ID_BLOCK;
        scheduler.gateway.reserve_job_ids(through)?;
        scheduler.job_ids_through = through;
        Ok(scheduler)
    }

    fn assemble(
        self,
        registry:          Registry,
        clock:             SimClock,
        next_seq:          u64,
        last_snapshot_seq: u64,
    ) -> SchedulerResult<Scheduler<P, G>> {
        let cells = self.vehicles.unwrap_or_else(|| vec![self.config.grid.dock]);
        if let Some(&cell) = cells.iter().find(|&&c| !registry.grid().contains(c)) {
            return Err(GridError::OutOfBounds(cell).into());
        }
        let fleet = Fleet::from_cells(cells);

        Ok(Scheduler {
            config: self.config,
            clock,
            registry,
            reservations: ReservationTable::new(),
            fleet,
            planner: self.planner,
            gateway: self.gateway,
            jobs: BTreeMap::new(),
            active: BTreeSet::new(),
            queue: VecDeque::new(),
            retry: RetryQueue::new(),
            plan_now: Vec::new(),
            inbound: HashMap::new(),
            claimed: HashMap::new(),
            next_job: 0,
            job_ids_through: 0,
            next_seq,
            last_snapshot_seq,
            stats: SchedulerStats::default(),
            outbox: Vec::new(),
        })
    }
}

impl<P: Pathfinder, G: PersistenceGateway> Scheduler<P, G> {
    /// Record jobs cut off by a restart as `Failed(Interrupted)`.
    fn archive_interrupted(&mut self, in_flight: Vec<Job>) {
        let now = self.now();
        for mut job in in_flight {
            let id = job.id;
            let from = job.state;
            warn!(job = %id, kind = %job.kind(), box_id = %job.box_id(), %from, "interrupted by restart");
            job.state = JobState::Failed(ErrorKind::Interrupted);
            job.updated = now;
            job.event = None;
            self.next_job = self.next_job.max(id.0 + 1);
            self.stats.record_submitted();
            self.stats.record_failed(ErrorKind::Interrupted);
            self.outbox.push(JobTransition { job: id, tick: now, from, to: job.state });
            self.jobs.insert(id, job);
        }
    }
}
