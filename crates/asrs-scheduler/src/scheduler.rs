//! The `Scheduler` struct and its tick loop.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::Path;

use tracing::{debug, error, info, trace, warn};

use asrs_core::{
    AsrsConfig, BoxId, Cell, ErrorKind, JobId, RackId, SchedulerConfig, SimClock, Tick, TimeWindow,
    VehicleId,
};
use asrs_fleet::{Activity, Fleet, Itinerary, ItineraryBuilder, Step, VehicleSnapshot, VehicleStatus};
use asrs_grid::{Grid, GridResult, Pathfinder};
use asrs_registry::{InventoryChange, Registry};
use asrs_reservation::ReservationTable;
use asrs_store::{InventoryEvent, PersistenceGateway, export_operations_csv};

use crate::{
    Job, JobKind, JobRequest, JobState, JobTransition, RetryQueue, SchedulerError,
    SchedulerObserver, SchedulerResult, SchedulerStats,
};

/// Job ids reserved in the store per round trip.
pub const JOB_ID_BLOCK: u64 = 64;

// ── Planning inputs ───────────────────────────────────────────────────────────

/// Data collected for one job before the (potentially parallel) planning
/// phase.  Building this sequentially keeps planning side-effect-free.
struct PlanInput {
    job:     JobId,
    vehicle: VehicleId,
    from:    Cell,
    /// `None` once the box is on board.
    pickup:  Option<Cell>,
    dropoff: Cell,
}

struct Planned {
    itinerary:    Itinerary,
    pickup_slots: usize,
}

/// Route `input`'s vehicle through pickup and drop-off, treating every cell
/// another vehicle holds (now or later) or stands on as a wall.
fn plan_itinerary<P: Pathfinder>(
    planner:      &P,
    grid:         &Grid,
    reservations: &ReservationTable,
    occupied:     &[(VehicleId, Cell)],
    config:       &SchedulerConfig,
    input:        &PlanInput,
    now:          Tick,
) -> GridResult<Planned> {
    let mut avoid = reservations.reserved_cells(input.vehicle, now);
    avoid.extend(
        occupied
            .iter()
            .filter(|&&(v, _)| v != input.vehicle)
            .map(|&(_, cell)| cell),
    );

    let mut builder = ItineraryBuilder::new(input.from);
    if let Some(pickup) = input.pickup {
        let leg = planner.plan(grid, input.from, pickup, &avoid)?;
        builder = builder.travel(&leg).dwell(Activity::Load, config.load_ticks);
    }
    let pickup_slots = builder.len();
    let leg = planner.plan(grid, builder.end_cell(), input.dropoff, &avoid)?;
    let itinerary = builder
        .travel(&leg)
        .dwell(Activity::Unload, config.unload_ticks)
        .build(now + 1);
    Ok(Planned { itinerary, pickup_slots })
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// The job scheduler: owns the registry, the fleet and the reservation table
/// and drives every job through its state machine one tick at a time.
///
/// Each tick runs these phases in order:
///
/// 1. **Expire**: drop reservations for past ticks.
/// 2. **Depart**: `Reserved` jobs whose departure tick has come start
///    `Executing`.
/// 3. **Advance**: every executing vehicle consumes one itinerary slot.
///    Arrivals move to `Completing`; stalls hold their cell or, past the
///    deadline, block the vehicle and re-route everyone crossing it.
/// 4. **Commit**: `Completing` jobs apply their inventory change and journal
///    it; a failed write is retried on later ticks.
/// 5. **Budgets**: jobs stuck in `Assigned`, `Planning` or `Reserved` time
///    out.  A re-routed job whose vehicle already left blocks it in place.
/// 6. **Assign**: pending jobs, oldest first, take the nearest idle vehicle.
/// 7. **Plan** (parallel with the `parallel` feature): route every job that
///    is due, against a per-shard snapshot of the reservation table.
/// 8. **Reserve** (sequential, ascending `JobId`): write each route's
///    reservations all-or-nothing; conflicts and unreachable goals back off
///    through the [`RetryQueue`].
///
/// Create via [`SchedulerBuilder`][crate::SchedulerBuilder].
pub struct Scheduler<P: Pathfinder, G: PersistenceGateway> {
    pub config: AsrsConfig,
    pub clock:  SimClock,

    pub(crate) registry:     Registry,
    pub(crate) reservations: ReservationTable,
    pub(crate) fleet:        Fleet,
    pub(crate) planner:      P,
    pub(crate) gateway:      G,

    /// Every job ever submitted, terminal ones included.
    pub(crate) jobs:    BTreeMap<JobId, Job>,
    /// Non-terminal jobs.
    pub(crate) active:  BTreeSet<JobId>,
    /// `Pending` jobs in arrival order.
    pub(crate) queue:   VecDeque<JobId>,
    pub(crate) retry:   RetryQueue,
    /// Jobs to route this tick without waiting on the retry queue.
    pub(crate) plan_now: Vec<JobId>,

    /// Store jobs in flight per destination rack.
    pub(crate) inbound: HashMap<RackId, u32>,
    /// Boxes with a job in flight.
    pub(crate) claimed: HashMap<BoxId, JobId>,

    pub(crate) next_job:          u64,
    /// Ids below this are durably reserved and never handed out again.
    pub(crate) job_ids_through:   u64,
    pub(crate) next_seq:          u64,
    pub(crate) last_snapshot_seq: u64,

    pub(crate) stats:  SchedulerStats,
    /// Transitions not yet delivered to an observer.
    pub(crate) outbox: Vec<JobTransition>,
}

impl<P: Pathfinder, G: PersistenceGateway> Scheduler<P, G> {
    // ── Running ───────────────────────────────────────────────────────────

    /// Run from the current tick to `config.run.end_tick()`.
    pub fn run<O: SchedulerObserver>(&mut self, observer: &mut O) -> SchedulerResult<()> {
        while self.clock.current_tick < self.config.run.end_tick() {
            self.tick(observer)?;
        }
        observer.on_run_end(self.clock.current_tick);
        Ok(())
    }

    /// Run exactly `n` ticks from the current position (ignores `end_tick`).
    pub fn run_ticks<O: SchedulerObserver>(&mut self, n: u64, observer: &mut O) -> SchedulerResult<()> {
        for _ in 0..n {
            self.tick(observer)?;
        }
        Ok(())
    }

    /// Run until no job is in flight, for at most `max_ticks`.  Returns the
    /// number of ticks run.
    pub fn run_until_idle<O: SchedulerObserver>(
        &mut self,
        max_ticks: u64,
        observer:  &mut O,
    ) -> SchedulerResult<u64> {
        let mut ran = 0;
        while !self.active.is_empty() && ran < max_ticks {
            self.tick(observer)?;
            ran += 1;
        }
        self.flush(observer);
        Ok(ran)
    }

    fn tick<O: SchedulerObserver>(&mut self, observer: &mut O) -> SchedulerResult<()> {
        let now = self.clock.current_tick;
        observer.on_tick_start(now);
        self.flush(observer);

        self.process_tick(now)?;

        self.flush(observer);
        let every = self.config.run.output_interval_ticks;
        if every > 0 && now.0.is_multiple_of(every) {
            observer.on_vehicles(now, &self.fleet.snapshots());
        }
        observer.on_tick_end(now, self.active.len());
        self.clock.advance();
        Ok(())
    }

    fn flush<O: SchedulerObserver>(&mut self, observer: &mut O) {
        for transition in self.outbox.drain(..) {
            observer.on_transition(&transition);
        }
    }

    // ── Job intake ────────────────────────────────────────────────────────

    /// Accept a request and return its id.
    ///
    /// Requests that cannot succeed are failed immediately, before any
    /// vehicle is assigned: a store into a full or unsuitable rack
    /// (`CapacityExceeded`), a store with no rack left (`NoCapacity`), a box
    /// already stored or claimed by another job (`AlreadyStored` for stores,
    /// `NotStored` for retrieves), an unknown box or rack (`NotFound`).
    ///
    /// Ids come from blocks of [`JOB_ID_BLOCK`] reserved in the store, so a
    /// restart never reuses one.  If a new block cannot be reserved the
    /// request fails with `PersistenceFailure`.
    pub fn submit_job(&mut self, request: JobRequest) -> JobId {
        let now = self.now();
        let id = JobId(self.next_job);
        self.next_job += 1;
        self.stats.record_submitted();

        let mut job = Job::new(id, request, self.registry.dock(), now);
        match self.reserve_job_id(id).and_then(|()| self.admit(&mut job)) {
            Ok(()) => {
                debug!(job = %id, kind = %job.kind(), box_id = %job.box_id(), "job accepted");
                if let (JobKind::Store, Some(rack)) = (job.kind(), job.rack) {
                    *self.inbound.entry(rack).or_default() += 1;
                }
                self.claimed.insert(job.box_id(), id);
                self.queue.push_back(id);
                self.active.insert(id);
            }
            Err(kind) => {
                warn!(job = %id, box_id = %job.box_id(), %kind, "job rejected");
                job.state = JobState::Failed(kind);
                self.stats.record_failed(kind);
                self.outbox.push(JobTransition {
                    job:  id,
                    tick: now,
                    from: JobState::Pending,
                    to:   job.state,
                });
            }
        }
        self.jobs.insert(id, job);
        id
    }

    /// Make sure `id` lies inside a durably reserved block.
    fn reserve_job_id(&mut self, id: JobId) -> Result<(), ErrorKind> {
        if id.0 < self.job_ids_through {
            return Ok(());
        }
        let through = id.0 + JOB_ID_BLOCK;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.gateway.reserve_job_ids(through) {
                Ok(()) => {
                    debug!(through, "job id block reserved");
                    self.job_ids_through = through;
                    return Ok(());
                }
                Err(e) if attempt < self.config.scheduler.persistence_attempts => {
                    warn!(job = %id, attempt, error = %e, "job id reservation failed; retrying");
                }
                Err(e) => {
                    error!(job = %id, error = %e, "job id reservation failed for good");
                    return Err(ErrorKind::PersistenceFailure);
                }
            }
        }
    }

    /// Resolve the job's rack and route endpoints, or say why it cannot run.
    fn admit(&self, job: &mut Job) -> Result<(), ErrorKind> {
        let box_id = job.box_id();
        let dock = self.registry.dock();
        match &job.request {
            JobRequest::Store { spec, rack } => {
                if self.claimed.contains_key(&box_id) {
                    return Err(ErrorKind::AlreadyStored);
                }
                if self.registry.box_record(box_id).is_ok_and(|r| r.location.is_some()) {
                    return Err(ErrorKind::AlreadyStored);
                }
                let rack = match *rack {
                    Some(rack) => {
                        self.registry.check_compatible(spec, rack).map_err(|e| e.kind())?;
                        let inbound = self.inbound.get(&rack).copied().unwrap_or(0);
                        self.registry.check_capacity(rack, inbound).map_err(|e| e.kind())?;
                        rack
                    }
                    None => self
                        .registry
                        .find_rack_for_store(spec, &self.inbound)
                        .map_err(|e| e.kind())?,
                };
                job.rack = Some(rack);
                job.pickup = dock;
                job.dropoff = self.registry.rack(rack).map_err(|e| e.kind())?.position;
            }
            JobRequest::Retrieve { .. } => {
                if self.claimed.contains_key(&box_id) {
                    return Err(ErrorKind::NotStored);
                }
                let record = self.registry.box_record(box_id).map_err(|e| e.kind())?;
                let rack = record.location.ok_or(ErrorKind::NotStored)?;
                job.rack = Some(rack);
                job.pickup = self.registry.rack(rack).map_err(|e| e.kind())?.position;
                job.dropoff = dock;
            }
        }
        Ok(())
    }

    /// Cancel a job that has not yet set off.
    ///
    /// # Errors
    ///
    /// `JobNotFound`, or `CannotCancel` once the job's vehicle has departed,
    /// even if a re-route has since put it back in `Planning` or `Reserved`.
    pub fn cancel_job(&mut self, id: JobId) -> SchedulerResult<()> {
        let job = self.jobs.get(&id).ok_or(SchedulerError::JobNotFound(id))?;
        if !job.is_cancellable() {
            return Err(SchedulerError::CannotCancel { job: id, state: job.state });
        }
        let now = self.now();
        self.finish_job(id, JobState::Cancelled, now)
    }

    // ── Operator hooks ────────────────────────────────────────────────────

    /// Freeze `vehicle` for `ticks` ticks, as if jammed.
    pub fn stall_vehicle(&mut self, vehicle: VehicleId, ticks: u64) -> SchedulerResult<()> {
        let until = self.now() + ticks;
        self.fleet.stall(vehicle, until)?;
        Ok(())
    }

    /// Return a `Blocked` vehicle to service.
    pub fn clear_blocked(&mut self, vehicle: VehicleId) -> SchedulerResult<()> {
        self.fleet.clear_blocked(vehicle)?;
        info!(%vehicle, "blocked vehicle cleared");
        Ok(())
    }

    /// Write a full snapshot now.  Returns the journal `seq` it covers.
    ///
    /// # Errors
    ///
    /// `CommitsInFlight` while an applied change is still waiting to be
    /// journalled, since a snapshot would make it durable out of order.
    pub fn checkpoint(&mut self) -> SchedulerResult<u64> {
        let waiting = self.uncommitted();
        if waiting > 0 {
            return Err(SchedulerError::CommitsInFlight(waiting));
        }
        let seq = self.next_seq - 1;
        self.gateway.snapshot(seq, &self.registry.snapshot())?;
        self.last_snapshot_seq = seq;
        info!(seq, "checkpoint written");
        Ok(seq)
    }

    /// Flush the gateway.
    pub fn finish(&mut self) -> SchedulerResult<()> {
        self.gateway.finish()?;
        Ok(())
    }

    /// Export the journal as the operations-log CSV.  Returns the row count.
    pub fn export_operations(&self, path: &Path) -> SchedulerResult<usize> {
        let journal = self.gateway.journal()?;
        Ok(export_operations_csv(&journal, path)?)
    }

    /// Stop abruptly, as a crash would: nothing is flushed or snapshotted.
    ///
    /// Returns the gateway and every job still in flight, ready for
    /// [`SchedulerBuilder::recover`][crate::SchedulerBuilder::recover].
    pub fn abort(self) -> (G, Vec<Job>) {
        let in_flight = self
            .active
            .iter()
            .filter_map(|id| self.jobs.get(id).cloned())
            .collect();
        (self.gateway, in_flight)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn now(&self) -> Tick {
        self.clock.current_tick
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn reservations(&self) -> &ReservationTable {
        &self.reservations
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    /// Every job, in id order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> + '_ {
        self.jobs.values()
    }

    /// Number of non-terminal jobs.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn vehicle_snapshots(&self) -> Vec<VehicleSnapshot> {
        self.fleet.snapshots()
    }

    // ── Core tick processing ──────────────────────────────────────────────

    fn process_tick(&mut self, now: Tick) -> SchedulerResult<()> {
        let expired = self.reservations.expire_before(now);
        trace!(tick = %now, expired, "reservations expired");

        self.start_departures(now)?;
        self.advance_vehicles(now)?;
        self.commit_arrivals(now)?;
        self.enforce_budgets(now)?;
        self.assign_vehicles(now)?;
        self.plan_and_reserve(now)
    }

    fn jobs_in(&self, state: JobState) -> Vec<JobId> {
        self.active
            .iter()
            .copied()
            .filter(|id| self.jobs.get(id).is_some_and(|j| j.state == state))
            .collect()
    }

    fn state_of(&self, id: JobId) -> Option<JobState> {
        self.jobs.get(&id).map(|j| j.state)
    }

    fn transition(&mut self, id: JobId, to: JobState, now: Tick) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        let from = job.state;
        job.state = to;
        job.updated = now;
        trace!(job = %id, %from, %to, "transition");
        self.outbox.push(JobTransition { job: id, tick: now, from, to });
    }

    /// Move a job to a terminal state and release everything it holds.
    fn finish_job(&mut self, id: JobId, to: JobState, now: Tick) -> SchedulerResult<()> {
        self.transition(id, to, now);
        self.active.remove(&id);
        self.queue.retain(|&j| j != id);

        let Some(job) = self.jobs.get_mut(&id) else {
            return Ok(());
        };
        job.event = None;
        let (kind, box_id, rack, vehicle, path_len) =
            (job.kind(), job.box_id(), job.rack, job.vehicle, job.path_len);

        if let (JobKind::Store, Some(rack)) = (kind, rack) {
            if let Some(n) = self.inbound.get_mut(&rack) {
                *n = n.saturating_sub(1);
                if *n == 0 {
                    self.inbound.remove(&rack);
                }
            }
        }
        if self.claimed.get(&box_id) == Some(&id) {
            self.claimed.remove(&box_id);
        }
        if let Some(v) = vehicle {
            self.reservations.release(v);
            self.fleet.release(v)?;
        }

        match to {
            JobState::Done => {
                self.stats.record_done(kind, now, path_len);
                info!(job = %id, %kind, %box_id, path_len, tick = %now, "job done");
            }
            JobState::Failed(error) => {
                self.stats.record_failed(error);
                warn!(job = %id, %kind, %box_id, %error, tick = %now, "job failed");
            }
            JobState::Cancelled => {
                self.stats.record_cancelled();
                info!(job = %id, %kind, %box_id, tick = %now, "job cancelled");
            }
            _ => {}
        }
        Ok(())
    }

    /// Fail a job.  If its vehicle already departed it is left `Blocked`
    /// where it stands, box and all.
    fn fail_job(&mut self, id: JobId, kind: ErrorKind, now: Tick) -> SchedulerResult<()> {
        let stranded = self.jobs.get(&id).filter(|j| j.departed).and_then(|j| j.vehicle);
        match stranded {
            Some(vehicle) => self.block_vehicle(id, vehicle, kind, now),
            None => self.finish_job(id, JobState::Failed(kind), now),
        }
    }

    /// Drop a job's route and send it back to planning from where its
    /// vehicle stands.
    fn reroute(&mut self, id: JobId, now: Tick) -> SchedulerResult<()> {
        let Some(job) = self.jobs.get_mut(&id) else {
            return Ok(());
        };
        job.stalled = false;
        job.pickup_slots = None;
        job.budget_from = now;
        if let Some(v) = job.vehicle {
            self.reservations.release(v);
            self.fleet.clear_itinerary(v);
        }
        debug!(job = %id, "re-routing");
        self.transition(id, JobState::Planning, now);
        self.plan_now.push(id);
        Ok(())
    }

    /// Transactions applied to the registry but not yet journalled.
    fn uncommitted(&self) -> usize {
        self.active
            .iter()
            .filter(|id| self.jobs.get(id).is_some_and(|j| j.event.is_some()))
            .count()
    }

    // ── Phase 2: departures ───────────────────────────────────────────────

    fn start_departures(&mut self, now: Tick) -> SchedulerResult<()> {
        for id in self.jobs_in(JobState::Reserved) {
            let Some(v) = self.jobs.get(&id).and_then(|j| j.vehicle) else {
                continue;
            };
            if self.fleet.itinerary(v).is_some_and(|it| it.depart <= now) {
                self.fleet.depart(v)?;
                if let Some(job) = self.jobs.get_mut(&id) {
                    job.departed = true;
                }
                self.transition(id, JobState::Executing, now);
            }
        }
        Ok(())
    }

    // ── Phase 3: movement ─────────────────────────────────────────────────

    fn advance_vehicles(&mut self, now: Tick) -> SchedulerResult<()> {
        for id in self.jobs_in(JobState::Executing) {
            // An earlier block in this loop may have re-routed it.
            if self.state_of(id) != Some(JobState::Executing) {
                continue;
            }
            let Some(job) = self.jobs.get(&id) else {
                continue;
            };
            let Some(v) = job.vehicle else {
                continue;
            };
            let (stalled, deadline) = (job.stalled, job.deadline);

            if now > deadline {
                warn!(job = %id, vehicle = %v, %deadline, "executing past deadline");
                self.block_vehicle(id, v, ErrorKind::TimedOut, now)?;
                continue;
            }
            let vehicle = self.fleet.get(v)?;
            if stalled && !vehicle.is_stalled(now) {
                // The reserved slots no longer match the vehicle's timing.
                self.reroute(id, now)?;
                continue;
            }

            let before = vehicle.current_cell;
            match self.fleet.step(v, now)? {
                Step::Stalled(cell) => self.hold_stalled(id, v, cell, now)?,
                Step::Moved(cell) => self.note_progress(id, v, before, cell),
                Step::Arrived(cell) => {
                    self.note_progress(id, v, before, cell);
                    self.transition(id, JobState::Completing, now);
                }
            }
        }
        Ok(())
    }

    fn note_progress(&mut self, id: JobId, vehicle: VehicleId, before: Cell, after: Cell) {
        let consumed = self
            .fleet
            .itinerary(vehicle)
            .map_or(0, |it| it.len() - it.remaining().len());
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        if after != before {
            job.path_len += 1;
        }
        if !job.loaded && job.pickup_slots.is_some_and(|n| consumed >= n) {
            job.loaded = true;
            trace!(job = %id, %vehicle, "box on board");
        }
    }

    /// Keep a stalled vehicle's cell reserved.  If another vehicle already
    /// holds it, the vehicle is declared blocked.
    fn hold_stalled(&mut self, id: JobId, vehicle: VehicleId, cell: Cell, now: Tick) -> SchedulerResult<()> {
        if let Some(job) = self.jobs.get_mut(&id) {
            job.stalled = true;
        }
        let hold = [(cell, TimeWindow::new(now, now + 2))];
        if let Err(e) = self.reservations.try_reserve(vehicle, &hold) {
            warn!(job = %id, %vehicle, error = %e, "stalled vehicle lost its cell");
            self.block_vehicle(id, vehicle, ErrorKind::TimedOut, now)?;
        }
        Ok(())
    }

    /// Fail the job with `kind`, leave the vehicle `Blocked` where it is,
    /// and re-route every other job whose route crosses that cell.
    fn block_vehicle(&mut self, id: JobId, vehicle: VehicleId, kind: ErrorKind, now: Tick) -> SchedulerResult<()> {
        let cell = self.fleet.block(vehicle)?;
        self.finish_job(id, JobState::Failed(kind), now)?;

        let crossing: Vec<JobId> = self
            .active
            .iter()
            .copied()
            .filter(|other| {
                self.jobs.get(other).is_some_and(|j| {
                    matches!(j.state, JobState::Reserved | JobState::Executing)
                        && j.vehicle
                            .and_then(|v| self.fleet.itinerary(v))
                            .is_some_and(|it| it.crosses(cell))
                })
            })
            .collect();
        for other in crossing {
            self.reroute(other, now)?;
        }
        Ok(())
    }

    // ── Phase 4: commit ───────────────────────────────────────────────────

    fn commit_arrivals(&mut self, now: Tick) -> SchedulerResult<()> {
        for id in self.jobs_in(JobState::Completing) {
            let needs_apply = self.jobs.get(&id).is_some_and(|j| j.event.is_none());
            if needs_apply {
                if let Err(kind) = self.apply_change(id, now) {
                    self.finish_job(id, JobState::Failed(kind), now)?;
                    continue;
                }
            }
            let Some(event) = self.jobs.get(&id).and_then(|j| j.event.clone()) else {
                continue;
            };

            match self.gateway.append_event(&event) {
                Ok(()) => {
                    debug!(job = %id, seq = event.seq, op = event.change.operation(), "committed");
                    self.finish_job(id, JobState::Done, now)?;
                    self.maybe_snapshot();
                }
                Err(e) => {
                    let limit = self.config.scheduler.persistence_attempts;
                    let Some(job) = self.jobs.get_mut(&id) else {
                        continue;
                    };
                    job.persist_attempts += 1;
                    let attempt = job.persist_attempts;
                    if attempt >= limit {
                        error!(
                            job = %id,
                            seq = event.seq,
                            error = %e,
                            "commit failed for good; durable state is behind memory"
                        );
                        self.finish_job(id, JobState::Failed(ErrorKind::PersistenceFailure), now)?;
                    } else {
                        warn!(job = %id, seq = event.seq, attempt, error = %e, "commit failed; retrying");
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply the job's inventory change to the registry and stage its event.
    fn apply_change(&mut self, id: JobId, now: Tick) -> Result<(), ErrorKind> {
        let job = self.jobs.get(&id).ok_or(ErrorKind::NotFound)?;
        let rack = job.rack.ok_or(ErrorKind::NotFound)?;
        let (change, sku) = match &job.request {
            JobRequest::Store { spec, .. } => (
                InventoryChange::Placed { spec: spec.clone(), rack },
                spec.sku.clone(),
            ),
            JobRequest::Retrieve { box_id } => {
                let sku = self
                    .registry
                    .box_record(*box_id)
                    .map(|r| r.spec.sku)
                    .map_err(|e| e.kind())?;
                (InventoryChange::Removed { box_id: *box_id, rack }, sku)
            }
        };
        let path_len = job.path_len;

        self.registry.apply(&change).map_err(|e| e.kind())?;

        let event = InventoryEvent { seq: self.next_seq, tick: now, job: id, sku, change, path_len };
        self.next_seq += 1;
        if let Some(job) = self.jobs.get_mut(&id) {
            job.event = Some(event);
        }
        Ok(())
    }

    fn maybe_snapshot(&mut self) {
        let every = self.config.scheduler.snapshot_every_events;
        let last = self.next_seq - 1;
        if every == 0 || last - self.last_snapshot_seq < every || self.uncommitted() > 0 {
            return;
        }
        match self.gateway.snapshot(last, &self.registry.snapshot()) {
            Ok(()) => {
                self.last_snapshot_seq = last;
                debug!(seq = last, "snapshot written");
            }
            Err(e) => warn!(seq = last, error = %e, "snapshot failed; retrying after the next commit"),
        }
    }

    // ── Phase 5: budgets ──────────────────────────────────────────────────

    fn enforce_budgets(&mut self, now: Tick) -> SchedulerResult<()> {
        let budget = self.config.scheduler.planning_budget_ticks;
        let expired: Vec<JobId> = self
            .active
            .iter()
            .copied()
            .filter(|id| {
                self.jobs.get(id).is_some_and(|j| {
                    matches!(j.state, JobState::Assigned | JobState::Planning | JobState::Reserved)
                        && now.since(j.budget_from) > budget
                })
            })
            .collect();
        for id in expired {
            warn!(job = %id, budget, "planning budget exhausted");
            self.fail_job(id, ErrorKind::TimedOut, now)?;
        }
        Ok(())
    }

    // ── Phase 6: assignment ───────────────────────────────────────────────

    fn assign_vehicles(&mut self, now: Tick) -> SchedulerResult<()> {
        while let Some(&id) = self.queue.front() {
            let Some(pickup) = self.jobs.get(&id).map(|j| j.pickup) else {
                self.queue.pop_front();
                continue;
            };
            let Some(v) = self.fleet.nearest_available(pickup, now) else {
                break;
            };
            self.queue.pop_front();
            self.fleet.assign(v, id)?;
            if let Some(job) = self.jobs.get_mut(&id) {
                job.vehicle = Some(v);
                job.budget_from = now;
            }
            debug!(job = %id, vehicle = %v, "assigned");
            self.transition(id, JobState::Assigned, now);
            self.transition(id, JobState::Planning, now);
            self.plan_now.push(id);
        }
        Ok(())
    }

    // ── Phases 7–8: plan, then reserve ────────────────────────────────────

    fn plan_and_reserve(&mut self, now: Tick) -> SchedulerResult<()> {
        let mut due = std::mem::take(&mut self.plan_now);
        due.extend(self.retry.drain_due(now));
        due.sort_unstable();
        due.dedup();

        let inputs: Vec<PlanInput> = due
            .into_iter()
            .filter_map(|id| {
                let job = self.jobs.get(&id).filter(|j| j.state == JobState::Planning)?;
                let vehicle = job.vehicle?;
                let from = self.fleet.get(vehicle).ok()?.current_cell;
                Some(PlanInput {
                    job: id,
                    vehicle,
                    from,
                    pickup: (!job.loaded).then_some(job.pickup),
                    dropoff: job.dropoff,
                })
            })
            .collect();
        if inputs.is_empty() {
            return Ok(());
        }

        let plans = self.compute_plans(now, &inputs);

        // Ascending JobId: the lower id wins any reservation race.
        for (input, plan) in inputs.iter().zip(plans) {
            self.apply_plan(input, plan, now)?;
        }
        Ok(())
    }

    /// Route every input.  With the `parallel` feature this runs on Rayon's
    /// thread pool; results come back in input order either way.
    fn compute_plans(&self, now: Tick, inputs: &[PlanInput]) -> Vec<GridResult<Planned>> {
        // Vehicles standing on a cell they are not free to leave.
        let occupied: Vec<(VehicleId, Cell)> = self
            .fleet
            .vehicles
            .iter()
            .filter(|v| v.job.is_some() || v.status == VehicleStatus::Blocked)
            .map(|v| (v.id, v.current_cell))
            .collect();

        let planner      = &self.planner;
        let grid         = self.registry.grid();
        let reservations = &self.reservations;
        let config       = &self.config.scheduler;
        let occupied     = occupied.as_slice();

        let plan_one = |input: &PlanInput| {
            plan_itinerary(planner, grid, reservations, occupied, config, input, now)
        };

        #[cfg(not(feature = "parallel"))]
        {
            inputs.iter().map(plan_one).collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            inputs.par_iter().map(plan_one).collect()
        }
    }

    fn apply_plan(&mut self, input: &PlanInput, plan: GridResult<Planned>, now: Tick) -> SchedulerResult<()> {
        let id = input.job;
        let planned = match plan {
            Ok(planned) => planned,
            Err(e) if e.kind().is_transient() => {
                let attempts = self.jobs.get_mut(&id).map_or(0, |j| {
                    j.unreachable += 1;
                    j.unreachable
                });
                return self.back_off(id, attempts, self.config.scheduler.max_unreachable_retries, e.kind(), now);
            }
            Err(e) => {
                debug!(job = %id, error = %e, "route impossible");
                return self.fail_job(id, e.kind(), now);
            }
        };

        // A vehicle blocked earlier in this phase is not in the plan's avoid set.
        let blocked = self.fleet.blocked_cells().find(|&cell| planned.itinerary.crosses(cell));
        if let Some(cell) = blocked {
            debug!(job = %id, vehicle = %input.vehicle, %cell, "route crosses a blocked vehicle");
            return self.lose_race(id, now);
        }
        let requests = planned.itinerary.reservation_requests(now);
        if let Err(e) = self.reservations.try_reserve(input.vehicle, &requests) {
            debug!(job = %id, vehicle = %input.vehicle, error = %e, "reservation lost");
            return self.lose_race(id, now);
        }

        let deadline = planned.itinerary.planned_arrival() + self.config.scheduler.executing_slack_ticks;
        debug!(
            job = %id,
            vehicle = %input.vehicle,
            depart = %planned.itinerary.depart,
            arrival = %planned.itinerary.planned_arrival(),
            "route reserved"
        );
        if let Some(job) = self.jobs.get_mut(&id) {
            job.deadline = deadline;
            job.pickup_slots = Some(planned.pickup_slots);
            job.loaded |= planned.pickup_slots == 0;
        }
        self.fleet.set_itinerary(input.vehicle, planned.itinerary)?;
        self.transition(id, JobState::Reserved, now);
        Ok(())
    }

    fn lose_race(&mut self, id: JobId, now: Tick) -> SchedulerResult<()> {
        let attempts = self.jobs.get_mut(&id).map_or(0, |j| {
            j.conflicts += 1;
            j.conflicts
        });
        self.back_off(id, attempts, self.config.scheduler.max_conflict_retries, ErrorKind::Conflict, now)
    }

    /// Park a job for another planning attempt, or fail it with `kind` once
    /// `attempts` exceeds `limit`.
    fn back_off(&mut self, id: JobId, attempts: u32, limit: u32, kind: ErrorKind, now: Tick) -> SchedulerResult<()> {
        if attempts > limit {
            return self.fail_job(id, kind, now);
        }
        let at = now + self.config.scheduler.retry_backoff_ticks;
        warn!(job = %id, %kind, attempts, retry_at = %at, "planning retry");
        self.retry.push(at, id);
        Ok(())
    }
}
