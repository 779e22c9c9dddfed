//! Integration tests for asrs-scheduler.

use std::collections::HashSet;

use asrs_core::{AsrsConfig, BoxId, Cell, ErrorKind, Extents, JobId, MoveCosts, RackId, Tick, VehicleId};
use asrs_fleet::{VehicleSnapshot, VehicleStatus};
use asrs_grid::{AStarPlanner, GridBuilder};
use asrs_registry::{BoxSpec, RackLayout, SizeClass};
use asrs_store::{MemoryGateway, PersistenceGateway};

use crate::{
    JOB_ID_BLOCK, JobRequest, JobState, JobTransition, NoopObserver, Scheduler, SchedulerBuilder,
    SchedulerObserver,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const ORIGIN: Cell = Cell::new(0, 0, 0);

fn c(x: i32, y: i32) -> Cell {
    Cell::new(x, y, 0)
}

fn test_config(width: u32, depth: u32, dock: Cell) -> AsrsConfig {
    let mut config = AsrsConfig::default();
    config.grid.extents = Extents::new(width, depth, 1);
    config.grid.dock = dock;
    config.run.total_ticks = 500;
    config
}

fn planner() -> AStarPlanner {
    AStarPlanner::new(MoveCosts::default())
}

fn layout(racks: &[(Cell, u32)]) -> RackLayout {
    let mut layout = RackLayout::new();
    for &(cell, capacity) in racks {
        layout.push(cell, capacity, SizeClass::Bulk, 500.0);
    }
    layout
}

fn bx(id: u32) -> BoxSpec {
    BoxSpec::new(BoxId(id), format!("SKU-{id}"))
}

type TestScheduler = Scheduler<AStarPlanner, MemoryGateway>;

/// 10×10×1, dock and one vehicle at the origin, one rack at `(5,5,0)`.
fn single_rack(capacity: u32) -> (TestScheduler, MemoryGateway) {
    let gateway = MemoryGateway::new();
    let scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway.clone())
        .layout(layout(&[(c(5, 5), capacity)]))
        .vehicles(vec![ORIGIN])
        .build()
        .unwrap();
    (scheduler, gateway)
}

/// Records every callback for later inspection.
#[derive(Default)]
struct Recorder {
    transitions: Vec<JobTransition>,
    frames:      Vec<(Tick, Vec<VehicleSnapshot>)>,
}

impl SchedulerObserver for Recorder {
    fn on_transition(&mut self, transition: &JobTransition) {
        self.transitions.push(*transition);
    }

    fn on_vehicles(&mut self, tick: Tick, vehicles: &[VehicleSnapshot]) {
        self.frames.push((tick, vehicles.to_vec()));
    }
}

impl Recorder {
    fn history(&self, job: JobId) -> Vec<(JobState, JobState)> {
        self.transitions
            .iter()
            .filter(|t| t.job == job)
            .map(|t| (t.from, t.to))
            .collect()
    }

    fn assert_no_shared_cells(&self) {
        for (tick, vehicles) in &self.frames {
            let mut seen = HashSet::new();
            for v in vehicles {
                assert!(seen.insert(v.cell), "two vehicles on {} at {tick}", v.cell);
            }
        }
    }
}

// ── Round trips ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod round_trip_tests {
    use super::*;

    #[test]
    fn store_job_reaches_done() {
        let (mut scheduler, gateway) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));

        scheduler.run_ticks(1, &mut NoopObserver).unwrap();
        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Reserved);
        assert_eq!(job.vehicle, Some(VehicleId(0)));
        assert!(!scheduler.reservations().held_by(VehicleId(0)).is_empty());

        let ran = scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        assert_eq!(ran, 12, "load at T1, ten moves, unload at T12");

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.path_len, 10);
        assert_eq!(job.updated, Tick(12));
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
        assert_eq!(gateway.event_count(), 1);
        assert!(scheduler.reservations().is_empty());

        let vehicle = scheduler.fleet().get(VehicleId(0)).unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Idle);
        assert_eq!(vehicle.current_cell, c(5, 5));
        assert_eq!(vehicle.job, None);
    }

    #[test]
    fn retrieve_returns_box_to_dock() {
        let (mut scheduler, gateway) = single_rack(1);
        scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let id = scheduler.submit_job(JobRequest::retrieve(BoxId(1)));
        assert_eq!(scheduler.job(id).unwrap().pickup, c(5, 5));
        assert_eq!(scheduler.job(id).unwrap().dropoff, ORIGIN);
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.path_len, 10);
        assert!(scheduler.registry().find_box(BoxId(1)).is_err());
        assert_eq!(scheduler.registry().box_record(BoxId(1)).unwrap().location, None);
        assert_eq!(scheduler.fleet().get(VehicleId(0)).unwrap().current_cell, ORIGIN);

        let journal = scheduler.gateway().journal().unwrap();
        let ops: Vec<_> = journal.iter().map(|e| (e.seq, e.change.operation(), e.path_len)).collect();
        assert_eq!(ops, vec![(1, "STORED", 10), (2, "RETRIEVED", 10)]);
        assert_eq!(gateway.event_count(), 2);
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        let mut rec = Recorder::default();
        scheduler.run_until_idle(100, &mut rec).unwrap();

        use JobState::*;
        assert_eq!(
            rec.history(id),
            vec![
                (Pending, Assigned),
                (Assigned, Planning),
                (Planning, Reserved),
                (Reserved, Executing),
                (Executing, Completing),
                (Completing, Done),
            ]
        );
        assert_eq!(rec.frames.len(), 13);
    }

    #[test]
    fn nearest_idle_vehicle_is_assigned() {
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), MemoryGateway::new())
            .layout(layout(&[(c(5, 5), 1)]))
            .vehicles(vec![c(9, 9), c(1, 0)])
            .build()
            .unwrap();
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_ticks(1, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.job(id).unwrap().vehicle, Some(VehicleId(1)));
    }

    #[test]
    fn stats_track_completions() {
        let (mut scheduler, _) = single_rack(1);
        scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        scheduler.submit_job(JobRequest::retrieve(BoxId(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let stats = scheduler.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.stores_completed, 1);
        assert_eq!(stats.retrieves_completed, 1);
        assert_eq!(stats.in_flight(), 0);
        assert!((stats.average_path_len() - 10.0).abs() < 1e-9);
        assert_eq!(stats.completed_between(Tick(0), Tick(13)), 1);
        assert_eq!(stats.completed_between(Tick(0), Tick(26)), 2);
        assert!((scheduler.registry().utilization() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn operations_log_exports_journal() {
        let (mut scheduler, _) = single_rack(1);
        scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operations.csv");
        assert_eq!(scheduler.export_operations(&path).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["id,box,sku,operation,tick,distance", "1,1,SKU-1,STORED,12,10"]);
    }
}

// ── Admission ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod admission_tests {
    use super::*;

    #[test]
    fn full_rack_fails_before_assignment() {
        let (mut scheduler, _) = single_rack(1);
        scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let id = scheduler.submit_job(JobRequest::store_into(bx(2), RackId(0)));
        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Failed(ErrorKind::CapacityExceeded));
        assert_eq!(job.vehicle, None);
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(scheduler.stats().failures_of(ErrorKind::CapacityExceeded), 1);
    }

    #[test]
    fn inbound_stores_count_against_capacity() {
        let (mut scheduler, _) = single_rack(1);
        let first = scheduler.submit_job(JobRequest::store(bx(1)));
        let explicit = scheduler.submit_job(JobRequest::store_into(bx(2), RackId(0)));
        let slotted = scheduler.submit_job(JobRequest::store(bx(3)));

        assert_eq!(scheduler.job(first).unwrap().state, JobState::Pending);
        assert_eq!(scheduler.job(explicit).unwrap().error(), Some(ErrorKind::CapacityExceeded));
        assert_eq!(scheduler.job(slotted).unwrap().error(), Some(ErrorKind::NoCapacity));
    }

    #[test]
    fn incompatible_rack_is_rejected() {
        let mut small = RackLayout::new();
        small.push(c(5, 5), 4, SizeClass::Small, 5.0);
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), MemoryGateway::new())
            .layout(small)
            .build()
            .unwrap();
        let bulky = BoxSpec::of_class(BoxId(1), "PALLET", SizeClass::Bulk);
        let id = scheduler.submit_job(JobRequest::store_into(bulky, RackId(0)));
        assert_eq!(scheduler.job(id).unwrap().error(), Some(ErrorKind::CapacityExceeded));
    }

    #[test]
    fn duplicate_boxes_are_rejected() {
        let (mut scheduler, _) = single_rack(2);
        scheduler.submit_job(JobRequest::store(bx(1)));
        let dup = scheduler.submit_job(JobRequest::store(bx(1)));
        assert_eq!(scheduler.job(dup).unwrap().error(), Some(ErrorKind::AlreadyStored));

        let early = scheduler.submit_job(JobRequest::retrieve(BoxId(1)));
        assert_eq!(scheduler.job(early).unwrap().error(), Some(ErrorKind::NotStored));

        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        let again = scheduler.submit_job(JobRequest::store(bx(1)));
        assert_eq!(scheduler.job(again).unwrap().error(), Some(ErrorKind::AlreadyStored));
    }

    #[test]
    fn unknown_box_retrieve_is_not_found() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::retrieve(BoxId(99)));
        assert_eq!(scheduler.job(id).unwrap().error(), Some(ErrorKind::NotFound));
    }

    #[test]
    fn rejections_reach_observers() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::retrieve(BoxId(99)));
        let mut rec = Recorder::default();
        scheduler.run_ticks(1, &mut rec).unwrap();
        assert_eq!(rec.history(id), vec![(JobState::Pending, JobState::Failed(ErrorKind::NotFound))]);
    }

    #[test]
    fn job_ids_are_sequential() {
        let (mut scheduler, _) = single_rack(4);
        let ids: Vec<JobId> = (1..=3).map(|i| scheduler.submit_job(JobRequest::store(bx(i)))).collect();
        assert_eq!(ids, vec![JobId(0), JobId(1), JobId(2)]);
        assert_eq!(scheduler.jobs().count(), 3);
    }
}

// ── Cancellation ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod cancel_tests {
    use super::*;
    use crate::SchedulerError;

    #[test]
    fn pending_job_cancels_and_frees_capacity() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.cancel_job(id).unwrap();
        assert_eq!(scheduler.job(id).unwrap().state, JobState::Cancelled);
        assert_eq!(scheduler.stats().cancelled, 1);

        // The inbound slot and the box claim are both released.
        let retry = scheduler.submit_job(JobRequest::store_into(bx(1), RackId(0)));
        assert_eq!(scheduler.job(retry).unwrap().state, JobState::Pending);
    }

    #[test]
    fn reserved_job_releases_reservations() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_ticks(1, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.job(id).unwrap().state, JobState::Reserved);

        scheduler.cancel_job(id).unwrap();
        assert!(scheduler.reservations().is_empty());
        let vehicle = scheduler.fleet().get(VehicleId(0)).unwrap();
        assert!(vehicle.is_available());
        assert!(scheduler.fleet().itinerary(VehicleId(0)).is_none());
    }

    #[test]
    fn executing_job_cannot_cancel() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_ticks(2, &mut NoopObserver).unwrap();

        let err = scheduler.cancel_job(id).unwrap_err();
        assert!(matches!(err, SchedulerError::CannotCancel { state: JobState::Executing, .. }));
        assert_eq!(err.kind(), ErrorKind::CannotCancel);

        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        let err = scheduler.cancel_job(id).unwrap_err();
        assert!(matches!(err, SchedulerError::CannotCancel { state: JobState::Done, .. }));
    }

    #[test]
    fn unknown_job_is_not_found() {
        let (mut scheduler, _) = single_rack(1);
        let err = scheduler.cancel_job(JobId(7)).unwrap_err();
        assert!(matches!(err, SchedulerError::JobNotFound(JobId(7))));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

// ── Conflicts and routing failures ────────────────────────────────────────────

#[cfg(test)]
mod conflict_tests {
    use super::*;

    /// 9×3 floor split by a wall at x = 5 except for the corridor cell
    /// `(5,0,0)`.  Dock at the origin, racks at `(8,0,0)` and `(8,2,0)`.
    fn corridor() -> TestScheduler {
        let grid = GridBuilder::new(Extents::new(9, 3, 1))
            .block(c(5, 1))
            .block(c(5, 2))
            .build();
        SchedulerBuilder::new(test_config(9, 3, ORIGIN), planner(), MemoryGateway::new())
            .grid(grid)
            .layout(layout(&[(c(8, 0), 1), (c(8, 2), 1)]))
            .vehicles(vec![c(1, 0), c(0, 1)])
            .build()
            .unwrap()
    }

    #[test]
    fn lower_job_id_wins_a_shared_cell() {
        let mut scheduler = corridor();
        let first = scheduler.submit_job(JobRequest::store_into(bx(1), RackId(0)));
        let second = scheduler.submit_job(JobRequest::store_into(bx(2), RackId(1)));
        scheduler.run_ticks(1, &mut NoopObserver).unwrap();

        // Both vehicles want the dock at T1; only the first route is written.
        assert_eq!(scheduler.job(first).unwrap().state, JobState::Reserved);
        let loser = scheduler.job(second).unwrap();
        assert_eq!(loser.state, JobState::Planning);
        assert_eq!(loser.conflicts, 1);
        assert_eq!(scheduler.reservations().holder(ORIGIN, Tick(1)), Some(VehicleId(0)));
        assert!(scheduler.reservations().held_by(VehicleId(1)).is_empty());
    }

    #[test]
    fn loser_waits_for_the_corridor_then_completes() {
        let mut scheduler = corridor();
        let first = scheduler.submit_job(JobRequest::store_into(bx(1), RackId(0)));
        let second = scheduler.submit_job(JobRequest::store_into(bx(2), RackId(1)));
        let mut rec = Recorder::default();
        scheduler.run_until_idle(200, &mut rec).unwrap();

        let a = scheduler.job(first).unwrap();
        let b = scheduler.job(second).unwrap();
        assert_eq!(a.state, JobState::Done);
        assert_eq!(b.state, JobState::Done);
        assert_eq!(a.updated, Tick(11));
        assert!(b.updated > a.updated);
        assert!(b.unreachable >= 1, "the corridor was held while the loser re-planned");
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
        assert_eq!(scheduler.registry().find_box(BoxId(2)).unwrap(), RackId(1));
        rec.assert_no_shared_cells();
    }

    fn walled_rack(budget: u64, retries: u32) -> TestScheduler {
        let mut config = test_config(10, 10, ORIGIN);
        config.scheduler.planning_budget_ticks = budget;
        config.scheduler.max_unreachable_retries = retries;
        let grid = GridBuilder::new(Extents::new(10, 10, 1))
            .block(c(4, 5))
            .block(c(6, 5))
            .block(c(5, 4))
            .block(c(5, 6))
            .build();
        SchedulerBuilder::new(config, planner(), MemoryGateway::new())
            .grid(grid)
            .layout(layout(&[(c(5, 5), 1)]))
            .build()
            .unwrap()
    }

    #[test]
    fn unreachable_rack_fails_after_retries() {
        let mut scheduler = walled_rack(30, 5);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Failed(ErrorKind::Unreachable));
        assert_eq!(job.unreachable, 6);
        assert_eq!(job.updated, Tick(10));
        assert!(scheduler.fleet().get(VehicleId(0)).unwrap().is_available());
        assert!(scheduler.registry().box_record(BoxId(1)).is_err(), "no partial mutation");
    }

    #[test]
    fn planning_budget_times_out() {
        let mut scheduler = walled_rack(3, 10);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Failed(ErrorKind::TimedOut));
        assert_eq!(job.unreachable, 2);
        assert_eq!(job.updated, Tick(4));
    }
}

// ── Stalls, blocking and re-routing ───────────────────────────────────────────

#[cfg(test)]
mod fault_tests {
    use super::*;
    use crate::SchedulerError;

    #[test]
    fn short_stall_reroutes_and_completes() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        let mut rec = Recorder::default();
        scheduler.run_ticks(4, &mut rec).unwrap();
        scheduler.stall_vehicle(VehicleId(0), 3).unwrap();
        scheduler.run_until_idle(100, &mut rec).unwrap();

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.path_len, 10);
        assert_eq!(job.updated, Tick(16));
        assert!(rec.history(id).contains(&(JobState::Executing, JobState::Planning)));
    }

    #[test]
    fn rerouted_job_cannot_cancel() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_ticks(4, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.job(id).unwrap().state, JobState::Executing);
        scheduler.stall_vehicle(VehicleId(0), 3).unwrap();
        for _ in 0..10 {
            if scheduler.job(id).unwrap().state != JobState::Executing {
                break;
            }
            scheduler.run_ticks(1, &mut NoopObserver).unwrap();
        }

        // Back in Reserved after the stall, but the box is already on board.
        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Reserved);
        assert!(job.departed);
        assert!(job.loaded);
        assert!(!job.is_cancellable());

        let err = scheduler.cancel_job(id).unwrap_err();
        assert!(matches!(err, SchedulerError::CannotCancel { state: JobState::Reserved, .. }));
        assert_eq!(scheduler.fleet().get(VehicleId(0)).unwrap().job, Some(id));

        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.updated, Tick(16));
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
    }

    /// 10×3 floor.  Row 0 is the only way east past x = 5; row 1 is walled
    /// except at x = 0 and x = 5, and row 2 is open up to x = 5.  A store
    /// runs from the dock at the origin to `(9,0,0)`.  A second vehicle
    /// parked on `(5,0,0)` takes a retrieve from `(5,2,0)`, jams, and is
    /// blocked there as the store closes in.  The store, already under way,
    /// then has no route left.
    fn stranded_store(budget: u64) -> (TestScheduler, JobId, JobId) {
        let mut config = test_config(10, 3, ORIGIN);
        config.scheduler.planning_budget_ticks = budget;
        let grid = GridBuilder::new(Extents::new(10, 3, 1))
            .block_region(c(1, 1), c(4, 1))
            .block_region(c(6, 1), c(9, 2))
            .build();
        let mut scheduler = SchedulerBuilder::new(config, planner(), MemoryGateway::new())
            .grid(grid)
            .layout(layout(&[(c(9, 0), 1), (c(5, 2), 1)]))
            .vehicles(vec![ORIGIN, c(5, 0)])
            .build()
            .unwrap();
        scheduler.registry().place_new(bx(7), RackId(1)).unwrap();

        let store = scheduler.submit_job(JobRequest::store_into(bx(1), RackId(0)));
        scheduler.run_ticks(3, &mut NoopObserver).unwrap();
        let retrieve = scheduler.submit_job(JobRequest::retrieve(BoxId(7)));
        scheduler.run_ticks(1, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.job(retrieve).unwrap().state, JobState::Reserved);
        assert_eq!(scheduler.job(retrieve).unwrap().vehicle, Some(VehicleId(1)));

        scheduler.stall_vehicle(VehicleId(1), 50).unwrap();
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        assert_eq!(scheduler.job(retrieve).unwrap().state, JobState::Failed(ErrorKind::TimedOut));
        assert_eq!(scheduler.fleet().get(VehicleId(1)).unwrap().status, VehicleStatus::Blocked);
        assert_eq!(scheduler.registry().find_box(BoxId(7)).unwrap(), RackId(1));
        (scheduler, store, retrieve)
    }

    fn assert_stranded(scheduler: &TestScheduler, store: JobId) {
        let job = scheduler.job(store).unwrap();
        assert!(job.departed);
        assert!(job.loaded);
        let vehicle = scheduler.fleet().get(VehicleId(0)).unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Blocked, "the box is still on board");
        assert_eq!(vehicle.current_cell, c(4, 0));
        assert_eq!(vehicle.job, None);
        assert!(scheduler.registry().box_record(BoxId(1)).is_err());
        assert!(scheduler.reservations().is_empty());
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn stranded_reroute_blocks_its_vehicle() {
        let (scheduler, store, _) = stranded_store(30);
        let job = scheduler.job(store).unwrap();
        assert_eq!(job.state, JobState::Failed(ErrorKind::Unreachable));
        assert_eq!(job.unreachable, 6);
        assert_eq!(job.updated, Tick(15));
        assert_stranded(&scheduler, store);
    }

    #[test]
    fn stranded_reroute_past_budget_blocks_its_vehicle() {
        let (scheduler, store, _) = stranded_store(3);
        let job = scheduler.job(store).unwrap();
        assert_eq!(job.state, JobState::Failed(ErrorKind::TimedOut));
        assert_eq!(job.unreachable, 2);
        assert_eq!(job.updated, Tick(9));
        assert_stranded(&scheduler, store);
    }

    #[test]
    fn long_stall_blocks_vehicle() {
        let (mut scheduler, _) = single_rack(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_ticks(3, &mut NoopObserver).unwrap();
        scheduler.stall_vehicle(VehicleId(0), 100).unwrap();
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Failed(ErrorKind::TimedOut));
        assert_eq!(job.updated, Tick(23), "planned arrival T12 plus ten ticks of slack");
        assert!(scheduler.registry().box_record(BoxId(1)).is_err(), "no partial mutation");
        assert!(scheduler.reservations().is_empty());

        let vehicle = scheduler.fleet().get(VehicleId(0)).unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Blocked);
        assert_eq!(vehicle.job, None);
        assert_eq!(scheduler.stats().failures_of(ErrorKind::TimedOut), 1);

        // Cleared, the vehicle serves the resubmitted job.
        scheduler.clear_blocked(VehicleId(0)).unwrap();
        let again = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.job(again).unwrap().state, JobState::Done);
    }

    #[test]
    fn clear_blocked_rejects_working_vehicle() {
        let (mut scheduler, _) = single_rack(1);
        assert!(scheduler.clear_blocked(VehicleId(0)).is_err());
        assert!(scheduler.stall_vehicle(VehicleId(9), 1).is_err());
    }

    /// Dock at `(0,5,0)`, a store heading east along row 5 and a parked
    /// vehicle sitting on that row at `(5,5,0)`.  The parked vehicle takes a
    /// retrieve, jams before leaving, and loses its cell to the passing
    /// route: it is blocked and the passing job re-routes around it.
    #[test]
    fn blocked_vehicle_reroutes_crossing_jobs() {
        let dock = c(0, 5);
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, dock), planner(), MemoryGateway::new())
            .layout(layout(&[(c(9, 5), 1), (c(5, 2), 1)]))
            .vehicles(vec![dock, c(5, 5)])
            .build()
            .unwrap();
        scheduler.registry().place_new(bx(7), RackId(1)).unwrap();

        let mut rec = Recorder::default();
        let store = scheduler.submit_job(JobRequest::store_into(bx(1), RackId(0)));
        scheduler.run_ticks(3, &mut rec).unwrap();
        let retrieve = scheduler.submit_job(JobRequest::retrieve(BoxId(7)));
        scheduler.run_ticks(1, &mut rec).unwrap();
        assert_eq!(scheduler.job(retrieve).unwrap().state, JobState::Reserved);
        assert_eq!(scheduler.job(retrieve).unwrap().vehicle, Some(VehicleId(1)));

        scheduler.stall_vehicle(VehicleId(1), 50).unwrap();
        scheduler.run_until_idle(100, &mut rec).unwrap();

        assert_eq!(scheduler.job(retrieve).unwrap().state, JobState::Failed(ErrorKind::TimedOut));
        assert_eq!(scheduler.fleet().get(VehicleId(1)).unwrap().status, VehicleStatus::Blocked);
        assert_eq!(scheduler.registry().find_box(BoxId(7)).unwrap(), RackId(1));

        let job = scheduler.job(store).unwrap();
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.path_len, 11, "one detour around the blocked cell");
        assert!(rec.history(store).contains(&(JobState::Executing, JobState::Planning)));
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
    }
}

// ── Persistence ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod persistence_tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use asrs_registry::RegistrySnapshot;
    use asrs_store::{InventoryEvent, Recovered, StoreError, StoreResult};

    use crate::SchedulerError;

    #[test]
    fn transient_write_failures_are_retried() {
        let (mut scheduler, gateway) = single_rack(1);
        gateway.fail_next(2);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.persist_attempts, 2);
        assert_eq!(job.updated, Tick(14));
        assert_eq!(gateway.event_count(), 1);
    }

    #[test]
    fn exhausted_writes_fail_the_job() {
        let (mut scheduler, gateway) = single_rack(1);
        gateway.fail_next(3);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Failed(ErrorKind::PersistenceFailure));
        assert_eq!(gateway.event_count(), 0);
        // Memory is ahead of the store; that is what the failure reports.
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
        assert!(scheduler.fleet().get(VehicleId(0)).unwrap().is_available());
    }

    /// Journals every event but reports the first append as failed, like a
    /// commit whose acknowledgement was lost.
    struct LostAck {
        inner: MemoryGateway,
        lost:  AtomicBool,
    }

    impl PersistenceGateway for LostAck {
        fn snapshot(&self, seq: u64, snapshot: &RegistrySnapshot) -> StoreResult<()> {
            self.inner.snapshot(seq, snapshot)
        }

        fn append_event(&self, event: &InventoryEvent) -> StoreResult<()> {
            self.inner.append_event(event)?;
            if self.lost.swap(true, Ordering::SeqCst) { Ok(()) } else { Err(StoreError::Injected) }
        }

        fn reserve_job_ids(&self, through: u64) -> StoreResult<()> {
            self.inner.reserve_job_ids(through)
        }

        fn recover(&self) -> StoreResult<Recovered> {
            self.inner.recover()
        }

        fn journal(&self) -> StoreResult<Vec<InventoryEvent>> {
            self.inner.journal()
        }
    }

    #[test]
    fn retried_commit_that_landed_completes() {
        let inner = MemoryGateway::new();
        let gateway = LostAck { inner: inner.clone(), lost: AtomicBool::new(false) };
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway)
            .layout(layout(&[(c(5, 5), 1)]))
            .vehicles(vec![ORIGIN])
            .build()
            .unwrap();
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();

        let job = scheduler.job(id).unwrap();
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.persist_attempts, 1);
        assert_eq!(inner.event_count(), 1);
        drop(scheduler);

        let scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), inner)
            .recover(Vec::new())
            .unwrap();
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
        assert_eq!(scheduler.registry().stored_count(), 1);
    }

    #[test]
    fn checkpoint_waits_for_pending_commits() {
        let (mut scheduler, gateway) = single_rack(1);
        gateway.fail_next(1);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_ticks(13, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.job(id).unwrap().state, JobState::Completing);

        let err = scheduler.checkpoint().unwrap_err();
        assert!(matches!(err, SchedulerError::CommitsInFlight(1)));

        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.checkpoint().unwrap(), 1);
        assert_eq!(gateway.snapshot_count(), 2);
    }

    #[test]
    fn snapshots_follow_the_cadence() {
        let mut config = test_config(10, 10, ORIGIN);
        config.scheduler.snapshot_every_events = 2;
        let gateway = MemoryGateway::new();
        let mut scheduler = SchedulerBuilder::new(config, planner(), gateway.clone())
            .layout(layout(&[(c(5, 5), 1), (c(6, 5), 1), (c(7, 5), 1)]))
            .build()
            .unwrap();
        assert_eq!(gateway.snapshot_count(), 1);

        for i in 1..=3 {
            scheduler.submit_job(JobRequest::store(bx(i)));
        }
        scheduler.run_until_idle(300, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.stats().completed, 3);
        assert_eq!(gateway.snapshot_count(), 2);

        let recovered = scheduler.gateway().recover().unwrap();
        assert_eq!(recovered.snapshot_seq, 2);
        assert_eq!(recovered.events.len(), 1);
    }
}

// ── Builder and recovery ──────────────────────────────────────────────────────

#[cfg(test)]
mod recovery_tests {
    use super::*;
    use asrs_grid::GridError;
    use asrs_store::JsonlGateway;

    use crate::SchedulerError;

    fn two_racks() -> RackLayout {
        layout(&[(c(5, 5), 1), (c(6, 5), 1)])
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = test_config(10, 10, ORIGIN);
        config.scheduler.persistence_attempts = 0;
        let result = SchedulerBuilder::new(config, planner(), MemoryGateway::new()).build();
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn vehicles_must_be_on_the_grid() {
        let result = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), MemoryGateway::new())
            .vehicles(vec![c(50, 0)])
            .build();
        assert!(matches!(result, Err(SchedulerError::Grid(GridError::OutOfBounds(_)))));
    }

    #[test]
    fn build_refuses_a_used_store() {
        let gateway = MemoryGateway::new();
        SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway.clone())
            .layout(two_racks())
            .build()
            .unwrap();
        let again = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway).build();
        assert!(matches!(again, Err(SchedulerError::StoreNotEmpty)));
    }

    #[test]
    fn recover_on_empty_store_starts_fresh() {
        let gateway = MemoryGateway::new();
        let scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway.clone())
            .layout(two_racks())
            .recover(Vec::new())
            .unwrap();
        assert_eq!(scheduler.registry().rack_count(), 2);
        assert_eq!(gateway.snapshot_count(), 1);
        assert_eq!(scheduler.now(), Tick(0));
    }

    #[test]
    fn crash_mid_execution_loses_only_the_in_flight_job() {
        let gateway = MemoryGateway::new();
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway.clone())
            .layout(two_racks())
            .build()
            .unwrap();
        scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.checkpoint().unwrap(), 1);

        let lost = scheduler.submit_job(JobRequest::store(bx(2)));
        scheduler.run_ticks(3, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.job(lost).unwrap().state, JobState::Executing);

        let (store, in_flight) = scheduler.abort();
        assert_eq!(in_flight.len(), 1);

        let mut rec = Recorder::default();
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), store)
            .recover(in_flight)
            .unwrap();
        assert_eq!(scheduler.registry().rack_count(), 2);
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
        assert!(scheduler.registry().box_record(BoxId(2)).is_err());
        assert_eq!(scheduler.job(lost).unwrap().state, JobState::Failed(ErrorKind::Interrupted));
        assert_eq!(scheduler.stats().failures_of(ErrorKind::Interrupted), 1);
        assert!(scheduler.now() > Tick(12));

        // Resubmitted under a fresh id, it completes normally.
        let retry = scheduler.submit_job(JobRequest::store(bx(2)));
        assert_eq!(retry, JobId(JOB_ID_BLOCK));
        scheduler.run_until_idle(100, &mut rec).unwrap();
        assert_eq!(scheduler.job(retry).unwrap().state, JobState::Done);
        assert_eq!(scheduler.registry().find_box(BoxId(2)).unwrap(), RackId(1));
        assert_eq!(
            rec.history(lost),
            vec![(JobState::Executing, JobState::Failed(ErrorKind::Interrupted))]
        );

        let journal = gateway.journal().unwrap();
        let seqs: Vec<u64> = journal.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn ids_of_rejected_and_cancelled_jobs_are_not_reused() {
        let gateway = MemoryGateway::new();
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway.clone())
            .layout(two_racks())
            .build()
            .unwrap();
        let cancelled = scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.cancel_job(cancelled).unwrap();
        let rejected = scheduler.submit_job(JobRequest::retrieve(BoxId(9)));
        assert_eq!(scheduler.job(rejected).unwrap().state, JobState::Failed(ErrorKind::NotFound));
        assert_eq!((cancelled, rejected), (JobId(0), JobId(1)));
        // Neither job left an event behind.
        assert!(gateway.journal().unwrap().is_empty());

        let (store, in_flight) = scheduler.abort();
        assert!(in_flight.is_empty());
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), store)
            .recover(in_flight)
            .unwrap();
        let next = scheduler.submit_job(JobRequest::store(bx(1)));
        assert_eq!(next, JobId(JOB_ID_BLOCK));
        assert_eq!(gateway.recover().unwrap().job_ids_through, 2 * JOB_ID_BLOCK);

        scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
        assert_eq!(scheduler.job(next).unwrap().state, JobState::Done);
    }

    #[test]
    fn ids_past_the_reserved_block_extend_it() {
        let (mut scheduler, gateway) = single_rack(1);
        let ids: Vec<JobId> =
            (0..=JOB_ID_BLOCK).map(|_| scheduler.submit_job(JobRequest::retrieve(BoxId(99)))).collect();
        assert_eq!(ids.last(), Some(&JobId(JOB_ID_BLOCK)));
        assert_eq!(gateway.recover().unwrap().job_ids_through, 2 * JOB_ID_BLOCK);

        // A block that cannot be reserved rejects the request.
        let mut config = test_config(10, 10, ORIGIN);
        config.scheduler.persistence_attempts = 2;
        let gateway = MemoryGateway::new();
        let mut scheduler = SchedulerBuilder::new(config, planner(), gateway.clone())
            .layout(layout(&[(c(5, 5), 1)]))
            .build()
            .unwrap();
        for _ in 0..JOB_ID_BLOCK {
            scheduler.submit_job(JobRequest::retrieve(BoxId(99)));
        }
        gateway.fail_next(2);
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        assert_eq!(scheduler.job(id).unwrap().state, JobState::Failed(ErrorKind::PersistenceFailure));
        assert_eq!(gateway.recover().unwrap().job_ids_through, JOB_ID_BLOCK);

        // The next request reserves again.
        let id = scheduler.submit_job(JobRequest::store(bx(1)));
        assert_eq!(scheduler.job(id).unwrap().state, JobState::Pending);
    }

    #[test]
    fn duplicated_journal_line_replays_once() {
        let dir = tempfile::tempdir().unwrap();
        {
            let gateway = JsonlGateway::open(dir.path()).unwrap();
            let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway)
                .layout(two_racks())
                .build()
                .unwrap();
            scheduler.submit_job(JobRequest::store(bx(1)));
            scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
            let (store, _) = scheduler.abort();
            // A retried commit wrote the same line twice.
            let journal = store.journal().unwrap();
            assert_eq!(journal.len(), 1);
            store.append_event(&journal[0]).unwrap();
            store.finish().unwrap();
        }

        let gateway = JsonlGateway::open(dir.path()).unwrap();
        let scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway)
            .recover(Vec::new())
            .unwrap();
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
        assert_eq!(scheduler.registry().stored_count(), 1);
    }

    #[test]
    fn journal_replays_events_after_the_snapshot() {
        let gateway = MemoryGateway::new();
        let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway.clone())
            .layout(two_racks())
            .build()
            .unwrap();
        scheduler.submit_job(JobRequest::store(bx(1)));
        scheduler.submit_job(JobRequest::store(bx(2)));
        scheduler.run_until_idle(200, &mut NoopObserver).unwrap();
        let (store, _) = scheduler.abort();

        // Only the initial snapshot exists; both stores come from the journal.
        assert_eq!(gateway.snapshot_count(), 1);
        let scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), store)
            .recover(Vec::new())
            .unwrap();
        assert_eq!(scheduler.registry().stored_count(), 2);
        assert_eq!(scheduler.registry().find_box(BoxId(2)).unwrap(), RackId(1));
    }

    #[test]
    fn jsonl_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let gateway = JsonlGateway::open(dir.path()).unwrap();
            let mut scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway)
                .layout(two_racks())
                .build()
                .unwrap();
            scheduler.submit_job(JobRequest::store(bx(1)));
            scheduler.run_until_idle(100, &mut NoopObserver).unwrap();
            scheduler.finish().unwrap();
        }

        let gateway = JsonlGateway::open(dir.path()).unwrap();
        let scheduler = SchedulerBuilder::new(test_config(10, 10, ORIGIN), planner(), gateway)
            .recover(Vec::new())
            .unwrap();
        assert_eq!(scheduler.registry().find_box(BoxId(1)).unwrap(), RackId(0));
        assert_eq!(scheduler.now(), Tick(13));
    }
}

// ── Observers ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use super::*;
    use crate::{ChannelObserver, SchedulerEvent};

    #[test]
    fn channel_observer_forwards_events() {
        let mut config = test_config(10, 10, ORIGIN);
        config.run.total_ticks = 20;
        let mut scheduler = SchedulerBuilder::new(config, planner(), MemoryGateway::new())
            .layout(layout(&[(c(5, 5), 1)]))
            .build()
            .unwrap();
        scheduler.submit_job(JobRequest::store(bx(1)));

        let (mut observer, rx) = ChannelObserver::new();
        scheduler.run(&mut observer).unwrap();
        drop(observer);

        let events: Vec<SchedulerEvent> = rx.iter().collect();
        let transitions = events.iter().filter(|e| matches!(e, SchedulerEvent::Transition(_))).count();
        let frames = events.iter().filter(|e| matches!(e, SchedulerEvent::Vehicles { .. })).count();
        assert_eq!(transitions, 6);
        assert_eq!(frames, 20);
        assert_eq!(events.last(), Some(&SchedulerEvent::RunEnd(Tick(20))));
    }

    #[test]
    fn dropped_receiver_is_harmless() {
        let (mut scheduler, _) = single_rack(1);
        scheduler.submit_job(JobRequest::store(bx(1)));
        let (mut observer, rx) = ChannelObserver::bounded(1);
        drop(rx);
        scheduler.run_until_idle(100, &mut observer).unwrap();
        assert_eq!(scheduler.stats().completed, 1);
    }

    #[test]
    fn snapshot_interval_is_respected() {
        let mut config = test_config(10, 10, ORIGIN);
        config.run.output_interval_ticks = 5;
        let mut scheduler = SchedulerBuilder::new(config, planner(), MemoryGateway::new())
            .layout(layout(&[(c(5, 5), 1)]))
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        scheduler.run_ticks(12, &mut rec).unwrap();
        let ticks: Vec<Tick> = rec.frames.iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![Tick(0), Tick(5), Tick(10)]);
    }
}

// ── Building blocks ───────────────────────────────────────────────────────────

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::{JobKind, RetryQueue, SchedulerStats};

    #[test]
    fn retry_queue_drains_in_tick_order() {
        let mut q = RetryQueue::new();
        q.push(Tick(5), JobId(1));
        q.push(Tick(3), JobId(2));
        q.push(Tick(5), JobId(3));
        assert_eq!(q.len(), 3);
        assert_eq!(q.next_tick(), Some(Tick(3)));

        assert_eq!(q.drain_due(Tick(4)), vec![JobId(2)]);
        assert_eq!(q.len(), 2);
        assert_eq!(q.next_tick(), Some(Tick(5)));

        assert_eq!(q.drain_due(Tick(5)), vec![JobId(1), JobId(3)]);
        assert!(q.is_empty());
        assert!(q.drain_due(Tick(100)).is_empty());
    }

    #[test]
    fn cancellable_states() {
        use JobState::*;
        for s in [Pending, Assigned, Planning, Reserved] {
            assert!(s.is_cancellable(), "{s}");
            assert!(!s.is_terminal());
        }
        for s in [Executing, Completing] {
            assert!(!s.is_cancellable(), "{s}");
        }
        for s in [Done, Failed(ErrorKind::Conflict), Cancelled] {
            assert!(s.is_terminal());
            assert!(!s.is_cancellable());
        }
    }

    #[test]
    fn state_display() {
        assert_eq!(JobState::Executing.to_string(), "executing");
        assert_eq!(JobState::Failed(ErrorKind::TimedOut).to_string(), "failed(timed_out)");
        assert_eq!(JobKind::Retrieve.to_string(), "retrieve");
    }

    #[test]
    fn requests_expose_box_and_kind() {
        let store = JobRequest::store_into(bx(4), RackId(2));
        assert_eq!(store.kind(), JobKind::Store);
        assert_eq!(store.box_id(), BoxId(4));
        let retrieve = JobRequest::retrieve(BoxId(9));
        assert_eq!(retrieve.kind(), JobKind::Retrieve);
        assert_eq!(retrieve.box_id(), BoxId(9));
    }

    #[test]
    fn empty_stats() {
        let stats = SchedulerStats::default();
        assert_eq!(stats.average_path_len(), 0.0);
        assert_eq!(stats.completed_between(Tick(0), Tick(100)), 0);
        assert_eq!(stats.failures_of(ErrorKind::Conflict), 0);
    }
}
