//! Random store/retrieve traffic for the demo.

use std::collections::HashMap;

use asrs_core::{BoxId, JobId, SimRng};
use asrs_registry::{BoxSpec, Registry, SizeClass};
use asrs_scheduler::{JobKind, JobRequest, JobState, JobTransition, SchedulerObserver};

const SKUS: [&str; 6] = ["BOLT-M8", "CABLE-10M", "FILTER-AIR", "MOTOR-24V", "PALLET-EU", "SEAL-KIT"];

const CLASSES: [SizeClass; 5] = [
    SizeClass::Small,
    SizeClass::Medium,
    SizeClass::Standard,
    SizeClass::Large,
    SizeClass::Bulk,
];

/// Generates requests and tracks which boxes are on the shelves.
pub struct Workload {
    rng:         SimRng,
    next_box:    u32,
    on_shelf:    Vec<BoxId>,
    /// Box carried by each job in flight.
    in_flight:   HashMap<JobId, (JobKind, BoxId)>,
    store_share: f64,
}

impl Workload {
    /// Continue after whatever `registry` already holds.
    pub fn new(seed: u64, registry: &Registry, store_share: f64) -> Self {
        let snapshot = registry.snapshot();
        let next_box = snapshot.boxes.iter().map(|b| b.spec.id.0 + 1).max().unwrap_or(1);
        let on_shelf = snapshot
            .boxes
            .iter()
            .filter(|b| b.location.is_some())
            .map(|b| b.spec.id)
            .collect();
        Self {
            rng: SimRng::new(seed),
            next_box,
            on_shelf,
            in_flight: HashMap::new(),
            store_share,
        }
    }

    pub fn on_shelf(&self) -> usize {
        self.on_shelf.len()
    }

    /// `true` if a request arrives this tick.
    pub fn arrives(&mut self, rate: f64) -> bool {
        self.rng.gen_bool(rate)
    }

    /// The next request: a new box to store, or a stored box to fetch.
    pub fn next_request(&mut self) -> JobRequest {
        if self.on_shelf.is_empty() || self.rng.gen_bool(self.store_share) {
            let id = BoxId(self.next_box);
            self.next_box += 1;
            let sku = self.rng.choose(&SKUS).copied().unwrap_or("MISC");
            let class = self.rng.choose(&CLASSES).copied().unwrap_or_default();
            JobRequest::store(BoxSpec::of_class(id, sku, class))
        } else {
            let i = self.rng.gen_range(0..self.on_shelf.len());
            JobRequest::retrieve(self.on_shelf.swap_remove(i))
        }
    }

    pub fn submitted(&mut self, job: JobId, request: &JobRequest) {
        self.in_flight.insert(job, (request.kind(), request.box_id()));
    }

    /// Shelve a stored box, or put back a box whose retrieve did not happen.
    fn settle(&mut self, job: JobId, done: bool) {
        match self.in_flight.remove(&job) {
            Some((JobKind::Store, id)) if done => self.on_shelf.push(id),
            Some((JobKind::Retrieve, id)) if !done => self.on_shelf.push(id),
            _ => {}
        }
    }
}

/// Counts transitions and shelves boxes whose store job finished.
pub struct Tally {
    pub workload:    Workload,
    pub transitions: usize,
    pub done:        usize,
    pub failed:      usize,
}

impl Tally {
    pub fn new(workload: Workload) -> Self {
        Self { workload, transitions: 0, done: 0, failed: 0 }
    }
}

impl SchedulerObserver for Tally {
    fn on_transition(&mut self, transition: &JobTransition) {
        self.transitions += 1;
        match transition.to {
            JobState::Done => {
                self.done += 1;
                self.workload.settle(transition.job, true);
            }
            JobState::Failed(_) => {
                self.failed += 1;
                self.workload.settle(transition.job, false);
            }
            JobState::Cancelled => self.workload.settle(transition.job, false),
            _ => {}
        }
    }
}
