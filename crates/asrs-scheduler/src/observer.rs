//! Scheduler observers: callbacks for progress, UIs and data collection.

use crossbeam_channel::{Receiver, Sender};

use asrs_core::{JobId, Tick};
use asrs_fleet::VehicleSnapshot;

use crate::JobState;

/// One job state change.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct JobTransition {
    pub job:  JobId,
    pub tick: Tick,
    pub from: JobState,
    pub to:   JobState,
}

/// Callbacks invoked by [`Scheduler::run`][crate::Scheduler::run] at key
/// points in the tick loop.
///
/// All methods have default no-op implementations.  Transitions caused by
/// `submit_job` or `cancel_job` between ticks are delivered at the start of
/// the next tick, in the order they happened.
pub trait SchedulerObserver {
    /// Called at the very start of each tick, before any processing.
    fn on_tick_start(&mut self, _tick: Tick) {}

    fn on_transition(&mut self, _transition: &JobTransition) {}

    /// Called every `run.output_interval_ticks` ticks with every vehicle's
    /// position and status.
    fn on_vehicles(&mut self, _tick: Tick, _vehicles: &[VehicleSnapshot]) {}

    /// Called at the end of each tick.  `active` is the number of
    /// non-terminal jobs left.
    fn on_tick_end(&mut self, _tick: Tick, _active: usize) {}

    /// Called once after the final tick of [`Scheduler::run`][crate::Scheduler::run].
    fn on_run_end(&mut self, _final_tick: Tick) {}
}

/// A [`SchedulerObserver`] that does nothing.
pub struct NoopObserver;

impl SchedulerObserver for NoopObserver {}

// ── Channel subscription ──────────────────────────────────────────────────────

/// What a [`ChannelObserver`] forwards.
#[derive(Clone, PartialEq, Debug)]
pub enum SchedulerEvent {
    Transition(JobTransition),
    Vehicles { tick: Tick, vehicles: Vec<VehicleSnapshot> },
    RunEnd(Tick),
}

/// Forwards observer callbacks over a channel so another thread (a UI, a
/// recorder) can consume them.
///
/// A dropped receiver is not an error: events are discarded.
pub struct ChannelObserver {
    tx: Sender<SchedulerEvent>,
}

impl ChannelObserver {
    /// Unbounded channel.
    pub fn new() -> (Self, Receiver<SchedulerEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    /// Bounded channel; the scheduler blocks when the subscriber falls
    /// `capacity` events behind.
    pub fn bounded(capacity: usize) -> (Self, Receiver<SchedulerEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }

    fn send(&self, event: SchedulerEvent) {
        let _ = self.tx.send(event);
    }
}

impl SchedulerObserver for ChannelObserver {
    fn on_transition(&mut self, transition: &JobTransition) {
        self.send(SchedulerEvent::Transition(*transition));
    }

    fn on_vehicles(&mut self, tick: Tick, vehicles: &[VehicleSnapshot]) {
        self.send(SchedulerEvent::Vehicles { tick, vehicles: vehicles.to_vec() });
    }

    fn on_run_end(&mut self, final_tick: Tick) {
        self.send(SchedulerEvent::RunEnd(final_tick));
    }
}
