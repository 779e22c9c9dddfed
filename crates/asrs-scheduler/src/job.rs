//! Jobs and their lifecycle.
//!
//! ```text
//! Pending → Assigned → Planning → Reserved → Executing → Completing → Done
//!                         ↑  ↺ retry     │         │
//!                         └──────────────┴─────────┘  re-route
//!
//! Failed(kind)  from any non-terminal state
//! Cancelled     from Pending, Assigned, Planning or Reserved, until the
//!               vehicle first departs
//! ```
//!
//! A re-routed job goes back through Planning and Reserved with the box
//! possibly on board.  [`Job::departed`] remembers that it already left:
//! such a job can no longer be cancelled, and failing it leaves its vehicle
//! `Blocked` where it stands.

use std::fmt;

use asrs_core::{BoxId, Cell, ErrorKind, JobId, RackId, Tick, VehicleId};
use asrs_registry::BoxSpec;
use asrs_store::InventoryEvent;

// ── Requests ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum JobKind {
    Store,
    Retrieve,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobKind::Store    => "store",
            JobKind::Retrieve => "retrieve",
        })
    }
}

/// What a caller asks the warehouse to do.
#[derive(Clone, PartialEq, Debug)]
pub enum JobRequest {
    /// Carry a new box from the dock into `rack`, or into the rack the
    /// slotting policy picks when `rack` is `None`.
    Store { spec: BoxSpec, rack: Option<RackId> },
    /// Carry a stored box from its rack to the dock.
    Retrieve { box_id: BoxId },
}

impl JobRequest {
    pub fn store(spec: BoxSpec) -> Self {
        JobRequest::Store { spec, rack: None }
    }

    pub fn store_into(spec: BoxSpec, rack: RackId) -> Self {
        JobRequest::Store { spec, rack: Some(rack) }
    }

    pub fn retrieve(box_id: BoxId) -> Self {
        JobRequest::Retrieve { box_id }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Store { .. }    => JobKind::Store,
            JobRequest::Retrieve { .. } => JobKind::Retrieve,
        }
    }

    pub fn box_id(&self) -> BoxId {
        match self {
            JobRequest::Store { spec, .. }  => spec.id,
            JobRequest::Retrieve { box_id } => *box_id,
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum JobState {
    /// Accepted, waiting for a vehicle.
    Pending,
    /// Bound to a vehicle, not yet routed.
    Assigned,
    /// Waiting for (or retrying) a route and its reservations.
    Planning,
    /// Route reserved; the vehicle departs on the next tick.
    Reserved,
    /// The vehicle is following its itinerary.
    Executing,
    /// Arrived; the inventory change is applied and being made durable.
    Completing,
    Done,
    Failed(ErrorKind),
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed(_) | JobState::Cancelled)
    }

    /// States a job that never departed may be cancelled from.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            JobState::Pending | JobState::Assigned | JobState::Planning | JobState::Reserved
        )
    }

    pub fn error(self) -> Option<ErrorKind> {
        match self {
            JobState::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending      => f.write_str("pending"),
            JobState::Assigned     => f.write_str("assigned"),
            JobState::Planning     => f.write_str("planning"),
            JobState::Reserved     => f.write_str("reserved"),
            JobState::Executing    => f.write_str("executing"),
            JobState::Completing   => f.write_str("completing"),
            JobState::Done         => f.write_str("done"),
            JobState::Failed(kind) => write!(f, "failed({kind})"),
            JobState::Cancelled    => f.write_str("cancelled"),
        }
    }
}

// ── Job ───────────────────────────────────────────────────────────────────────

/// One tracked request and everything the scheduler knows about it.
#[derive(Clone, PartialEq, Debug)]
pub struct Job {
    pub id:        JobId,
    pub request:   JobRequest,
    pub state:     JobState,
    pub vehicle:   Option<VehicleId>,
    /// Destination rack of a store, source rack of a retrieve.
    pub rack:      Option<RackId>,
    pub pickup:    Cell,
    pub dropoff:   Cell,
    pub submitted: Tick,
    /// Tick of the latest transition.
    pub updated:   Tick,
    /// Cells actually travelled so far.
    pub path_len:  u32,
    /// The box is on the vehicle.
    pub loaded:    bool,
    /// The vehicle has set off with this job at least once.
    pub departed:  bool,

    pub conflicts:        u32,
    pub unreachable:      u32,
    pub persist_attempts: u32,

    /// Start of the current Assigned/Planning/Reserved budget.
    pub(crate) budget_from:  Tick,
    /// Latest tick an Executing job may still be running.
    pub(crate) deadline:     Tick,
    /// Itinerary slots up to and including the pickup dwell.
    pub(crate) pickup_slots: Option<usize>,
    /// The vehicle lost at least one tick since the route was reserved.
    pub(crate) stalled:      bool,
    /// Applied to the registry but not yet journalled.
    pub(crate) event:        Option<InventoryEvent>,
}

impl Job {
    pub(crate) fn new(id: JobId, request: JobRequest, dock: Cell, now: Tick) -> Self {
        Self {
            id,
            request,
            state:            JobState::Pending,
            vehicle:          None,
            rack:             None,
            pickup:           dock,
            dropoff:          dock,
            submitted:        now,
            updated:          now,
            path_len:         0,
            loaded:           false,
            departed:         false,
            conflicts:        0,
            unreachable:      0,
            persist_attempts: 0,
            budget_from:      now,
            deadline:         now,
            pickup_slots:     None,
            stalled:          false,
            event:            None,
        }
    }

    #[inline]
    pub fn kind(&self) -> JobKind {
        self.request.kind()
    }

    #[inline]
    pub fn box_id(&self) -> BoxId {
        self.request.box_id()
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.state.error()
    }

    /// `true` until the vehicle first departs.
    pub fn is_cancellable(&self) -> bool {
        !self.departed && self.state.is_cancellable()
    }
}
