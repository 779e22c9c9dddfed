//! Per-vehicle state.

use asrs_core::{Cell, JobId, Tick, VehicleId};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleStatus {
    /// No job; free to be assigned.
    #[default]
    Idle,
    /// Following an itinerary, or assigned and waiting to depart.
    EnRoute,
    /// Dwelling at a pickup or drop-off cell.
    Loading,
    /// Stuck.  Its cell is an obstacle for every other vehicle until an
    /// operator clears it.
    Blocked,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Vehicle {
    pub id:            VehicleId,
    pub current_cell:  Cell,
    pub status:        VehicleStatus,
    /// The job this vehicle is serving.  At most one.
    pub job:           Option<JobId>,
    /// While set and in the future, the vehicle cannot move.
    pub stalled_until: Option<Tick>,
}

impl Vehicle {
    pub fn new(id: VehicleId, cell: Cell) -> Self {
        Self {
            id,
            current_cell:  cell,
            status:        VehicleStatus::Idle,
            job:           None,
            stalled_until: None,
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Idle && self.job.is_none()
    }

    #[inline]
    pub fn is_stalled(&self, now: Tick) -> bool {
        self.stalled_until.is_some_and(|t| now < t)
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id:     self.id,
            cell:   self.current_cell,
            status: self.status,
            job:    self.job,
        }
    }
}

/// What a visualization layer needs per vehicle per tick.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleSnapshot {
    pub id:     VehicleId,
    pub cell:   Cell,
    pub status: VehicleStatus,
    pub job:    Option<JobId>,
}
