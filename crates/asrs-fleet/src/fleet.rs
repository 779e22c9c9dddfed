//! The `Fleet` — every vehicle plus the itineraries of those on the move.

use std::collections::HashMap;

use tracing::{debug, warn};

use asrs_core::{Cell, JobId, Tick, VehicleId};

use crate::{
    Activity, FleetError, FleetResult, Itinerary, Vehicle, VehicleSnapshot, VehicleStatus,
};

/// Result of advancing one vehicle by one tick.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Step {
    /// Entered the next slot; more remain.
    Moved(Cell),
    /// Consumed the final slot.
    Arrived(Cell),
    /// Stalled this tick; nothing consumed.
    Stalled(Cell),
}

/// Holds state for every vehicle plus sparse itineraries.
///
/// `vehicles` is indexed by `VehicleId`.  `itineraries` only has entries for
/// vehicles that currently have a planned route.
#[derive(Default)]
pub struct Fleet {
    pub vehicles:    Vec<Vehicle>,
    pub itineraries: HashMap<VehicleId, Itinerary>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fleet with one idle vehicle per cell, ids in iteration order.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut fleet = Self::new();
        for cell in cells {
            fleet.add(cell);
        }
        fleet
    }

    pub fn add(&mut self, cell: Cell) -> VehicleId {
        let id = VehicleId(self.vehicles.len() as u32);
        self.vehicles.push(Vehicle::new(id, cell));
        id
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn get(&self, id: VehicleId) -> FleetResult<&Vehicle> {
        self.vehicles.get(id.index()).ok_or(FleetError::NotFound(id))
    }

    fn get_mut(&mut self, id: VehicleId) -> FleetResult<&mut Vehicle> {
        self.vehicles.get_mut(id.index()).ok_or(FleetError::NotFound(id))
    }

    pub fn itinerary(&self, id: VehicleId) -> Option<&Itinerary> {
        self.itineraries.get(&id)
    }

    // ── Assignment ────────────────────────────────────────────────────────

    /// The available vehicle nearest to `to` (Manhattan), ties by id.
    pub fn nearest_available(&self, to: Cell, now: Tick) -> Option<VehicleId> {
        self.vehicles
            .iter()
            .filter(|v| v.is_available() && !v.is_stalled(now))
            .min_by_key(|v| (v.current_cell.manhattan(to), v.id))
            .map(|v| v.id)
    }

    /// Bind `job` to `vehicle`.  The vehicle stays `Idle` until it departs.
    pub fn assign(&mut self, vehicle: VehicleId, job: JobId) -> FleetResult<()> {
        let v = self.get_mut(vehicle)?;
        if !v.is_available() {
            return Err(FleetError::Busy(vehicle));
        }
        v.job = Some(job);
        Ok(())
    }

    /// Store (or replace) the vehicle's itinerary.
    pub fn set_itinerary(&mut self, vehicle: VehicleId, itinerary: Itinerary) -> FleetResult<()> {
        self.get(vehicle)?;
        self.itineraries.insert(vehicle, itinerary);
        Ok(())
    }

    pub fn clear_itinerary(&mut self, vehicle: VehicleId) -> Option<Itinerary> {
        self.itineraries.remove(&vehicle)
    }

    /// Mark the vehicle as under way.
    pub fn depart(&mut self, vehicle: VehicleId) -> FleetResult<()> {
        if !self.itineraries.contains_key(&vehicle) {
            return Err(FleetError::NoItinerary(vehicle));
        }
        self.get_mut(vehicle)?.status = VehicleStatus::EnRoute;
        Ok(())
    }

    // ── Movement ──────────────────────────────────────────────────────────

    /// Advance `vehicle` by one slot of its itinerary.
    pub fn step(&mut self, vehicle: VehicleId, now: Tick) -> FleetResult<Step> {
        let itinerary = self
            .itineraries
            .get_mut(&vehicle)
            .ok_or(FleetError::NoItinerary(vehicle))?;
        let v = self
            .vehicles
            .get_mut(vehicle.index())
            .ok_or(FleetError::NotFound(vehicle))?;

        if v.is_stalled(now) {
            return Ok(Step::Stalled(v.current_cell));
        }
        let Some(wp) = itinerary.advance() else {
            return Ok(Step::Arrived(v.current_cell));
        };
        v.current_cell = wp.cell;
        v.status = match wp.activity {
            Activity::Travel                   => VehicleStatus::EnRoute,
            Activity::Load | Activity::Unload  => VehicleStatus::Loading,
        };
        if itinerary.is_complete() {
            Ok(Step::Arrived(wp.cell))
        } else {
            Ok(Step::Moved(wp.cell))
        }
    }

    /// Job over: back to `Idle` with no itinerary.
    pub fn release(&mut self, vehicle: VehicleId) -> FleetResult<()> {
        self.itineraries.remove(&vehicle);
        let v = self.get_mut(vehicle)?;
        if v.status != VehicleStatus::Blocked {
            v.status = VehicleStatus::Idle;
        }
        v.job = None;
        Ok(())
    }

    // ── Faults ────────────────────────────────────────────────────────────

    /// Freeze `vehicle` until `until`.
    pub fn stall(&mut self, vehicle: VehicleId, until: Tick) -> FleetResult<()> {
        let v = self.get_mut(vehicle)?;
        v.stalled_until = Some(until);
        debug!(%vehicle, %until, "stalled");
        Ok(())
    }

    /// Declare `vehicle` stuck at its current cell.  Drops its job and
    /// itinerary; returns the cell it blocks.
    pub fn block(&mut self, vehicle: VehicleId) -> FleetResult<Cell> {
        self.itineraries.remove(&vehicle);
        let v = self.get_mut(vehicle)?;
        v.status = VehicleStatus::Blocked;
        v.job = None;
        warn!(%vehicle, cell = %v.current_cell, "vehicle blocked");
        Ok(v.current_cell)
    }

    /// Operator intervention: a `Blocked` vehicle returns to `Idle`.
    pub fn clear_blocked(&mut self, vehicle: VehicleId) -> FleetResult<()> {
        let v = self.get_mut(vehicle)?;
        if v.status != VehicleStatus::Blocked {
            return Err(FleetError::NotBlocked(vehicle));
        }
        v.status = VehicleStatus::Idle;
        v.stalled_until = None;
        Ok(())
    }

    // ── Views ─────────────────────────────────────────────────────────────

    pub fn blocked_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.vehicles
            .iter()
            .filter(|v| v.status == VehicleStatus::Blocked)
            .map(|v| v.current_cell)
    }

    pub fn snapshots(&self) -> Vec<VehicleSnapshot> {
        self.vehicles.iter().map(Vehicle::snapshot).collect()
    }
}
