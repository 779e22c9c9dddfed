//! The sharded reservation table.
//!
//! # Layout
//!
//! ```text
//! cells[s]     (cell, tick) → holder      for every cell hashing to shard s
//! vehicles[s]  vehicle → [(cell, tick)]   for every vehicle hashing to shard s
//! ```
//!
//! All ticks of one cell live in the same cell shard.  The vehicle index is
//! what makes `release` proportional to the vehicle's own reservations
//! rather than to the table.
//!
//! # Lock order
//!
//! Every writer locks the caller's vehicle shard first, then the cell shards
//! it needs in ascending shard index.  `try_reserve` holds all of them while
//! it checks and writes, so a multi-cell request is atomic with respect to
//! every other writer touching any of the same cells, while requests on
//! disjoint shards proceed in parallel.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace};

use asrs_core::{Cell, Tick, TimeWindow, VehicleId};
use asrs_grid::CellSet;

use crate::{ReservationError, ReservationResult};

#[cfg(feature = "fx-hash")]
type Map<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
type Map<K, V> = std::collections::HashMap<K, V>;

pub const CELL_SHARDS: usize = 64;
pub const VEHICLE_SHARDS: usize = 16;

type CellShard = Map<(Cell, Tick), VehicleId>;
type VehicleShard = Map<VehicleId, Vec<(Cell, Tick)>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[inline]
fn cell_shard(cell: Cell) -> usize {
    let h = (cell.x as u32).wrapping_mul(73_856_093)
        ^ (cell.y as u32).wrapping_mul(19_349_663)
        ^ (cell.z as u32).wrapping_mul(83_492_791);
    h as usize % CELL_SHARDS
}

#[inline]
fn vehicle_shard(vehicle: VehicleId) -> usize {
    vehicle.index() % VEHICLE_SHARDS
}

/// Group `(cell, tick)` keys by cell shard, ascending.
fn by_shard(keys: impl IntoIterator<Item = (Cell, Tick)>) -> BTreeMap<usize, Vec<(Cell, Tick)>> {
    let mut grouped: BTreeMap<usize, Vec<(Cell, Tick)>> = BTreeMap::new();
    for key in keys {
        grouped.entry(cell_shard(key.0)).or_default().push(key);
    }
    grouped
}

// ── ReservationTable ──────────────────────────────────────────────────────────

pub struct ReservationTable {
    cells:    Vec<Mutex<CellShard>>,
    vehicles: Vec<Mutex<VehicleShard>>,
}

impl Default for ReservationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationTable {
    pub fn new() -> Self {
        Self {
            cells:    (0..CELL_SHARDS).map(|_| Mutex::new(Map::default())).collect(),
            vehicles: (0..VEHICLE_SHARDS).map(|_| Mutex::new(Map::default())).collect(),
        }
    }

    /// Reserve every `(cell, window)` pair for `vehicle`, or nothing.
    ///
    /// Ticks the vehicle already holds are accepted as-is.  On conflict the
    /// first clashing request (in request order) is reported and the table is
    /// left untouched.
    pub fn try_reserve(&self, vehicle: VehicleId, requests: &[(Cell, TimeWindow)]) -> ReservationResult<()> {
        // Key → index of the request that produced it, for error reporting.
        let mut origin: Map<(Cell, Tick), usize> = Map::default();
        for (i, (cell, window)) in requests.iter().enumerate() {
            for tick in window.ticks() {
                origin.entry((*cell, tick)).or_insert(i);
            }
        }
        let grouped = by_shard(origin.keys().copied());

        let mut held = lock(&self.vehicles[vehicle_shard(vehicle)]);
        let mut guards: Vec<(MutexGuard<'_, CellShard>, &Vec<(Cell, Tick)>)> = grouped
            .iter()
            .map(|(&s, keys)| (lock(&self.cells[s]), keys))
            .collect();

        // Check everything before writing anything.
        let mut clash: Option<(usize, VehicleId)> = None;
        for (shard, keys) in &guards {
            for key in keys.iter() {
                if let Some(&holder) = shard.get(key) {
                    if holder != vehicle {
                        let i = origin[key];
                        if clash.is_none_or(|(j, _)| i < j) {
                            clash = Some((i, holder));
                        }
                    }
                }
            }
        }
        if let Some((i, holder)) = clash {
            let (cell, window) = requests[i];
            debug!(%vehicle, %cell, %window, %holder, "reservation conflict");
            return Err(ReservationError::Conflict { cell, window, holder });
        }

        let list = held.entry(vehicle).or_default();
        for (shard, keys) in &mut guards {
            for &key in keys.iter() {
                if shard.insert(key, vehicle).is_none() {
                    list.push(key);
                }
            }
        }
        trace!(%vehicle, keys = origin.len(), "reserved");
        Ok(())
    }

    /// Drop every reservation `vehicle` holds.  Returns how many were freed.
    pub fn release(&self, vehicle: VehicleId) -> usize {
        let mut held = lock(&self.vehicles[vehicle_shard(vehicle)]);
        let Some(keys) = held.remove(&vehicle) else {
            return 0;
        };
        let freed = keys.len();
        for (s, keys) in by_shard(keys) {
            let mut shard = lock(&self.cells[s]);
            for key in keys {
                if shard.get(&key) == Some(&vehicle) {
                    shard.remove(&key);
                }
            }
        }
        trace!(%vehicle, freed, "released");
        freed
    }

    /// Drop every reservation for a tick before `now`.  Returns how many
    /// were freed.
    pub fn expire_before(&self, now: Tick) -> usize {
        let mut freed = 0;
        for vehicles in &self.vehicles {
            let mut held = lock(vehicles);
            let mut expired: Vec<(Cell, Tick)> = Vec::new();
            held.retain(|_, keys| {
                keys.retain(|&(cell, tick)| {
                    let keep = tick >= now;
                    if !keep {
                        expired.push((cell, tick));
                    }
                    keep
                });
                !keys.is_empty()
            });
            freed += expired.len();
            for (s, keys) in by_shard(expired) {
                let mut shard = lock(&self.cells[s]);
                for key in keys {
                    shard.remove(&key);
                }
            }
        }
        freed
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// The vehicle holding `cell` at `tick`.
    pub fn holder(&self, cell: Cell, tick: Tick) -> Option<VehicleId> {
        lock(&self.cells[cell_shard(cell)]).get(&(cell, tick)).copied()
    }

    /// `true` if no vehicle other than `vehicle` holds `cell` at any tick of
    /// `window`.
    pub fn is_free_for(&self, vehicle: VehicleId, cell: Cell, window: TimeWindow) -> bool {
        let shard = lock(&self.cells[cell_shard(cell)]);
        window
            .ticks()
            .all(|t| shard.get(&(cell, t)).is_none_or(|&h| h == vehicle))
    }

    /// Cells held by any vehicle other than `except` at or after `from`.
    ///
    /// This is the dynamic half of a planning `avoid` set.  Shards are read
    /// one at a time, so the result is a per-shard consistent view.
    pub fn reserved_cells(&self, except: VehicleId, from: Tick) -> CellSet {
        let mut out = CellSet::default();
        for shard in &self.cells {
            let shard = lock(shard);
            out.extend(
                shard
                    .iter()
                    .filter(|&(&(_, tick), &holder)| tick >= from && holder != except)
                    .map(|(&(cell, _), _)| cell),
            );
        }
        out
    }

    /// `(cell, tick)` pairs held by `vehicle`, sorted by tick then cell.
    pub fn held_by(&self, vehicle: VehicleId) -> Vec<(Cell, Tick)> {
        let held = lock(&self.vehicles[vehicle_shard(vehicle)]);
        let mut keys = held.get(&vehicle).cloned().unwrap_or_default();
        keys.sort_by_key(|&(cell, tick)| (tick, cell));
        keys
    }

    /// Total number of held `(cell, tick)` pairs.
    pub fn len(&self) -> usize {
        self.cells.iter().map(|s| lock(s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
