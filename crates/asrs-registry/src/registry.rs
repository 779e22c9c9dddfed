//! The `Registry` — authoritative rack and box state.
//!
//! # Locking
//!
//! Boxes live in [`BOX_SHARDS`] mutex-guarded maps keyed by `BoxId`; every
//! rack carries its own mutex around its contents.  A mutation locks exactly
//! one box shard and then at most one rack, always in that order, so two
//! operations on disjoint boxes and racks never wait on each other and no
//! lock cycle can form.  Box location and rack contents are updated under the
//! same pair of guards: every operation is all-or-nothing.
//!
//! Rack *topology* (which racks exist, where, and with which limits) is only
//! changed through `&mut self` during layout, so it needs no lock.
//!
//! # Spatial index
//!
//! Rack positions are indexed in an R-tree (`rstar`).  Nearest-rack search
//! walks it in ascending Euclidean distance from the dock and stops once the
//! Euclidean distance exceeds the best Manhattan distance found so far; every
//! rack beyond that point is at least as far in Manhattan terms.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::{debug, info};

use asrs_core::{BoxId, Cell, RackId};
use asrs_grid::{Grid, GridError};

use crate::layout::RackLayout;
use crate::model::{BoxRecord, BoxSpec, Rack, SizeClass};
use crate::slotting::SlottingPolicy;
use crate::snapshot::{InventoryChange, RegistrySnapshot};
use crate::{RegistryError, RegistryResult};

/// Number of box shards.  Boxes map to `id % BOX_SHARDS`.
pub const BOX_SHARDS: usize = 16;

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct RackPoint {
    point: [i32; 3],
    id:    RackId,
}

impl RTreeObject for RackPoint {
    type Envelope = AABB<[i32; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for RackPoint {
    /// Squared Euclidean distance in grid units.
    fn distance_2(&self, point: &[i32; 3]) -> i32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        let dz = self.point[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

struct RackSlot {
    rack:     Rack,
    contents: Mutex<BTreeSet<BoxId>>,
}

/// Poisoning only means another thread panicked mid-operation; every
/// operation validates before it writes, so the data is still consistent.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Racks, boxes, and the grid they stand on.
///
/// All inventory operations take `&self` and are safe to call from many
/// threads at once.
pub struct Registry {
    grid:        Grid,
    dock:        Cell,
    policy:      SlottingPolicy,
    racks:       Vec<RackSlot>,
    spatial_idx: RTree<RackPoint>,
    boxes:       Vec<Mutex<HashMap<BoxId, BoxRecord>>>,
}

impl Registry {
    /// An empty registry over `grid`.  `dock` is the origin for slotting
    /// distances and must lie inside the grid.
    pub fn new(grid: Grid, dock: Cell) -> RegistryResult<Self> {
        if !grid.contains(dock) {
            return Err(GridError::OutOfBounds(dock).into());
        }
        Ok(Self {
            grid,
            dock,
            policy:      SlottingPolicy::default(),
            racks:       Vec::new(),
            spatial_idx: RTree::new(),
            boxes:       (0..BOX_SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        })
    }

    /// A registry with every rack of `layout` added in order.
    pub fn from_layout(grid: Grid, dock: Cell, layout: &RackLayout) -> RegistryResult<Self> {
        let mut registry = Self::new(grid, dock)?;
        for t in &layout.racks {
            registry.add_rack(t.position, t.capacity, t.max_class, t.max_weight_kg)?;
        }
        Ok(registry)
    }

    pub fn with_policy(mut self, policy: SlottingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: SlottingPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> &SlottingPolicy {
        &self.policy
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn dock(&self) -> Cell {
        self.dock
    }

    // ── Layout ────────────────────────────────────────────────────────────

    /// Stand a new rack on `position`.  Ids are assigned densely from 0.
    ///
    /// # Errors
    ///
    /// `Grid(OutOfBounds)` outside the grid, `Impassable` on a wall,
    /// `CellOccupied` if another rack stands there.
    pub fn add_rack(
        &mut self,
        position:      Cell,
        capacity:      u32,
        max_class:     SizeClass,
        max_weight_kg: f32,
    ) -> RegistryResult<RackId> {
        if self.grid.occupancy(position)?.is_some() {
            return Err(RegistryError::CellOccupied(position));
        }
        if !self.grid.is_passable(position)? {
            return Err(RegistryError::Impassable(position));
        }
        let id = RackId(self.racks.len() as u32);
        self.grid.set_occupancy(position, Some(id))?;
        self.spatial_idx.insert(RackPoint { point: position.to_array(), id });
        self.racks.push(RackSlot {
            rack:     Rack { id, position, capacity, max_class, max_weight_kg },
            contents: Mutex::new(BTreeSet::new()),
        });
        Ok(id)
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    #[inline]
    fn slot(&self, rack: RackId) -> RegistryResult<&RackSlot> {
        self.racks.get(rack.index()).ok_or(RegistryError::RackNotFound(rack))
    }

    #[inline]
    fn shard(&self, id: BoxId) -> &Mutex<HashMap<BoxId, BoxRecord>> {
        &self.boxes[id.index() % BOX_SHARDS]
    }

    pub fn rack(&self, rack: RackId) -> RegistryResult<&Rack> {
        self.slot(rack).map(|s| &s.rack)
    }

    pub fn racks(&self) -> impl Iterator<Item = &Rack> + '_ {
        self.racks.iter().map(|s| &s.rack)
    }

    pub fn rack_count(&self) -> usize {
        self.racks.len()
    }

    /// The rack standing on `cell`, if any.
    pub fn rack_at(&self, cell: Cell) -> Option<RackId> {
        self.grid.occupancy(cell).ok().flatten()
    }

    /// Boxes currently held by `rack`, in id order.
    pub fn contents(&self, rack: RackId) -> RegistryResult<Vec<BoxId>> {
        let slot = self.slot(rack)?;
        Ok(lock(&slot.contents).iter().copied().collect())
    }

    pub fn free_slots(&self, rack: RackId) -> RegistryResult<u32> {
        let slot = self.slot(rack)?;
        let held = lock(&slot.contents).len() as u32;
        Ok(slot.rack.capacity.saturating_sub(held))
    }

    pub fn box_record(&self, box_id: BoxId) -> RegistryResult<BoxRecord> {
        lock(self.shard(box_id))
            .get(&box_id)
            .cloned()
            .ok_or(RegistryError::BoxNotFound(box_id))
    }

    pub fn box_count(&self) -> usize {
        self.boxes.iter().map(|s| lock(s).len()).sum()
    }

    /// The rack holding `box_id`.
    ///
    /// # Errors
    ///
    /// `BoxNotFound` if the box is unknown or not currently stored.
    pub fn find_box(&self, box_id: BoxId) -> RegistryResult<RackId> {
        lock(self.shard(box_id))
            .get(&box_id)
            .and_then(|r| r.location)
            .ok_or(RegistryError::BoxNotFound(box_id))
    }

    // ── Inventory mutation ────────────────────────────────────────────────

    /// Register a box without storing it.
    pub fn register_box(&self, spec: BoxSpec) -> RegistryResult<()> {
        let mut shard = lock(self.shard(spec.id));
        if shard.contains_key(&spec.id) {
            return Err(RegistryError::DuplicateBox(spec.id));
        }
        shard.insert(spec.id, BoxRecord { spec, location: None });
        Ok(())
    }

    /// Store the registered box `box_id` in `rack`.
    ///
    /// # Errors
    ///
    /// `BoxNotFound`, `RackNotFound`, `AlreadyStored`, `Incompatible`,
    /// `CapacityExceeded`.  On error nothing is modified.
    pub fn place(&self, box_id: BoxId, rack: RackId) -> RegistryResult<()> {
        let slot = self.slot(rack)?;
        let mut shard = lock(self.shard(box_id));
        let record = shard.get_mut(&box_id).ok_or(RegistryError::BoxNotFound(box_id))?;
        if record.location.is_some() {
            return Err(RegistryError::AlreadyStored(box_id));
        }
        if !slot.rack.accepts(&record.spec) {
            return Err(RegistryError::Incompatible { box_id, rack });
        }
        let mut contents = lock(&slot.contents);
        if contents.len() as u32 >= slot.rack.capacity {
            return Err(RegistryError::CapacityExceeded(rack));
        }
        contents.insert(box_id);
        record.location = Some(rack);
        debug!(%box_id, %rack, "placed");
        Ok(())
    }

    /// Register `spec` (or refresh an unstored box's spec) and store it in
    /// `rack`, as one operation.
    pub fn place_new(&self, spec: BoxSpec, rack: RackId) -> RegistryResult<()> {
        let slot = self.slot(rack)?;
        let box_id = spec.id;
        let mut shard = lock(self.shard(box_id));
        if shard.get(&box_id).is_some_and(|r| r.location.is_some()) {
            return Err(RegistryError::AlreadyStored(box_id));
        }
        if !slot.rack.accepts(&spec) {
            return Err(RegistryError::Incompatible { box_id, rack });
        }
        let mut contents = lock(&slot.contents);
        if contents.len() as u32 >= slot.rack.capacity {
            return Err(RegistryError::CapacityExceeded(rack));
        }
        contents.insert(box_id);
        shard.insert(box_id, BoxRecord { spec, location: Some(rack) });
        debug!(%box_id, %rack, "placed (new)");
        Ok(())
    }

    /// Take `box_id` out of its rack.  The box stays registered with no
    /// location.  Returns the rack it left.
    pub fn remove(&self, box_id: BoxId) -> RegistryResult<RackId> {
        let mut shard = lock(self.shard(box_id));
        let record = shard.get_mut(&box_id).ok_or(RegistryError::BoxNotFound(box_id))?;
        let rack = record.location.ok_or(RegistryError::NotStored(box_id))?;
        let slot = self.slot(rack)?;
        let mut contents = lock(&slot.contents);
        if !contents.remove(&box_id) {
            return Err(RegistryError::Inconsistent(format!("{box_id} located in {rack} but not in its contents")));
        }
        record.location = None;
        debug!(%box_id, %rack, "removed");
        Ok(rack)
    }

    /// Apply a journalled change.
    pub fn apply(&self, change: &InventoryChange) -> RegistryResult<()> {
        match change {
            InventoryChange::Placed { spec, rack } => self.place_new(spec.clone(), *rack),
            InventoryChange::Removed { box_id, rack } => {
                let left = self.remove(*box_id)?;
                if left != *rack {
                    return Err(RegistryError::Inconsistent(format!(
                        "{box_id} removed from {left}, journal says {rack}"
                    )));
                }
                Ok(())
            }
        }
    }

    // ── Capacity and slotting ─────────────────────────────────────────────

    /// `Ok` if `rack` has room for one more box after `pending` inbound
    /// placements land.
    pub fn check_capacity(&self, rack: RackId, pending: u32) -> RegistryResult<()> {
        let slot = self.slot(rack)?;
        let held = lock(&slot.contents).len() as u32;
        if held + pending >= slot.rack.capacity {
            return Err(RegistryError::CapacityExceeded(rack));
        }
        Ok(())
    }

    /// `Ok` if `rack` physically accepts `spec`.
    pub fn check_compatible(&self, spec: &BoxSpec, rack: RackId) -> RegistryResult<()> {
        if self.rack(rack)?.accepts(spec) {
            Ok(())
        } else {
            Err(RegistryError::Incompatible { box_id: spec.id, rack })
        }
    }

    /// Pick a destination rack for `spec` under the current policy.
    ///
    /// Candidates must accept the box, be admitted by the policy, and have a
    /// free slot once `pending` inbound placements are counted.  The winner
    /// is the candidate nearest the dock by Manhattan distance; ties go to
    /// the lower `RackId`.
    pub fn find_rack_for_store(
        &self,
        spec:    &BoxSpec,
        pending: &HashMap<RackId, u32>,
    ) -> RegistryResult<RackId> {
        let origin = self.dock.to_array();
        let mut best: Option<(u32, RackId)> = None;

        for (entry, euclid_2) in self.spatial_idx.nearest_neighbor_iter_with_distance_2(&origin) {
            if let Some((best_m, _)) = best {
                if i64::from(euclid_2) > i64::from(best_m) * i64::from(best_m) {
                    break;
                }
            }
            let slot = &self.racks[entry.id.index()];
            if !slot.rack.accepts(spec) || !self.policy.admits(&slot.rack, spec) {
                continue;
            }
            let held = lock(&slot.contents).len() as u32;
            let inbound = pending.get(&entry.id).copied().unwrap_or(0);
            if held + inbound >= slot.rack.capacity {
                continue;
            }
            let candidate = (slot.rack.position.manhattan(self.dock), entry.id);
            if best.is_none_or(|b| candidate < b) {
                best = Some(candidate);
            }
        }

        match best {
            Some((distance, rack)) => {
                debug!(box_id = %spec.id, %rack, distance, "slotted");
                Ok(rack)
            }
            None => Err(RegistryError::NoCapacity(spec.id)),
        }
    }

    // ── Analytics ─────────────────────────────────────────────────────────

    pub fn total_capacity(&self) -> u64 {
        self.racks.iter().map(|s| u64::from(s.rack.capacity)).sum()
    }

    pub fn stored_count(&self) -> usize {
        self.racks.iter().map(|s| lock(&s.contents).len()).sum()
    }

    /// Stored boxes over total capacity, in `[0.0, 1.0]`.
    pub fn utilization(&self) -> f64 {
        let capacity = self.total_capacity();
        if capacity == 0 {
            return 0.0;
        }
        self.stored_count() as f64 / capacity as f64
    }

    // ── Snapshot / restore ────────────────────────────────────────────────

    /// A consistent copy of all racks and boxes.
    ///
    /// Holds every box shard for the duration, which excludes all inventory
    /// mutations without touching the rack locks.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let guards: Vec<_> = self.boxes.iter().map(lock).collect();
        let mut boxes: Vec<BoxRecord> = guards.iter().flat_map(|g| g.values().cloned()).collect();
        drop(guards);
        boxes.sort_by_key(|b| b.spec.id);
        RegistrySnapshot {
            racks: self.racks.iter().map(|s| s.rack.clone()).collect(),
            boxes,
        }
    }

    /// Rebuild a registry from `snapshot`, then replay `changes` in order.
    ///
    /// Any rack occupancy already marked on `grid` is discarded; the
    /// snapshot's racks are authoritative.
    pub fn restore<'a>(
        mut grid: Grid,
        dock:     Cell,
        policy:   SlottingPolicy,
        snapshot: &RegistrySnapshot,
        changes:  impl IntoIterator<Item = &'a InventoryChange>,
    ) -> RegistryResult<Self> {
        let stale: Vec<Cell> = grid.rack_cells().map(|(cell, _)| cell).collect();
        for cell in stale {
            grid.set_occupancy(cell, None)?;
        }

        let mut registry = Self::new(grid, dock)?.with_policy(policy);
        for rack in &snapshot.racks {
            let id = registry.add_rack(rack.position, rack.capacity, rack.max_class, rack.max_weight_kg)?;
            if id != rack.id {
                return Err(RegistryError::Inconsistent(format!(
                    "snapshot rack ids are not dense: expected {id}, found {}",
                    rack.id
                )));
            }
        }
        for record in &snapshot.boxes {
            match record.location {
                Some(rack) => registry.place_new(record.spec.clone(), rack)?,
                None => registry.register_box(record.spec.clone())?,
            }
        }
        let mut replayed = 0usize;
        for change in changes {
            registry.apply(change)?;
            replayed += 1;
        }

        info!(
            racks = registry.rack_count(),
            boxes = snapshot.boxes.len(),
            replayed,
            "registry restored"
        );
        Ok(registry)
    }
}
