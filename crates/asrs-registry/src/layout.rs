//! Rack placement generators.
//!
//! A [`RackLayout`] is a plain list of rack templates; feeding it to
//! [`Registry::from_layout`][crate::Registry::from_layout] assigns `RackId`s
//! in list order.

use asrs_core::{Cell, Extents};

use crate::model::SizeClass;
use crate::slotting::Zone;

/// One rack to be created.
#[derive(Clone, PartialEq, Debug)]
pub struct RackTemplate {
    pub position:      Cell,
    pub capacity:      u32,
    pub max_class:     SizeClass,
    pub max_weight_kg: f32,
}

#[derive(Clone, Debug, Default)]
pub struct RackLayout {
    pub racks: Vec<RackTemplate>,
}

impl RackLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        position:      Cell,
        capacity:      u32,
        max_class:     SizeClass,
        max_weight_kg: f32,
    ) -> &mut Self {
        self.racks.push(RackTemplate { position, capacity, max_class, max_weight_kg });
        self
    }

    /// Rows of racks separated by `aisle_count` travel aisles.
    ///
    /// Aisle rows sit at the centre of `aisle_count` equal bands of the floor;
    /// the column through `dock` is a cross aisle connecting them.  Every other
    /// cell on every level holds a rack.  Racks are emitted level by level,
    /// row by row.
    pub fn aisles(
        extents:       Extents,
        dock:          Cell,
        aisle_count:   u32,
        capacity:      u32,
        max_class:     SizeClass,
        max_weight_kg: f32,
    ) -> Self {
        let aisle_rows = aisle_rows(extents, aisle_count);
        let mut layout = Self::new();
        for cell in extents.cells() {
            if cell.x == dock.x || aisle_rows.contains(&cell.y) {
                continue;
            }
            layout.push(cell, capacity, max_class, max_weight_kg);
        }
        layout
    }

    /// [`aisles`](Self::aisles), with each rack's class and weight limit
    /// taken from the zone covering its row.  Rows outside every zone get no
    /// rack.
    pub fn zoned_aisles(extents: Extents, dock: Cell, aisle_count: u32, capacity: u32, zones: &[Zone]) -> Self {
        let aisle_rows = aisle_rows(extents, aisle_count);
        let mut layout = Self::new();
        for cell in extents.cells() {
            if cell.x == dock.x || aisle_rows.contains(&cell.y) {
                continue;
            }
            if let Some(zone) = zones.iter().find(|z| z.contains(cell)) {
                layout.push(cell, capacity, zone.class, zone.class.nominal_weight_kg());
            }
        }
        layout
    }

    pub fn len(&self) -> usize {
        self.racks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.racks.is_empty()
    }
}

fn aisle_rows(extents: Extents, aisle_count: u32) -> Vec<i32> {
    let depth = extents.depth as u64;
    let n = aisle_count as u64;
    (0..n).map(|a| ((2 * a + 1) * depth / (2 * n)) as i32).collect()
}
