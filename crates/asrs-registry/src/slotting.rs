//! Store-destination policies.
//!
//! Both policies pick the compatible rack with free capacity nearest to the
//! dock (Manhattan distance, ties by `RackId`); they differ in which racks are
//! candidates at all.

use asrs_core::Cell;

use crate::model::{BoxSpec, Rack, SizeClass};

/// A band of rows reserved for one size class.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zone {
    pub name:      String,
    /// First row (`y`) of the band, inclusive.
    pub first_row: i32,
    /// Last row (`y`) of the band, inclusive.
    pub last_row:  i32,
    pub class:     SizeClass,
}

impl Zone {
    pub fn new(name: impl Into<String>, first_row: i32, last_row: i32, class: SizeClass) -> Self {
        Self { name: name.into(), first_row, last_row, class }
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        (self.first_row..=self.last_row).contains(&cell.y)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlottingPolicy {
    /// Any compatible rack qualifies.
    #[default]
    Nearest,
    /// Only racks inside a zone bound to the box's size class qualify.
    Zoned(Vec<Zone>),
}

impl SlottingPolicy {
    /// Five zones A–E over a 30-row floor, small items furthest from the
    /// dock row and bulk items nearest to it.
    pub fn standard_zones() -> Vec<Zone> {
        vec![
            Zone::new("A", 0, 3, SizeClass::Small),
            Zone::new("B", 4, 9, SizeClass::Medium),
            Zone::new("C", 10, 15, SizeClass::Standard),
            Zone::new("D", 16, 21, SizeClass::Large),
            Zone::new("E", 22, 29, SizeClass::Bulk),
        ]
    }

    /// `true` if the policy lets `spec` go to `rack`.  Physical compatibility
    /// ([`Rack::accepts`]) and capacity are checked separately.
    pub fn admits(&self, rack: &Rack, spec: &BoxSpec) -> bool {
        match self {
            SlottingPolicy::Nearest => true,
            SlottingPolicy::Zoned(zones) => {
                let class = spec.class();
                zones.iter().any(|z| z.class == class && z.contains(rack.position))
            }
        }
    }
}
