//! Point-in-time registry state and the replayable changes applied on top.

use asrs_core::{BoxId, RackId};

use crate::model::{BoxRecord, BoxSpec, Rack};

/// Every rack and every registered box, each sorted by id.
///
/// Rack contents are not stored separately: they are implied by the boxes'
/// locations.
#[derive(Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegistrySnapshot {
    pub racks: Vec<Rack>,
    pub boxes: Vec<BoxRecord>,
}

impl RegistrySnapshot {
    pub fn location_of(&self, box_id: BoxId) -> Option<RackId> {
        self.boxes
            .binary_search_by_key(&box_id, |b| b.spec.id)
            .ok()
            .and_then(|i| self.boxes[i].location)
    }

    pub fn contents_of(&self, rack: RackId) -> Vec<BoxId> {
        self.boxes
            .iter()
            .filter(|b| b.location == Some(rack))
            .map(|b| b.spec.id)
            .collect()
    }

    pub fn stored_count(&self) -> usize {
        self.boxes.iter().filter(|b| b.location.is_some()).count()
    }
}

/// A committed registry mutation, as journalled by the persistence layer.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op", rename_all = "snake_case"))]
pub enum InventoryChange {
    Placed { spec: BoxSpec, rack: RackId },
    Removed { box_id: BoxId, rack: RackId },
}

impl InventoryChange {
    pub fn box_id(&self) -> BoxId {
        match self {
            InventoryChange::Placed { spec, .. }    => spec.id,
            InventoryChange::Removed { box_id, .. } => *box_id,
        }
    }

    pub fn rack(&self) -> RackId {
        match self {
            InventoryChange::Placed { rack, .. } | InventoryChange::Removed { rack, .. } => *rack,
        }
    }

    /// `"STORED"` or `"RETRIEVED"`, as written to the operations log.
    pub fn operation(&self) -> &'static str {
        match self {
            InventoryChange::Placed { .. }  => "STORED",
            InventoryChange::Removed { .. } => "RETRIEVED",
        }
    }
}
