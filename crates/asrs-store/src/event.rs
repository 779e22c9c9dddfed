//! The journalled event type.

use serde::{Deserialize, Serialize};

use asrs_core::{JobId, Tick};
use asrs_registry::InventoryChange;

/// One committed inventory change.
///
/// `seq` is assigned by the scheduler, starts at 1, and increases by one per
/// event; snapshots record the `seq` of the last event they include.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub seq:      u64,
    pub tick:     Tick,
    pub job:      JobId,
    /// The box's SKU at commit time, so the log reads without the registry.
    pub sku:      String,
    pub change:   InventoryChange,
    /// Steps travelled by the vehicle for the whole job.
    pub path_len: u32,
}
