//! `asrs-registry` — racks, boxes, and where every box lives.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`model`]      | `Rack`, `BoxSpec`, `BoxRecord`, `Dimensions`, `SizeClass` |
//! | [`layout`]     | `RackLayout` — rack placement generators                  |
//! | [`slotting`]   | `SlottingPolicy`, `Zone`                                  |
//! | [`registry`]   | `Registry` — transactional place/remove, rack search      |
//! | [`snapshot`]   | `RegistrySnapshot`, `InventoryChange` (replayable ops)    |
//! | [`error`]      | `RegistryError`, `RegistryResult<T>`                      |
//!
//! # Ownership
//!
//! The registry owns the [`Grid`][asrs_grid::Grid] and is the only writer of
//! rack occupancy.  Racks and boxes refer to each other by id only; a box's
//! location is the single source of truth and rack contents mirror it under
//! the same lock scope.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on model and snapshot types. |

pub mod error;
pub mod layout;
pub mod model;
pub mod registry;
pub mod slotting;
pub mod snapshot;


pub use error::{RegistryError, RegistryResult};
pub use layout::{RackLayout, RackTemplate};
pub use model::{BoxRecord, BoxSpec, Dimensions, Rack, SizeClass};
pub use registry::Registry;
pub use slotting::{SlottingPolicy, Zone};
pub use snapshot::{InventoryChange, RegistrySnapshot};
