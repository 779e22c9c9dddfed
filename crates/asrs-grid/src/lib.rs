//! `asrs-grid` — the discretized warehouse space and routing over it.
//!
//! # Crate layout
//!
//! | Module         | Contents                                               |
//! |----------------|--------------------------------------------------------|
//! | [`grid`]       | `Grid` (passability + rack occupancy), `GridBuilder`   |
//! | [`pathfinder`] | `Pathfinder` trait, `Path`, `AStarPlanner`             |
//! | [`error`]      | `GridError`, `GridResult<T>`                           |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                     |
//! |-----------|------------------------------------------------------------|
//! | `fx-hash` | `CellSet` uses FxHash instead of SipHash.                  |
//! | `serde`   | Derives `Serialize`/`Deserialize` on `Path`.               |

pub mod error;
pub mod grid;
pub mod pathfinder;


pub use error::{GridError, GridResult};
pub use grid::{Grid, GridBuilder};
pub use pathfinder::{AStarPlanner, Path, Pathfinder};

/// A set of cells, used for planning obstacles and occupancy snapshots.
#[cfg(feature = "fx-hash")]
pub type CellSet = rustc_hash::FxHashSet<asrs_core::Cell>;

/// A set of cells, used for planning obstacles and occupancy snapshots.
#[cfg(not(feature = "fx-hash"))]
pub type CellSet = std::collections::HashSet<asrs_core::Cell>;
