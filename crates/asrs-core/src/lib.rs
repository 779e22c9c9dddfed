//! `asrs-core` — foundational types for the `asrs` warehouse engine.
//!
//! This crate is a dependency of every other `asrs-*` crate.  It has no
//! `asrs-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `RackId`, `BoxId`, `JobId`, `VehicleId`               |
//! | [`cell`]        | `Cell`, `Extents`, grid distances                     |
//! | [`time`]        | `Tick`, `TimeWindow`, `SimClock`                      |
//! | [`config`]      | `AsrsConfig`, `GridConfig`, `SchedulerConfig`, …      |
//! | [`rng`]         | `SimRng` (seeded workload randomness)                 |
//! | [`error`]       | `ErrorKind` taxonomy, `CoreError`, `CoreResult`       |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required by `asrs-store`.                                  |

pub mod cell;
pub mod config;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cell::{Cell, Extents};
pub use config::{AsrsConfig, GridConfig, MoveCosts, RunConfig, SchedulerConfig};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use ids::{BoxId, JobId, RackId, VehicleId};
pub use rng::SimRng;
pub use time::{SimClock, Tick, TimeWindow};
