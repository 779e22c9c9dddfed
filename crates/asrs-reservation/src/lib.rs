//! `asrs-reservation` — short-lived cell/time locks.
//!
//! A reservation says "vehicle V may occupy cell C during tick T".  Routes
//! are reserved all at once before a vehicle moves, so two vehicles can never
//! be scheduled into the same cell at the same tick.
//!
//! | Module    | Contents                                                 |
//! |-----------|----------------------------------------------------------|
//! | [`table`] | `ReservationTable` — sharded, all-or-nothing reservation |
//! | [`error`] | `ReservationError`, `ReservationResult<T>`               |
//!
//! Time is measured in simulation [`Tick`][asrs_core::Tick]s, never wall
//! clock, so replanning is reproducible.

pub mod error;
pub mod table;


pub use error::{ReservationError, ReservationResult};
pub use table::ReservationTable;
