//! `asrs-fleet` — vehicles and the tick-by-tick itineraries they follow.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`vehicle`]   | `Vehicle`, `VehicleStatus`, `VehicleSnapshot`              |
//! | [`itinerary`] | `Itinerary`, `ItineraryBuilder`, `Waypoint`, `Activity`    |
//! | [`fleet`]     | `Fleet` — `Vec<Vehicle>` + sparse itinerary map            |
//! | [`error`]     | `FleetError`, `FleetResult<T>`                             |
//!
//! # Movement model (one cell per tick)
//!
//! An itinerary is a list of slots: slot `k` is the cell the vehicle occupies
//! during tick `depart + k`.  Travel moves one cell per slot; loading and
//! unloading repeat the current cell for the configured dwell.  A vehicle
//! that is stalled simply does not consume its next slot.
//!
//! Slot `k` is reserved for `[depart + k, depart + k + 2)`: the extra tick
//! covers the hand-over into slot `k + 1`, so a second vehicle can neither
//! enter a cell the moment the first leaves it nor swap cells head-on.

pub mod error;
pub mod fleet;
pub mod itinerary;
pub mod vehicle;


pub use error::{FleetError, FleetResult};
pub use fleet::{Fleet, Step};
pub use itinerary::{Activity, Itinerary, ItineraryBuilder, Waypoint};
pub use vehicle::{Vehicle, VehicleSnapshot, VehicleStatus};
