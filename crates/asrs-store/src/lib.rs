//! `asrs-store` — durable record of rack and box state.
//!
//! The gateway keeps two things: periodic [`RegistrySnapshot`]s and an
//! append-only journal of committed [`InventoryEvent`]s.  Recovery returns
//! the latest snapshot plus every event journalled after it; replaying those
//! events over the snapshot yields the last committed registry state.
//!
//! | Feature   | Backend          | Files created                           |
//! |-----------|------------------|-----------------------------------------|
//! | *(none)*  | [`MemoryGateway`]| none (process memory, fault injection)  |
//! | *(none)*  | [`JsonlGateway`] | `snapshot.json`, `events.jsonl`         |
//! | `sqlite`  | `SqliteGateway`  | `inventory.db`                          |
//!
//! The journal doubles as the operations log; [`oplog`] exports it as CSV.
//!
//! [`RegistrySnapshot`]: asrs_registry::RegistrySnapshot

pub mod error;
pub mod event;
pub mod gateway;
pub mod jsonl;
pub mod memory;
pub mod oplog;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use error::{StoreError, StoreResult};
pub use event::InventoryEvent;
pub use gateway::{PersistenceGateway, Recovered};
pub use jsonl::JsonlGateway;
pub use memory::MemoryGateway;
pub use oplog::{write_operations, export_operations_csv};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteGateway;
