//! `asrs-scheduler` — job state machine and tick loop for the asrs engine.
//!
//! # Tick loop
//!
//! ```text
//! for tick in now..config.run.end_tick():
//!   ① Expire    — reservations for past ticks are dropped.
//!   ② Depart    — Reserved jobs whose itinerary starts now begin Executing.
//!   ③ Advance   — every executing vehicle consumes one itinerary slot;
//!                 arrivals move to Completing, stalls hold their cell,
//!                 overdue vehicles are blocked and crossing routes re-planned.
//!   ④ Commit    — Completing jobs apply their inventory change and journal
//!                 it through the PersistenceGateway.
//!   ⑤ Budgets   — jobs that never set off within their budget time out.
//!   ⑥ Assign    — Pending jobs, oldest first, take the nearest idle vehicle.
//!   ⑦ Plan      — route every due job (parallel with the `parallel` feature).
//!   ⑧ Reserve   — in ascending JobId order, write each route's reservations
//!                 all-or-nothing; losers back off through the RetryQueue.
//! ```
//!
//! | Module       | Contents                                              |
//! |--------------|-------------------------------------------------------|
//! | [`job`]      | `JobRequest`, `JobState`, `Job`                       |
//! | [`scheduler`]| `Scheduler`: intake, operator hooks, the tick loop    |
//! | [`builder`]  | `SchedulerBuilder`: fresh start and recovery          |
//! | [`retry`]    | `RetryQueue` of backed-off planning attempts          |
//! | [`observer`] | `SchedulerObserver`, `ChannelObserver`                |
//! | [`stats`]    | `SchedulerStats` counters                             |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Runs the planning phase on Rayon's thread pool.        |
//! | `fx-hash`  | FxHash for cell sets and the reservation table.        |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use asrs_core::AsrsConfig;
//! use asrs_grid::AStarPlanner;
//! use asrs_registry::{BoxSpec, RackLayout, SizeClass};
//! use asrs_scheduler::{JobRequest, NoopObserver, SchedulerBuilder};
//! use asrs_store::MemoryGateway;
//!
//! let config = AsrsConfig::default();
//! let layout = RackLayout::aisles(config.grid.extents, config.grid.dock, 4, 8, SizeClass::Bulk, 500.0);
//! let mut scheduler = SchedulerBuilder::new(config.clone(), AStarPlanner::from_config(&config.grid), MemoryGateway::new())
//!     .layout(layout)
//!     .build()?;
//! let job = scheduler.submit_job(JobRequest::store(BoxSpec::new(BoxId(1), "SKU-1")));
//! scheduler.run_until_idle(1_000, &mut NoopObserver)?;
//! ```

pub mod builder;
pub mod error;
pub mod job;
pub mod observer;
pub mod retry;
pub mod scheduler;
pub mod stats;

#[cfg(test)]
mod tests;

pub use builder::SchedulerBuilder;
pub use error::{SchedulerError, SchedulerResult};
pub use job::{Job, JobKind, JobRequest, JobState};
pub use observer::{ChannelObserver, JobTransition, NoopObserver, SchedulerEvent, SchedulerObserver};
pub use retry::RetryQueue;
pub use scheduler::{JOB_ID_BLOCK, Scheduler};
pub use stats::SchedulerStats;
