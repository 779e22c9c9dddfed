use thiserror::Error;

use asrs_core::{CoreError, ErrorKind, JobId};
use asrs_fleet::FleetError;
use asrs_grid::GridError;
use asrs_registry::RegistryError;
use asrs_store::StoreError;

use crate::JobState;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("unknown job {0}")]
    JobNotFound(JobId),

    #[error("job {job} cannot be cancelled in state {state}")]
    CannotCancel { job: JobId, state: JobState },

    #[error("the store already holds state; recover instead of starting fresh")]
    StoreNotEmpty,

    #[error("{0} commits are waiting on the store; retry the checkpoint later")]
    CommitsInFlight(usize),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SchedulerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            // Every config check is a bound on geometry, costs or budgets.
            SchedulerError::Config(_)                 => ErrorKind::OutOfBounds,
            SchedulerError::JobNotFound(_)            => ErrorKind::NotFound,
            SchedulerError::CannotCancel { .. }       => ErrorKind::CannotCancel,
            SchedulerError::StoreNotEmpty
            | SchedulerError::CommitsInFlight(_)      => ErrorKind::PersistenceFailure,
            SchedulerError::Grid(e)                   => e.kind(),
            SchedulerError::Fleet(e)                  => e.kind(),
            SchedulerError::Registry(e)               => e.kind(),
            SchedulerError::Store(e)                  => e.kind(),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
