use thiserror::Error;

use asrs_core::{BoxId, Cell, ErrorKind, RackId};
use asrs_grid::GridError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("rack {0} is full")]
    CapacityExceeded(RackId),

    #[error("rack {rack} does not accept box {box_id} (size class or weight)")]
    Incompatible { box_id: BoxId, rack: RackId },

    #[error("box {0} is already stored")]
    AlreadyStored(BoxId),

    #[error("box {0} is not stored")]
    NotStored(BoxId),

    #[error("box {0} is already registered")]
    DuplicateBox(BoxId),

    #[error("unknown box {0}")]
    BoxNotFound(BoxId),

    #[error("unknown rack {0}")]
    RackNotFound(RackId),

    #[error("no rack can accept box {0}")]
    NoCapacity(BoxId),

    #[error("cell {0} already holds a rack")]
    CellOccupied(Cell),

    #[error("cell {0} is a structural wall")]
    Impassable(Cell),

    /// Rack contents disagree with box locations, or a replayed journal
    /// disagrees with the snapshot under it.  Only corrupt durable state gets
    /// here, so it reports as `PersistenceFailure`.
    #[error("inconsistent registry state: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::CapacityExceeded(_)
            | RegistryError::Incompatible { .. } => ErrorKind::CapacityExceeded,
            RegistryError::AlreadyStored(_)
            | RegistryError::DuplicateBox(_)     => ErrorKind::AlreadyStored,
            RegistryError::NotStored(_)          => ErrorKind::NotStored,
            RegistryError::BoxNotFound(_)
            | RegistryError::RackNotFound(_)     => ErrorKind::NotFound,
            RegistryError::NoCapacity(_)         => ErrorKind::NoCapacity,
            RegistryError::CellOccupied(_)       => ErrorKind::Conflict,
            RegistryError::Impassable(_)         => ErrorKind::Unreachable,
            RegistryError::Inconsistent(_)       => ErrorKind::PersistenceFailure,
            RegistryError::Grid(e)               => e.kind(),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
