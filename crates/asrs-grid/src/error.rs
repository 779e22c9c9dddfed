//! Grid and pathfinding error type.

use thiserror::Error;

use asrs_core::{Cell, ErrorKind};

/// Errors produced by `asrs-grid`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell {0} lies outside the warehouse extents")]
    OutOfBounds(Cell),

    #[error("no path from {from} to {to}")]
    Unreachable { from: Cell, to: Cell },
}

impl GridError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GridError::OutOfBounds(_)   => ErrorKind::OutOfBounds,
            GridError::Unreachable { .. } => ErrorKind::Unreachable,
        }
    }
}

pub type GridResult<T> = Result<T, GridError>;
