use thiserror::Error;

use asrs_core::{Cell, ErrorKind, TimeWindow, VehicleId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// Another vehicle holds `cell` during part of `window`.
    #[error("cell {cell} is held by {holder} during {window}")]
    Conflict { cell: Cell, window: TimeWindow, holder: VehicleId },
}

impl ReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::Conflict { .. } => ErrorKind::Conflict,
        }
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
