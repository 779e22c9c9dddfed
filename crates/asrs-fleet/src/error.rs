use thiserror::Error;

use asrs_core::{ErrorKind, VehicleId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("unknown vehicle {0}")]
    NotFound(VehicleId),

    #[error("vehicle {0} already has a job")]
    Busy(VehicleId),

    #[error("vehicle {0} has no itinerary")]
    NoItinerary(VehicleId),

    #[error("vehicle {0} is not blocked")]
    NotBlocked(VehicleId),
}

impl FleetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FleetError::NotFound(_) | FleetError::NoItinerary(_) => ErrorKind::NotFound,
            FleetError::Busy(_) | FleetError::NotBlocked(_)      => ErrorKind::Conflict,
        }
    }
}

pub type FleetResult<T> = Result<T, FleetError>;
