//! Error taxonomy shared by every `asrs-*` crate.
//!
//! Each sub-crate keeps its own `thiserror` enum so error sites stay precise,
//! and maps every variant onto one [`ErrorKind`].  The scheduler attaches the
//! kind to failed jobs, so callers can react to "what went wrong" without
//! depending on every crate's error type.

use std::fmt;

use thiserror::Error;

/// The coarse failure category attached to a failed job.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// A coordinate lies outside the configured warehouse extents.
    OutOfBounds,
    /// The target rack is full.
    CapacityExceeded,
    /// The box already has a location.
    AlreadyStored,
    /// The box has no location.
    NotStored,
    /// An unknown box or rack id.
    NotFound,
    /// No rack can accept the box.
    NoCapacity,
    /// No path exists between the requested cells.
    Unreachable,
    /// A reservation overlaps one held by another vehicle.
    Conflict,
    /// The job has progressed too far to be cancelled.
    CannotCancel,
    /// The durable store rejected a write.
    PersistenceFailure,
    /// A job exceeded its tick budget in some state.
    TimedOut,
    /// The job was in flight when the engine stopped; it must be resubmitted.
    Interrupted,
}

impl ErrorKind {
    /// Transient kinds are retried with backoff before being surfaced.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Conflict | ErrorKind::Unreachable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::OutOfBounds        => "out_of_bounds",
            ErrorKind::CapacityExceeded   => "capacity_exceeded",
            ErrorKind::AlreadyStored      => "already_stored",
            ErrorKind::NotStored          => "not_stored",
            ErrorKind::NotFound           => "not_found",
            ErrorKind::NoCapacity         => "no_capacity",
            ErrorKind::Unreachable        => "unreachable",
            ErrorKind::Conflict           => "conflict",
            ErrorKind::CannotCancel       => "cannot_cancel",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::TimedOut           => "timed_out",
            ErrorKind::Interrupted        => "interrupted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by `asrs-core` itself (configuration and I/O).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `asrs-core`.
pub type CoreResult<T> = Result<T, CoreError>;
