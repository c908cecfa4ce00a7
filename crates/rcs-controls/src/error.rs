//! Error types for control primitives.

use thiserror::Error;

/// Result type for control primitive construction.
pub type ControlResult<T> = Result<T, ControlError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Timing parameter incompatible with the timestep.
    #[error("Invalid timing for {what}: {value} s")]
    InvalidTiming { what: &'static str, value: f64 },
}
