//! Error types for the primary-system engine.

use thiserror::Error;

/// Errors encountered while building or stepping the primary system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid configuration: {what} ({detail})")]
    InvalidConfig { what: &'static str, detail: String },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },

    #[error("Boundary flow already applied for tick {tick}")]
    BoundaryAlreadyApplied { tick: u64 },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<rcs_controls::ControlError> for SimError {
    fn from(e: rcs_controls::ControlError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<rcs_core::CoreError> for SimError {
    fn from(e: rcs_core::CoreError) -> Self {
        SimError::InvalidConfig {
            what: e.what(),
            detail: e.to_string(),
        }
    }
}

impl From<rcs_water::WaterError> for SimError {
    fn from(e: rcs_water::WaterError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
