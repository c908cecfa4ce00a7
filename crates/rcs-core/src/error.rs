use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Value out of range for {what}: {value} not in [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl CoreError {
    /// Name of the offending quantity.
    pub fn what(&self) -> &'static str {
        match self {
            CoreError::NonFinite { what, .. }
            | CoreError::InvalidArg { what }
            | CoreError::OutOfRange { what, .. } => what,
        }
    }
}
