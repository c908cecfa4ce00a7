//! Water property errors.

use thiserror::Error;

pub type WaterResult<T> = Result<T, WaterError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaterError {
    /// Backend returned a value no real water state has.
    #[error("Non-physical value for {what}: {value}")]
    NonPhysical { what: &'static str, value: f64 },

    /// Tabulated property does not move the way water does.
    #[error("Property table not monotone: {what} near {t_f} °F")]
    NonMonotone { what: &'static str, t_f: f64 },

    /// Backend (CoolProp) error.
    #[error("Backend error: {message}")]
    Backend { message: String },
}
