//! rcs-core: shared foundation for the primary-coolant heatup engine.
//!
//! Contains:
//! - units (plant-unit constants, conversions, uom bridge to SI)
//! - numeric (Real, validation guards, interpolation, lag gain)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
