//! rcs-water: light-water property provider for the primary-coolant engine.
//!
//! Provides:
//! - A CoolProp backend (via `rfluids`) for saturation and compressed-liquid states
//! - [`WaterTable`]: those states tabulated once over the operating envelope
//! - Saturation line (pressure ↔ temperature, slope), subcooled liquid
//!   properties and saturated liquid/vapour properties as table lookups
//! - Property packs bundling everything evaluated at one state
//!
//! # Conventions
//!
//! Table lookups are pure, infallible and work in plant units: °F, psia,
//! lbm/ft³, BTU/lbm. Inputs outside the operating envelope are clamped to
//! the nearest bound rather than rejected, because iterative solvers may
//! probe outside the physical envelope for a single trial step. Backend
//! failures surface once, from [`water_table`] or [`WaterTable::build`].
//!
//! # Example
//!
//! ```
//! let water = rcs_water::water_table()?;
//! let t_sat = water.saturation_temperature(365.0);
//! assert!((t_sat - 435.7).abs() < 1.0);
//! let rho = water.liquid_density(100.0, 365.0);
//! assert!(rho > 61.9 && rho < 62.1);
//! # Ok::<(), rcs_water::WaterError>(())
//! ```

pub mod coolprop;
pub mod envelope;
pub mod error;
pub mod pack;
pub mod source;
pub mod table;

use std::sync::OnceLock;

pub use coolprop::CoolPropWater;
pub use envelope::{P_MAX_PSIA, P_MIN_PSIA, T_MAX_F, T_MIN_F, clamp_pressure, clamp_temperature};
pub use error::{WaterError, WaterResult};
pub use pack::{LiquidProperties, SaturationProperties};
pub use source::{LiquidState, SaturatedState, WaterSource};
pub use table::WaterTable;

static SHARED: OnceLock<WaterTable> = OnceLock::new();

/// The process-wide CoolProp table, built on first use.
///
/// A failed build is not cached; the next call tries again.
pub fn water_table() -> WaterResult<&'static WaterTable> {
    if let Some(table) = SHARED.get() {
        return Ok(table);
    }
    let table = WaterTable::build(&CoolPropWater::new())?;
    Ok(SHARED.get_or_init(|| table))
}
