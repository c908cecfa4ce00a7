//! Property backends and the raw states they report.

use crate::error::{WaterError, WaterResult};

/// One point on the saturation line, in plant units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SaturatedState {
    pub t_f: f64,
    pub p_psia: f64,
    /// Liquid density ρf [lbm/ft³]
    pub rho_f: f64,
    /// Vapour density ρg [lbm/ft³]
    pub rho_g: f64,
    /// Liquid enthalpy hf [BTU/lbm]
    pub h_f: f64,
    /// Vapour enthalpy hg [BTU/lbm]
    pub h_g: f64,
}

/// Compressed liquid at one (T, P), in plant units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiquidState {
    /// [lbm/ft³]
    pub density: f64,
    /// [BTU/lbm]
    pub enthalpy: f64,
    /// [BTU/(lbm·°F)]
    pub cp: f64,
}

/// A source of real-water states.
///
/// Queries may fail; [`crate::WaterTable`] calls a source only while it is
/// being built and never during a simulation tick.
pub trait WaterSource: Send + Sync {
    /// Backend name, for diagnostics.
    fn name(&self) -> &str;

    /// Saturated liquid and vapour at temperature `t_f` [°F].
    fn saturated(&self, t_f: f64) -> WaterResult<SaturatedState>;

    /// Single-phase liquid at `t_f` [°F] and `p_psia` above saturation.
    fn liquid(&self, t_f: f64, p_psia: f64) -> WaterResult<LiquidState>;
}

/// Reject states a backend should never return.
pub(crate) mod validation {
    use super::*;

    pub fn positive(value: f64, what: &'static str) -> WaterResult<f64> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(WaterError::NonPhysical { what, value })
        }
    }

    pub fn finite(value: f64, what: &'static str) -> WaterResult<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(WaterError::NonPhysical { what, value })
        }
    }

    pub fn saturated(s: SaturatedState) -> WaterResult<SaturatedState> {
        positive(s.p_psia, "saturation pressure")?;
        positive(s.rho_f, "saturated liquid density")?;
        positive(s.rho_g, "saturated vapour density")?;
        finite(s.h_f, "saturated liquid enthalpy")?;
        finite(s.h_g, "saturated vapour enthalpy")?;
        if s.rho_g >= s.rho_f {
            return Err(WaterError::NonPhysical {
                what: "vapour denser than liquid",
                value: s.rho_g,
            });
        }
        Ok(s)
    }

    pub fn liquid(s: LiquidState) -> WaterResult<LiquidState> {
        positive(s.density, "liquid density")?;
        finite(s.enthalpy, "liquid enthalpy")?;
        positive(s.cp, "liquid specific heat")?;
        Ok(s)
    }
}
