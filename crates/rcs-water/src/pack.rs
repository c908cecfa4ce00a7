//! Property packs: every property the engine needs at one state, evaluated once.

use crate::envelope::{clamp_pressure, clamp_temperature};
use crate::table::WaterTable;
use rcs_core::units::PSIA_FT3_TO_BTU;

/// Subcooled liquid properties at (T, P).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiquidProperties {
    /// Temperature [°F] (clamped)
    pub t_f: f64,
    /// Pressure [psia] (clamped)
    pub p_psia: f64,
    /// Density [lbm/ft³]
    pub density: f64,
    /// Specific heat [BTU/(lbm·°F)]
    pub cp: f64,
    /// Expansion coefficient [1/°F]
    pub beta: f64,
    /// Isothermal compressibility [1/psi]
    pub kappa: f64,
    /// Enthalpy [BTU/lbm]
    pub enthalpy: f64,
    /// Saturation temperature at `p_psia` [°F]
    pub t_sat_f: f64,
}

impl LiquidProperties {
    pub fn at(water: &WaterTable, t_f: f64, p_psia: f64) -> Self {
        let t = clamp_temperature(t_f);
        let p = clamp_pressure(p_psia);
        Self {
            t_f: t,
            p_psia: p,
            density: water.liquid_density(t, p),
            cp: water.specific_heat(t, p),
            beta: water.expansion_coefficient(t, p),
            kappa: water.isothermal_compressibility(t, p),
            enthalpy: water.liquid_enthalpy(t, p),
            t_sat_f: water.saturation_temperature(p),
        }
    }

    /// Subcooling margin Tsat(P) − T [°F]; negative when superheated.
    pub fn subcooling(&self) -> f64 {
        self.t_sat_f - self.t_f
    }
}

/// Saturated liquid/vapour properties at temperature T.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SaturationProperties {
    pub t_f: f64,
    /// Saturation pressure [psia]
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

impl SaturationProperties {
    pub fn at(water: &WaterTable, t_f: f64) -> Self {
        let t = clamp_temperature(t_f);
        Self {
            t_f: t,
            p_psia: water.saturation_pressure(t),
            rho_f: water.saturated_liquid_density(t),
            rho_g: water.saturated_vapor_density(t),
            h_f: water.saturated_liquid_enthalpy(t),
            h_g: water.saturated_vapor_enthalpy(t),
        }
    }

    pub fn v_f(&self) -> f64 {
        1.0 / self.rho_f
    }

    pub fn v_g(&self) -> f64 {
        1.0 / self.rho_g
    }

    /// Liquid internal energy uf [BTU/lbm].
    pub fn u_f(&self) -> f64 {
        self.h_f - self.p_psia * self.v_f() * PSIA_FT3_TO_BTU
    }

    /// Vapour internal energy ug [BTU/lbm].
    pub fn u_g(&self) -> f64 {
        self.h_g - self.p_psia * self.v_g() * PSIA_FT3_TO_BTU
    }

    pub fn h_fg(&self) -> f64 {
        self.h_g - self.h_f
    }

    /// Static quality of a mixture with specific volume `v` [ft³/lbm].
    ///
    /// Not clamped: values below zero mean the liquid alone overfills `v`.
    pub fn quality_from_volume(&self, v: f64) -> f64 {
        (v - self.v_f()) / (self.v_g() - self.v_f())
    }

    /// Mixture internal energy [BTU/lbm] at quality `x`.
    pub fn mixture_energy(&self, x: f64) -> f64 {
        self.u_f() + x * (self.u_g() - self.u_f())
    }
}
