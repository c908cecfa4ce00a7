//! Water properties tabulated once from a [`WaterSource`].
//!
//! The saturation line is stored every 1 °F with ln(Psat) linear between
//! nodes, so [`WaterTable::saturation_temperature`] is the exact inverse of
//! [`WaterTable::saturation_pressure`]. Compressed liquid is stored on a grid
//! of temperature × excess pressure above saturation and interpolated
//! bilinearly. Below the first excess node (liquid at or under its vapour
//! pressure) density follows the node's compressibility.
//!
//! Lookups never fail and never call the backend. They are continuous, and
//! monotone wherever the tabulated data are; [`WaterTable::build`] rejects
//! data that are not.

use crate::envelope::{T_MAX_F, T_MIN_F, clamp_pressure, clamp_temperature};
use crate::error::{WaterError, WaterResult};
use crate::source::{SaturatedState, WaterSource, validation};
use rcs_core::units::{PSIA_FT3_TO_BTU, f_to_kelvin};
use std::fmt;

const SAT_STEP_F: f64 = 1.0;
const LIQ_STEP_F: f64 = 2.5;
/// Excess pressure above saturation of each liquid column [psi].
const EXCESS_PSI: [f64; 12] = [
    1.0, 5.0, 15.0, 40.0, 100.0, 200.0, 400.0, 700.0, 1100.0, 1600.0, 2200.0, 2800.0,
];
const KAPPA_STEP_PSI: f64 = 0.5;
const BETA_STEP_F: f64 = 0.25;
/// Lower bound on the density ratio for liquid far below its vapour pressure.
const METASTABLE_FLOOR: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
struct SatNode {
    ln_p: f64,
    rho_f: f64,
    rho_g: f64,
    h_f: f64,
    h_g: f64,
    /// dPsat/dT from Clapeyron [psia/°F]
    slope: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct LiquidNode {
    density: f64,
    enthalpy: f64,
    cp: f64,
    beta: f64,
    kappa: f64,
}

impl LiquidNode {
    fn lerp(&self, other: &Self, w: f64) -> Self {
        let mix = |a: f64, b: f64| a + w * (b - a);
        Self {
            density: mix(self.density, other.density),
            enthalpy: mix(self.enthalpy, other.enthalpy),
            cp: mix(self.cp, other.cp),
            beta: mix(self.beta, other.beta),
            kappa: mix(self.kappa, other.kappa),
        }
    }
}

type LiquidRow = [LiquidNode; EXCESS_PSI.len()];

/// Tabulated light-water properties in plant units.
#[derive(Clone, PartialEq)]
pub struct WaterTable {
    backend: String,
    sat: Vec<SatNode>,
    liquid: Vec<LiquidRow>,
}

impl fmt::Debug for WaterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaterTable")
            .field("backend", &self.backend)
            .field("saturation_nodes", &self.sat.len())
            .field("liquid_rows", &self.liquid.len())
            .finish()
    }
}

fn node_count(step: f64) -> usize {
    ((T_MAX_F - T_MIN_F) / step).round() as usize + 1
}

/// Cell index and weight of `t_f` on a grid starting at `T_MIN_F`.
fn cell(t_f: f64, step: f64, nodes: usize) -> (usize, f64) {
    let x = (clamp_temperature(t_f) - T_MIN_F) / step;
    let i = (x.floor().max(0.0) as usize).min(nodes - 2);
    (i, (x - i as f64).clamp(0.0, 1.0))
}

fn sat_node(s: SaturatedState) -> SatNode {
    let v_f = 1.0 / s.rho_f;
    let v_g = 1.0 / s.rho_g;
    let t_rankine = f_to_kelvin(s.t_f) * 1.8;
    SatNode {
        ln_p: s.p_psia.ln(),
        rho_f: s.rho_f,
        rho_g: s.rho_g,
        h_f: s.h_f,
        h_g: s.h_g,
        slope: (s.h_g - s.h_f) / (t_rankine * (v_g - v_f) * PSIA_FT3_TO_BTU),
    }
}

impl WaterTable {
    /// Query `source` over the whole envelope and tabulate the results.
    pub fn build(source: &dyn WaterSource) -> WaterResult<Self> {
        let sat_nodes = node_count(SAT_STEP_F);
        let mut sat = Vec::with_capacity(sat_nodes);
        for i in 0..sat_nodes {
            let t_f = T_MIN_F + i as f64 * SAT_STEP_F;
            let node = sat_node(source.saturated(t_f)?);
            validation::positive(node.slope, "saturation slope")?;
            if let Some(prev) = sat.last().map(|n: &SatNode| n.ln_p)
                && node.ln_p <= prev
            {
                return Err(WaterError::NonMonotone {
                    what: "saturation pressure",
                    t_f,
                });
            }
            sat.push(node);
        }

        let mut table = Self {
            backend: source.name().to_string(),
            sat,
            liquid: Vec::with_capacity(node_count(LIQ_STEP_F)),
        };
        for i in 0..node_count(LIQ_STEP_F) {
            let t_f = T_MIN_F + i as f64 * LIQ_STEP_F;
            let row = table.liquid_row(source, t_f)?;
            table.liquid.push(row);
        }
        Ok(table)
    }

    fn liquid_row(&self, source: &dyn WaterSource, t_f: f64) -> WaterResult<LiquidRow> {
        let p_sat = self.saturation_pressure(t_f);
        let mut row = [LiquidNode {
            density: 0.0,
            enthalpy: 0.0,
            cp: 0.0,
            beta: 0.0,
            kappa: 0.0,
        }; EXCESS_PSI.len()];
        for (slot, excess) in row.iter_mut().zip(EXCESS_PSI) {
            let p = p_sat + excess;
            let here = source.liquid(t_f, p)?;
            let compressed = source.liquid(t_f, p + KAPPA_STEP_PSI)?;
            let colder = source.liquid(t_f - BETA_STEP_F, p)?;
            *slot = LiquidNode {
                density: here.density,
                enthalpy: here.enthalpy,
                cp: here.cp,
                beta: validation::positive(
                    (colder.density - here.density) / (BETA_STEP_F * here.density),
                    "expansion coefficient",
                )?,
                kappa: validation::positive(
                    (compressed.density - here.density) / (KAPPA_STEP_PSI * here.density),
                    "compressibility",
                )?,
            };
        }
        if row.windows(2).any(|w| w[1].density <= w[0].density) {
            return Err(WaterError::NonMonotone {
                what: "liquid density vs pressure",
                t_f,
            });
        }
        if let Some(prev) = self.liquid.last()
            && row.iter().zip(prev).any(|(hot, cold)| hot.density >= cold.density)
        {
            return Err(WaterError::NonMonotone {
                what: "liquid density vs temperature",
                t_f,
            });
        }
        Ok(row)
    }

    /// Name of the backend the table was built from.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    fn sat_at(&self, t_f: f64) -> (&SatNode, &SatNode, f64) {
        let (i, w) = cell(t_f, SAT_STEP_F, self.sat.len());
        (&self.sat[i], &self.sat[i + 1], w)
    }

    fn sat_lerp(&self, t_f: f64, f: impl Fn(&SatNode) -> f64) -> f64 {
        let (a, b, w) = self.sat_at(t_f);
        f(a) + w * (f(b) - f(a))
    }

    /// Saturation pressure [psia] at temperature [°F].
    pub fn saturation_pressure(&self, t_f: f64) -> f64 {
        self.sat_lerp(t_f, |n| n.ln_p).exp()
    }

    /// Slope of the saturation line dPsat/dT [psia/°F].
    pub fn saturation_slope(&self, t_f: f64) -> f64 {
        self.sat_lerp(t_f, |n| n.slope)
    }

    /// Saturation temperature [°F] at pressure [psia].
    pub fn saturation_temperature(&self, p_psia: f64) -> f64 {
        let ln_p = clamp_pressure(p_psia).ln();
        let k = self.sat.partition_point(|n| n.ln_p < ln_p);
        if k == 0 {
            return T_MIN_F;
        }
        if k >= self.sat.len() {
            return T_MAX_F;
        }
        let (a, b) = (&self.sat[k - 1], &self.sat[k]);
        let w = (ln_p - a.ln_p) / (b.ln_p - a.ln_p);
        clamp_temperature(T_MIN_F + ((k - 1) as f64 + w) * SAT_STEP_F)
    }

    /// Saturated liquid density [lbm/ft³] at temperature [°F].
    pub fn saturated_liquid_density(&self, t_f: f64) -> f64 {
        self.sat_lerp(t_f, |n| n.rho_f)
    }

    /// Saturated liquid enthalpy [BTU/lbm] at temperature [°F].
    pub fn saturated_liquid_enthalpy(&self, t_f: f64) -> f64 {
        self.sat_lerp(t_f, |n| n.h_f)
    }

    /// Saturated vapour density [lbm/ft³] at temperature [°F].
    pub fn saturated_vapor_density(&self, t_f: f64) -> f64 {
        self.sat_lerp(t_f, |n| n.rho_g)
    }

    /// Saturated vapour density [lbm/ft³] at pressure [psia].
    pub fn saturated_vapor_density_at_pressure(&self, p_psia: f64) -> f64 {
        self.saturated_vapor_density(self.saturation_temperature(p_psia))
    }

    /// Saturated vapour enthalpy [BTU/lbm] at temperature [°F].
    pub fn saturated_vapor_enthalpy(&self, t_f: f64) -> f64 {
        self.sat_lerp(t_f, |n| n.h_g)
    }

    /// Latent heat of vaporisation h_fg [BTU/lbm].
    pub fn latent_heat(&self, t_f: f64) -> f64 {
        self.sat_lerp(t_f, |n| n.h_g - n.h_f).max(0.0)
    }

    fn row_at(&self, i: usize, excess: f64) -> LiquidNode {
        let row = &self.liquid[i];
        let first = EXCESS_PSI[0];
        if excess <= first {
            let n = row[0];
            let dp = excess - first;
            return LiquidNode {
                density: n.density * (1.0 + n.kappa * dp).max(METASTABLE_FLOOR),
                enthalpy: n.enthalpy + dp / n.density * PSIA_FT3_TO_BTU,
                ..n
            };
        }
        let k = EXCESS_PSI.partition_point(|e| *e < excess).min(EXCESS_PSI.len() - 1);
        let (e0, e1) = (EXCESS_PSI[k - 1], EXCESS_PSI[k]);
        row[k - 1].lerp(&row[k], ((excess - e0) / (e1 - e0)).min(1.0))
    }

    fn liquid_node(&self, t_f: f64, p_psia: f64) -> LiquidNode {
        let t = clamp_temperature(t_f);
        let excess = clamp_pressure(p_psia) - self.saturation_pressure(t);
        let (i, w) = cell(t, LIQ_STEP_F, self.liquid.len());
        self.row_at(i, excess).lerp(&self.row_at(i + 1, excess), w)
    }

    /// Liquid density [lbm/ft³] at temperature [°F] and pressure [psia].
    pub fn liquid_density(&self, t_f: f64, p_psia: f64) -> f64 {
        self.liquid_node(t_f, p_psia).density
    }

    /// Liquid enthalpy [BTU/lbm].
    pub fn liquid_enthalpy(&self, t_f: f64, p_psia: f64) -> f64 {
        self.liquid_node(t_f, p_psia).enthalpy
    }

    /// Specific heat [BTU/(lbm·°F)].
    pub fn specific_heat(&self, t_f: f64, p_psia: f64) -> f64 {
        self.liquid_node(t_f, p_psia).cp
    }

    /// Volumetric expansion coefficient at constant pressure [1/°F].
    pub fn expansion_coefficient(&self, t_f: f64, p_psia: f64) -> f64 {
        self.liquid_node(t_f, p_psia).beta
    }

    /// Isothermal compressibility [1/psi].
    pub fn isothermal_compressibility(&self, t_f: f64, p_psia: f64) -> f64 {
        self.liquid_node(t_f, p_psia).kappa
    }
}
