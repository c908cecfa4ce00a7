//! CoolProp water via `rfluids`.

use crate::error::{WaterError, WaterResult};
use crate::source::{LiquidState, SaturatedState, WaterSource, validation};
use rcs_core::units::{
    density_from_si, enthalpy_from_si, f_to_kelvin, pascal_to_psia, psia_to_pascal,
    specific_heat_from_si,
};
use rfluids::prelude::*;
use rfluids::substance::Pure;

/// CoolProp (Helmholtz-energy) light water.
///
/// Thread-safe: each query builds its own `Fluid`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoolPropWater;

impl CoolPropWater {
    pub fn new() -> Self {
        Self
    }

    fn saturated_phase(&self, t_k: f64, quality: f64) -> WaterResult<Fluid> {
        Fluid::from(Pure::Water)
            .in_state(FluidInput::temperature(t_k), FluidInput::quality(quality))
            .map_err(|e| WaterError::Backend {
                message: format!("rfluids error at T={t_k} K, Q={quality}: {e}"),
            })
    }

    fn fluid_at_pt(&self, p_pa: f64, t_k: f64) -> WaterResult<Fluid> {
        Fluid::from(Pure::Water)
            .in_state(FluidInput::pressure(p_pa), FluidInput::temperature(t_k))
            .map_err(|e| WaterError::Backend {
                message: format!("rfluids error at P={p_pa} Pa, T={t_k} K: {e}"),
            })
    }
}

fn backend<E: std::fmt::Display>(what: &'static str) -> impl Fn(E) -> WaterError {
    move |e| WaterError::Backend {
        message: format!("rfluids error getting {what}: {e}"),
    }
}

impl WaterSource for CoolPropWater {
    fn name(&self) -> &str {
        "CoolProp"
    }

    fn saturated(&self, t_f: f64) -> WaterResult<SaturatedState> {
        let t_k = f_to_kelvin(t_f);
        let mut liquid = self.saturated_phase(t_k, 0.0)?;
        let mut vapour = self.saturated_phase(t_k, 1.0)?;
        validation::saturated(SaturatedState {
            t_f,
            p_psia: pascal_to_psia(liquid.pressure().map_err(backend("pressure"))?),
            rho_f: density_from_si(liquid.density().map_err(backend("density"))?),
            rho_g: density_from_si(vapour.density().map_err(backend("density"))?),
            h_f: enthalpy_from_si(liquid.enthalpy().map_err(backend("enthalpy"))?),
            h_g: enthalpy_from_si(vapour.enthalpy().map_err(backend("enthalpy"))?),
        })
    }

    fn liquid(&self, t_f: f64, p_psia: f64) -> WaterResult<LiquidState> {
        let mut fluid = self.fluid_at_pt(psia_to_pascal(p_psia), f_to_kelvin(t_f))?;
        validation::liquid(LiquidState {
            density: density_from_si(fluid.density().map_err(backend("density"))?),
            enthalpy: enthalpy_from_si(fluid.enthalpy().map_err(backend("enthalpy"))?),
            cp: specific_heat_from_si(fluid.specific_heat().map_err(backend("cp"))?),
        })
    }
}
