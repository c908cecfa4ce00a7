//! Coupled equilibrium solver for forced-flow operation.
//!
//! With the reactor coolant pumps running, RCS and pressurizer share one
//! pressure set by the steam cushion. For a trial pressure the RCS liquid
//! density fixes how much water surges into the pressurizer, which fixes the
//! pressurizer liquid volume and so the steam space; the steam already in
//! the pressurizer must fill that space at `ρg(P)`. Newton iteration drives
//! the steam-mass residual to zero.

use crate::config::CoupledConfig;
use rcs_water::{P_MAX_PSIA, P_MIN_PSIA, WaterTable};
use serde::{Deserialize, Serialize};

/// Largest pressure correction per iteration [psi].
const MAX_STEP_PSI: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    Converged,
    MaxIterations,
    /// No steam cushion, or a non-positive/non-finite derivative.
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverReport {
    pub status: SolverStatus,
    pub iterations: u32,
    /// Steam mass residual at the returned pressure [lbm]
    pub residual_lbm: f64,
    /// Last pressure correction [psi]
    pub last_step_psi: f64,
}

/// State entering the coupled solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoupledInputs {
    /// RCS mass after this tick's boundary flows, before surge [lbm]
    pub rcs_mass_lbm: f64,
    /// PZR water after evaporation, before surge [lbm]
    pub pzr_water_lbm: f64,
    /// PZR steam after relief and evaporation [lbm]
    pub steam_lbm: f64,
    pub t_rcs: f64,
    pub t_pzr: f64,
    pub rcs_volume_ft3: f64,
    pub pzr_volume_ft3: f64,
    /// Starting pressure [psia]
    pub seed_psia: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoupledSolution {
    pub pressure: f64,
    /// RCS → PZR [lbm]
    pub surge_lbm: f64,
    pub report: SolverReport,
}

/// Linear steam-cushion estimate: previous pressure moved along the
/// saturation slope by this tick's pressurizer temperature change.
pub fn linear_pressure_estimate(water: &WaterTable, p_prev: f64, t_pzr_prev: f64, t_pzr_new: f64) -> f64 {
    (p_prev + water.saturation_slope(t_pzr_prev) * (t_pzr_new - t_pzr_prev)).clamp(P_MIN_PSIA, P_MAX_PSIA)
}

/// Surge that leaves the RCS exactly water-full at pressure `p`.
pub fn surge_at(water: &WaterTable, input: &CoupledInputs, p: f64) -> f64 {
    input.rcs_mass_lbm - water.liquid_density(input.t_rcs, p) * input.rcs_volume_ft3
}

struct Evaluation {
    residual: f64,
    derivative: f64,
}

fn evaluate(water: &WaterTable, input: &CoupledInputs, p: f64) -> Evaluation {
    let rho_rcs = water.liquid_density(input.t_rcs, p);
    let kappa_rcs = water.isothermal_compressibility(input.t_rcs, p);
    let rho_pw = water.liquid_density(input.t_pzr, p);
    let kappa_pw = water.isothermal_compressibility(input.t_pzr, p);

    let liquid = input.pzr_water_lbm + surge_at(water, input, p);
    let v_liquid = liquid / rho_pw;
    let v_steam = input.pzr_volume_ft3 - v_liquid;
    let rho_g = water.saturated_vapor_density_at_pressure(p);

    let h = (1e-4 * p).max(0.05);
    let drho_g = (water.saturated_vapor_density_at_pressure(p + h)
        - water.saturated_vapor_density_at_pressure(p - h))
        / (2.0 * h);
    // d(steam space)/dP: RCS compression pushes water in, PZR liquid compresses.
    let dv_steam = input.rcs_volume_ft3 * (rho_rcs / rho_pw) * kappa_rcs + v_liquid * kappa_pw;

    Evaluation {
        residual: input.steam_lbm - rho_g * v_steam,
        derivative: drho_g * v_steam + rho_g * dv_steam,
    }
}

/// Newton solve for the shared pressure. Never fails: non-convergence is
/// reported in the returned status.
pub fn solve_coupled(cfg: &CoupledConfig, water: &WaterTable, input: &CoupledInputs) -> CoupledSolution {
    let mut p = input.seed_psia.clamp(P_MIN_PSIA, P_MAX_PSIA);
    let finish = |p: f64, status: SolverStatus, iterations: u32, residual_lbm: f64, last_step_psi: f64| {
        CoupledSolution {
            pressure: p,
            surge_lbm: surge_at(water, input, p),
            report: SolverReport {
                status,
                iterations,
                residual_lbm,
                last_step_psi,
            },
        }
    };

    if input.steam_lbm < cfg.min_steam_lbm {
        return finish(p, SolverStatus::Degenerate, 0, input.steam_lbm, 0.0);
    }

    let mut last_step = 0.0;
    let mut residual = f64::INFINITY;
    for iteration in 1..=cfg.max_iterations {
        let eval = evaluate(water, input, p);
        residual = eval.residual;
        if !(eval.derivative.is_finite() && eval.derivative > 0.0 && residual.is_finite()) {
            return finish(p, SolverStatus::Degenerate, iteration, residual, last_step);
        }
        let step = (residual / eval.derivative).clamp(-MAX_STEP_PSI, MAX_STEP_PSI);
        let next = (p + step).clamp(P_MIN_PSIA, P_MAX_PSIA);
        last_step = next - p;
        p = next;
        if last_step.abs() < cfg.pressure_tol_psi && residual.abs() < cfg.mass_tol_lbm {
            return finish(p, SolverStatus::Converged, iteration, residual, last_step);
        }
    }
    finish(p, SolverStatus::MaxIterations, cfg.max_iterations, residual, last_step)
}
