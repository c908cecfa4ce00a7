//! Bubble formation: trigger detection, the two-phase pressurizer energy
//! balance and the drain/stabilize/pressurize state machine.
//!
//! Once a steam space exists the pressurizer is one saturated mixture at a
//! single temperature. Each tick its total energy (fluid plus wall) is
//! updated with heater input, losses and surge enthalpy, then the mixture
//! temperature is solved at fixed volume. Pressure is `Psat(T)`; flashing
//! and condensation fall out of the solve.

use crate::config::{BubbleConfig, PlantConfig};
use crate::error::SimResult;
use crate::heat::{HeatFlows, mix_temperature};
use crate::ledger::{BoundaryFlow, ComponentMasses};
use crate::relief::ReliefFlow;
use crate::state::{BubbleControlState, BubblePhase};
use rcs_controls::{Action, DwellTimer, PIController, PIControllerState};
use rcs_core::units::gpm_to_ft3;
use rcs_water::{SaturationProperties, T_MAX_F, T_MIN_F, WaterTable};
use tracing::{debug, warn};

/// Half-width of the temperature bracket searched each tick [°F].
const SOLVE_BRACKET_F: f64 = 60.0;
const SOLVE_TOL_F: f64 = 1e-9;
const SOLVE_MAX_ITER: usize = 200;

/// True when the pressurizer is hot enough to start a bubble at `pressure`.
pub fn bubble_trigger(cfg: &BubbleConfig, water: &WaterTable, t_pzr: f64, pressure: f64) -> bool {
    t_pzr >= water.saturation_temperature(pressure) - cfg.saturation_margin_f && t_pzr >= cfg.min_bubble_temp_f
}

/// Saturated pressurizer contents at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PzrEquilibrium {
    pub t_f: f64,
    pub p_psia: f64,
    pub water_lbm: f64,
    pub steam_lbm: f64,
    /// Static quality used for the split (clamped to [0, 1])
    pub quality: f64,
    /// Liquid volume over vessel volume; above 1 when the liquid overfills
    pub level: f64,
    pub steam_volume_ft3: f64,
    /// Solution hit the temperature bracket or the envelope
    pub bracket_clamped: bool,
}

/// Internal energy of the pressurizer fluid plus wall [BTU].
pub fn pzr_energy(water: &WaterTable, water_lbm: f64, steam_lbm: f64, t_f: f64, wall_capacity: f64) -> f64 {
    let sat = SaturationProperties::at(water, t_f);
    water_lbm * sat.u_f() + steam_lbm * sat.u_g() + wall_capacity * t_f
}

fn split(water: &WaterTable, mass: f64, volume: f64, t_f: f64) -> (SaturationProperties, f64) {
    let sat = SaturationProperties::at(water, t_f);
    let x = if mass > 0.0 {
        sat.quality_from_volume(volume / mass).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (sat, x)
}

fn energy_residual(water: &WaterTable, mass: f64, energy: f64, volume: f64, wall: f64, t_f: f64) -> f64 {
    let (sat, x) = split(water, mass, volume, t_f);
    mass * sat.mixture_energy(x) + wall * t_f - energy
}

/// Solve the saturated mixture temperature for total `mass`, `energy` and
/// fixed `volume`, searching within ±60 °F of `t_guess`.
///
/// The residual is monotone in temperature (both `u_f` and the static
/// quality rise with T), so bisection always converges inside the bracket.
pub fn solve_equilibrium(
    water: &WaterTable,
    mass: f64,
    energy: f64,
    volume: f64,
    wall: f64,
    t_guess: f64,
) -> PzrEquilibrium {
    let residual = |t: f64| energy_residual(water, mass, energy, volume, wall, t);
    let mut lo = (t_guess - SOLVE_BRACKET_F).max(T_MIN_F);
    let mut hi = (t_guess + SOLVE_BRACKET_F).min(T_MAX_F);
    let mut bracket_clamped = false;

    let t = if residual(lo) >= 0.0 {
        bracket_clamped = true;
        lo
    } else if residual(hi) <= 0.0 {
        bracket_clamped = true;
        hi
    } else {
        for _ in 0..SOLVE_MAX_ITER {
            if hi - lo < SOLVE_TOL_F {
                break;
            }
            let mid = 0.5 * (lo + hi);
            if residual(mid) > 0.0 {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        0.5 * (lo + hi)
    };

    let (sat, x) = split(water, mass, volume, t);
    let steam = mass * x;
    let liquid = mass - steam;
    PzrEquilibrium {
        t_f: t,
        p_psia: sat.p_psia,
        water_lbm: liquid,
        steam_lbm: steam,
        quality: x,
        level: liquid * sat.v_f() / volume,
        steam_volume_ft3: steam * sat.v_g(),
        bracket_clamped,
    }
}

/// Inputs to one isolated two-phase tick.
#[derive(Debug, Clone, Copy)]
pub struct TwoPhaseInputs<'a> {
    pub pressure: f64,
    pub t_pzr: f64,
    pub t_rcs: f64,
    pub masses: &'a ComponentMasses,
    pub heater_kw: f64,
    pub alpha: f64,
    pub charging_gpm: f64,
    pub letdown_gpm: f64,
    /// Relief valve state; discharge comes from the steam space
    pub relief: ReliefFlow,
}

/// Result of one isolated two-phase tick. Nothing here has been applied yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPhasePhysics {
    pub equilibrium: PzrEquilibrium,
    /// RCS temperature after conduction, before outsurge mixing
    pub t_rcs_conducted: f64,
    pub t_rcs: f64,
    /// RCS mass after boundary flows, before surge [lbm]
    pub rcs_mass_after_boundary: f64,
    /// RCS → PZR [lbm]; negative for outsurge
    pub surge_lbm: f64,
    /// PZR water → steam [lbm]; negative for condensation
    pub evaporation_lbm: f64,
    pub boundary: BoundaryFlow,
    /// Letdown after any cut for an emptying pressurizer [gpm]
    pub letdown_gpm: f64,
    /// Letdown was cut so the RCS stays water-full
    pub letdown_limited: bool,
    pub surge_clamped: bool,
}

/// Advance the isolated (no forced flow coupling) two-phase pressurizer.
///
/// The RCS stays water-full at the previous pressure; whatever mass it
/// cannot hold surges into the pressurizer, and any shortfall is drawn out.
/// Relief discharges saturated steam from the steam space, so the RCS never
/// loses water through the valve. When the shortfall exceeds the
/// pressurizer water, letdown is cut first; only what remains is clamped.
pub fn two_phase_physics(
    cfg: &PlantConfig,
    water: &WaterTable,
    input: TwoPhaseInputs<'_>,
    dt: f64,
) -> TwoPhasePhysics {
    let g = &cfg.geometry;
    let wall = cfg.thermal.pzr_wall_capacity_btu_per_f;
    let m = input.masses;

    let q = HeatFlows::compute(&cfg.thermal, input.heater_kw, input.alpha, input.t_pzr, input.t_rcs, dt);
    let cp_rcs = water.specific_heat(input.t_rcs, input.pressure);
    let c_rcs = m.rcs_water * cp_rcs + cfg.thermal.rcs_metal_capacity_btu_per_f;
    let t_rcs_conducted = if c_rcs > 0.0 {
        (input.t_rcs + q.rcs_net() / c_rcs).clamp(T_MIN_F, T_MAX_F)
    } else {
        input.t_rcs
    };

    let rho_boundary = water.liquid_density(input.t_rcs, input.pressure);
    let to_mass = |gpm: f64| gpm_to_ft3(gpm, dt) * rho_boundary;
    let steam_relief = input
        .relief
        .steam_lbm(&cfg.relief, dt)
        .clamp(0.0, m.pzr_steam.max(0.0));
    let mut boundary = BoundaryFlow {
        charging_lbm: to_mass(input.charging_gpm),
        letdown_lbm: to_mass(input.letdown_gpm),
        relief_lbm: 0.0,
        steam_relief_lbm: steam_relief,
    };
    let mut rcs_mass_after_boundary = m.rcs_water + boundary.rcs_net_inflow();
    let rcs_required = water.liquid_density(t_rcs_conducted, input.pressure) * g.rcs_volume_ft3;

    let mut surge = rcs_mass_after_boundary - rcs_required;
    let mut letdown_gpm = input.letdown_gpm;
    let mut letdown_limited = false;
    let mut surge_clamped = false;
    if surge < -m.pzr_water {
        let shortfall = -m.pzr_water - surge;
        let cut = shortfall.min(boundary.letdown_lbm);
        if cut > 0.0 {
            letdown_gpm *= (boundary.letdown_lbm - cut) / boundary.letdown_lbm;
            boundary.letdown_lbm -= cut;
            rcs_mass_after_boundary += cut;
            letdown_limited = true;
        }
        surge = -m.pzr_water;
        surge_clamped = cut < shortfall;
    }

    let sat_now = SaturationProperties::at(water, input.t_pzr);
    let surge_enthalpy = if surge >= 0.0 {
        surge * water.liquid_enthalpy(t_rcs_conducted, input.pressure)
    } else {
        surge * sat_now.h_f
    };
    let energy = pzr_energy(water, m.pzr_water, m.pzr_steam, input.t_pzr, wall) + q.pzr_net() + surge_enthalpy
        - steam_relief * sat_now.h_g;
    let mass = m.pzr_total() - steam_relief + surge;
    let equilibrium = solve_equilibrium(water, mass, energy, g.pzr_volume_ft3, wall, input.t_pzr);

    let t_rcs = if surge < 0.0 {
        mix_temperature(t_rcs_conducted, c_rcs, input.t_pzr, -surge * cp_rcs)
    } else {
        t_rcs_conducted
    };

    TwoPhasePhysics {
        equilibrium,
        t_rcs_conducted,
        t_rcs,
        rcs_mass_after_boundary,
        surge_lbm: surge,
        evaporation_lbm: equilibrium.steam_lbm - (m.pzr_steam - steam_relief),
        boundary,
        letdown_gpm,
        letdown_limited,
        surge_clamped,
    }
}

/// Bubble-phase letdown policy and transitions.
#[derive(Debug, Clone)]
pub struct BubbleController {
    cfg: BubbleConfig,
    level_pi: PIController,
}

impl BubbleController {
    pub fn new(cfg: &BubbleConfig) -> SimResult<Self> {
        let level_pi = PIController::new(
            cfg.level_kp_gpm_per_pct,
            cfg.level_ti_s,
            -cfg.level_trim_gpm,
            cfg.level_trim_gpm,
        )?
        .with_action(Action::Direct);
        Ok(Self {
            cfg: cfg.clone(),
            level_pi,
        })
    }

    pub fn config(&self) -> &BubbleConfig {
        &self.cfg
    }

    pub fn initial_state(&self) -> BubbleControlState {
        BubbleControlState {
            confirmations: 0,
            level_pi: PIControllerState::default(),
            stabilize_dwell: DwellTimer::new(self.cfg.stabilize_dwell_s),
            stabilize_elapsed_s: 0.0,
        }
    }

    /// Pressurizer level low enough that letdown must stay shut.
    pub fn letdown_isolated(&self, phase: BubblePhase, level: f64) -> bool {
        phase != BubblePhase::Detection && level < self.cfg.letdown_isolation_level
    }

    /// Letdown for this tick [gpm]. Zero while isolated on low level.
    pub fn letdown(
        &self,
        phase: BubblePhase,
        st: &mut BubbleControlState,
        level: f64,
        letdown_base: f64,
        dt: f64,
    ) -> f64 {
        let trim = match phase {
            BubblePhase::Detection => 0.0,
            BubblePhase::Drain => self.cfg.drain_boost_gpm,
            BubblePhase::Stabilize | BubblePhase::Pressurize | BubblePhase::Complete => {
                let (next, out) =
                    self.level_pi
                        .update(&st.level_pi, level * 100.0, self.cfg.level_target * 100.0, dt);
                st.level_pi = next;
                out
            }
        };
        if self.letdown_isolated(phase, level) {
            return 0.0;
        }
        (letdown_base + trim).max(0.0)
    }

    /// Phase after this tick's physics.
    pub fn advance(
        &self,
        phase: BubblePhase,
        st: &mut BubbleControlState,
        level: f64,
        pressure: f64,
        rate_psi_hr: f64,
        dt: f64,
    ) -> BubblePhase {
        let next = match phase {
            BubblePhase::Detection => BubblePhase::Detection,
            BubblePhase::Drain => {
                if level <= self.cfg.level_target {
                    if rate_psi_hr.abs() > self.cfg.drain_exit_rate_advisory_psi_hr {
                        warn!(
                            rate_psi_hr,
                            band = self.cfg.drain_exit_rate_advisory_psi_hr,
                            "drain complete with pressure still moving"
                        );
                    }
                    st.stabilize_dwell.reset();
                    st.stabilize_elapsed_s = 0.0;
                    st.level_pi = PIControllerState::default();
                    BubblePhase::Stabilize
                } else {
                    BubblePhase::Drain
                }
            }
            BubblePhase::Stabilize => {
                st.stabilize_elapsed_s += dt;
                let settled = rate_psi_hr.abs() <= self.cfg.stabilize_rate_band_psi_hr;
                if st.stabilize_dwell.update(settled, dt) {
                    BubblePhase::Pressurize
                } else if st.stabilize_elapsed_s >= self.cfg.stabilize_max_s {
                    warn!(
                        elapsed_s = st.stabilize_elapsed_s,
                        rate_psi_hr, "pressure did not settle; proceeding to pressurize"
                    );
                    BubblePhase::Pressurize
                } else {
                    BubblePhase::Stabilize
                }
            }
            BubblePhase::Pressurize => {
                let level_ok = (level - self.cfg.level_target).abs() <= self.cfg.level_tolerance;
                if pressure >= self.cfg.min_rcp_pressure_psia && level_ok {
                    BubblePhase::Complete
                } else {
                    BubblePhase::Pressurize
                }
            }
            BubblePhase::Complete => BubblePhase::Complete,
        };
        if next != phase {
            debug!(from = ?phase, to = ?next, level, pressure, "bubble phase change");
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InitialConditions;

    fn table() -> &'static WaterTable {
        rcs_water::water_table().unwrap()
    }

    #[test]
    fn trigger_needs_both_conditions() {
        let cfg = BubbleConfig::default();
        let w = table();
        assert!(bubble_trigger(&cfg, w, 436.0, 365.0));
        assert!(!bubble_trigger(&cfg, w, 400.0, 365.0));
        // Saturated at low pressure but below the absolute minimum.
        assert!(!bubble_trigger(&cfg, w, 200.0, 11.5));
    }

    #[test]
    fn equilibrium_recovers_state() {
        let w = table();
        let volume = 1800.0;
        let t = 450.0;
        let sat = SaturationProperties::at(w, t);
        let water = 0.5 * volume * sat.rho_f;
        let steam = 0.5 * volume * sat.rho_g;
        let energy = pzr_energy(w, water, steam, t, 24_000.0);
        let eq = solve_equilibrium(w, water + steam, energy, volume, 24_000.0, t + 10.0);
        assert!((eq.t_f - t).abs() < 1e-6, "t = {}", eq.t_f);
        assert!((eq.steam_lbm - steam).abs() < 1e-3);
        assert!((eq.level - 0.5).abs() < 1e-6);
        assert!((eq.p_psia - w.saturation_pressure(t)).abs() < 1e-6);
    }

    #[test]
    fn heating_a_mixture_raises_pressure_and_boils() {
        let w = table();
        let volume = 1800.0;
        let t = 436.0;
        let sat = SaturationProperties::at(w, t);
        let water = 0.6 * volume * sat.rho_f;
        let steam = 0.4 * volume * sat.rho_g;
        let energy = pzr_energy(w, water, steam, t, 24_000.0) + 100_000.0;
        let eq = solve_equilibrium(w, water + steam, energy, volume, 24_000.0, t);
        assert!(eq.t_f > t);
        assert!(eq.p_psia > sat.p_psia);
        assert!((eq.water_lbm + eq.steam_lbm - (water + steam)).abs() < 1e-6);
    }

    /// Saturated PZR at `t_pzr` and `level`, RCS water-full at `t_rcs`.
    fn plant_masses(cfg: &PlantConfig, t_pzr: f64, t_rcs: f64, level: f64) -> ComponentMasses {
        let w = table();
        let sat = SaturationProperties::at(w, t_pzr);
        let v = cfg.geometry.pzr_volume_ft3;
        ComponentMasses {
            rcs_water: w.liquid_density(t_rcs, sat.p_psia) * cfg.geometry.rcs_volume_ft3,
            pzr_water: level * v * sat.rho_f,
            pzr_steam: (1.0 - level) * v * sat.rho_g,
            ..InitialConditions::default().component_masses(cfg, w)
        }
    }

    #[test]
    fn open_relief_vents_steam_and_lowers_pressure() {
        let cfg = PlantConfig::default();
        let w = table();
        let masses = plant_masses(&cfg, 456.0, 120.0, 0.25);
        let p = w.saturation_pressure(456.0);
        let input = |fraction: f64| TwoPhaseInputs {
            pressure: p,
            t_pzr: 456.0,
            t_rcs: 120.0,
            masses: &masses,
            heater_kw: 1800.0,
            alpha: 0.0,
            charging_gpm: 75.0,
            letdown_gpm: 75.0,
            relief: ReliefFlow {
                fraction,
                gpm: 0.0,
                open: fraction > 0.0,
            },
        };
        let shut = two_phase_physics(&cfg, w, input(0.0), 10.0);
        let open = two_phase_physics(&cfg, w, input(1.0), 10.0);

        assert_eq!(shut.boundary.steam_relief_lbm, 0.0);
        let vented = cfg.relief.steam_capacity_lbm_per_s * 10.0;
        assert!((open.boundary.steam_relief_lbm - vented).abs() < 1e-9);
        // Nothing leaves the RCS through the valve.
        assert_eq!(open.boundary.relief_lbm, 0.0);
        assert_eq!(open.rcs_mass_after_boundary, shut.rcs_mass_after_boundary);
        assert!(open.equilibrium.p_psia < shut.equilibrium.p_psia);
        // Flashing replaces part of the vented steam.
        assert!(open.evaporation_lbm > shut.evaporation_lbm);
        let pzr_after = open.equilibrium.water_lbm + open.equilibrium.steam_lbm;
        assert!((pzr_after - (masses.pzr_total() - vented + open.surge_lbm)).abs() < 1e-6);
    }

    #[test]
    fn emptying_pressurizer_cuts_letdown_before_clamping() {
        let cfg = PlantConfig::default();
        let w = table();
        let mut masses = plant_masses(&cfg, 456.0, 120.0, 0.25);
        masses.pzr_water = 50.0;
        let input = TwoPhaseInputs {
            pressure: w.saturation_pressure(456.0),
            t_pzr: 456.0,
            t_rcs: 120.0,
            masses: &masses,
            heater_kw: 0.0,
            alpha: 0.0,
            charging_gpm: 0.0,
            letdown_gpm: 120.0,
            relief: ReliefFlow::default(),
        };
        let out = two_phase_physics(&cfg, w, input, 10.0);
        assert!(out.letdown_limited);
        assert!(!out.surge_clamped);
        assert!(out.letdown_gpm < 120.0 && out.letdown_gpm > 0.0);
        assert!((out.surge_lbm + 50.0).abs() < 1e-6);
        let required = w.liquid_density(out.t_rcs_conducted, input.pressure) * cfg.geometry.rcs_volume_ft3;
        assert!((out.rcs_mass_after_boundary - out.surge_lbm - required).abs() < 1e-6);
    }

    #[test]
    fn low_level_isolates_letdown() {
        let ctl = BubbleController::new(&BubbleConfig::default()).unwrap();
        let mut st = ctl.initial_state();
        assert!(ctl.letdown_isolated(BubblePhase::Pressurize, 0.10));
        assert!(!ctl.letdown_isolated(BubblePhase::Detection, 0.10));
        assert_eq!(ctl.letdown(BubblePhase::Pressurize, &mut st, 0.10, 75.0, 10.0), 0.0);
        assert!(ctl.letdown(BubblePhase::Pressurize, &mut st, 0.20, 75.0, 10.0) > 0.0);
    }

    #[test]
    fn overfilled_vessel_has_no_steam() {
        let w = table();
        let volume = 1800.0;
        let t = 436.0;
        let sat = SaturationProperties::at(w, t);
        let water = 1.01 * volume * sat.rho_f;
        let energy = pzr_energy(w, water, 0.0, t, 0.0);
        let eq = solve_equilibrium(w, water, energy, volume, 0.0, t);
        assert_eq!(eq.steam_lbm, 0.0);
        assert!(eq.level > 1.0);
        assert!((eq.t_f - t).abs() < 1e-6);
    }

    #[test]
    fn drain_boosts_letdown() {
        let ctl = BubbleController::new(&BubbleConfig::default()).unwrap();
        let mut st = ctl.initial_state();
        let ld = ctl.letdown(BubblePhase::Drain, &mut st, 0.9, 75.0, 10.0);
        assert_eq!(ld, 75.0 + 45.0);
    }

    #[test]
    fn level_trim_direction() {
        let ctl = BubbleController::new(&BubbleConfig::default()).unwrap();
        let mut st = ctl.initial_state();
        let high = ctl.letdown(BubblePhase::Pressurize, &mut st, 0.35, 75.0, 10.0);
        let mut st = ctl.initial_state();
        let low = ctl.letdown(BubblePhase::Pressurize, &mut st, 0.15, 75.0, 10.0);
        assert!(high > 75.0);
        assert!(low < 75.0);
    }

    #[test]
    fn drain_exits_at_target() {
        let ctl = BubbleController::new(&BubbleConfig::default()).unwrap();
        let mut st = ctl.initial_state();
        assert_eq!(ctl.advance(BubblePhase::Drain, &mut st, 0.5, 400.0, 0.0, 10.0), BubblePhase::Drain);
        assert_eq!(
            ctl.advance(BubblePhase::Drain, &mut st, 0.24, 400.0, 0.0, 10.0),
            BubblePhase::Stabilize
        );
    }

    #[test]
    fn stabilize_falls_back_after_max_time() {
        let ctl = BubbleController::new(&BubbleConfig::default()).unwrap();
        let mut st = ctl.initial_state();
        let mut phase = BubblePhase::Stabilize;
        let mut ticks = 0;
        while phase == BubblePhase::Stabilize {
            phase = ctl.advance(phase, &mut st, 0.25, 380.0, 500.0, 10.0);
            ticks += 1;
        }
        assert_eq!(phase, BubblePhase::Pressurize);
        assert_eq!(ticks, 180);
    }

    #[test]
    fn pressurize_completes_with_pressure_and_level() {
        let ctl = BubbleController::new(&BubbleConfig::default()).unwrap();
        let mut st = ctl.initial_state();
        assert_eq!(
            ctl.advance(BubblePhase::Pressurize, &mut st, 0.25, 390.0, 0.0, 10.0),
            BubblePhase::Pressurize
        );
        assert_eq!(
            ctl.advance(BubblePhase::Pressurize, &mut st, 0.50, 410.0, 0.0, 10.0),
            BubblePhase::Pressurize
        );
        assert_eq!(
            ctl.advance(BubblePhase::Pressurize, &mut st, 0.27, 410.0, 0.0, 10.0),
            BubblePhase::Complete
        );
    }
}
