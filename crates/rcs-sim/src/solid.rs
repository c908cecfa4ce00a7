//! Solid-pressurizer regime: letdown-trim pressure control and
//! compressibility-based pressure response.

use crate::config::{PlantConfig, SolidControlConfig};
use crate::error::SimResult;
use crate::events::clamp_pressure_floor;
use crate::heat::{HeatFlows, mix_temperature};
use crate::ledger::{BoundaryFlow, ComponentMasses};
use crate::state::{ActuatorChannel, SolidControlState, SolidMode};
use rcs_controls::{
    Action, DwellTimer, LagSlewActuator, LowPassFilter, PIController, RateEstimator, RateState,
    TransportDelay,
};
use rcs_core::numeric::interp_clamped;
use rcs_core::units::gpm_to_ft3;
use rcs_water::{LiquidProperties, T_MAX_F, T_MIN_F, WaterTable};
use tracing::debug;

/// Flows commanded by the solid controller this tick [gpm].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidCommand {
    pub mode: SolidMode,
    pub charging_gpm: f64,
    /// Base letdown plus the effective (pre-delay) trim
    pub letdown_demand_gpm: f64,
    /// Base letdown plus the delayed trim; what reaches the plant
    pub letdown_gpm: f64,
}

/// Letdown-trim pressure controller for the water-solid plant.
#[derive(Debug, Clone)]
pub struct SolidController {
    cfg: SolidControlConfig,
    pressurize_pi: PIController,
    hold_pi: PIController,
    actuator: LagSlewActuator,
    filter: LowPassFilter,
    rate: RateEstimator,
}

impl SolidController {
    pub fn new(cfg: &SolidControlConfig) -> SimResult<Self> {
        let pressurize_pi = PIController::new(
            cfg.kp_gpm_per_psi,
            cfg.ti_s,
            -cfg.pressurize_trim_gpm,
            cfg.pressurize_trim_gpm,
        )?
        .with_action(Action::Direct);
        let hold_pi = PIController::new(cfg.kp_gpm_per_psi, cfg.ti_s, -cfg.hold_trim_gpm, cfg.hold_trim_gpm)?
            .with_action(Action::Direct);
        let trim = cfg.hold_trim_gpm.max(cfg.pressurize_trim_gpm);
        Ok(Self {
            cfg: cfg.clone(),
            pressurize_pi,
            hold_pi,
            actuator: LagSlewActuator::new(cfg.actuator_tau_s, cfg.actuator_slew_gpm_per_s, -trim, trim)?,
            filter: LowPassFilter::new(cfg.pressure_filter_tau_s)?,
            rate: RateEstimator::new(cfg.rate_filter_tau_s)?,
        })
    }

    pub fn config(&self) -> &SolidControlConfig {
        &self.cfg
    }

    /// Mode at start-up. Isolation is decided per tick from the base flows.
    pub fn initial_mode(&self, pressure: f64) -> SolidMode {
        if pressure >= self.cfg.handoff_psia {
            SolidMode::HeaterPressurize
        } else {
            SolidMode::PreheaterCharging
        }
    }

    pub fn initial_state(&self, pressure: f64, dt_s: f64) -> SimResult<SolidControlState> {
        Ok(SolidControlState {
            filtered_pressure: pressure,
            rate: RateState::default(),
            channel: ActuatorChannel::new(TransportDelay::new(self.cfg.transport_delay_s, dt_s)?),
            handoff_dwell: DwellTimer::new(self.cfg.handoff_dwell_s),
            hold_dwell: DwellTimer::new(self.cfg.hold_dwell_s),
        })
    }

    /// Run one controller tick: measurement filtering, mode transitions,
    /// command generation and the actuator chain.
    pub fn update(
        &self,
        mode: SolidMode,
        st: &mut SolidControlState,
        pressure: f64,
        charging_base: f64,
        letdown_base: f64,
        dt: f64,
    ) -> SolidCommand {
        st.filtered_pressure = self.filter.apply(st.filtered_pressure, pressure, dt);
        st.rate = self.rate.update(&st.rate, st.filtered_pressure, dt);
        let pf = st.filtered_pressure;
        let sp = self.cfg.setpoint_psia;

        let next = self.transition(mode, st, pf, charging_base, letdown_base, dt);
        if next != mode {
            debug!(from = ?mode, to = ?next, pressure = pf, "solid control mode change");
        }

        let raw = match next {
            SolidMode::IsolatedNoFlow => {
                st.channel.suppress();
                return SolidCommand {
                    mode: next,
                    charging_gpm: 0.0,
                    letdown_demand_gpm: 0.0,
                    letdown_gpm: 0.0,
                };
            }
            SolidMode::PreheaterCharging => {
                st.channel.windup_inhibited = false;
                interp_clamped(&self.cfg.preheater_trim, st.rate.rate_per_hr)
            }
            SolidMode::HeaterPressurize | SolidMode::HoldSolid => {
                let pi = if next == SolidMode::HoldSolid {
                    &self.hold_pi
                } else {
                    &self.pressurize_pi
                };
                let band = self.cfg.control_band_psi;
                let pv = pf.clamp(sp - band, sp + band);
                let inhibit =
                    (st.channel.raw_command - st.channel.delayed).abs() > self.cfg.deadtime_threshold_gpm;
                let out = pi.update_inhibited(&st.channel.pi, pv, sp, dt, inhibit);
                st.channel.pi = out.state;
                st.channel.windup_inhibited = out.windup_inhibited;
                out.output
            }
        };

        let channel = &mut st.channel;
        channel.raw_command = raw;
        channel.actuator = self.actuator.step(&channel.actuator, dt, raw);
        let effective = channel.actuator.position;
        channel.delayed = channel.delay.push(effective);

        SolidCommand {
            mode: next,
            charging_gpm: charging_base,
            letdown_demand_gpm: (letdown_base + effective).max(0.0),
            letdown_gpm: (letdown_base + channel.delayed).max(0.0),
        }
    }

    fn transition(
        &self,
        mode: SolidMode,
        st: &mut SolidControlState,
        pf: f64,
        charging_base: f64,
        letdown_base: f64,
        dt: f64,
    ) -> SolidMode {
        let sp = self.cfg.setpoint_psia;
        let isolated = charging_base <= 0.0 && letdown_base <= 0.0;
        if isolated {
            return SolidMode::IsolatedNoFlow;
        }
        match mode {
            SolidMode::IsolatedNoFlow => {
                st.handoff_dwell.reset();
                st.hold_dwell.reset();
                if pf >= self.cfg.handoff_psia {
                    SolidMode::HeaterPressurize
                } else {
                    SolidMode::PreheaterCharging
                }
            }
            SolidMode::PreheaterCharging => {
                if st.handoff_dwell.update(pf >= self.cfg.handoff_psia, dt) {
                    // Bumpless: start the PI where the open-loop trim left off.
                    st.channel.pi = self
                        .pressurize_pi
                        .bumpless_state(st.channel.actuator.position, pf, sp);
                    st.hold_dwell.reset();
                    SolidMode::HeaterPressurize
                } else {
                    SolidMode::PreheaterCharging
                }
            }
            SolidMode::HeaterPressurize => {
                if st.hold_dwell.update((pf - sp).abs() <= self.cfg.hold_band_psi, dt) {
                    SolidMode::HoldSolid
                } else {
                    SolidMode::HeaterPressurize
                }
            }
            SolidMode::HoldSolid => {
                if pf < sp - self.cfg.hold_exit_margin_psi {
                    st.hold_dwell.reset();
                    SolidMode::HeaterPressurize
                } else {
                    SolidMode::HoldSolid
                }
            }
        }
    }
}

/// Inputs to one solid-physics tick.
#[derive(Debug, Clone, Copy)]
pub struct SolidInputs<'a> {
    pub pressure: f64,
    pub t_pzr: f64,
    pub t_rcs: f64,
    pub masses: &'a ComponentMasses,
    pub heater_kw: f64,
    pub alpha: f64,
    pub charging_gpm: f64,
    pub letdown_gpm: f64,
    pub relief_gpm: f64,
}

/// Result of one solid-physics tick. Nothing here has been applied yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidPhysics {
    pub pressure: f64,
    pub t_pzr: f64,
    pub t_rcs: f64,
    /// RCS → PZR mass [lbm]; negative for outsurge
    pub surge_lbm: f64,
    pub boundary: BoundaryFlow,
    pub floor_clamped: bool,
    pub envelope_clamped: bool,
}

/// Heat the water-solid system and integrate pressure from the volume
/// balance `ΔP = ΔV_net / Σ(V·κ)`.
pub fn solid_physics(cfg: &PlantConfig, water: &WaterTable, input: SolidInputs<'_>, dt: f64) -> SolidPhysics {
    let g = &cfg.geometry;
    let p = input.pressure;
    let pzr = LiquidProperties::at(water, input.t_pzr, p);
    let rcs = LiquidProperties::at(water, input.t_rcs, p);

    let q = HeatFlows::compute(&cfg.thermal, input.heater_kw, input.alpha, input.t_pzr, input.t_rcs, dt);
    let c_pzr = input.masses.pzr_water * pzr.cp + cfg.thermal.pzr_wall_capacity_btu_per_f;
    let c_rcs = input.masses.rcs_water * rcs.cp + cfg.thermal.rcs_metal_capacity_btu_per_f;
    let dt_pzr = if c_pzr > 0.0 { q.pzr_net() / c_pzr } else { 0.0 };
    let dt_rcs = if c_rcs > 0.0 { q.rcs_net() / c_rcs } else { 0.0 };

    let dv_pzr = pzr.beta * g.pzr_volume_ft3 * dt_pzr;
    let dv_rcs = rcs.beta * g.rcs_volume_ft3 * dt_rcs;
    // Expansion leaves the pressurizer at its pre-heating density.
    let surge_lbm = -dv_pzr * pzr.density;

    let mut t_pzr = input.t_pzr + dt_pzr;
    let mut t_rcs = input.t_rcs + dt_rcs;
    if surge_lbm < 0.0 {
        t_rcs = mix_temperature(t_rcs, c_rcs, t_pzr, -surge_lbm * pzr.cp);
    } else if surge_lbm > 0.0 {
        t_pzr = mix_temperature(t_pzr, c_pzr, t_rcs, surge_lbm * rcs.cp);
    }

    let to_mass = |gpm: f64| gpm_to_ft3(gpm, dt) * rcs.density;
    let boundary = BoundaryFlow {
        charging_lbm: to_mass(input.charging_gpm),
        letdown_lbm: to_mass(input.letdown_gpm),
        relief_lbm: to_mass(input.relief_gpm),
        steam_relief_lbm: 0.0,
    };
    let dv_removed = gpm_to_ft3(input.letdown_gpm + input.relief_gpm - input.charging_gpm, dt);
    let dv_net = dv_pzr + dv_rcs - dv_removed;
    let stiffness = g.pzr_volume_ft3 * pzr.kappa + g.rcs_volume_ft3 * rcs.kappa;
    let (pressure, floor_clamped) =
        clamp_pressure_floor(p + dv_net / stiffness, cfg.diagnostics.allow_subatmospheric);

    let envelope_clamped = !(T_MIN_F..=T_MAX_F).contains(&t_pzr) || !(T_MIN_F..=T_MAX_F).contains(&t_rcs);
    SolidPhysics {
        pressure,
        t_pzr: t_pzr.clamp(T_MIN_F, T_MAX_F),
        t_rcs: t_rcs.clamp(T_MIN_F, T_MAX_F),
        surge_lbm,
        boundary,
        floor_clamped,
        envelope_clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InitialConditions;

    fn controller() -> (SolidController, SolidControlState) {
        let cfg = SolidControlConfig::default();
        let ctl = SolidController::new(&cfg).unwrap();
        let st = ctl.initial_state(365.0, 10.0).unwrap();
        (ctl, st)
    }

    #[test]
    fn initial_mode_selection() {
        let (ctl, _) = controller();
        assert_eq!(ctl.initial_mode(365.0), SolidMode::HeaterPressurize);
        assert_eq!(ctl.initial_mode(300.0), SolidMode::PreheaterCharging);
    }

    #[test]
    fn high_pressure_raises_letdown_demand() {
        let (ctl, mut st) = controller();
        st.filtered_pressure = 395.0;
        let cmd = ctl.update(SolidMode::HeaterPressurize, &mut st, 395.0, 75.0, 75.0, 10.0);
        assert!(cmd.letdown_demand_gpm > 75.0);
        // Delay still priming: the plant sees only base letdown.
        assert_eq!(cmd.letdown_gpm, 75.0);
    }

    #[test]
    fn isolated_mode_suppresses_channel() {
        let (ctl, mut st) = controller();
        st.channel.pi.integral = 100.0;
        st.channel.delay.push(3.0);
        let cmd = ctl.update(SolidMode::HoldSolid, &mut st, 370.0, 0.0, 0.0, 10.0);
        assert_eq!(cmd.mode, SolidMode::IsolatedNoFlow);
        assert_eq!(cmd.letdown_gpm, 0.0);
        assert_eq!(st.channel.pi.integral, 0.0);
        assert!(!st.channel.delay.is_primed());
    }

    #[test]
    fn handoff_requires_dwell() {
        let (ctl, mut st) = controller();
        st.filtered_pressure = 330.0;
        let mut mode = SolidMode::PreheaterCharging;
        let mut ticks = 0;
        while mode == SolidMode::PreheaterCharging && ticks < 20 {
            mode = ctl.update(mode, &mut st, 330.0, 75.0, 75.0, 10.0).mode;
            ticks += 1;
        }
        assert_eq!(mode, SolidMode::HeaterPressurize);
        assert_eq!(ticks, 6);
    }

    #[test]
    fn heating_raises_pressure() {
        let cfg = PlantConfig::default();
        let water = rcs_water::water_table().unwrap();
        let masses = InitialConditions::default().component_masses(&cfg, water);
        let out = solid_physics(
            &cfg,
            water,
            SolidInputs {
                pressure: 365.0,
                t_pzr: 100.0,
                t_rcs: 100.0,
                masses: &masses,
                heater_kw: 1800.0,
                alpha: 0.0,
                charging_gpm: 75.0,
                letdown_gpm: 75.0,
                relief_gpm: 0.0,
            },
            10.0,
        );
        assert!(out.pressure > 365.5 && out.pressure < 367.0, "p = {}", out.pressure);
        assert!(out.t_pzr > 100.0);
        assert!(out.surge_lbm < 0.0);
        assert!(!out.floor_clamped);
    }

    #[test]
    fn pressure_floor_applies_unless_bypassed() {
        let mut cfg = PlantConfig::default();
        let water = rcs_water::water_table().unwrap();
        let masses = InitialConditions::default().component_masses(&cfg, water);
        let input = SolidInputs {
            pressure: 20.0,
            t_pzr: 100.0,
            t_rcs: 100.0,
            masses: &masses,
            heater_kw: 0.0,
            alpha: 0.0,
            charging_gpm: 0.0,
            letdown_gpm: 200.0,
            relief_gpm: 0.0,
        };
        let floored = solid_physics(&cfg, water, input, 10.0);
        assert!(floored.floor_clamped);
        assert_eq!(floored.pressure, rcs_core::units::ATMOSPHERIC_PSIA);

        cfg.diagnostics.allow_subatmospheric = true;
        let bypassed = solid_physics(&cfg, water, input, 10.0);
        assert!(!bypassed.floor_clamped);
        assert!(bypassed.pressure < rcs_core::units::ATMOSPHERIC_PSIA);
    }
}
