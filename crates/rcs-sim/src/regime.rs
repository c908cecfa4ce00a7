//! Regime selector and tick driver.
//!
//! [`PrimarySystem`] owns the state and runs each tick in a fixed order:
//!
//! 1. sanitise inputs
//! 2. dispatch physics by control mode and forced-flow fraction; physics
//!    returns a plan and never touches the mass inventory
//! 3. apply the boundary flows to the ledger (once)
//! 4. apply internal transfers (surge, phase change)
//! 5. audit
//! 6. commit and publish a snapshot

use crate::bubble::{BubbleController, TwoPhaseInputs, bubble_trigger, two_phase_physics};
use crate::config::PlantConfig;
use crate::coupled::{
    CoupledInputs, SolverReport, SolverStatus, linear_pressure_estimate, solve_coupled, surge_at,
};
use crate::error::{SimError, SimResult};
use crate::events::{TransitionEvent, clamp_pressure_floor};
use crate::heat::heater_step;
use crate::ledger::{AuditReport, BoundaryFlow, InternalTransfer, MassInventory};
use crate::relief::{ReliefFlow, relief_flow};
use crate::snapshot::Snapshot;
use crate::solid::{SolidController, SolidInputs, solid_physics};
use crate::state::{
    BubblePhase, ControlMode, DiagnosticFlags, InitialConditions, PressureModel, PrimarySystemState,
    SolidMode, TickInputs,
};
use rcs_core::units::{SECONDS_PER_HOUR, ft3_to_gpm, psia_to_psig};
use rcs_water::{P_MAX_PSIA, T_MAX_F, T_MIN_F, WaterTable};
use tracing::{debug, info, warn};

/// Physics result for one tick, not yet applied to the inventory.
#[derive(Debug, Clone, Copy)]
struct TickPlan {
    pressure: f64,
    t_pzr: f64,
    t_rcs: f64,
    mode: ControlMode,
    model: PressureModel,
    boundary: BoundaryFlow,
    /// RCS → PZR [lbm]
    surge_lbm: f64,
    /// PZR water → steam [lbm]
    evaporation_lbm: f64,
    charging_gpm: f64,
    letdown_demand_gpm: f64,
    letdown_gpm: f64,
    /// Water-solid relief discharge [gpm]
    relief_gpm: f64,
    bubble_formed: bool,
    solver: Option<SolverReport>,
    converged_pressure: Option<f64>,
    flags: DiagnosticFlags,
}

/// The primary-coolant system: state plus the controllers that act on it.
#[derive(Debug, Clone)]
pub struct PrimarySystem {
    config: PlantConfig,
    water: &'static WaterTable,
    dt_s: f64,
    initial: InitialConditions,
    solid_ctl: SolidController,
    bubble_ctl: BubbleController,
    state: PrimarySystemState,
    transitions: Vec<TransitionEvent>,
    last_snapshot: Option<Snapshot>,
}

impl PrimarySystem {
    /// Validate the configuration and build a cold, water-solid plant.
    pub fn new(config: PlantConfig, initial: InitialConditions) -> SimResult<Self> {
        config.validate()?;
        initial.validate()?;
        let water = rcs_water::water_table()?;
        let solid_ctl = SolidController::new(&config.solid)?;
        let bubble_ctl = BubbleController::new(&config.bubble)?;
        let state = build_state(&config, water, &initial, &solid_ctl, &bubble_ctl)?;
        debug!(
            pressure = initial.pressure_psia,
            mode = %state.control_mode,
            ledger = state.inventory.ledger_total(),
            water = water.backend(),
            "primary system initialised"
        );
        Ok(Self {
            dt_s: config.dt_seconds(),
            config,
            water,
            initial,
            solid_ctl,
            bubble_ctl,
            state,
            transitions: Vec::new(),
            last_snapshot: None,
        })
    }

    /// Return to the initial conditions given at construction.
    pub fn reset(&mut self) -> SimResult<()> {
        let initial = self.initial.clone();
        self.reinitialize(initial)
    }

    /// Rebuild the state from new initial conditions.
    pub fn reinitialize(&mut self, initial: InitialConditions) -> SimResult<()> {
        initial.validate()?;
        self.state = build_state(&self.config, self.water, &initial, &self.solid_ctl, &self.bubble_ctl)?;
        self.initial = initial;
        self.transitions.clear();
        self.last_snapshot = None;
        Ok(())
    }

    pub fn config(&self) -> &PlantConfig {
        &self.config
    }

    pub fn state(&self) -> &PrimarySystemState {
        &self.state
    }

    pub fn dt_seconds(&self) -> f64 {
        self.dt_s
    }

    /// Mode and pressure-model changes recorded so far.
    pub fn transitions(&self) -> &[TransitionEvent] {
        &self.transitions
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// Diagnostics: force the pressurizer temperature. Masses are untouched.
    pub fn override_pzr_temperature(&mut self, t_f: f64) -> SimResult<()> {
        if !t_f.is_finite() {
            return Err(SimError::InvalidArg {
                what: "override temperature must be finite",
            });
        }
        warn!(from = self.state.pzr_temperature_f, to = t_f, "PZR temperature overridden");
        self.state.pzr_temperature_f = t_f.clamp(T_MIN_F, T_MAX_F);
        Ok(())
    }

    /// Diagnostics: force the system pressure. Masses are untouched.
    pub fn override_pressure(&mut self, p_psia: f64) -> SimResult<()> {
        if !p_psia.is_finite() || p_psia <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "override pressure must be finite and positive",
            });
        }
        warn!(from = self.state.pressure_psia, to = p_psia, "pressure overridden");
        self.state.pressure_psia = p_psia.min(P_MAX_PSIA);
        Ok(())
    }

    /// Advance one fixed timestep.
    pub fn step(&mut self, inputs: &TickInputs) -> SimResult<Snapshot> {
        let inputs = inputs.sanitized();
        let dt = self.dt_s;
        let tick = self.state.tick + 1;
        let p0 = self.state.pressure_psia;
        let mode0 = self.state.control_mode;
        let model0 = self.state.pressure_model;

        let relief = relief_flow(&self.config.relief, psia_to_psig(p0), self.state.relief_open);
        let heater = heater_step(&self.config.thermal, self.state.heater_effective_kw, inputs.heater_kw, dt);

        let plan = match mode0 {
            ControlMode::Solid(mode) => self.plan_solid(mode, &inputs, relief, heater),
            ControlMode::Bubble(BubblePhase::Detection) => self.plan_detection(&inputs, relief, heater),
            ControlMode::Bubble(phase) => {
                if inputs.alpha > self.config.coupled.alpha_epsilon {
                    self.plan_coupled(phase, &inputs, relief, heater)
                } else {
                    self.plan_two_phase(phase, &inputs, relief, heater)
                }
            }
        };

        let mut flags = plan.flags;
        let applied = self.state.inventory.apply_boundary_flow(tick, &plan.boundary)?;
        if applied.clamped {
            flags.boundary_clamped = true;
            warn!(tick, "boundary flow limited by available inventory");
        }
        let was_isolated = self
            .last_snapshot
            .as_ref()
            .is_some_and(|snap| snap.flags.letdown_isolated);
        if flags.letdown_isolated && !was_isolated {
            warn!(tick, level = self.current_level(), "letdown isolated on low pressurizer level");
        }
        if flags.letdown_limited {
            warn!(
                tick,
                requested_gpm = plan.letdown_demand_gpm,
                applied_gpm = plan.letdown_gpm,
                "letdown cut to keep the RCS water-full"
            );
        }

        let (surge_moved, surge_clamped) = self
            .state
            .inventory
            .apply_internal(InternalTransfer::Surge { lbm: plan.surge_lbm });
        let (_, phase_clamped) = self
            .state
            .inventory
            .apply_internal(InternalTransfer::PhaseChange {
                lbm: plan.evaporation_lbm,
            });
        if surge_clamped || phase_clamped {
            flags.negative_mass_clamped = true;
            warn!(tick, surge_clamped, phase_clamped, "internal transfer limited to keep masses non-negative");
        }

        let audit = self.state.inventory.audit(self.config.audit_tolerance_lbm);
        if !audit.ok {
            flags.audit_violation = true;
            warn!(
                tick,
                residual = audit.residual,
                independent_residual = audit.independent_residual,
                plant_residual = audit.plant_residual,
                regime = %plan.mode,
                "mass audit violation"
            );
        }

        let s = &mut self.state;
        s.tick = tick;
        s.time_s = tick as f64 * dt;
        s.pressure_psia = plan.pressure;
        s.pzr_temperature_f = plan.t_pzr;
        s.rcs_temperature_f = plan.t_rcs;
        s.control_mode = plan.mode;
        s.pressure_model = plan.model;
        s.heater_effective_kw = heater;
        s.bubble_formed = plan.bubble_formed;
        s.relief_open = relief.open;
        s.pressure_rate_psi_hr = (plan.pressure - p0) / dt * SECONDS_PER_HOUR;
        // Only a converged solve on the immediately preceding tick may seed a fallback.
        s.last_converged_pressure = plan.converged_pressure;

        if plan.mode != mode0 || plan.model != model0 {
            let event = TransitionEvent {
                tick,
                from_mode: mode0,
                to_mode: plan.mode,
                from_model: model0,
                to_model: plan.model,
                pressure_before: p0,
                pressure_after: plan.pressure,
            };
            debug!(
                tick,
                from = %mode0,
                to = %plan.mode,
                model = ?plan.model,
                jump_psi = event.pressure_jump(),
                "regime transition"
            );
            self.transitions.push(event);
        }

        let snapshot = self.publish(&inputs, &plan, applied.flow.relief_total(), surge_moved, audit, flags);
        self.last_snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn plan_solid(&mut self, mode: SolidMode, inputs: &TickInputs, relief: ReliefFlow, heater: f64) -> TickPlan {
        let mut plan = self.solid_plan(mode, inputs, relief, heater);
        if plan.bubble_formed {
            self.state.bubble.confirmations = 1;
            info!(
                tick = self.state.tick + 1,
                t_pzr = plan.t_pzr,
                pressure = plan.pressure,
                "bubble trigger; entering detection"
            );
            plan.mode = ControlMode::Bubble(BubblePhase::Detection);
        }
        plan
    }

    /// Detection runs solid physics under HoldSolid control until the trigger
    /// has held for the confirmation count.
    fn plan_detection(&mut self, inputs: &TickInputs, relief: ReliefFlow, heater: f64) -> TickPlan {
        let mut plan = self.solid_plan(SolidMode::HoldSolid, inputs, relief, heater);
        let confirm_ticks = self.bubble_ctl.config().confirm_ticks;
        if plan.bubble_formed {
            let confirmations = self.state.bubble.confirmations + 1;
            if confirmations >= confirm_ticks {
                info!(confirmations, "bubble confirmed; draining");
                self.state.bubble = self.bubble_ctl.initial_state();
                plan.mode = ControlMode::Bubble(BubblePhase::Drain);
            } else {
                self.state.bubble.confirmations = confirmations;
                plan.mode = ControlMode::Bubble(BubblePhase::Detection);
            }
        } else {
            info!(
                t_pzr = plan.t_pzr,
                pressure = plan.pressure,
                "bubble detection lapsed; back to solid hold"
            );
            self.state.bubble.confirmations = 0;
            plan.mode = ControlMode::Solid(SolidMode::HoldSolid);
        }
        plan
    }

    /// Solid control and compressibility physics. `bubble_formed` carries the
    /// trigger result; the caller decides the mode.
    fn solid_plan(&mut self, mode: SolidMode, inputs: &TickInputs, relief: ReliefFlow, heater: f64) -> TickPlan {
        let dt = self.dt_s;
        let p0 = self.state.pressure_psia;
        let cmd = self.solid_ctl.update(
            mode,
            &mut self.state.solid,
            p0,
            inputs.charging_gpm,
            inputs.letdown_gpm,
            dt,
        );
        let phys = solid_physics(
            &self.config,
            self.water,
            SolidInputs {
                pressure: p0,
                t_pzr: self.state.pzr_temperature_f,
                t_rcs: self.state.rcs_temperature_f,
                masses: self.state.inventory.components(),
                heater_kw: heater,
                alpha: inputs.alpha,
                charging_gpm: cmd.charging_gpm,
                letdown_gpm: cmd.letdown_gpm,
                relief_gpm: relief.gpm,
            },
            dt,
        );
        let triggered = bubble_trigger(&self.config.bubble, self.water, phys.t_pzr, phys.pressure);

        let channel = &self.state.solid.channel;
        TickPlan {
            pressure: phys.pressure,
            t_pzr: phys.t_pzr,
            t_rcs: phys.t_rcs,
            mode: ControlMode::Solid(cmd.mode),
            model: PressureModel::SolidCompressibility,
            boundary: phys.boundary,
            surge_lbm: phys.surge_lbm,
            evaporation_lbm: 0.0,
            charging_gpm: cmd.charging_gpm,
            letdown_demand_gpm: cmd.letdown_demand_gpm,
            letdown_gpm: cmd.letdown_gpm,
            relief_gpm: relief.gpm,
            bubble_formed: triggered,
            solver: None,
            converged_pressure: None,
            flags: DiagnosticFlags {
                pressure_floor_clamped: phys.floor_clamped,
                envelope_clamped: phys.envelope_clamped,
                delay_priming: !channel.delay.is_primed() && !channel.delay.is_empty(),
                windup_inhibited: channel.windup_inhibited,
                ..DiagnosticFlags::default()
            },
        }
    }

    fn plan_two_phase(&mut self, phase: BubblePhase, inputs: &TickInputs, relief: ReliefFlow, heater: f64) -> TickPlan {
        let dt = self.dt_s;
        let p0 = self.state.pressure_psia;
        let level = self.current_level();
        let letdown = self
            .bubble_ctl
            .letdown(phase, &mut self.state.bubble, level, inputs.letdown_gpm, dt);
        let phys = two_phase_physics(
            &self.config,
            self.water,
            TwoPhaseInputs {
                pressure: p0,
                t_pzr: self.state.pzr_temperature_f,
                t_rcs: self.state.rcs_temperature_f,
                masses: self.state.inventory.components(),
                heater_kw: heater,
                alpha: inputs.alpha,
                charging_gpm: inputs.charging_gpm,
                letdown_gpm: letdown,
                relief,
            },
            dt,
        );
        let eq = phys.equilibrium;
        let rate = (eq.p_psia - p0) / dt * SECONDS_PER_HOUR;
        let next = self
            .bubble_ctl
            .advance(phase, &mut self.state.bubble, eq.level, eq.p_psia, rate, dt);

        TickPlan {
            pressure: eq.p_psia,
            t_pzr: eq.t_f,
            t_rcs: phys.t_rcs,
            mode: ControlMode::Bubble(next),
            model: PressureModel::SaturationEquilibrium,
            boundary: phys.boundary,
            surge_lbm: phys.surge_lbm,
            evaporation_lbm: phys.evaporation_lbm,
            charging_gpm: inputs.charging_gpm,
            letdown_demand_gpm: letdown,
            letdown_gpm: phys.letdown_gpm,
            relief_gpm: 0.0,
            bubble_formed: true,
            solver: None,
            converged_pressure: None,
            flags: DiagnosticFlags {
                envelope_clamped: eq.bracket_clamped,
                negative_mass_clamped: phys.surge_clamped,
                letdown_isolated: self.bubble_ctl.letdown_isolated(phase, level),
                letdown_limited: phys.letdown_limited,
                ..DiagnosticFlags::default()
            },
        }
    }

    /// Forced flow with a steam space: blend the isolated two-phase result
    /// with the coupled equilibrium by α.
    fn plan_coupled(&mut self, phase: BubblePhase, inputs: &TickInputs, relief: ReliefFlow, heater: f64) -> TickPlan {
        let dt = self.dt_s;
        let p0 = self.state.pressure_psia;
        let t_pzr0 = self.state.pzr_temperature_f;
        let masses = *self.state.inventory.components();
        let level = self.current_level();
        let letdown = self
            .bubble_ctl
            .letdown(phase, &mut self.state.bubble, level, inputs.letdown_gpm, dt);
        let iso = two_phase_physics(
            &self.config,
            self.water,
            TwoPhaseInputs {
                pressure: p0,
                t_pzr: t_pzr0,
                t_rcs: self.state.rcs_temperature_f,
                masses: &masses,
                heater_kw: heater,
                alpha: inputs.alpha,
                charging_gpm: inputs.charging_gpm,
                letdown_gpm: letdown,
                relief,
            },
            dt,
        );
        let eq = iso.equilibrium;

        let coupled_input = CoupledInputs {
            rcs_mass_lbm: iso.rcs_mass_after_boundary,
            pzr_water_lbm: masses.pzr_water - iso.evaporation_lbm,
            steam_lbm: masses.pzr_steam - iso.boundary.steam_relief_lbm + iso.evaporation_lbm,
            t_rcs: iso.t_rcs_conducted,
            t_pzr: eq.t_f,
            rcs_volume_ft3: self.config.geometry.rcs_volume_ft3,
            pzr_volume_ft3: self.config.geometry.pzr_volume_ft3,
            seed_psia: linear_pressure_estimate(self.water, p0, t_pzr0, eq.t_f),
        };
        let solution = solve_coupled(&self.config.coupled, self.water, &coupled_input);
        let alpha = inputs.alpha;
        let full = alpha >= self.config.coupled.alpha_full;

        let (p_cpl, surge_cpl, converged, model) = match solution.report.status {
            SolverStatus::Converged => {
                let model = if full {
                    PressureModel::CoupledEquilibrium
                } else {
                    PressureModel::CoupledBlend
                };
                (solution.pressure, solution.surge_lbm, Some(solution.pressure), model)
            }
            SolverStatus::MaxIterations | SolverStatus::Degenerate => {
                // Continue the coupled branch from last tick's solve when there
                // was one, otherwise from the linear estimate.
                let fallback = match self.state.last_converged_pressure {
                    Some(base) => base + (coupled_input.seed_psia - p0),
                    None => coupled_input.seed_psia,
                };
                warn!(
                    status = ?solution.report.status,
                    iterations = solution.report.iterations,
                    residual_lbm = solution.report.residual_lbm,
                    fallback,
                    "coupled solve did not converge; using linear estimate"
                );
                (
                    fallback,
                    surge_at(self.water, &coupled_input, fallback),
                    None,
                    PressureModel::CoupledFallback,
                )
            }
        };

        let (pressure, surge) = if full {
            (p_cpl, surge_cpl)
        } else {
            (
                (1.0 - alpha) * eq.p_psia + alpha * p_cpl,
                (1.0 - alpha) * iso.surge_lbm + alpha * surge_cpl,
            )
        };
        let (pressure, floor_clamped) =
            clamp_pressure_floor(pressure, self.config.diagnostics.allow_subatmospheric);

        let water_after = masses.pzr_water - iso.evaporation_lbm + surge;
        let level_after =
            water_after.max(0.0) / self.water.liquid_density(eq.t_f, pressure) / self.config.geometry.pzr_volume_ft3;
        let rate = (pressure - p0) / dt * SECONDS_PER_HOUR;
        let next = self
            .bubble_ctl
            .advance(phase, &mut self.state.bubble, level_after, pressure, rate, dt);

        TickPlan {
            pressure,
            t_pzr: eq.t_f,
            t_rcs: iso.t_rcs,
            mode: ControlMode::Bubble(next),
            model,
            boundary: iso.boundary,
            surge_lbm: surge,
            evaporation_lbm: iso.evaporation_lbm,
            charging_gpm: inputs.charging_gpm,
            letdown_demand_gpm: letdown,
            letdown_gpm: iso.letdown_gpm,
            relief_gpm: 0.0,
            bubble_formed: true,
            solver: Some(solution.report),
            converged_pressure: converged,
            flags: DiagnosticFlags {
                pressure_floor_clamped: floor_clamped,
                envelope_clamped: eq.bracket_clamped,
                negative_mass_clamped: iso.surge_clamped,
                letdown_isolated: self.bubble_ctl.letdown_isolated(phase, level),
                letdown_limited: iso.letdown_limited,
                ..DiagnosticFlags::default()
            },
        }
    }

    /// PZR liquid volume over vessel volume, from the current masses.
    fn current_level(&self) -> f64 {
        let m = self.state.inventory.components();
        let rho = self
            .water
            .liquid_density(self.state.pzr_temperature_f, self.state.pressure_psia);
        m.pzr_water / rho / self.config.geometry.pzr_volume_ft3
    }

    fn publish(
        &self,
        inputs: &TickInputs,
        plan: &TickPlan,
        relief_lbm: f64,
        surge_moved: f64,
        audit: AuditReport,
        flags: DiagnosticFlags,
    ) -> Snapshot {
        let s = &self.state;
        let masses = *s.inventory.components();
        let p = s.pressure_psia;
        let t_sat = self.water.saturation_temperature(p);
        let steam_volume = if masses.pzr_steam > 0.0 {
            masses.pzr_steam / self.water.saturated_vapor_density_at_pressure(p)
        } else {
            0.0
        };
        let surge_ft3 = surge_moved / self.water.liquid_density(s.rcs_temperature_f, p);
        Snapshot {
            tick: s.tick,
            time_s: s.time_s,
            pressure_psia: p,
            pzr_temperature_f: s.pzr_temperature_f,
            rcs_temperature_f: s.rcs_temperature_f,
            t_sat_f: t_sat,
            subcooling_f: t_sat - s.rcs_temperature_f,
            control_mode: s.control_mode,
            pressure_model: s.pressure_model,
            masses,
            ledger_total_lbm: s.inventory.ledger_total(),
            audit,
            pzr_level: self.current_level(),
            steam_volume_ft3: steam_volume,
            heater_kw: s.heater_effective_kw,
            charging_gpm: plan.charging_gpm,
            letdown_demand_gpm: plan.letdown_demand_gpm,
            letdown_gpm: plan.letdown_gpm,
            relief_gpm: plan.relief_gpm,
            relief_lbm,
            surge_gpm: ft3_to_gpm(surge_ft3, self.dt_s),
            alpha: inputs.alpha,
            bubble_formed: s.bubble_formed,
            solver: plan.solver,
            flags,
        }
    }
}

fn build_state(
    config: &PlantConfig,
    water: &WaterTable,
    initial: &InitialConditions,
    solid_ctl: &SolidController,
    bubble_ctl: &BubbleController,
) -> SimResult<PrimarySystemState> {
    let p = initial.pressure_psia;
    initial.check_subcooled(water)?;
    Ok(PrimarySystemState {
        tick: 0,
        time_s: 0.0,
        pressure_psia: p,
        pzr_temperature_f: initial.pzr_temperature_f.clamp(T_MIN_F, T_MAX_F),
        rcs_temperature_f: initial.rcs_temperature_f.clamp(T_MIN_F, T_MAX_F),
        inventory: MassInventory::new(initial.component_masses(config, water))?,
        control_mode: ControlMode::Solid(solid_ctl.initial_mode(p)),
        pressure_model: PressureModel::SolidCompressibility,
        heater_effective_kw: 0.0,
        bubble_formed: false,
        relief_open: false,
        solid: solid_ctl.initial_state(p, config.dt_seconds())?,
        bubble: bubble_ctl.initial_state(),
        last_converged_pressure: None,
        pressure_rate_psi_hr: 0.0,
    })
}
