//! Primary-system state, control modes and per-tick inputs.

use crate::config::PlantConfig;
use crate::error::{SimError, SimResult};
use crate::ledger::{ComponentMasses, MassInventory};
use rcs_controls::{ActuatorState, DwellTimer, PIControllerState, RateState, TransportDelay};
use rcs_core::units::ATMOSPHERIC_PSIA;
use rcs_water::WaterTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Solid-pressurizer control policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolidMode {
    PreheaterCharging,
    HeaterPressurize,
    HoldSolid,
    IsolatedNoFlow,
}

/// Bubble-formation phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BubblePhase {
    Detection,
    Drain,
    Stabilize,
    Pressurize,
    Complete,
}

/// Exactly one control mode is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    Solid(SolidMode),
    Bubble(BubblePhase),
}

impl ControlMode {
    /// True once a steam space is being modelled (past detection).
    pub fn has_steam_space(&self) -> bool {
        match self {
            ControlMode::Solid(_) => false,
            ControlMode::Bubble(BubblePhase::Detection) => false,
            ControlMode::Bubble(_) => true,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Solid(m) => write!(f, "Solid::{m:?}"),
            ControlMode::Bubble(p) => write!(f, "Bubble::{p:?}"),
        }
    }
}

/// Which model produced this tick's pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureModel {
    SolidCompressibility,
    SaturationEquilibrium,
    CoupledBlend,
    CoupledEquilibrium,
    CoupledFallback,
}

/// Letdown trim actuator chain: PI → lag/slew → transport delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorChannel {
    pub pi: PIControllerState,
    /// PI (or open-loop) command before the actuator [gpm]
    pub raw_command: f64,
    pub actuator: ActuatorState,
    pub delay: TransportDelay,
    /// Output of the transport delay this tick [gpm]
    pub delayed: f64,
    pub windup_inhibited: bool,
}

impl ActuatorChannel {
    pub fn new(delay: TransportDelay) -> Self {
        Self {
            pi: PIControllerState::default(),
            raw_command: 0.0,
            actuator: ActuatorState::default(),
            delay,
            delayed: 0.0,
            windup_inhibited: false,
        }
    }

    /// Zero every stage and return the delay to priming.
    pub fn suppress(&mut self) {
        self.pi = PIControllerState::default();
        self.raw_command = 0.0;
        self.actuator = ActuatorState::default();
        self.delay.reset();
        self.delayed = 0.0;
        self.windup_inhibited = false;
    }
}

/// Solid-controller memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidControlState {
    pub filtered_pressure: f64,
    pub rate: RateState,
    pub channel: ActuatorChannel,
    pub handoff_dwell: DwellTimer,
    pub hold_dwell: DwellTimer,
}

/// Bubble state-machine memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleControlState {
    /// Consecutive ticks the trigger has held during detection.
    pub confirmations: u32,
    pub level_pi: PIControllerState,
    pub stabilize_dwell: DwellTimer,
    /// Time spent in Stabilize [s]
    pub stabilize_elapsed_s: f64,
}

/// Initial conditions at construction / reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    pub pressure_psia: f64,
    pub rcs_temperature_f: f64,
    pub pzr_temperature_f: f64,
    pub vct_mass_lbm: f64,
    pub holdup_mass_lbm: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            pressure_psia: 365.0,
            rcs_temperature_f: 100.0,
            pzr_temperature_f: 100.0,
            vct_mass_lbm: 20_000.0,
            holdup_mass_lbm: 0.0,
        }
    }
}

impl InitialConditions {
    pub fn validate(&self) -> SimResult<()> {
        let checks = [
            (self.pressure_psia, "initial pressure"),
            (self.rcs_temperature_f, "initial RCS temperature"),
            (self.pzr_temperature_f, "initial PZR temperature"),
        ];
        for (value, what) in checks {
            if !value.is_finite() {
                return Err(SimError::InvalidConfig {
                    what,
                    detail: format!("must be finite, got {value}"),
                });
            }
        }
        if self.pressure_psia < ATMOSPHERIC_PSIA {
            return Err(SimError::InvalidConfig {
                what: "initial pressure",
                detail: format!("{} psia is below atmospheric", self.pressure_psia),
            });
        }
        if !(self.vct_mass_lbm >= 0.0 && self.holdup_mass_lbm >= 0.0) {
            return Err(SimError::InvalidConfig {
                what: "initial tank inventory",
                detail: "VCT and holdup masses must be non-negative".into(),
            });
        }
        Ok(())
    }

    /// A water-solid start needs both volumes below saturation.
    pub fn check_subcooled(&self, water: &WaterTable) -> SimResult<()> {
        let t_sat = water.saturation_temperature(self.pressure_psia);
        if self.pzr_temperature_f > t_sat || self.rcs_temperature_f > t_sat {
            return Err(SimError::NonPhysical {
                what: "initial water above saturation at the initial pressure",
            });
        }
        Ok(())
    }

    /// Solid, water-full masses at these conditions.
    pub fn component_masses(&self, cfg: &PlantConfig, water: &WaterTable) -> ComponentMasses {
        let p = self.pressure_psia;
        ComponentMasses {
            rcs_water: water.liquid_density(self.rcs_temperature_f, p) * cfg.geometry.rcs_volume_ft3,
            pzr_water: water.liquid_density(self.pzr_temperature_f, p) * cfg.geometry.pzr_volume_ft3,
            pzr_steam: 0.0,
            vct: self.vct_mass_lbm,
            holdup: self.holdup_mass_lbm,
        }
    }
}

/// Operator and external commands for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInputs {
    pub heater_kw: f64,
    pub charging_gpm: f64,
    pub letdown_gpm: f64,
    /// Forced-flow fraction α ∈ [0, 1]
    pub alpha: f64,
}

impl TickInputs {
    /// Clamp to physical ranges; non-finite values become zero.
    pub fn sanitized(&self) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            heater_kw: finite(self.heater_kw).max(0.0),
            charging_gpm: finite(self.charging_gpm).max(0.0),
            letdown_gpm: finite(self.letdown_gpm).max(0.0),
            alpha: finite(self.alpha).clamp(0.0, 1.0),
        }
    }
}

/// Non-fatal conditions raised during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticFlags {
    pub pressure_floor_clamped: bool,
    pub negative_mass_clamped: bool,
    pub boundary_clamped: bool,
    pub audit_violation: bool,
    pub delay_priming: bool,
    pub windup_inhibited: bool,
    pub envelope_clamped: bool,
    /// Letdown held shut on low pressurizer level
    pub letdown_isolated: bool,
    /// Letdown reduced so outsurge could refill the RCS
    pub letdown_limited: bool,
}

/// The single owned state of the primary system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimarySystemState {
    pub tick: u64,
    pub time_s: f64,
    pub pressure_psia: f64,
    pub pzr_temperature_f: f64,
    pub rcs_temperature_f: f64,
    pub inventory: MassInventory,
    pub control_mode: ControlMode,
    pub pressure_model: PressureModel,
    pub heater_effective_kw: f64,
    pub bubble_formed: bool,
    pub relief_open: bool,
    pub solid: SolidControlState,
    pub bubble: BubbleControlState,
    /// Last pressure accepted from a converged coupled solve [psia]
    pub last_converged_pressure: Option<f64>,
    /// Previous tick's pressure rate [psi/hr]
    pub pressure_rate_psi_hr: f64,
}
