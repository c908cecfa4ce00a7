//! Plant configuration.
//!
//! All values are fixed at construction. [`PlantConfig::default`] describes a
//! four-loop reference plant; scenario files override individual fields.

use crate::error::{SimError, SimResult};
use rcs_core::numeric::{ensure_in_range, ensure_positive};
use rcs_core::units::SECONDS_PER_HOUR;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// Fixed timestep [hr].
    pub dt_hours: f64,
    pub geometry: Geometry,
    pub thermal: ThermalConfig,
    pub solid: SolidControlConfig,
    pub relief: ReliefConfig,
    pub bubble: BubbleConfig,
    pub coupled: CoupledConfig,
    /// Allowed |ledger − Σ components| before an audit violation [lbm].
    pub audit_tolerance_lbm: f64,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// RCS water volume excluding the pressurizer [ft³]
    pub rcs_volume_ft3: f64,
    /// Pressurizer internal volume [ft³]
    pub pzr_volume_ft3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Pressurizer wall heat capacity [BTU/°F]
    pub pzr_wall_capacity_btu_per_f: f64,
    /// RCS metal heat capacity [BTU/°F]
    pub rcs_metal_capacity_btu_per_f: f64,
    pub heater_max_kw: f64,
    /// Heater first-order lag [s]
    pub heater_tau_s: f64,
    /// Surge-line natural-convection conductance [BTU/(hr·°F)]
    pub surge_line_ua: f64,
    /// Pressurizer insulation loss conductance [BTU/(hr·°F)]
    pub pzr_loss_ua: f64,
    /// RCS insulation loss conductance [BTU/(hr·°F)]
    pub rcs_loss_ua: f64,
    /// Ambient reference below which insulation losses are zero [°F]
    pub ambient_f: f64,
    /// RCP heat input at full forced flow [kW]
    pub rcp_heat_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidControlConfig {
    pub setpoint_psia: f64,
    /// Error clamp applied before the PI [psi]
    pub control_band_psi: f64,
    /// Pressure above which heater pressurization takes over [psia]
    pub handoff_psia: f64,
    pub handoff_dwell_s: f64,
    /// |error| band for entering HoldSolid [psi]
    pub hold_band_psi: f64,
    pub hold_dwell_s: f64,
    /// Drop below setpoint that leaves HoldSolid [psi]
    pub hold_exit_margin_psi: f64,
    /// Pressure measurement filter [s]
    pub pressure_filter_tau_s: f64,
    /// Proportional gain [gpm/psi]
    pub kp_gpm_per_psi: f64,
    /// Integral time [s]
    pub ti_s: f64,
    /// Trim limit while heater-pressurizing [gpm]
    pub pressurize_trim_gpm: f64,
    /// Trim limit while holding solid [gpm]
    pub hold_trim_gpm: f64,
    pub actuator_tau_s: f64,
    /// Actuator slew limit [gpm/s]
    pub actuator_slew_gpm_per_s: f64,
    pub transport_delay_s: f64,
    /// |raw − delayed| above which integration is inhibited [gpm]
    pub deadtime_threshold_gpm: f64,
    /// Open-loop preheater trim vs filtered pressure rate: (psi/hr, gpm)
    pub preheater_trim: Vec<(f64, f64)>,
    pub rate_filter_tau_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefConfig {
    pub setpoint_psig: f64,
    /// Overpressure for full capacity [psi]
    pub accumulation_psi: f64,
    pub reseat_psig: f64,
    pub capacity_gpm: f64,
    /// Opening fraction held between reseat and setpoint once open
    pub min_open_fraction: f64,
    /// Full-open discharge from a steam space [lbm/s]
    pub steam_capacity_lbm_per_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    /// Trigger margin below Tsat(P) [°F]
    pub saturation_margin_f: f64,
    /// Minimum absolute PZR temperature for a bubble [°F]
    pub min_bubble_temp_f: f64,
    /// Consecutive confirming ticks before draining
    pub confirm_ticks: u32,
    pub drain_boost_gpm: f64,
    /// Target PZR level (fraction of volume)
    pub level_target: f64,
    pub level_tolerance: f64,
    /// |dP/dt| band for a settled pressure [psi/hr]
    pub stabilize_rate_band_psi_hr: f64,
    pub stabilize_dwell_s: f64,
    pub stabilize_max_s: f64,
    /// Pressure rate above which a drain exit is flagged [psi/hr]
    pub drain_exit_rate_advisory_psi_hr: f64,
    pub min_rcp_pressure_psia: f64,
    /// Level PI: gain [gpm per % level]
    pub level_kp_gpm_per_pct: f64,
    pub level_ti_s: f64,
    pub level_trim_gpm: f64,
    /// PZR level below which letdown is isolated once a bubble exists
    pub letdown_isolation_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoupledConfig {
    pub pressure_tol_psi: f64,
    pub mass_tol_lbm: f64,
    pub max_iterations: u32,
    /// α below this is treated as zero
    pub alpha_epsilon: f64,
    /// α at or above this is treated as fully coupled
    pub alpha_full: f64,
    /// Steam mass below which no cushion exists [lbm]
    pub min_steam_lbm: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Disable the atmospheric pressure floor (diagnostics only).
    pub allow_subatmospheric: bool,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            dt_hours: 1.0 / 360.0,
            geometry: Geometry::default(),
            thermal: ThermalConfig::default(),
            solid: SolidControlConfig::default(),
            relief: ReliefConfig::default(),
            bubble: BubbleConfig::default(),
            coupled: CoupledConfig::default(),
            audit_tolerance_lbm: 0.01,
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            rcs_volume_ft3: 11_500.0,
            pzr_volume_ft3: 1_800.0,
        }
    }
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            pzr_wall_capacity_btu_per_f: 24_000.0,
            rcs_metal_capacity_btu_per_f: 264_000.0,
            heater_max_kw: 1_800.0,
            heater_tau_s: 20.0,
            surge_line_ua: 500.0,
            pzr_loss_ua: 250.0,
            rcs_loss_ua: 3_000.0,
            ambient_f: 80.0,
            rcp_heat_kw: 21_000.0,
        }
    }
}

impl Default for SolidControlConfig {
    fn default() -> Self {
        Self {
            setpoint_psia: 365.0,
            control_band_psi: 30.0,
            handoff_psia: 325.0,
            handoff_dwell_s: 60.0,
            hold_band_psi: 5.0,
            hold_dwell_s: 120.0,
            hold_exit_margin_psi: 15.0,
            pressure_filter_tau_s: 5.0,
            kp_gpm_per_psi: 0.25,
            ti_s: 300.0,
            pressurize_trim_gpm: 20.0,
            hold_trim_gpm: 40.0,
            actuator_tau_s: 5.0,
            actuator_slew_gpm_per_s: 2.0,
            transport_delay_s: 20.0,
            deadtime_threshold_gpm: 5.0,
            preheater_trim: vec![(30.0, -10.0), (120.0, 10.0)],
            rate_filter_tau_s: 60.0,
        }
    }
}

impl Default for ReliefConfig {
    fn default() -> Self {
        Self {
            setpoint_psig: 450.0,
            accumulation_psi: 20.0,
            reseat_psig: 430.0,
            capacity_gpm: 480.0,
            min_open_fraction: 0.2,
            steam_capacity_lbm_per_s: 20.0,
        }
    }
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            saturation_margin_f: 1.0,
            min_bubble_temp_f: 212.0,
            confirm_ticks: 2,
            drain_boost_gpm: 45.0,
            level_target: 0.25,
            level_tolerance: 0.05,
            stabilize_rate_band_psi_hr: 60.0,
            stabilize_dwell_s: 300.0,
            stabilize_max_s: 1_800.0,
            drain_exit_rate_advisory_psi_hr: 200.0,
            min_rcp_pressure_psia: 400.0,
            level_kp_gpm_per_pct: 2.0,
            level_ti_s: 600.0,
            level_trim_gpm: 40.0,
            letdown_isolation_level: 0.12,
        }
    }
}

impl Default for CoupledConfig {
    fn default() -> Self {
        Self {
            pressure_tol_psi: 0.01,
            mass_tol_lbm: 0.5,
            max_iterations: 50,
            alpha_epsilon: 1e-6,
            alpha_full: 0.999,
            min_steam_lbm: 1.0,
        }
    }
}

fn positive(v: f64, what: &'static str) -> SimResult<()> {
    ensure_positive(v, what)?;
    Ok(())
}

fn non_negative(v: f64, what: &'static str) -> SimResult<()> {
    ensure_in_range(v, 0.0, f64::INFINITY, what)?;
    Ok(())
}

fn fraction(v: f64, what: &'static str) -> SimResult<()> {
    ensure_in_range(v, 0.0, 1.0, what)?;
    Ok(())
}

fn ordered(lo: f64, hi: f64, what: &'static str) -> SimResult<()> {
    if lo < hi {
        Ok(())
    } else {
        Err(SimError::InvalidConfig {
            what,
            detail: format!("expected {lo} < {hi}"),
        })
    }
}

impl PlantConfig {
    /// Timestep in seconds.
    pub fn dt_seconds(&self) -> f64 {
        self.dt_hours * SECONDS_PER_HOUR
    }

    /// Reject inconsistent or non-physical configuration.
    pub fn validate(&self) -> SimResult<()> {
        positive(self.dt_hours, "dt_hours")?;
        positive(self.audit_tolerance_lbm, "audit_tolerance_lbm")?;

        let g = &self.geometry;
        positive(g.rcs_volume_ft3, "geometry.rcs_volume_ft3")?;
        positive(g.pzr_volume_ft3, "geometry.pzr_volume_ft3")?;

        let t = &self.thermal;
        non_negative(t.pzr_wall_capacity_btu_per_f, "thermal.pzr_wall_capacity_btu_per_f")?;
        non_negative(t.rcs_metal_capacity_btu_per_f, "thermal.rcs_metal_capacity_btu_per_f")?;
        non_negative(t.heater_max_kw, "thermal.heater_max_kw")?;
        non_negative(t.heater_tau_s, "thermal.heater_tau_s")?;
        non_negative(t.surge_line_ua, "thermal.surge_line_ua")?;
        non_negative(t.pzr_loss_ua, "thermal.pzr_loss_ua")?;
        non_negative(t.rcs_loss_ua, "thermal.rcs_loss_ua")?;
        non_negative(t.rcp_heat_kw, "thermal.rcp_heat_kw")?;

        let s = &self.solid;
        positive(s.setpoint_psia, "solid.setpoint_psia")?;
        positive(s.control_band_psi, "solid.control_band_psi")?;
        ordered(s.handoff_psia, s.setpoint_psia, "solid.handoff_psia < solid.setpoint_psia")?;
        ordered(s.hold_band_psi, s.control_band_psi, "solid.hold_band_psi < solid.control_band_psi")?;
        positive(s.hold_band_psi, "solid.hold_band_psi")?;
        ordered(
            s.hold_band_psi,
            s.hold_exit_margin_psi,
            "solid.hold_band_psi < solid.hold_exit_margin_psi",
        )?;
        non_negative(s.handoff_dwell_s, "solid.handoff_dwell_s")?;
        non_negative(s.hold_dwell_s, "solid.hold_dwell_s")?;
        non_negative(s.pressure_filter_tau_s, "solid.pressure_filter_tau_s")?;
        positive(s.kp_gpm_per_psi, "solid.kp_gpm_per_psi")?;
        positive(s.ti_s, "solid.ti_s")?;
        positive(s.pressurize_trim_gpm, "solid.pressurize_trim_gpm")?;
        positive(s.hold_trim_gpm, "solid.hold_trim_gpm")?;
        non_negative(s.actuator_tau_s, "solid.actuator_tau_s")?;
        positive(s.actuator_slew_gpm_per_s, "solid.actuator_slew_gpm_per_s")?;
        non_negative(s.transport_delay_s, "solid.transport_delay_s")?;
        positive(s.deadtime_threshold_gpm, "solid.deadtime_threshold_gpm")?;
        non_negative(s.rate_filter_tau_s, "solid.rate_filter_tau_s")?;
        if s.preheater_trim.is_empty() {
            return Err(SimError::InvalidConfig {
                what: "solid.preheater_trim",
                detail: "table is empty".into(),
            });
        }
        for pair in s.preheater_trim.windows(2) {
            ordered(pair[0].0, pair[1].0, "solid.preheater_trim rates must increase")?;
        }

        let r = &self.relief;
        ordered(r.reseat_psig, r.setpoint_psig, "relief.reseat_psig < relief.setpoint_psig")?;
        positive(r.accumulation_psi, "relief.accumulation_psi")?;
        non_negative(r.capacity_gpm, "relief.capacity_gpm")?;
        fraction(r.min_open_fraction, "relief.min_open_fraction")?;
        positive(r.steam_capacity_lbm_per_s, "relief.steam_capacity_lbm_per_s")?;

        let b = &self.bubble;
        non_negative(b.saturation_margin_f, "bubble.saturation_margin_f")?;
        if b.confirm_ticks == 0 {
            return Err(SimError::InvalidConfig {
                what: "bubble.confirm_ticks",
                detail: "must be at least 1".into(),
            });
        }
        non_negative(b.drain_boost_gpm, "bubble.drain_boost_gpm")?;
        ordered(0.0, b.level_target, "bubble.level_target > 0")?;
        ordered(b.level_target, 1.0, "bubble.level_target < 1")?;
        positive(b.level_tolerance, "bubble.level_tolerance")?;
        positive(b.stabilize_rate_band_psi_hr, "bubble.stabilize_rate_band_psi_hr")?;
        non_negative(b.stabilize_dwell_s, "bubble.stabilize_dwell_s")?;
        ordered(
            b.stabilize_dwell_s,
            b.stabilize_max_s,
            "bubble.stabilize_dwell_s < bubble.stabilize_max_s",
        )?;
        positive(b.min_rcp_pressure_psia, "bubble.min_rcp_pressure_psia")?;
        positive(b.level_kp_gpm_per_pct, "bubble.level_kp_gpm_per_pct")?;
        positive(b.level_ti_s, "bubble.level_ti_s")?;
        positive(b.level_trim_gpm, "bubble.level_trim_gpm")?;
        fraction(b.letdown_isolation_level, "bubble.letdown_isolation_level")?;
        ordered(
            b.letdown_isolation_level,
            b.level_target - b.level_tolerance,
            "bubble.letdown_isolation_level below the level band",
        )?;

        let c = &self.coupled;
        positive(c.pressure_tol_psi, "coupled.pressure_tol_psi")?;
        positive(c.mass_tol_lbm, "coupled.mass_tol_lbm")?;
        if c.max_iterations == 0 {
            return Err(SimError::InvalidConfig {
                what: "coupled.max_iterations",
                detail: "must be at least 1".into(),
            });
        }
        positive(c.alpha_epsilon, "coupled.alpha_epsilon")?;
        ordered(c.alpha_epsilon, c.alpha_full, "coupled.alpha_epsilon < coupled.alpha_full")?;
        fraction(c.alpha_full, "coupled.alpha_full")?;
        non_negative(c.min_steam_lbm, "coupled.min_steam_lbm")?;

        Ok(())
    }
}
