//! Read-only per-tick output.

use crate::coupled::SolverReport;
use crate::ledger::{AuditReport, ComponentMasses};
use crate::state::{ControlMode, DiagnosticFlags, PressureModel};
use serde::{Deserialize, Serialize};

/// Everything an external consumer sees after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub time_s: f64,
    pub pressure_psia: f64,
    pub pzr_temperature_f: f64,
    pub rcs_temperature_f: f64,
    pub t_sat_f: f64,
    /// Tsat(P) − T_rcs [°F]
    pub subcooling_f: f64,
    pub control_mode: ControlMode,
    pub pressure_model: PressureModel,
    pub masses: ComponentMasses,
    pub ledger_total_lbm: f64,
    pub audit: AuditReport,
    pub pzr_level: f64,
    pub steam_volume_ft3: f64,
    pub heater_kw: f64,
    pub charging_gpm: f64,
    /// Letdown the active controller asked for [gpm]. Solid: base plus the
    /// undelayed trim. Bubble: the level program after low-level isolation.
    pub letdown_demand_gpm: f64,
    /// Letdown that reached the plant [gpm]: the delayed trim while solid,
    /// less any cut that kept the RCS water-full once a bubble exists.
    pub letdown_gpm: f64,
    /// Water-solid relief discharge [gpm]; zero once relief vents steam
    pub relief_gpm: f64,
    /// Relief discharge to the holdup tank this tick, water or steam [lbm]
    pub relief_lbm: f64,
    /// RCS → PZR; negative for outsurge
    pub surge_gpm: f64,
    pub alpha: f64,
    pub bubble_formed: bool,
    pub solver: Option<SolverReport>,
    pub flags: DiagnosticFlags,
}

impl Snapshot {
    /// One-line summary for progress output.
    pub fn summary(&self) -> String {
        format!(
            "t={:>8.1}s P={:>7.2} psia Tpzr={:>6.1} F Trcs={:>6.1} F level={:>5.1}% mode={} audit={:+.3e}",
            self.time_s,
            self.pressure_psia,
            self.pzr_temperature_f,
            self.rcs_temperature_f,
            self.pzr_level * 100.0,
            self.control_mode,
            self.audit.residual,
        )
    }
}
