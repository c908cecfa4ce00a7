//! Heat sources and sinks shared by every regime.

use crate::config::ThermalConfig;
use rcs_core::numeric::first_order_gain;
use rcs_core::units::{SECONDS_PER_HOUR, kw_to_btu_per_hr};

/// Advance the heater lag toward `demand_kw` (clamped to the bank rating).
pub fn heater_step(cfg: &ThermalConfig, effective_kw: f64, demand_kw: f64, dt_s: f64) -> f64 {
    let demand = demand_kw.clamp(0.0, cfg.heater_max_kw);
    effective_kw + first_order_gain(dt_s, cfg.heater_tau_s) * (demand - effective_kw)
}

/// Energy terms over one tick [BTU].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeatFlows {
    pub heater: f64,
    /// PZR → RCS through the surge line (negative when the RCS is hotter)
    pub surge_line: f64,
    pub pzr_loss: f64,
    pub rcs_loss: f64,
    pub rcp: f64,
}

impl HeatFlows {
    pub fn compute(
        cfg: &ThermalConfig,
        heater_kw: f64,
        alpha: f64,
        t_pzr: f64,
        t_rcs: f64,
        dt_s: f64,
    ) -> Self {
        let hours = dt_s / SECONDS_PER_HOUR;
        Self {
            heater: kw_to_btu_per_hr(heater_kw) * hours,
            surge_line: cfg.surge_line_ua * (t_pzr - t_rcs) * hours,
            pzr_loss: insulation_loss(cfg.pzr_loss_ua, t_pzr, cfg.ambient_f) * hours,
            rcs_loss: insulation_loss(cfg.rcs_loss_ua, t_rcs, cfg.ambient_f) * hours,
            rcp: kw_to_btu_per_hr(alpha * cfg.rcp_heat_kw) * hours,
        }
    }

    /// Net heat into the pressurizer fluid and wall.
    pub fn pzr_net(&self) -> f64 {
        self.heater - self.surge_line - self.pzr_loss
    }

    /// Net heat into the RCS water and metal.
    pub fn rcs_net(&self) -> f64 {
        self.surge_line - self.rcs_loss + self.rcp
    }
}

/// Insulation loss [BTU/hr]: zero at or below ambient, linear above.
pub fn insulation_loss(ua: f64, t: f64, ambient: f64) -> f64 {
    ua * (t - ambient).max(0.0)
}

/// Temperature after mixing two heat capacities [BTU/°F].
pub fn mix_temperature(t_a: f64, c_a: f64, t_b: f64, c_b: f64) -> f64 {
    let total = c_a + c_b;
    if total <= 0.0 {
        t_a
    } else {
        (t_a * c_a + t_b * c_b) / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_lag_approaches_demand() {
        let cfg = ThermalConfig::default();
        let mut p = 0.0;
        for _ in 0..30 {
            p = heater_step(&cfg, p, 1800.0, 10.0);
        }
        assert!((p - 1800.0).abs() < 1.0);
        assert_eq!(heater_step(&cfg, 0.0, 5000.0, 1e9), cfg.heater_max_kw);
        assert_eq!(heater_step(&cfg, 0.0, -10.0, 1e9), 0.0);
    }

    #[test]
    fn no_loss_below_ambient() {
        assert_eq!(insulation_loss(250.0, 70.0, 80.0), 0.0);
        assert_eq!(insulation_loss(250.0, 90.0, 80.0), 2500.0);
    }

    #[test]
    fn heat_balance_signs() {
        let cfg = ThermalConfig::default();
        let q = HeatFlows::compute(&cfg, 1800.0, 0.0, 300.0, 100.0, 3600.0);
        assert!((q.heater - 1800.0 * 3412.142).abs() < 1e-6);
        assert!(q.surge_line > 0.0);
        assert_eq!(q.rcp, 0.0);
        assert!((q.pzr_net() + q.rcs_net() - (q.heater - q.pzr_loss - q.rcs_loss)).abs() < 1e-6);
    }

    #[test]
    fn mixing_is_capacity_weighted() {
        assert_eq!(mix_temperature(100.0, 3.0, 200.0, 1.0), 125.0);
        assert_eq!(mix_temperature(100.0, 0.0, 200.0, 0.0), 100.0);
    }
}
