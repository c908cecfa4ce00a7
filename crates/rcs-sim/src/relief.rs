//! Pressurizer relief valve with reseat hysteresis.

use crate::config::ReliefConfig;
use serde::{Deserialize, Serialize};

/// Relief valve outcome for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliefFlow {
    /// Opening as a fraction of rated capacity
    pub fraction: f64,
    /// Water-solid discharge [gpm]
    pub gpm: f64,
    pub open: bool,
}

impl ReliefFlow {
    /// Discharge from a steam space over `dt` seconds [lbm].
    pub fn steam_lbm(&self, cfg: &ReliefConfig, dt: f64) -> f64 {
        self.fraction * cfg.steam_capacity_lbm_per_s * dt
    }
}

/// Relief flow at gauge pressure `p_psig` given whether the valve was open.
///
/// Closed: opens proportionally above the setpoint, reaching capacity over
/// the accumulation band. Open: below the setpoint a reduced flow continues,
/// falling linearly to zero at the reseat pressure, where the valve closes.
pub fn relief_flow(cfg: &ReliefConfig, p_psig: f64, was_open: bool) -> ReliefFlow {
    let over = p_psig - cfg.setpoint_psig;
    let fraction = if over > 0.0 {
        if was_open {
            cfg.min_open_fraction + (1.0 - cfg.min_open_fraction) * over / cfg.accumulation_psi
        } else {
            over / cfg.accumulation_psi
        }
    } else if was_open && p_psig > cfg.reseat_psig {
        cfg.min_open_fraction * (p_psig - cfg.reseat_psig) / (cfg.setpoint_psig - cfg.reseat_psig)
    } else {
        0.0
    };
    let fraction = fraction.clamp(0.0, 1.0);
    ReliefFlow {
        fraction,
        gpm: fraction * cfg.capacity_gpm,
        open: fraction > 0.0,
    }
}
