//! Transition records and physical clamps.

use crate::state::{ControlMode, PressureModel};
use rcs_core::units::ATMOSPHERIC_PSIA;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A change of control mode or pressure model, with the pressures on either
/// side of the tick where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub tick: u64,
    pub from_mode: ControlMode,
    pub to_mode: ControlMode,
    pub from_model: PressureModel,
    pub to_model: PressureModel,
    pub pressure_before: f64,
    pub pressure_after: f64,
}

impl TransitionEvent {
    pub fn pressure_jump(&self) -> f64 {
        (self.pressure_after - self.pressure_before).abs()
    }
}

/// Apply the atmospheric floor unless the diagnostics override is set.
/// Returns the pressure and whether it was clamped.
pub(crate) fn clamp_pressure_floor(p: f64, allow_subatmospheric: bool) -> (f64, bool) {
    if allow_subatmospheric || p >= ATMOSPHERIC_PSIA {
        (p, false)
    } else {
        warn!(pressure = p, "pressure below atmospheric; clamped");
        (ATMOSPHERIC_PSIA, true)
    }
}
