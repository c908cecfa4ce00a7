//! PI controller.
//!
//! Sampled PI with:
//! - Output clamping
//! - Integral clamping (defaults to the output range divided by `ki`)
//! - Conditional-integration anti-windup (saturation or external inhibit)
//! - Direct or reverse action
//! - Bumpless initialisation from a known output

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Sign convention of the error term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Action {
    /// `e = sp - pv`: output rises when the process is below setpoint.
    #[default]
    Reverse,
    /// `e = pv - sp`: output rises when the process is above setpoint.
    Direct,
}

/// PI controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PIController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral time constant (seconds). Larger values reduce integral action.
    pub ti: f64,
    /// Minimum output value.
    pub out_min: f64,
    /// Maximum output value.
    pub out_max: f64,
    /// Integral windup limit. If None, derived from the output limits.
    pub integral_limit: Option<f64>,
    pub action: Action,
}

/// PI controller state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PIControllerState {
    /// Integral accumulator (error·seconds).
    pub integral: f64,
}

/// Result of one controller update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PIOutput {
    pub state: PIControllerState,
    /// Clamped output.
    pub output: f64,
    /// Output before clamping.
    pub raw: f64,
    /// Signed error used this update.
    pub error: f64,
    /// True when integration was suppressed this update.
    pub windup_inhibited: bool,
}

impl PIController {
    /// Create a new PI controller.
    ///
    /// # Arguments
    ///
    /// * `kp` - Proportional gain
    /// * `ti` - Integral time constant (seconds)
    /// * `out_min` - Minimum output
    /// * `out_max` - Maximum output
    pub fn new(kp: f64, ti: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        if !kp.is_finite() || kp <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "kp must be positive",
            });
        }
        if !ti.is_finite() || ti <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "ti must be positive",
            });
        }
        if out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            kp,
            ti,
            out_min,
            out_max,
            integral_limit: None,
            action: Action::Reverse,
        })
    }

    /// Set integral windup limit.
    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit.abs());
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Integral gain `kp / ti`.
    pub fn ki(&self) -> f64 {
        self.kp / self.ti
    }

    /// Effective integral limit: explicit, or the largest output magnitude over `ki`.
    pub fn effective_integral_limit(&self) -> f64 {
        self.integral_limit
            .unwrap_or_else(|| self.out_min.abs().max(self.out_max.abs()) / self.ki())
    }

    pub fn error(&self, pv: f64, sp: f64) -> f64 {
        match self.action {
            Action::Reverse => sp - pv,
            Action::Direct => pv - sp,
        }
    }

    /// Compute controller output given process variable and setpoint.
    ///
    /// Returns updated state and output value.
    pub fn update(
        &self,
        state: &PIControllerState,
        pv: f64,
        sp: f64,
        dt: f64,
    ) -> (PIControllerState, f64) {
        let out = self.update_inhibited(state, pv, sp, dt, false);
        (out.state, out.output)
    }

    /// Update with an external integration inhibit (e.g. actuator deadtime).
    pub fn update_inhibited(
        &self,
        state: &PIControllerState,
        pv: f64,
        sp: f64,
        dt: f64,
        inhibit: bool,
    ) -> PIOutput {
        let error = self.error(pv, sp);
        let limit = self.effective_integral_limit();

        let candidate = (state.integral + error * dt).clamp(-limit, limit);
        let raw = self.kp * error + self.ki() * candidate;
        let output = raw.clamp(self.out_min, self.out_max);

        // Hold the integral while saturated or inhibited.
        let saturated = output != raw;
        let windup_inhibited = saturated || inhibit;
        let integral = if windup_inhibited {
            state.integral.clamp(-limit, limit)
        } else {
            candidate
        };

        PIOutput {
            state: PIControllerState { integral },
            output,
            raw,
            error,
            windup_inhibited,
        }
    }

    /// State that reproduces `output` at the current error (bumpless transfer).
    pub fn bumpless_state(&self, output: f64, pv: f64, sp: f64) -> PIControllerState {
        let limit = self.effective_integral_limit();
        let target = output.clamp(self.out_min, self.out_max);
        let integral = (target - self.kp * self.error(pv, sp)) / self.ki();
        PIControllerState {
            integral: integral.clamp(-limit, limit),
        }
    }
}
