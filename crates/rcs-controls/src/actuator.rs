//! Actuator dynamics between controller output and the plant.
//!
//! Two stages in series:
//! - First-order lag (time constant `tau`), discretised exactly so that any
//!   timestep is stable
//! - Slew limiter (maximum rate of change of the lagged value)
//!
//! The output is then clamped to `[out_min, out_max]`.

use crate::error::{ControlError, ControlResult};
use rcs_core::numeric::first_order_gain;
use serde::{Deserialize, Serialize};

/// State of a lag/slew actuator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    /// Output of the lag stage.
    pub lagged: f64,
    /// Output of the slew stage (effective command).
    pub position: f64,
}

impl ActuatorState {
    /// State resting at `value` in both stages.
    pub fn at(value: f64) -> Self {
        Self {
            lagged: value,
            position: value,
        }
    }
}

/// First-order lag followed by a slew limiter.
///
/// # Example
///
/// ```
/// use rcs_controls::{ActuatorState, LagSlewActuator};
///
/// let actuator = LagSlewActuator::new(5.0, 2.0, -40.0, 40.0).unwrap();
/// let mut state = ActuatorState::default();
/// for _ in 0..60 {
///     state = actuator.step(&state, 1.0, 10.0);
/// }
/// assert!((state.position - 10.0).abs() < 0.1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LagSlewActuator {
    /// Lag time constant (seconds); zero disables the lag.
    pub tau: f64,
    /// Slew limit (units/second), must be positive.
    pub rate_limit: f64,
    pub out_min: f64,
    pub out_max: f64,
}

impl LagSlewActuator {
    pub fn new(tau: f64, rate_limit: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        if !tau.is_finite() || tau < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "tau must be non-negative",
            });
        }
        if !rate_limit.is_finite() || rate_limit <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "rate_limit must be positive",
            });
        }
        if out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            tau,
            rate_limit,
            out_min,
            out_max,
        })
    }

    /// Advance the actuator by `dt` seconds toward `command`.
    pub fn step(&self, state: &ActuatorState, dt: f64, command: f64) -> ActuatorState {
        let command = command.clamp(self.out_min, self.out_max);
        let lagged = state.lagged + first_order_gain(dt, self.tau) * (command - state.lagged);
        let max_step = self.rate_limit * dt;
        let delta = (lagged - state.position).clamp(-max_step, max_step);
        ActuatorState {
            lagged,
            position: (state.position + delta).clamp(self.out_min, self.out_max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_moves_toward_command() {
        let act = LagSlewActuator::new(5.0, 100.0, 0.0, 100.0).unwrap();
        let state = act.step(&ActuatorState::default(), 1.0, 50.0);
        assert!(state.position > 0.0 && state.position < 50.0);
    }

    #[test]
    fn slew_limits_the_rate() {
        let act = LagSlewActuator::new(0.0, 2.0, -100.0, 100.0).unwrap();
        let state = act.step(&ActuatorState::default(), 10.0, 100.0);
        assert_eq!(state.lagged, 100.0);
        assert!((state.position - 20.0).abs() < 1e-12);
    }

    #[test]
    fn large_timestep_is_stable() {
        let act = LagSlewActuator::new(5.0, 1000.0, -100.0, 100.0).unwrap();
        let mut state = ActuatorState::default();
        for _ in 0..10 {
            state = act.step(&state, 60.0, 10.0);
            assert!(state.position <= 10.0 + 1e-9);
        }
        assert!((state.position - 10.0).abs() < 1e-6);
    }

    #[test]
    fn output_clamped() {
        let act = LagSlewActuator::new(0.1, 1000.0, -1.0, 1.0).unwrap();
        let state = act.step(&ActuatorState::at(0.5), 1.0, 5.0);
        assert!(state.position <= 1.0);
        let state = act.step(&ActuatorState::at(0.5), 1.0, -5.0);
        assert!(state.position >= -1.0);
    }

    #[test]
    fn invalid_parameters() {
        assert!(LagSlewActuator::new(-0.1, 1.0, 0.0, 1.0).is_err());
        assert!(LagSlewActuator::new(0.1, 0.0, 0.0, 1.0).is_err());
        assert!(LagSlewActuator::new(0.1, 1.0, 1.0, 1.0).is_err());
    }
}
