//! First-order signal conditioning.

use crate::error::{ControlError, ControlResult};
use rcs_core::numeric::first_order_gain;
use serde::{Deserialize, Serialize};

/// First-order low-pass filter, exact discretisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowPassFilter {
    /// Time constant (seconds); zero passes the input through.
    pub tau: f64,
}

impl LowPassFilter {
    pub fn new(tau: f64) -> ControlResult<Self> {
        if !tau.is_finite() || tau < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "filter tau must be non-negative",
            });
        }
        Ok(Self { tau })
    }

    pub fn apply(&self, previous: f64, input: f64, dt: f64) -> f64 {
        previous + first_order_gain(dt, self.tau) * (input - previous)
    }
}

/// Filtered rate of change of a signal, in units per hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateEstimator {
    pub filter: LowPassFilter,
}

/// Rate estimator memory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RateState {
    pub last: Option<f64>,
    pub rate_per_hr: f64,
}

impl RateEstimator {
    pub fn new(tau: f64) -> ControlResult<Self> {
        Ok(Self {
            filter: LowPassFilter::new(tau)?,
        })
    }

    pub fn update(&self, state: &RateState, value: f64, dt: f64) -> RateState {
        let Some(last) = state.last else {
            return RateState {
                last: Some(value),
                rate_per_hr: 0.0,
            };
        };
        let instant = if dt > 0.0 {
            (value - last) / dt * 3600.0
        } else {
            0.0
        };
        RateState {
            last: Some(value),
            rate_per_hr: self.filter.apply(state.rate_per_hr, instant, dt),
        }
    }
}
