//! Dwell timers: a condition must hold continuously before it counts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DwellTimer {
    /// Required continuous time (seconds).
    pub required_s: f64,
    /// Time the condition has held so far (seconds).
    pub elapsed_s: f64,
}

impl DwellTimer {
    pub fn new(required_s: f64) -> Self {
        Self {
            required_s: required_s.max(0.0),
            elapsed_s: 0.0,
        }
    }

    /// Feed this tick's condition; returns true once it has held for the dwell.
    pub fn update(&mut self, condition: bool, dt: f64) -> bool {
        if condition {
            self.elapsed_s += dt;
        } else {
            self.elapsed_s = 0.0;
        }
        self.is_satisfied()
    }

    pub fn is_satisfied(&self) -> bool {
        // Tolerate accumulated round-off in the sum of timesteps.
        self.elapsed_s + 1e-9 >= self.required_s && self.elapsed_s > 0.0
    }

    pub fn reset(&mut self) {
        self.elapsed_s = 0.0;
    }
}
