//! Scenario file format.

use rcs_sim::{InitialConditions, PlantConfig, TickInputs};
use serde::{Deserialize, Serialize};

pub const SCENARIO_VERSION: u32 = 1;

/// A complete, reproducible heatup run: plant, starting point and the
/// operator inputs over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub plant: PlantConfig,
    #[serde(default)]
    pub initial: InitialConditions,
    /// Simulated duration [s]
    pub duration_s: f64,
    pub schedule: Vec<ScheduleSegment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideDef>,
}

/// Inputs held constant from `start_s` until the next segment begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSegment {
    pub start_s: f64,
    pub heater_kw: f64,
    pub charging_gpm: f64,
    pub letdown_gpm: f64,
    #[serde(default)]
    pub alpha: f64,
}

impl ScheduleSegment {
    pub fn inputs(&self) -> TickInputs {
        TickInputs {
            heater_kw: self.heater_kw,
            charging_gpm: self.charging_gpm,
            letdown_gpm: self.letdown_gpm,
            alpha: self.alpha,
        }
    }
}

/// Diagnostic state override applied before the first tick starting at or
/// after `at_s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideDef {
    pub at_s: f64,
    #[serde(flatten)]
    pub kind: OverrideKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideKind {
    PzrTemperature { value_f: f64 },
    Pressure { value_psia: f64 },
}

impl Scenario {
    /// Inputs in force at `time_s`. Assumes a validated, ordered schedule.
    pub fn inputs_at(&self, time_s: f64) -> TickInputs {
        self.schedule
            .iter()
            .take_while(|seg| seg.start_s <= time_s)
            .last()
            .map(ScheduleSegment::inputs)
            .unwrap_or_default()
    }

    /// Number of fixed ticks covering `duration_s`.
    pub fn tick_count(&self) -> u64 {
        let ticks = (self.duration_s / self.plant.dt_seconds()).round();
        if ticks.is_finite() && ticks >= 1.0 {
            ticks as u64
        } else {
            1
        }
    }
}
