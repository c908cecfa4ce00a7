//! Scenario validation.

use crate::schema::{OverrideKind, SCENARIO_VERSION, Scenario};
use rcs_sim::SimError;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Schedule is empty")]
    EmptySchedule,

    #[error("Schedule segment {index} starts at {start_s} s, not after the previous one")]
    UnorderedSchedule { index: usize, start_s: f64 },

    #[error("Plant rejected: {0}")]
    Plant(#[from] SimError),
}

fn invalid(field: impl Into<String>, value: f64, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version > SCENARIO_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if !(scenario.duration_s.is_finite() && scenario.duration_s > 0.0) {
        return Err(invalid("duration_s", scenario.duration_s, "must be finite and positive"));
    }

    scenario.plant.validate()?;
    scenario.initial.validate()?;

    let first = scenario.schedule.first().ok_or(ValidationError::EmptySchedule)?;
    if first.start_s != 0.0 {
        return Err(invalid("schedule[0].start_s", first.start_s, "first segment must start at 0"));
    }
    for (index, seg) in scenario.schedule.iter().enumerate() {
        let values = [
            ("start_s", seg.start_s),
            ("heater_kw", seg.heater_kw),
            ("charging_gpm", seg.charging_gpm),
            ("letdown_gpm", seg.letdown_gpm),
        ];
        for (name, value) in values {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(
                    format!("schedule[{index}].{name}"),
                    value,
                    "must be finite and non-negative",
                ));
            }
        }
        if !(0.0..=1.0).contains(&seg.alpha) {
            return Err(invalid(format!("schedule[{index}].alpha"), seg.alpha, "must lie in [0, 1]"));
        }
        if index > 0 && seg.start_s <= scenario.schedule[index - 1].start_s {
            return Err(ValidationError::UnorderedSchedule {
                index,
                start_s: seg.start_s,
            });
        }
    }

    for (index, o) in scenario.overrides.iter().enumerate() {
        if !(o.at_s.is_finite() && (0.0..=scenario.duration_s).contains(&o.at_s)) {
            return Err(invalid(format!("overrides[{index}].at_s"), o.at_s, "must lie within the run"));
        }
        let (name, value) = match o.kind {
            OverrideKind::PzrTemperature { value_f } => ("value_f", value_f),
            OverrideKind::Pressure { value_psia } => ("value_psia", value_psia),
        };
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid(
                format!("overrides[{index}].{name}"),
                value,
                "must be finite and positive",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{OverrideDef, ScheduleSegment};
    use rcs_sim::{InitialConditions, PlantConfig};

    fn segment(start_s: f64) -> ScheduleSegment {
        ScheduleSegment {
            start_s,
            heater_kw: 1800.0,
            charging_gpm: 75.0,
            letdown_gpm: 75.0,
            alpha: 0.0,
        }
    }

    fn valid() -> Scenario {
        Scenario {
            version: SCENARIO_VERSION,
            name: "valid".into(),
            description: None,
            plant: PlantConfig::default(),
            initial: InitialConditions::default(),
            duration_s: 600.0,
            schedule: vec![segment(0.0), segment(300.0)],
            overrides: vec![],
        }
    }

    #[test]
    fn accepts_default_plant() {
        validate_scenario(&valid()).unwrap();
    }

    #[test]
    fn rejects_future_version() {
        let mut s = valid();
        s.version = SCENARIO_VERSION + 1;
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn rejects_empty_and_unordered_schedules() {
        let mut s = valid();
        s.schedule.clear();
        assert!(matches!(validate_scenario(&s), Err(ValidationError::EmptySchedule)));

        let mut s = valid();
        s.schedule = vec![segment(0.0), segment(300.0), segment(300.0)];
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::UnorderedSchedule { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_late_first_segment() {
        let mut s = valid();
        s.schedule = vec![segment(10.0)];
        assert!(matches!(validate_scenario(&s), Err(ValidationError::InvalidValue { .. })));
    }

    #[test]
    fn rejects_out_of_range_alpha() {
        let mut s = valid();
        s.schedule[1].alpha = 1.5;
        assert!(matches!(validate_scenario(&s), Err(ValidationError::InvalidValue { .. })));
    }

    #[test]
    fn rejects_override_outside_run() {
        let mut s = valid();
        s.overrides.push(OverrideDef {
            at_s: 900.0,
            kind: OverrideKind::Pressure { value_psia: 365.0 },
        });
        assert!(matches!(validate_scenario(&s), Err(ValidationError::InvalidValue { .. })));
    }

    #[test]
    fn plant_errors_are_wrapped() {
        let mut s = valid();
        s.plant.dt_hours = -1.0;
        assert!(matches!(validate_scenario(&s), Err(ValidationError::Plant(_))));
    }
}
