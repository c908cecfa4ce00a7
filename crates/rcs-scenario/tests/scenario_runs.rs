//! End-to-end scenario loading, running and fingerprinting.

use rcs_scenario::{
    OverrideDef, OverrideKind, RunOptions, SCENARIO_VERSION, Scenario, ScenarioError,
    ScheduleSegment, load_record_json, load_yaml, run_scenario, save_record_json, save_yaml,
};
use rcs_sim::{BubblePhase, ControlMode, InitialConditions, PlantConfig};
use std::path::PathBuf;

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(name)
}

fn cold_heatup(duration_s: f64, heater_kw: f64) -> Scenario {
    Scenario {
        version: SCENARIO_VERSION,
        name: "cold-heatup".into(),
        description: Some("solid plant on full heaters".into()),
        plant: PlantConfig::default(),
        initial: InitialConditions::default(),
        duration_s,
        schedule: vec![ScheduleSegment {
            start_s: 0.0,
            heater_kw,
            charging_gpm: 75.0,
            letdown_gpm: 75.0,
            alpha: 0.0,
        }],
        overrides: vec![],
    }
}

#[test]
fn yaml_roundtrip() {
    let mut scenario = cold_heatup(3600.0, 1800.0);
    scenario.overrides.push(OverrideDef {
        at_s: 60.0,
        kind: OverrideKind::Pressure { value_psia: 380.0 },
    });
    let path = std::env::temp_dir().join("rcs_scenario_roundtrip.yaml");
    save_yaml(&path, &scenario).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(scenario, loaded);
}

#[test]
fn invalid_scenario_is_rejected_on_load() {
    let path = std::env::temp_dir().join("rcs_scenario_invalid.yaml");
    std::fs::write(&path, "version: 1\nname: empty\nduration_s: 60.0\nschedule: []\n").unwrap();
    assert!(matches!(load_yaml(&path), Err(ScenarioError::Validation(_))));
}

#[test]
fn bundled_scenarios_load() {
    for name in ["heatup.yaml", "forced-saturation.yaml"] {
        let scenario = load_yaml(&bundled(name)).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(scenario.version, SCENARIO_VERSION);
    }
}

#[test]
fn solid_hour_keeps_mass_and_pressure() {
    let record = run_scenario(&cold_heatup(3600.0, 1800.0), &RunOptions::default()).unwrap();
    let s = &record.summary;
    assert_eq!(s.ticks, 360);
    assert_eq!(record.snapshots.len(), 360);
    assert_eq!(s.audit_violations, 0);
    assert_eq!(s.final_mode, ControlMode::Solid(rcs_sim::SolidMode::HoldSolid));
    assert!(s.bubble_tick.is_none());
    assert!(s.max_pressure_psia < 400.0 && s.min_pressure_psia > 330.0);
}

#[test]
fn bundled_heatup_reaches_full_coupling() {
    let scenario = load_yaml(&bundled("heatup.yaml")).unwrap();
    let record = run_scenario(&scenario, &RunOptions { record_every: 60 }).unwrap();
    let s = &record.summary;
    assert_eq!(s.ticks, 720);
    assert_eq!(s.audit_violations, 0);
    assert_eq!(s.relief_ticks, 0);
    assert!(s.bubble_tick.is_some());
    assert_eq!(s.final_mode, ControlMode::Bubble(BubblePhase::Complete));
    assert!(s.final_rcs_temperature_f > 150.0);
    assert!(record.transitions.len() >= 5);
}

#[test]
fn override_forces_bubble_detection() {
    let scenario = load_yaml(&bundled("forced-saturation.yaml")).unwrap();
    let record = run_scenario(&scenario, &RunOptions::default()).unwrap();
    assert_eq!(record.summary.bubble_tick, Some(record.snapshots[10].tick));
    assert_eq!(
        record.snapshots[10].control_mode,
        ControlMode::Bubble(BubblePhase::Detection)
    );
}

#[test]
fn fingerprint_is_reproducible_and_sensitive() {
    let options = RunOptions::default();
    let a = run_scenario(&cold_heatup(600.0, 1800.0), &options).unwrap();
    let b = run_scenario(&cold_heatup(600.0, 1800.0), &options).unwrap();
    let c = run_scenario(&cold_heatup(600.0, 900.0), &options).unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.snapshots, b.snapshots);
    assert_ne!(a.fingerprint, c.fingerprint);
    assert_ne!(a.scenario_id, c.scenario_id);
}

#[test]
fn thinning_keeps_fingerprint_and_final_tick() {
    let scenario = cold_heatup(1000.0, 1800.0);
    let full = run_scenario(&scenario, &RunOptions::default()).unwrap();
    let thin = run_scenario(&scenario, &RunOptions { record_every: 30 }).unwrap();
    assert_eq!(full.fingerprint, thin.fingerprint);
    // Ticks 0, 30, 60, 90 and the final one.
    assert_eq!(thin.snapshots.len(), 5);
    assert_eq!(thin.snapshots.last(), full.snapshots.last());
}

#[test]
fn record_json_roundtrip_keeps_identity() {
    let record = run_scenario(&cold_heatup(300.0, 1800.0), &RunOptions { record_every: 10 }).unwrap();
    let path = std::env::temp_dir().join("rcs_scenario_record.json");
    save_record_json(&path, &record).unwrap();
    let loaded = load_record_json(&path).unwrap();
    assert_eq!(loaded.fingerprint, record.fingerprint);
    assert_eq!(loaded.snapshots.len(), record.snapshots.len());
    assert_eq!(loaded.summary.final_mode, record.summary.final_mode);
}
