//! Water-solid pressure control through the public tick interface.

use rcs_core::units::psig_to_psia;
use rcs_sim::{
    ControlMode, InitialConditions, PlantConfig, PrimarySystem, SimError, SolidMode, TickInputs,
};

fn heatup_inputs() -> TickInputs {
    TickInputs {
        heater_kw: 1800.0,
        charging_gpm: 75.0,
        letdown_gpm: 75.0,
        alpha: 0.0,
    }
}

fn system(config: PlantConfig) -> PrimarySystem {
    PrimarySystem::new(config, InitialConditions::default()).expect("valid plant")
}

#[test]
fn pi_holds_setpoint_under_full_heater() {
    let mut sys = system(PlantConfig::default());
    for tick in 1..=400 {
        let snap = sys.step(&heatup_inputs()).unwrap();
        assert!(snap.audit.ok, "audit failed at tick {tick}: {:?}", snap.audit);
        if tick > 200 {
            assert!(
                (snap.pressure_psia - 365.0).abs() < 5.0,
                "tick {tick}: p = {}",
                snap.pressure_psia
            );
        }
    }
    assert_eq!(
        sys.state().control_mode,
        ControlMode::Solid(SolidMode::HoldSolid)
    );
    // Heater energy went somewhere.
    assert!(sys.state().pzr_temperature_f > 140.0);
}

#[test]
fn high_pressure_raises_letdown_demand() {
    let mut sys = system(PlantConfig::default());
    sys.override_pressure(395.0).unwrap();
    let snap = sys.step(&heatup_inputs()).unwrap();
    assert!(snap.letdown_demand_gpm > 75.0, "demand = {}", snap.letdown_demand_gpm);
    // Transport delay still priming: the plant sees the base letdown.
    assert_eq!(snap.letdown_gpm, 75.0);
    assert!(snap.flags.delay_priming);

    // Once the delay has filled, the extra letdown reaches the plant.
    let mut primed = snap;
    for _ in 0..2 {
        sys.override_pressure(395.0).unwrap();
        primed = sys.step(&heatup_inputs()).unwrap();
    }
    assert!(!primed.flags.delay_priming);
    assert!(primed.letdown_demand_gpm > 75.0);
    assert!(primed.letdown_gpm > 75.0, "applied = {}", primed.letdown_gpm);
}

#[test]
fn low_pressure_cuts_letdown_demand() {
    let mut sys = system(PlantConfig::default());
    sys.override_pressure(335.0).unwrap();
    let snap = sys.step(&heatup_inputs()).unwrap();
    assert!(snap.letdown_demand_gpm < 75.0, "demand = {}", snap.letdown_demand_gpm);
}

#[test]
fn without_delay_actual_letdown_follows_demand() {
    let mut config = PlantConfig::default();
    config.solid.transport_delay_s = 0.0;
    let mut sys = system(config);
    sys.override_pressure(395.0).unwrap();
    let snap = sys.step(&heatup_inputs()).unwrap();
    assert!(snap.letdown_gpm > 75.0);
    assert_eq!(snap.letdown_gpm, snap.letdown_demand_gpm);
    assert!(!snap.flags.delay_priming);
}

#[test]
fn delay_primes_after_its_length() {
    let mut sys = system(PlantConfig::default());
    let first = sys.step(&heatup_inputs()).unwrap();
    assert!(first.flags.delay_priming);
    sys.step(&heatup_inputs()).unwrap();
    let third = sys.step(&heatup_inputs()).unwrap();
    assert!(!third.flags.delay_priming);
}

#[test]
fn no_flow_isolates_the_trim_channel() {
    let mut sys = system(PlantConfig::default());
    for _ in 0..5 {
        sys.step(&heatup_inputs()).unwrap();
    }
    let snap = sys
        .step(&TickInputs {
            heater_kw: 1800.0,
            ..TickInputs::default()
        })
        .unwrap();
    assert_eq!(snap.control_mode, ControlMode::Solid(SolidMode::IsolatedNoFlow));
    assert_eq!(snap.letdown_gpm, 0.0);
    assert_eq!(snap.charging_gpm, 0.0);
    assert_eq!(sys.state().solid.channel.pi.integral, 0.0);
}

#[test]
fn cold_low_pressure_start_uses_preheater_trim() {
    let initial = InitialConditions {
        pressure_psia: 300.0,
        ..InitialConditions::default()
    };
    let mut sys = PrimarySystem::new(PlantConfig::default(), initial).unwrap();
    assert_eq!(
        sys.state().control_mode,
        ControlMode::Solid(SolidMode::PreheaterCharging)
    );
    let snap = sys.step(&heatup_inputs()).unwrap();
    assert_eq!(snap.control_mode, ControlMode::Solid(SolidMode::PreheaterCharging));
}

#[test]
fn relief_lifts_and_reseats() {
    let mut sys = system(PlantConfig::default());
    for _ in 0..10 {
        sys.step(&heatup_inputs()).unwrap();
    }
    sys.override_pressure(psig_to_psia(465.0)).unwrap();
    let lifted = sys.step(&heatup_inputs()).unwrap();
    assert!(lifted.relief_gpm > 0.0);
    assert!(lifted.relief_lbm > 0.0);
    assert!((lifted.masses.holdup - lifted.relief_lbm).abs() < 1e-9);
    assert!(lifted.pressure_psia < psig_to_psia(430.0));
    assert!(lifted.audit.ok);

    let after = sys.step(&heatup_inputs()).unwrap();
    assert_eq!(after.relief_gpm, 0.0);
    assert_eq!(after.relief_lbm, 0.0);
    assert!(!sys.state().relief_open);
    assert_eq!(after.masses.holdup, lifted.masses.holdup);
}

#[test]
fn non_finite_inputs_are_sanitised() {
    let mut sys = system(PlantConfig::default());
    let snap = sys
        .step(&TickInputs {
            heater_kw: f64::NAN,
            charging_gpm: 75.0,
            letdown_gpm: f64::INFINITY,
            alpha: -3.0,
        })
        .unwrap();
    assert!(snap.pressure_psia.is_finite());
    assert_eq!(snap.alpha, 0.0);
    assert_eq!(snap.heater_kw, 0.0);
}

#[test]
fn reset_restores_initial_state() {
    let mut sys = system(PlantConfig::default());
    let initial = sys.state().clone();
    for _ in 0..20 {
        sys.step(&heatup_inputs()).unwrap();
    }
    assert_ne!(sys.state(), &initial);
    sys.reset().unwrap();
    assert_eq!(sys.state(), &initial);
    assert!(sys.transitions().is_empty());
    assert!(sys.last_snapshot().is_none());
}

#[test]
fn superheated_start_is_rejected() {
    let initial = InitialConditions {
        pressure_psia: 365.0,
        pzr_temperature_f: 450.0,
        ..InitialConditions::default()
    };
    assert!(matches!(
        PrimarySystem::new(PlantConfig::default(), initial),
        Err(SimError::NonPhysical { .. })
    ));
}
