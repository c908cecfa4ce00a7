//! Drive a [`PrimarySystem`] through a scenario.

use crate::ScenarioResult;
use crate::hash::{RunHasher, scenario_id};
use crate::schema::{OverrideKind, Scenario};
use crate::validate::validate_scenario;
use rcs_sim::{ControlMode, PressureModel, PrimarySystem, Snapshot, TransitionEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Keep every Nth snapshot (the final one is always kept).
    pub record_every: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { record_every: 1 }
    }
}

/// Headline numbers of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub final_time_s: f64,
    pub final_mode: ControlMode,
    pub min_pressure_psia: f64,
    pub max_pressure_psia: f64,
    pub final_rcs_temperature_f: f64,
    pub max_audit_residual_lbm: f64,
    pub audit_violations: u64,
    /// First tick with the bubble flag set.
    pub bubble_tick: Option<u64>,
    /// Ticks with the relief valve passing flow.
    pub relief_ticks: u64,
    pub solver_fallbacks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub scenario: String,
    pub scenario_id: String,
    /// SHA-256 over every snapshot of the run, recorded or not.
    pub fingerprint: String,
    pub summary: RunSummary,
    pub transitions: Vec<TransitionEvent>,
    pub snapshots: Vec<Snapshot>,
}

struct SummaryBuilder {
    min_p: f64,
    max_p: f64,
    max_residual: f64,
    audit_violations: u64,
    bubble_tick: Option<u64>,
    relief_ticks: u64,
    solver_fallbacks: u64,
}

impl SummaryBuilder {
    fn new() -> Self {
        Self {
            min_p: f64::INFINITY,
            max_p: f64::NEG_INFINITY,
            max_residual: 0.0,
            audit_violations: 0,
            bubble_tick: None,
            relief_ticks: 0,
            solver_fallbacks: 0,
        }
    }

    fn observe(&mut self, snap: &Snapshot) {
        self.min_p = self.min_p.min(snap.pressure_psia);
        self.max_p = self.max_p.max(snap.pressure_psia);
        self.max_residual = self.max_residual.max(snap.audit.residual.abs());
        if !snap.audit.ok {
            self.audit_violations += 1;
        }
        if snap.bubble_formed && self.bubble_tick.is_none() {
            self.bubble_tick = Some(snap.tick);
        }
        if snap.relief_lbm > 0.0 {
            self.relief_ticks += 1;
        }
        if snap.pressure_model == PressureModel::CoupledFallback {
            self.solver_fallbacks += 1;
        }
    }

    fn finish(self, last: &Snapshot, ticks: u64) -> RunSummary {
        RunSummary {
            ticks,
            final_time_s: last.time_s,
            final_mode: last.control_mode,
            min_pressure_psia: self.min_p,
            max_pressure_psia: self.max_p,
            final_rcs_temperature_f: last.rcs_temperature_f,
            max_audit_residual_lbm: self.max_residual,
            audit_violations: self.audit_violations,
            bubble_tick: self.bubble_tick,
            relief_ticks: self.relief_ticks,
            solver_fallbacks: self.solver_fallbacks,
        }
    }
}

/// Validate and run a scenario to completion.
pub fn run_scenario(scenario: &Scenario, options: &RunOptions) -> ScenarioResult<RunRecord> {
    validate_scenario(scenario)?;
    let id = scenario_id(scenario)?;
    let mut system = PrimarySystem::new(scenario.plant.clone(), scenario.initial.clone())?;
    let dt_s = system.dt_seconds();
    let ticks = scenario.tick_count();
    let every = options.record_every.max(1);

    info!(scenario = %scenario.name, ticks, dt_s, "starting run");

    let mut overrides = scenario.overrides.clone();
    overrides.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));
    let mut pending = overrides.into_iter().peekable();

    let mut hasher = RunHasher::new(&id);
    let mut summary = SummaryBuilder::new();
    let mut snapshots = Vec::new();
    let mut last = None;

    for index in 0..ticks {
        let start_s = index as f64 * dt_s;
        while let Some(o) = pending.next_if(|o| o.at_s < start_s + dt_s) {
            debug!(at_s = o.at_s, kind = ?o.kind, "applying override");
            match o.kind {
                OverrideKind::PzrTemperature { value_f } => system.override_pzr_temperature(value_f)?,
                OverrideKind::Pressure { value_psia } => system.override_pressure(value_psia)?,
            }
        }

        let snap = system.step(&scenario.inputs_at(start_s))?;
        hasher.update(&snap)?;
        summary.observe(&snap);
        if !snap.audit.ok {
            warn!(tick = snap.tick, residual = snap.audit.residual, "audit violation during run");
        }
        if index % every == 0 || index + 1 == ticks {
            snapshots.push(snap.clone());
        }
        last = Some(snap);
    }

    let Some(last) = last else {
        return Err(crate::ScenarioError::EmptyRun);
    };
    let summary = summary.finish(&last, ticks);
    let fingerprint = hasher.finish();
    info!(
        scenario = %scenario.name,
        final_mode = %summary.final_mode,
        pressure = last.pressure_psia,
        fingerprint = %fingerprint,
        "run complete"
    );

    Ok(RunRecord {
        scenario: scenario.name.clone(),
        scenario_id: id,
        fingerprint,
        summary,
        transitions: system.transitions().to_vec(),
        snapshots,
    })
}
