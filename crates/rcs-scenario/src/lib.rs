//! rcs-scenario: scenario files, batch runs and run fingerprints.

pub mod hash;
pub mod run;
pub mod schema;
pub mod validate;

pub use hash::{ENGINE_VERSION, RunHasher, scenario_id};
pub use run::{RunOptions, RunRecord, RunSummary, run_scenario};
pub use schema::*;
pub use validate::{ValidationError, validate_scenario};

use std::path::Path;

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Simulation error: {0}")]
    Sim(#[from] rcs_sim::SimError),

    #[error("Run produced no ticks")]
    EmptyRun,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ScenarioResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_yaml::from_str(&content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn save_yaml(path: &Path, scenario: &Scenario) -> ScenarioResult<()> {
    validate_scenario(scenario)?;
    let content = serde_yaml::to_string(scenario)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Write a run record as pretty JSON.
pub fn save_record_json(path: &Path, record: &RunRecord) -> ScenarioResult<()> {
    let content = serde_json::to_string_pretty(record)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_record_json(path: &Path) -> ScenarioResult<RunRecord> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// One snapshot per line.
pub fn save_snapshots_jsonl(path: &Path, record: &RunRecord) -> ScenarioResult<()> {
    let mut content = String::new();
    for snap in &record.snapshots {
        content.push_str(&serde_json::to_string(snap)?);
        content.push('\n');
    }
    std::fs::write(path, content)?;
    Ok(())
}
