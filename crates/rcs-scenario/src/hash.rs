//! Content hashing for scenarios and runs.

use crate::ScenarioResult;
use crate::schema::Scenario;
use rcs_sim::Snapshot;
use sha2::{Digest, Sha256};

/// Engine version mixed into every hash so results from different builds
/// never share an ID.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stable ID of a scenario's inputs.
pub fn scenario_id(scenario: &Scenario) -> ScenarioResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(scenario)?);
    hasher.update(ENGINE_VERSION.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Running SHA-256 over every snapshot of a run.
pub struct RunHasher {
    hasher: Sha256,
}

impl RunHasher {
    pub fn new(scenario_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(scenario_id.as_bytes());
        Self { hasher }
    }

    pub fn update(&mut self, snapshot: &Snapshot) -> ScenarioResult<()> {
        self.hasher.update(serde_json::to_vec(snapshot)?);
        self.hasher.update(b"\n");
        Ok(())
    }

    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}
