//! Content-based hashing for run IDs.

use sha2::{Digest, Sha256};
use wedm_sim::SimConfig;

use crate::types::TraceSpec;

/// Run id over everything that determines a trajectory and its trace.
pub fn compute_run_id(config: &SimConfig, seed: u64, max_steps: u64, trace: &TraceSpec) -> String {
    let mut hasher = Sha256::new();

    let config_json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(config_json.as_bytes());

    hasher.update(seed.to_le_bytes());
    hasher.update(max_steps.to_le_bytes());

    let trace_json = serde_json::to_string(trace).unwrap_or_default();
    hasher.update(trace_json.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
