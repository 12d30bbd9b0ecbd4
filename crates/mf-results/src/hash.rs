//! Content-based hashing for run IDs.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// The experiment parameters a run ID is derived from. Two experiments with
/// identical parameters get the same ID and can share a cache slot.
#[derive(Debug, Clone, Serialize)]
pub struct RunIdInputs<'a> {
    pub model: &'a str,
    pub seed: u64,
    pub runs: usize,
    pub periods: usize,
    pub engine_version: &'a str,
}

pub fn compute_run_id(inputs: &RunIdInputs<'_>) -> String {
    let mut hasher = Sha256::new();
    let json = serde_json::to_string(inputs).unwrap_or_default();
    hasher.update(json.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_stability() {
        let inputs = RunIdInputs {
            model: "demo",
            seed: 1,
            runs: 100,
            periods: 10,
            engine_version: "v1",
        };
        assert_eq!(compute_run_id(&inputs), compute_run_id(&inputs));
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let a = RunIdInputs {
            model: "demo",
            seed: 1,
            runs: 100,
            periods: 10,
            engine_version: "v1",
        };
        let b = RunIdInputs { seed: 2, ..a.clone() };
        assert_ne!(compute_run_id(&a), compute_run_id(&b));
    }
}
