use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    pub name: String,
    pub passed: bool,
    pub output: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub results: Vec<VerifyResult>,
}

impl VerifyReport {
    pub fn new(results: Vec<VerifyResult>) -> Self {
        Self { results }
    }

    /// Overall pass iff every verifier passed. An empty report passes
    /// vacuously, matching an empty-list universal quantifier.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}
