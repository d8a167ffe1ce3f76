use serde::{Deserialize, Serialize};

/// Hard caps on a run. `0` means unlimited for either field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetLimits {
    pub max_iterations: u32,
    pub max_cost_usd: f64,
}

/// Accumulated usage counters for a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetUsage {
    pub iterations: u32,
    pub cost: f64,
    pub tokens_in: u64,
    pub tokens_out: u64,
}
