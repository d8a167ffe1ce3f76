//! The budget tracker: a `Mutex`-guarded usage counter checked
//! against configured limits, safe for concurrent use from the engine loop
//! and any observer that wants to read current spend.

use tokio::sync::Mutex;

use tasksmith_types::{BudgetLimits, BudgetUsage};

pub struct BudgetTracker {
    limits: BudgetLimits,
    usage: Mutex<BudgetUsage>,
}

impl BudgetTracker {
    pub fn new(limits: BudgetLimits) -> Self {
        Self {
            limits,
            usage: Mutex::new(BudgetUsage::default()),
        }
    }

    pub async fn add_iteration(&self) {
        let mut usage = self.usage.lock().await;
        usage.iterations += 1;
    }

    pub async fn add_cost(&self, usd: f64) {
        let mut usage = self.usage.lock().await;
        usage.cost += usd;
    }

    pub async fn add_tokens(&self, input: u64, output: u64) {
        let mut usage = self.usage.lock().await;
        usage.tokens_in += input;
        usage.tokens_out += output;
    }

    pub async fn usage(&self) -> BudgetUsage {
        self.usage.lock().await.clone()
    }

    /// Returns `true` with a reason when either configured limit (if
    /// non-zero) has been reached or exceeded. Takes a
    /// single consistent snapshot of usage under one lock acquisition.
    pub async fn should_stop(&self) -> (bool, Option<String>) {
        let usage = self.usage.lock().await;
        if self.limits.max_iterations != 0 && usage.iterations >= self.limits.max_iterations {
            return (
                true,
                Some(format!(
                    "iteration budget exhausted ({}/{})",
                    usage.iterations, self.limits.max_iterations
                )),
            );
        }
        if self.limits.max_cost_usd != 0.0 && usage.cost >= self.limits.max_cost_usd {
            return (
                true,
                Some(format!(
                    "cost budget exhausted (${:.2}/${:.2})",
                    usage.cost, self.limits.max_cost_usd
                )),
            );
        }
        (false, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_limits_never_stop() {
        let tracker = BudgetTracker::new(BudgetLimits::default());
        tracker.add_iteration().await;
        tracker.add_cost(1000.0).await;
        let (stop, reason) = tracker.should_stop().await;
        assert!(!stop);
        assert!(reason.is_none());
    }

    #[tokio::test]
    async fn iteration_limit_triggers_stop() {
        let tracker = BudgetTracker::new(BudgetLimits {
            max_iterations: 2,
            max_cost_usd: 0.0,
        });
        tracker.add_iteration().await;
        assert!(!tracker.should_stop().await.0);
        tracker.add_iteration().await;
        let (stop, reason) = tracker.should_stop().await;
        assert!(stop);
        assert!(reason.unwrap().contains("iteration"));
    }

    #[tokio::test]
    async fn cost_limit_triggers_stop() {
        let tracker = BudgetTracker::new(BudgetLimits {
            max_iterations: 0,
            max_cost_usd: 5.0,
        });
        tracker.add_cost(4.99).await;
        assert!(!tracker.should_stop().await.0);
        tracker.add_cost(0.02).await;
        let (stop, reason) = tracker.should_stop().await;
        assert!(stop);
        assert!(reason.unwrap().contains("cost"));
    }

    #[tokio::test]
    async fn usage_accumulates_tokens() {
        let tracker = BudgetTracker::new(BudgetLimits::default());
        tracker.add_tokens(100, 50).await;
        tracker.add_tokens(25, 10).await;
        let usage = tracker.usage().await;
        assert_eq!(usage.tokens_in, 125);
        assert_eq!(usage.tokens_out, 60);
    }
}
