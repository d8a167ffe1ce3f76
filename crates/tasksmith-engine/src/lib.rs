//! The verdict processor and the iteration engine that drives a coding
//! agent task-by-task against an epic.

mod engine;
mod exit_reason;
mod pause;
pub mod verdict;

pub use engine::{EngineDeps, IterationEngine, RunOptions};
pub use exit_reason::{ExitReason, TerminationClass};
pub use pause::PauseControl;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tasksmith_budget::BudgetTracker;
    use tasksmith_tracker::InMemoryTracker;
    use tasksmith_types::{BudgetLimits, Epic, RequiresKind, Task};
    use tasksmith_verify::ShellVerifier;

    fn deps(tracker: Arc<InMemoryTracker>, budget: Arc<BudgetTracker>) -> EngineDeps {
        EngineDeps {
            tracker,
            budget,
            bus: None,
            verifiers: Vec::new(),
            checkpoint: None,
            checkpoint_every: 5,
            agent_command: "sh".to_string(),
            agent_args: Vec::new(),
            timeout: Duration::from_secs(5),
            max_iterations: 0,
            max_cost_usd: 0.0,
        }
    }

    fn echo_complete_args() -> Vec<String> {
        vec![
            "-c".to_string(),
            "read _; echo '{\"type\":\"result\",\"subtype\":\"success\",\"result\":\"<<<SIGNAL:COMPLETE>>><<<END_SIGNAL>>>\"}'"
                .to_string(),
        ]
    }

    // scenario (a): single task, clean success.
    #[tokio::test]
    async fn single_task_clean_success_completes_the_epic() {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        tracker.add_task("e1", Task::new("t1")).await;
        let budget = Arc::new(BudgetTracker::new(BudgetLimits::default()));

        let mut engine_deps = deps(tracker.clone(), budget);
        engine_deps.agent_args = echo_complete_args();
        let engine = IterationEngine::new(engine_deps);

        let reason = engine
            .run(RunOptions {
                epic_id: "e1".to_string(),
                skip_verify: true,
                repo_root: None,
            })
            .await;

        assert_eq!(reason.text, "all tasks completed");
        let t1 = tracker.get_run_record("t1").await.unwrap();
        assert!(t1.is_some());
    }

    // scenario (b): gated approval.
    #[tokio::test]
    async fn task_requiring_approval_awaits_instead_of_closing() {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        let mut task = Task::new("t2");
        task.requires = Some(RequiresKind::Approval);
        tracker.add_task("e1", task).await;
        let budget = Arc::new(BudgetTracker::new(BudgetLimits::default()));

        let mut engine_deps = deps(tracker.clone(), budget);
        engine_deps.agent_args = echo_complete_args();
        let engine = IterationEngine::new(engine_deps);

        let reason = engine
            .run(RunOptions {
                epic_id: "e1".to_string(),
                skip_verify: true,
                repo_root: None,
            })
            .await;

        assert_eq!(
            reason.text,
            "no ready tasks (remaining tasks are blocked or awaiting human)"
        );
    }

    // scenario (c): handoff BLOCKED.
    #[tokio::test]
    async fn blocked_signal_sets_awaiting_input_with_reason() {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        tracker.add_task("e1", Task::new("t3")).await;
        let budget = Arc::new(BudgetTracker::new(BudgetLimits::default()));

        let mut engine_deps = deps(tracker.clone(), budget);
        engine_deps.agent_args = vec![
            "-c".to_string(),
            "read _; echo '{\"type\":\"result\",\"subtype\":\"success\",\"result\":\"<<<SIGNAL:BLOCKED>>>need credentials<<<END_SIGNAL>>>\"}'".to_string(),
        ];
        let engine = IterationEngine::new(engine_deps);

        let _ = engine
            .run(RunOptions {
                epic_id: "e1".to_string(),
                skip_verify: true,
                repo_root: None,
            })
            .await;

        let task = tracker.next_task("e1").await.unwrap();
        assert!(task.is_none(), "task should be awaiting, not ready");
    }

    // scenario (d): verification failure reopens the task.
    #[tokio::test]
    async fn failed_verifier_reopens_task_with_note() {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        tracker.add_task("e1", Task::new("t4")).await;
        let budget = Arc::new(BudgetTracker::new(BudgetLimits::default()));

        let mut engine_deps = deps(tracker.clone(), budget);
        engine_deps.agent_args = echo_complete_args();
        engine_deps.verifiers = vec![Box::new(ShellVerifier::new(
            "git",
            "echo 'M file.go' && exit 1",
        ))];
        let engine = IterationEngine::new(engine_deps);

        // the engine loops forever once the task keeps reopening, so bound
        // the run with an outer timeout and inspect state at that point.
        let _ = tokio::time::timeout(
            Duration::from_millis(500),
            engine.run(RunOptions {
                epic_id: "e1".to_string(),
                skip_verify: false,
                repo_root: None,
            }),
        )
        .await;

        let task = tracker
            .next_task("e1")
            .await
            .unwrap()
            .expect("task should have been reopened and be ready again");
        assert_eq!(task.id, "t4");
        assert!(task
            .notes
            .iter()
            .any(|n| n.contains("[git]") && n.contains("file.go") && n.contains("Please fix")));
    }

    // scenario (e): iteration cap.
    #[tokio::test]
    async fn iteration_cap_stops_after_configured_limit() {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        tracker.add_task("e1", Task::new("t5")).await;
        let budget = Arc::new(BudgetTracker::new(BudgetLimits {
            max_iterations: 3,
            max_cost_usd: 0.0,
        }));

        let mut engine_deps = deps(tracker.clone(), budget);
        // reports an error every run, so the task never closes or gets
        // gated and stays ready for the next iteration
        engine_deps.agent_args = vec![
            "-c".to_string(),
            "read _; echo '{\"type\":\"result\",\"subtype\":\"error\",\"result\":\"still working\"}'"
                .to_string(),
        ];
        let engine = IterationEngine::new(engine_deps);

        let reason = engine
            .run(RunOptions {
                epic_id: "e1".to_string(),
                skip_verify: true,
                repo_root: None,
            })
            .await;

        assert!(reason.text.starts_with("iteration limit reached"));
        assert_eq!(reason.class, TerminationClass::PreserveForResume);
    }

    // scenario (g): a run that times out still carries whatever output the
    // agent had written before it was killed.
    #[tokio::test]
    async fn timed_out_iteration_records_partial_output() {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        tracker.add_task("e1", Task::new("t7")).await;
        let budget = Arc::new(BudgetTracker::new(BudgetLimits::default()));

        let mut engine_deps = deps(tracker.clone(), budget);
        engine_deps.timeout = Duration::from_millis(200);
        engine_deps.agent_args = vec![
            "-c".to_string(),
            "echo '{\"type\":\"stream_event\",\"event\":{\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\"}}}'; \
             echo '{\"type\":\"stream_event\",\"event\":{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"halfway done\"}}}'; \
             sleep 5"
                .to_string(),
        ];
        let engine = IterationEngine::new(engine_deps);

        let _ = tokio::time::timeout(
            Duration::from_secs(2),
            engine.run(RunOptions {
                epic_id: "e1".to_string(),
                skip_verify: true,
                repo_root: None,
            }),
        )
        .await;

        let task = tracker
            .next_task("e1")
            .await
            .unwrap()
            .expect("task should remain ready after a timed-out iteration");
        assert!(task
            .notes
            .iter()
            .any(|n| n.contains("timed out") && n.contains("halfway done")));
    }

    // scenario (f): stuck task.
    #[tokio::test]
    async fn same_task_four_times_is_reported_stuck() {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        tracker.add_task("e1", Task::new("t6")).await;
        let budget = Arc::new(BudgetTracker::new(BudgetLimits::default()));

        let mut engine_deps = deps(tracker.clone(), budget);
        engine_deps.agent_args = vec![
            "-c".to_string(),
            "read _; echo '{\"type\":\"result\",\"subtype\":\"error\",\"result\":\"still working\"}'"
                .to_string(),
        ];
        let engine = IterationEngine::new(engine_deps);

        let reason = engine
            .run(RunOptions {
                epic_id: "e1".to_string(),
                skip_verify: true,
                repo_root: None,
            })
            .await;

        assert_eq!(
            reason.text,
            "stuck on task t6 after 3 iterations - may need manual review"
        );
    }
}
