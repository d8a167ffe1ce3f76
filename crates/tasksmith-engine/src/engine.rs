use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tasksmith_bus::EventBus;
use tasksmith_budget::BudgetTracker;
use tasksmith_checkpoint::{CheckpointManager, RunCheckpoint};
use tasksmith_runner::RunOutcome;
use tasksmith_tracker::Tracker;
use tasksmith_types::{AwaitingKind, RequiresKind, Task};
use tasksmith_verify::{truncate_output, verify_all, Verifier, DEFAULT_TRUNCATION_CAP};

use crate::exit_reason::ExitReason;
use crate::pause::PauseControl;

/// Run configuration, opaque prompt-construction
/// details aside.
pub struct RunOptions {
    pub epic_id: String,
    pub skip_verify: bool,
    pub repo_root: Option<String>,
}

/// Mutable loop state.
#[derive(Debug, Clone, Default)]
struct RunState {
    iteration: u32,
    completed_tasks: Vec<String>,
    last_task_id: Option<String>,
    same_task_count: u32,
}

/// Dependencies wired into one [`IterationEngine`]. Bundled into a struct
/// rather than threaded as positional constructor arguments, the same
/// composition-root shape a larger engine's dependency set would use.
pub struct EngineDeps {
    pub tracker: Arc<dyn Tracker>,
    pub budget: Arc<BudgetTracker>,
    pub bus: Option<EventBus>,
    pub verifiers: Vec<Box<dyn Verifier>>,
    pub checkpoint: Option<Arc<CheckpointManager>>,
    pub checkpoint_every: u32,
    pub agent_command: String,
    pub agent_args: Vec<String>,
    pub timeout: Duration,
    pub max_iterations: u32,
    pub max_cost_usd: f64,
}

/// The iteration engine: picks a ready task, runs the agent against it,
/// routes the result through the handoff state machine, and repeats until
/// a terminal reason is assigned. A single-epic, single-owner loop.
#[derive(Clone)]
pub struct IterationEngine {
    tracker: Arc<dyn Tracker>,
    budget: Arc<BudgetTracker>,
    bus: Option<EventBus>,
    verifiers: Arc<Vec<Box<dyn Verifier>>>,
    checkpoint: Option<Arc<CheckpointManager>>,
    checkpoint_every: u32,
    agent_command: String,
    agent_args: Vec<String>,
    timeout: Duration,
    max_iterations: u32,
    max_cost_usd: f64,
    pub pause: PauseControl,
    pub cancel: CancellationToken,
}

impl IterationEngine {
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            tracker: deps.tracker,
            budget: deps.budget,
            bus: deps.bus,
            verifiers: Arc::new(deps.verifiers),
            checkpoint: deps.checkpoint,
            checkpoint_every: deps.checkpoint_every.max(1),
            agent_command: deps.agent_command,
            agent_args: deps.agent_args,
            timeout: deps.timeout,
            max_iterations: deps.max_iterations,
            max_cost_usd: deps.max_cost_usd,
            pause: PauseControl::new(),
            cancel: CancellationToken::new(),
        }
    }

    fn publish(&self, event: tasksmith_types::EngineEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(event);
        }
    }

    /// Runs the outer loop to a terminal reason.
    pub async fn run(&self, opts: RunOptions) -> ExitReason {
        let mut state = RunState::default();
        let working_dir = opts.repo_root.clone().unwrap_or_else(|| ".".to_string());

        if let Ok(Some(epic)) = self.tracker.get_epic(&opts.epic_id).await {
            self.publish(tasksmith_bus::epic_added(&epic.id, &epic.title));
        }

        loop {
            // 1. cancellation
            if self.cancel.is_cancelled() {
                return ExitReason::context_cancelled();
            }

            // 2. pause
            while self.pause.is_paused().await {
                tokio::select! {
                    _ = self.cancel.cancelled() => return ExitReason::context_cancelled_while_paused(),
                    _ = self.pause.wait_for_resume() => {}
                }
            }

            // 3. budget
            let (should_stop, reason) = self.budget.should_stop().await;
            if should_stop {
                let usage = self.budget.usage().await;
                return if self.max_iterations != 0 && usage.iterations >= self.max_iterations {
                    ExitReason::iteration_limit_reached(usage.iterations, self.max_iterations)
                } else if self.max_cost_usd != 0.0 && usage.cost >= self.max_cost_usd {
                    ExitReason::cost_limit_reached(usage.cost, self.max_cost_usd)
                } else {
                    ExitReason {
                        text: reason.unwrap_or_else(|| "budget exhausted".to_string()),
                        class: crate::exit_reason::TerminationClass::PreserveForResume,
                    }
                };
            }

            // 4. next ready task
            let task = match self.tracker.next_task(&opts.epic_id).await {
                Ok(Some(task)) => task,
                Ok(None) => {
                    let has_open = self
                        .tracker
                        .has_open_tasks(&opts.epic_id)
                        .await
                        .unwrap_or(false);
                    if has_open {
                        return ExitReason::no_ready_tasks();
                    }
                    return if state.completed_tasks.is_empty() {
                        ExitReason::no_tasks_found()
                    } else {
                        ExitReason::all_tasks_completed()
                    };
                }
                Err(err) => return ExitReason::transient_tracker_error(&err.to_string()),
            };

            // 5. same-task loop guard
            if state.last_task_id.as_deref() == Some(task.id.as_str()) {
                state.same_task_count += 1;
            } else {
                state.last_task_id = Some(task.id.clone());
                state.same_task_count = 1;
            }
            if state.same_task_count > 3 {
                return ExitReason::stuck_on_task(&task.id);
            }

            // 6. build prompt, count the iteration
            let epic_notes = self.tracker.get_notes(&opts.epic_id).await.unwrap_or_default();
            let prompt = build_prompt(&task, &epic_notes);
            self.budget.add_iteration().await;
            state.iteration += 1;

            // 7. invoke the runner
            self.publish(tasksmith_bus::iteration_start(state.iteration));
            let run_opts = tasksmith_runner::RunOptions {
                command: self.agent_command.clone(),
                args: self.agent_args.clone(),
                prompt,
                working_directory: Some(working_dir.clone()),
                timeout: self.timeout,
                bus: self.bus.clone(),
            };

            let outcome = match tasksmith_runner::run(run_opts).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    if let Err(tracker_err) = self
                        .tracker
                        .add_note(&task.id, &format!("agent launch error: {err}"))
                        .await
                    {
                        tracing::warn!(error = %tracker_err, "failed to record launch-error note");
                    }
                    self.publish(tasksmith_bus::iteration_end(state.iteration, false, true));
                    self.maybe_checkpoint(&opts.epic_id, &state).await;
                    continue;
                }
            };

            // 8. on runner result
            match outcome {
                RunOutcome::TimedOut(record) => {
                    let partial = if record.output.is_empty() {
                        "no output captured".to_string()
                    } else {
                        truncate_output(&record.output, 2 * 1024)
                    };
                    let note = format!(
                        "iteration {} on task {} timed out after {:?}: {}",
                        state.iteration, task.id, self.timeout, partial
                    );
                    if let Err(err) = self.tracker.add_note(&task.id, &note).await {
                        tracing::warn!(error = %err, "failed to record timeout note");
                    }
                    self.publish(tasksmith_bus::iteration_end(state.iteration, true, false));
                }
                RunOutcome::Completed(record) => {
                    self.budget.add_cost(record.metrics.cost_usd).await;
                    self.budget
                        .add_tokens(record.metrics.input_tokens, record.metrics.output_tokens)
                        .await;

                    if !record.success {
                        let message = record
                            .error_msg
                            .clone()
                            .unwrap_or_else(|| "agent reported an error".to_string());
                        if let Err(err) = self.tracker.add_note(&task.id, &message).await {
                            tracing::warn!(error = %err, "failed to record error note");
                        }
                        self.publish(tasksmith_bus::iteration_end(state.iteration, false, true));
                    } else {
                        let (signal, reason) = tasksmith_signal::parse(&record.output);
                        self.publish(tasksmith_bus::signal_detected(
                            &format!("{signal:?}"),
                            &reason,
                        ));
                        self.publish(tasksmith_bus::iteration_end(state.iteration, false, false));
                        self.route_signal(&mut state, &task, signal, reason, record, &opts, &working_dir)
                            .await;
                    }
                }
            }

            // 10. checkpointing
            self.maybe_checkpoint(&opts.epic_id, &state).await;
        }
    }

    /// Step 9: the handoff state machine.
    async fn route_signal(
        &self,
        state: &mut RunState,
        task: &Task,
        signal: tasksmith_types::Signal,
        reason: String,
        record: tasksmith_types::RunRecord,
        opts: &RunOptions,
        working_dir: &str,
    ) {
        match signal.awaiting_kind() {
            Some(awaiting) => {
                if let Err(err) = self
                    .tracker
                    .set_awaiting(&task.id, awaiting, Some(&reason))
                    .await
                {
                    tracing::warn!(error = %err, task_id = %task.id, "failed to set awaiting state");
                }
            }
            None => {
                if let Some(requires) = task.requires {
                    let awaiting = match requires {
                        RequiresKind::Approval => AwaitingKind::Approval,
                        RequiresKind::Review => AwaitingKind::Review,
                        RequiresKind::Content => AwaitingKind::Content,
                    };
                    if let Err(err) = self.tracker.set_awaiting(&task.id, awaiting, None).await {
                        tracing::warn!(error = %err, task_id = %task.id, "failed to gate task on requires");
                    }
                    return;
                }

                if let Err(err) = self
                    .tracker
                    .close_task(&task.id, "agent reported completion")
                    .await
                {
                    tracing::warn!(error = %err, task_id = %task.id, "failed to close task");
                    return;
                }

                if !opts.skip_verify && !self.verifiers.is_empty() {
                    self.publish(tasksmith_bus::verification_start(&task.id));
                    let report = verify_all(&self.verifiers, &task.id, working_dir).await;
                    self.publish(tasksmith_bus::verification_end(&task.id, report.passed()));
                    if !report.passed() {
                        if let Err(err) = self.tracker.reopen_task(&task.id).await {
                            tracing::warn!(error = %err, task_id = %task.id, "failed to reopen after verification failure");
                        }
                        let note = build_verification_note(&report);
                        if let Err(err) = self.tracker.add_note(&task.id, &note).await {
                            tracing::warn!(error = %err, task_id = %task.id, "failed to record verification note");
                        }
                        return;
                    }
                }

                if let Err(err) = self.tracker.set_run_record(&task.id, record).await {
                    tracing::warn!(error = %err, task_id = %task.id, "failed to record run record");
                }
                state.completed_tasks.push(task.id.clone());
            }
        }
    }

    async fn maybe_checkpoint(&self, epic_id: &str, state: &RunState) {
        let Some(checkpoint) = &self.checkpoint else {
            return;
        };
        if state.iteration == 0 || state.iteration % self.checkpoint_every != 0 {
            return;
        }
        let snapshot = RunCheckpoint {
            epic_id: epic_id.to_string(),
            iteration: state.iteration,
            completed_tasks: state.completed_tasks.clone(),
            last_task_id: state.last_task_id.clone(),
            same_task_count: state.same_task_count,
            saved_at: chrono::Utc::now(),
        };
        if let Err(err) = checkpoint.save(&snapshot).await {
            tracing::warn!(error = %err, "failed to save checkpoint");
        }
    }
}

fn build_prompt(task: &Task, epic_notes: &[String]) -> String {
    let mut prompt = format!("Task: {}\n", task.id);
    if !epic_notes.is_empty() {
        prompt.push_str("\nEpic notes:\n");
        for note in epic_notes {
            prompt.push_str(&format!("- {note}\n"));
        }
    }
    if !task.notes.is_empty() {
        prompt.push_str("\nTask notes:\n");
        for note in &task.notes {
            prompt.push_str(&format!("- {note}\n"));
        }
    }
    prompt
}

fn build_verification_note(report: &tasksmith_types::VerifyReport) -> String {
    let mut note = String::from("Verification failed. Please fix the issues below and try again.\n");
    for result in &report.results {
        if !result.passed {
            note.push_str(&format!(
                "[{}] {}\n",
                result.name,
                truncate_output(&result.output, DEFAULT_TRUNCATION_CAP)
            ));
        }
    }
    note
}
