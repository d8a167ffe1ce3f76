/// The nine exit reason strings are part of the external
/// contract: downstream tooling classifies runs by matching on them, so
/// every constructor here reproduces its text verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReason {
    pub text: String,
    pub class: TerminationClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationClass {
    /// Worktree may be cleaned up.
    Clean,
    /// Worktree is retained so the run can be resumed.
    PreserveForResume,
}

impl ExitReason {
    pub fn all_tasks_completed() -> Self {
        Self {
            text: "all tasks completed".to_string(),
            class: TerminationClass::Clean,
        }
    }

    pub fn no_tasks_found() -> Self {
        Self {
            text: "no tasks found".to_string(),
            class: TerminationClass::Clean,
        }
    }

    pub fn no_ready_tasks() -> Self {
        Self {
            text: "no ready tasks (remaining tasks are blocked or awaiting human)".to_string(),
            class: TerminationClass::PreserveForResume,
        }
    }

    pub fn context_cancelled() -> Self {
        Self {
            text: "context cancelled".to_string(),
            class: TerminationClass::PreserveForResume,
        }
    }

    pub fn context_cancelled_while_paused() -> Self {
        Self {
            text: "context cancelled while paused".to_string(),
            class: TerminationClass::PreserveForResume,
        }
    }

    pub fn stuck_on_task(task_id: &str) -> Self {
        Self {
            text: format!("stuck on task {task_id} after 3 iterations - may need manual review"),
            class: TerminationClass::PreserveForResume,
        }
    }

    pub fn iteration_limit_reached(current: u32, max: u32) -> Self {
        Self {
            text: format!("iteration limit reached ({current}/{max})"),
            class: TerminationClass::PreserveForResume,
        }
    }

    pub fn cost_limit_reached(current: f64, max: f64) -> Self {
        Self {
            text: format!("cost limit reached (${current:.2}/${max:.2})"),
            class: TerminationClass::PreserveForResume,
        }
    }

    pub fn transient_tracker_error(message: &str) -> Self {
        Self {
            text: message.to_string(),
            class: TerminationClass::PreserveForResume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuck_on_task_includes_id_verbatim() {
        let reason = ExitReason::stuck_on_task("t9");
        assert_eq!(
            reason.text,
            "stuck on task t9 after 3 iterations - may need manual review"
        );
    }

    #[test]
    fn clean_terminations_are_classified_clean() {
        assert_eq!(
            ExitReason::all_tasks_completed().class,
            TerminationClass::Clean
        );
        assert_eq!(ExitReason::no_tasks_found().class, TerminationClass::Clean);
    }

    #[test]
    fn preserve_for_resume_terminations_are_classified_correctly() {
        assert_eq!(
            ExitReason::no_ready_tasks().class,
            TerminationClass::PreserveForResume
        );
        assert_eq!(
            ExitReason::context_cancelled().class,
            TerminationClass::PreserveForResume
        );
    }
}
