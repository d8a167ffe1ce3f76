use crate::task::{AwaitingKind, Task, TaskStatus, Verdict};

/// Outcome of applying the verdict table to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictOutcome {
    pub should_close: bool,
    pub cleared: bool,
    pub new_status: TaskStatus,
}

/// Pure reducer: `(task) -> {should_close, cleared, new_status}`. A no-op
/// (and `cleared = false`) unless both `awaiting` and `verdict` are set on
/// the task. Always clears `awaiting`, `verdict`, and `manual` together when
/// it does act.
///
/// Idempotent: a second call against the already-cleared task is a no-op,
/// since `awaiting`/`verdict` are gone.
pub fn apply_verdict(task: &mut Task) -> VerdictOutcome {
    let (Some(awaiting), Some(verdict)) = (task.awaiting, task.verdict) else {
        return VerdictOutcome {
            should_close: false,
            cleared: false,
            new_status: task.status,
        };
    };

    let should_close = match (awaiting, verdict) {
        (AwaitingKind::Work, Verdict::Approved) => true,
        (AwaitingKind::Work, Verdict::Rejected) => false,
        (AwaitingKind::Approval | AwaitingKind::Review | AwaitingKind::Content, Verdict::Approved) => true,
        (AwaitingKind::Approval | AwaitingKind::Review | AwaitingKind::Content, Verdict::Rejected) => false,
        (AwaitingKind::Input | AwaitingKind::Escalation, Verdict::Approved) => false,
        (AwaitingKind::Input | AwaitingKind::Escalation, Verdict::Rejected) => true,
        (AwaitingKind::Checkpoint, _) => false,
    };

    let new_status = if should_close {
        TaskStatus::Closed
    } else {
        TaskStatus::Open
    };

    task.clear_awaiting();
    task.status = new_status;

    VerdictOutcome {
        should_close,
        cleared: true,
        new_status,
    }
}
