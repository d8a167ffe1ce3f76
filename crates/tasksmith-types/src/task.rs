use serde::{Deserialize, Serialize};

use crate::run_record::RunRecord;

/// What kind of human gate must be satisfied before a task can close.
/// Immutable once set on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiresKind {
    Approval,
    Review,
    Content,
}

/// Who owes the next move on a task, and for what kind of action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwaitingKind {
    Work,
    Approval,
    Input,
    Review,
    Content,
    Escalation,
    Checkpoint,
}

impl AwaitingKind {
    /// Parses the legacy string encoding the tracker may still emit.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "work" => Some(Self::Work),
            "approval" => Some(Self::Approval),
            "input" => Some(Self::Input),
            "review" => Some(Self::Review),
            "content" => Some(Self::Content),
            "escalation" => Some(Self::Escalation),
            "checkpoint" => Some(Self::Checkpoint),
            _ => None,
        }
    }
}

/// A human's ruling on the current awaiting-state. Transient: cleared
/// atomically with the transition it triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Closed,
}

/// A leaf work item consumed one-at-a-time by the iteration engine.
///
/// Invariants (see spec): `closed` implies `awaiting`/`verdict` are both
/// `None`; a `requires` gate must be routed through its matching awaiting
/// state before the task can close; `verdict` is only meaningful while
/// `awaiting` is set and is cleared atomically with it.
///
/// `manual` is the tracker's legacy dual encoding: on read, `manual == true`
/// with `awaiting.is_none()` is equivalent to `awaiting = Some(Work)`, and
/// any write clears it. Callers should prefer [`Task::awaiting_effective`]
/// over reading `manual`/`awaiting` directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub requires: Option<RequiresKind>,
    #[serde(default)]
    pub awaiting: Option<AwaitingKind>,
    #[serde(default)]
    pub verdict: Option<Verdict>,
    /// Legacy boolean alias for `awaiting == Some(Work)`. Accepted on read,
    /// always cleared on write.
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub run_record: Option<RunRecord>,
    /// Free-form progress/diagnostic notes the engine appends to (signal
    /// reasons, timeout summaries, verification-failure reports).
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Open,
            blocked_by: Vec::new(),
            requires: None,
            awaiting: None,
            verdict: None,
            manual: false,
            run_record: None,
            notes: Vec::new(),
        }
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// The task's single source of truth for "who owes work", folding the
    /// legacy `manual` flag into `awaiting` for callers that only check one field.
    pub fn awaiting_effective(&self) -> Option<AwaitingKind> {
        self.awaiting.or(if self.manual {
            Some(AwaitingKind::Work)
        } else {
            None
        })
    }

    /// A task is ready for the engine to pick up when it is not closed, not
    /// owed-to-a-human, and not blocked by other open tasks.
    pub fn is_ready(&self) -> bool {
        self.status != TaskStatus::Closed && self.awaiting_effective().is_none()
    }

    /// Clears `awaiting`, `verdict`, and `manual` together: the "cleared"
    /// output of the verdict processor.
    pub fn clear_awaiting(&mut self) {
        self.awaiting = None;
        self.verdict = None;
        self.manual = false;
    }
}

/// Parent work item aggregating tasks. Free-form notes the engine may
/// append progress/diagnostics to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Epic {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            notes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_flag_is_equivalent_to_awaiting_work() {
        let mut task = Task::new("t1");
        task.manual = true;
        assert_eq!(task.awaiting_effective(), Some(AwaitingKind::Work));
        assert!(!task.is_ready());
    }

    #[test]
    fn clear_awaiting_resets_all_three_fields() {
        let mut task = Task::new("t1");
        task.awaiting = Some(AwaitingKind::Review);
        task.verdict = Some(Verdict::Approved);
        task.manual = true;
        task.clear_awaiting();
        assert!(task.awaiting.is_none());
        assert!(task.verdict.is_none());
        assert!(!task.manual);
    }

    #[test]
    fn ready_task_has_no_effective_awaiting() {
        let task = Task::new("t1");
        assert!(task.is_ready());
    }
}
