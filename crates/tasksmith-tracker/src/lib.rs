//! Tracker client contract and an in-memory reference implementation: an
//! `RwLock<HashMap<...>>` store behind an async API, call-serialized by
//! contract (the engine never issues concurrent RPCs against it).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tasksmith_types::{
    apply_verdict, AwaitingKind, Epic, RunRecord, Task, TaskStatus, TasksmithError, Verdict,
};

/// The RPCs the Iteration Engine issues against a task/epic store, per the
/// external interface the iteration engine depends on.
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn get_epic(&self, id: &str) -> Result<Option<Epic>, TasksmithError>;
    /// Must return only ready tasks: open, not-awaiting, unblocked.
    async fn next_task(&self, epic_id: &str) -> Result<Option<Task>, TasksmithError>;
    async fn has_open_tasks(&self, epic_id: &str) -> Result<bool, TasksmithError>;
    async fn get_notes(&self, epic_id: &str) -> Result<Vec<String>, TasksmithError>;
    async fn add_note(&self, issue_id: &str, message: &str) -> Result<(), TasksmithError>;
    async fn close_task(&self, task_id: &str, reason: &str) -> Result<(), TasksmithError>;
    async fn reopen_task(&self, task_id: &str) -> Result<(), TasksmithError>;
    async fn set_status(&self, issue_id: &str, status: TaskStatus) -> Result<(), TasksmithError>;
    async fn set_awaiting(
        &self,
        task_id: &str,
        awaiting: AwaitingKind,
        note: Option<&str>,
    ) -> Result<(), TasksmithError>;
    async fn clear_awaiting(&self, task_id: &str) -> Result<(), TasksmithError>;
    /// Writes the feedback note first, the verdict second.
    async fn set_verdict(
        &self,
        task_id: &str,
        verdict: Verdict,
        feedback: &str,
    ) -> Result<(), TasksmithError>;
    async fn set_run_record(&self, task_id: &str, record: RunRecord) -> Result<(), TasksmithError>;
    async fn get_run_record(&self, task_id: &str) -> Result<Option<RunRecord>, TasksmithError>;
    /// Reads the task's current awaiting/verdict pair, applies the verdict table, writes it back.
    async fn process_verdict(
        &self,
        task_id: &str,
    ) -> Result<(bool, bool), TasksmithError>;
}

#[derive(Default)]
struct EpicEntry {
    epic: Epic,
    task_order: Vec<String>,
}

/// Reference [`Tracker`] implementation backed by in-process maps. Intended
/// for tests and for driving the engine against a synthetic epic/task graph
/// without a real external tracker.
pub struct InMemoryTracker {
    epics: RwLock<HashMap<String, EpicEntry>>,
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self {
            epics: RwLock::new(HashMap::new()),
            tasks: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_epic(&self, epic: Epic) {
        let mut epics = self.epics.write().await;
        epics.entry(epic.id.clone()).or_insert_with(|| EpicEntry {
            epic,
            task_order: Vec::new(),
        });
    }

    /// Registers `task` under `epic_id`, appended to that epic's task order
    /// (the order [`Tracker::next_task`] scans in).
    pub async fn add_task(&self, epic_id: &str, task: Task) {
        let mut epics = self.epics.write().await;
        if let Some(entry) = epics.get_mut(epic_id) {
            entry.task_order.push(task.id.clone());
        }
        drop(epics);
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    async fn task_mut_or_err<'a>(
        tasks: &'a mut HashMap<String, Task>,
        task_id: &str,
    ) -> Result<&'a mut Task, TasksmithError> {
        tasks
            .get_mut(task_id)
            .ok_or_else(|| TasksmithError::Tracker(format!("unknown task: {task_id}")))
    }
}

impl Default for InMemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tracker for InMemoryTracker {
    async fn get_epic(&self, id: &str) -> Result<Option<Epic>, TasksmithError> {
        Ok(self.epics.read().await.get(id).map(|e| e.epic.clone()))
    }

    async fn next_task(&self, epic_id: &str) -> Result<Option<Task>, TasksmithError> {
        let epics = self.epics.read().await;
        let Some(entry) = epics.get(epic_id) else {
            return Ok(None);
        };
        let tasks = self.tasks.read().await;
        for id in &entry.task_order {
            if let Some(task) = tasks.get(id) {
                if task.is_ready() {
                    let blocked = task
                        .blocked_by
                        .iter()
                        .any(|dep| tasks.get(dep).map(|t| t.status != TaskStatus::Closed).unwrap_or(false));
                    if !blocked {
                        return Ok(Some(task.clone()));
                    }
                }
            }
        }
        Ok(None)
    }

    async fn has_open_tasks(&self, epic_id: &str) -> Result<bool, TasksmithError> {
        let epics = self.epics.read().await;
        let Some(entry) = epics.get(epic_id) else {
            return Ok(false);
        };
        let tasks = self.tasks.read().await;
        Ok(entry
            .task_order
            .iter()
            .filter_map(|id| tasks.get(id))
            .any(|t| t.status != TaskStatus::Closed))
    }

    async fn get_notes(&self, epic_id: &str) -> Result<Vec<String>, TasksmithError> {
        Ok(self
            .epics
            .read()
            .await
            .get(epic_id)
            .map(|e| e.epic.notes.clone())
            .unwrap_or_default())
    }

    async fn add_note(&self, issue_id: &str, message: &str) -> Result<(), TasksmithError> {
        if let Some(entry) = self.epics.write().await.get_mut(issue_id) {
            entry.epic.notes.push(message.to_string());
            return Ok(());
        }
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, issue_id).await?;
        task.add_note(message);
        Ok(())
    }

    async fn close_task(&self, task_id: &str, reason: &str) -> Result<(), TasksmithError> {
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, task_id).await?;
        task.status = TaskStatus::Closed;
        task.add_note(format!("closed: {reason}"));
        Ok(())
    }

    async fn reopen_task(&self, task_id: &str) -> Result<(), TasksmithError> {
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, task_id).await?;
        task.status = TaskStatus::Open;
        Ok(())
    }

    async fn set_status(&self, issue_id: &str, status: TaskStatus) -> Result<(), TasksmithError> {
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, issue_id).await?;
        task.status = status;
        Ok(())
    }

    async fn set_awaiting(
        &self,
        task_id: &str,
        awaiting: AwaitingKind,
        note: Option<&str>,
    ) -> Result<(), TasksmithError> {
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, task_id).await?;
        task.awaiting = Some(awaiting);
        if let Some(note) = note {
            task.add_note(note.to_string());
        }
        Ok(())
    }

    async fn clear_awaiting(&self, task_id: &str) -> Result<(), TasksmithError> {
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, task_id).await?;
        task.clear_awaiting();
        Ok(())
    }

    async fn set_verdict(
        &self,
        task_id: &str,
        verdict: Verdict,
        feedback: &str,
    ) -> Result<(), TasksmithError> {
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, task_id).await?;
        task.add_note(feedback.to_string());
        task.verdict = Some(verdict);
        Ok(())
    }

    async fn set_run_record(&self, task_id: &str, record: RunRecord) -> Result<(), TasksmithError> {
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, task_id).await?;
        task.run_record = Some(record);
        Ok(())
    }

    async fn get_run_record(&self, task_id: &str) -> Result<Option<RunRecord>, TasksmithError> {
        Ok(self
            .tasks
            .read()
            .await
            .get(task_id)
            .and_then(|t| t.run_record.clone()))
    }

    async fn process_verdict(&self, task_id: &str) -> Result<(bool, bool), TasksmithError> {
        let mut tasks = self.tasks.write().await;
        let task = Self::task_mut_or_err(&mut tasks, task_id).await?;
        let outcome = apply_verdict(task);
        Ok((outcome.should_close, outcome.cleared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn next_task_skips_blocked_and_awaiting() {
        let tracker = InMemoryTracker::new();
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        let mut blocked = Task::new("t1");
        blocked.blocked_by = vec!["t0".to_string()];
        let mut blocker = Task::new("t0");
        blocker.status = TaskStatus::Open;
        let ready = Task::new("t2");
        tracker.add_task("e1", blocker).await;
        tracker.add_task("e1", blocked).await;
        tracker.add_task("e1", ready).await;

        let next = tracker.next_task("e1").await.unwrap();
        assert_eq!(next.unwrap().id, "t0");
    }

    #[tokio::test]
    async fn close_then_no_open_tasks_remain() {
        let tracker = InMemoryTracker::new();
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        tracker.add_task("e1", Task::new("t1")).await;
        assert!(tracker.has_open_tasks("e1").await.unwrap());
        tracker.close_task("t1", "done").await.unwrap();
        assert!(!tracker.has_open_tasks("e1").await.unwrap());
    }

    #[tokio::test]
    async fn process_verdict_applies_table_and_clears() {
        let tracker = InMemoryTracker::new();
        tracker.add_epic(Epic::new("e1", "Epic one")).await;
        let mut task = Task::new("t1");
        task.awaiting = Some(AwaitingKind::Review);
        task.verdict = Some(Verdict::Approved);
        tracker.add_task("e1", task).await;

        let (should_close, cleared) = tracker.process_verdict("t1").await.unwrap();
        assert!(should_close);
        assert!(cleared);

        let next = tracker.next_task("e1").await.unwrap();
        assert!(next.is_none(), "task should be closed, not ready");
    }

    #[tokio::test]
    async fn add_note_on_unknown_task_errors() {
        let tracker = InMemoryTracker::new();
        let result = tracker.add_note("ghost", "hello").await;
        assert!(result.is_err());
    }
}
