//! Checkpoint persistence: every `checkpoint_every` iterations, serialize
//! run state to disk so a run can resume after a crash or restart.
//! Writes `serde_json::to_string_pretty` output via `tokio::fs::write` to a
//! single checkpoint file per run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use tasksmith_types::TasksmithError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub epic_id: String,
    pub iteration: u32,
    pub completed_tasks: Vec<String>,
    pub last_task_id: Option<String>,
    pub same_task_count: u32,
    pub saved_at: DateTime<Utc>,
}

pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, checkpoint: &RunCheckpoint) -> Result<(), TasksmithError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_string_pretty(checkpoint)?;
        fs::write(&self.path, payload).await?;
        tracing::debug!(path = %self.path.display(), iteration = checkpoint.iteration, "checkpoint saved");
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<RunCheckpoint>, TasksmithError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Default cadence: checkpoint every 5 iterations.
pub const DEFAULT_CHECKPOINT_EVERY: u32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("run.json"));
        let checkpoint = RunCheckpoint {
            epic_id: "e1".to_string(),
            iteration: 5,
            completed_tasks: vec!["t1".to_string()],
            last_task_id: Some("t2".to_string()),
            same_task_count: 1,
            saved_at: Utc::now(),
        };
        manager.save(&checkpoint).await.unwrap();
        let loaded = manager.load().await.unwrap().unwrap();
        assert_eq!(loaded.iteration, 5);
        assert_eq!(loaded.completed_tasks, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("missing.json"));
        assert!(manager.load().await.unwrap().is_none());
    }
}
