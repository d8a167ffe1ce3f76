use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::{AgentSnapshot, CompletedTool, Metrics};

/// Immutable record of one agent invocation, persisted onto a [`crate::Task`]
/// once its run completes. Produced by reducing the final [`AgentSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub session_id: Option<String>,
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub output: String,
    pub thinking: String,
    pub tools: Vec<CompletedTool>,
    pub metrics: Metrics,
    pub success: bool,
    pub num_turns: u64,
    pub error_msg: Option<String>,
}

impl RunRecord {
    /// Reduces a terminal [`AgentSnapshot`] into a `RunRecord`.
    /// `success` is `status == AgentStatus::Complete`, matching the
    /// round-trip property an ingest-then-reduce cycle must satisfy.
    pub fn from_snapshot(snapshot: &AgentSnapshot, ended_at: DateTime<Utc>) -> Self {
        Self {
            session_id: snapshot.session_id.clone(),
            model: snapshot.model.clone(),
            started_at: snapshot.started_at,
            ended_at,
            output: snapshot.output.clone(),
            thinking: snapshot.thinking.clone(),
            tools: snapshot.tool_history.clone(),
            metrics: snapshot.metrics.clone(),
            success: snapshot.status == crate::snapshot::AgentStatus::Complete,
            num_turns: snapshot.num_turns,
            error_msg: snapshot.error_msg.clone(),
        }
    }
}
