use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Starting,
    Thinking,
    Writing,
    ToolUse,
    Complete,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cost_usd: f64,
}

impl Metrics {
    /// Folds in a later, cumulative usage report. Every field is
    /// monotonic non-decreasing, so this takes
    /// the max rather than adding, matching how `message_delta.usage`
    /// reports running totals rather than deltas.
    pub fn merge_cumulative(&mut self, other: &Metrics) {
        self.input_tokens = self.input_tokens.max(other.input_tokens);
        self.output_tokens = self.output_tokens.max(other.output_tokens);
        self.cache_read_input_tokens = self
            .cache_read_input_tokens
            .max(other.cache_read_input_tokens);
        self.cache_creation_input_tokens = self
            .cache_creation_input_tokens
            .max(other.cache_creation_input_tokens);
        self.cost_usd = self.cost_usd.max(other.cost_usd);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveTool {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub started_at: Option<std::time::Instant>,
    pub input_accumulator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTool {
    pub id: String,
    pub name: String,
    pub input: String,
    pub duration_ms: u64,
    pub is_error: bool,
}

/// Append-only view of one agent run, owned by Stream Ingest and published
/// to observers as immutable snapshots/deltas. Every accumulated text
/// field, token count, and `num_turns` is monotonic non-decreasing across
/// the life of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub session_id: Option<String>,
    pub model: Option<String>,
    pub status: AgentStatus,
    pub thinking: String,
    pub output: String,
    pub active_tool: Option<ActiveTool>,
    pub tool_history: Vec<CompletedTool>,
    pub metrics: Metrics,
    pub num_turns: u64,
    pub error_msg: Option<String>,
    pub final_result_text: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl AgentSnapshot {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: None,
            model: None,
            status: AgentStatus::Starting,
            thinking: String::new(),
            output: String::new(),
            active_tool: None,
            tool_history: Vec::new(),
            metrics: Metrics::default(),
            num_turns: 0,
            error_msg: None,
            final_result_text: None,
            started_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, AgentStatus::Complete | AgentStatus::Error)
    }
}
