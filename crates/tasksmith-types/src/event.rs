use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed event envelope published on the [event bus](../tasksmith_bus).
/// Mirrors the wire shape observers (a JSON-lines sink, a future TUI) expect:
/// a `type` tag plus a free-form payload, timestamped at publish time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
    pub at: DateTime<Utc>,
}

impl EngineEvent {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            at: Utc::now(),
        }
    }
}
