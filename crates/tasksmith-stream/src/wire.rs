//! JSON shapes for the line-delimited agent event stream.
//! Deliberately permissive: every field the ingest doesn't strictly need
//! is optional, and unrecognized `type`/`subtype` values simply don't
//! match any variant here. The ingest treats that as "unrecognized
//! event, skip" rather than a parse error.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WireLine {
    #[serde(rename = "system")]
    System {
        subtype: String,
        session_id: Option<String>,
        model: Option<String>,
        #[serde(default)]
        #[allow(dead_code)]
        cwd: Option<String>,
    },
    #[serde(rename = "stream_event")]
    StreamEvent { event: StreamEventBody },
    #[serde(rename = "result")]
    Result {
        subtype: String,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        #[allow(dead_code)]
        duration_ms: Option<u64>,
        #[serde(default)]
        num_turns: Option<u64>,
        #[serde(default)]
        total_cost_usd: Option<f64>,
        #[serde(default)]
        usage: Option<UsageWire>,
        #[serde(default)]
        error: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEventBody {
    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        index: u64,
        content_block: ContentBlockWire,
    },
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: u64, delta: DeltaWire },
    #[serde(rename = "content_block_stop")]
    ContentBlockStop { index: u64 },
    #[serde(rename = "message_delta")]
    MessageDelta {
        #[serde(default)]
        #[allow(dead_code)]
        delta: Option<MessageDeltaInner>,
        #[serde(default)]
        usage: Option<UsageWire>,
    },
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaInner {
    #[serde(default)]
    #[allow(dead_code)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlockWire {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum DeltaWire {
    #[serde(rename = "text_delta")]
    Text { text: String },
    #[serde(rename = "thinking_delta")]
    Thinking { thinking: String },
    #[serde(rename = "input_json_delta")]
    InputJson {
        #[serde(rename = "partial_json")]
        partial_json: String,
    },
}

#[derive(Debug, Default, Deserialize, Clone, Copy)]
pub struct UsageWire {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
}
