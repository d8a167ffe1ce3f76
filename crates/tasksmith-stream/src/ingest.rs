use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use tasksmith_bus::EventBus;
use tasksmith_types::{
    ActiveTool, AgentSnapshot, AgentStatus, CompletedTool, Metrics, RunRecord,
};

use crate::wire::{ContentBlockWire, DeltaWire, StreamEventBody, UsageWire, WireLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    Thinking,
    ToolUse,
}

/// Reader-safe handle onto the live snapshot a [`StreamIngest`] is writing.
/// Any number of observers may hold a clone and call [`Self::snapshot`];
/// only the ingest loop itself ever takes the write lock, matching the
/// single-writer discipline the rest of the engine relies on.
#[derive(Clone)]
pub struct SnapshotHandle(Arc<RwLock<AgentSnapshot>>);

impl SnapshotHandle {
    pub async fn snapshot(&self) -> AgentSnapshot {
        self.0.read().await.clone()
    }
}

/// Parses a line-delimited agent event stream into a live,
/// monotonic [`AgentSnapshot`], publishing one [`tasksmith_bus`] event per
/// applied line. Malformed lines increment [`Self::skipped_lines`] and are
/// otherwise ignored; so are recognized-but-unhandled event shapes.
pub struct StreamIngest {
    snapshot: Arc<RwLock<AgentSnapshot>>,
    bus: Option<EventBus>,
    block_kinds: HashMap<u64, BlockKind>,
    tool_starts: HashMap<u64, Instant>,
    terminated: bool,
    skipped_lines: Arc<AtomicU64>,
}

impl StreamIngest {
    pub fn new(bus: Option<EventBus>) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(AgentSnapshot::new(Utc::now()))),
            bus,
            block_kinds: HashMap::new(),
            tool_starts: HashMap::new(),
            terminated: false,
            skipped_lines: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn handle(&self) -> SnapshotHandle {
        SnapshotHandle(self.snapshot.clone())
    }

    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines.load(Ordering::Relaxed)
    }

    /// Drives the ingest loop to completion: reads lines until EOF or a
    /// terminal `result` event, then returns the final snapshot. If the
    /// stream ends without ever observing a `result` event, status becomes
    /// `Error` with a synthetic message describing the missing result.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, reader: R) -> AgentSnapshot {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    // Lines after termination are still drained so the
                    // child can finish writing, but ingest_line ignores
                    // them (§9 open question: first result wins).
                    self.ingest_line(&line).await;
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "stream read error, stopping ingest");
                    break;
                }
            }
        }

        let mut snapshot = self.snapshot.write().await;
        if !snapshot.is_terminal() {
            snapshot.status = AgentStatus::Error;
            snapshot.error_msg = Some("stream closed without result".to_string());
        }
        snapshot.clone()
    }

    async fn ingest_line(&mut self, line: &str) {
        if self.terminated {
            debug!("ignoring event after stream termination");
            return;
        }

        let parsed: Result<WireLine, _> = serde_json::from_str(line);
        let event = match parsed {
            Ok(event) => event,
            Err(err) => {
                self.skipped_lines.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "skipping malformed stream line");
                return;
            }
        };

        let mut snapshot = self.snapshot.write().await;
        match event {
            WireLine::System {
                session_id, model, ..
            } => {
                snapshot.session_id = session_id;
                snapshot.model = model;
                self.publish(&snapshot, None);
            }
            WireLine::StreamEvent { event } => {
                self.apply_stream_event(&mut snapshot, event);
            }
            WireLine::Result {
                subtype,
                result,
                num_turns,
                usage,
                error,
                total_cost_usd,
                ..
            } => {
                self.apply_result(
                    &mut snapshot,
                    &subtype,
                    result,
                    num_turns,
                    usage,
                    error,
                    total_cost_usd,
                );
            }
        }
    }

    fn apply_stream_event(&mut self, snapshot: &mut AgentSnapshot, event: StreamEventBody) {
        match event {
            StreamEventBody::ContentBlockStart {
                index,
                content_block,
            } => self.start_block(snapshot, index, content_block),
            StreamEventBody::ContentBlockDelta { index, delta } => {
                self.apply_delta(snapshot, index, delta)
            }
            StreamEventBody::ContentBlockStop { index } => self.stop_block(snapshot, index),
            StreamEventBody::MessageDelta { usage, .. } => {
                if let Some(usage) = usage {
                    merge_usage(&mut snapshot.metrics, usage);
                }
                self.publish(snapshot, None);
            }
        }
    }

    fn start_block(&mut self, snapshot: &mut AgentSnapshot, index: u64, block: ContentBlockWire) {
        match block.kind.as_str() {
            "text" => {
                self.block_kinds.insert(index, BlockKind::Text);
                snapshot.status = AgentStatus::Writing;
            }
            "thinking" => {
                self.block_kinds.insert(index, BlockKind::Thinking);
                snapshot.status = AgentStatus::Thinking;
            }
            "tool_use" => {
                self.block_kinds.insert(index, BlockKind::ToolUse);
                snapshot.status = AgentStatus::ToolUse;
                self.tool_starts.insert(index, Instant::now());
                let id = block.id.unwrap_or_default();
                let name = block.name.unwrap_or_default();
                self.publish_tool_start(&id, &name);
                snapshot.active_tool = Some(ActiveTool {
                    id,
                    name,
                    started_at: Some(Instant::now()),
                    input_accumulator: String::new(),
                });
            }
            other => {
                debug!(block_kind = other, "ignoring unrecognized content block type");
            }
        }
        self.publish(snapshot, None);
    }

    fn apply_delta(&mut self, snapshot: &mut AgentSnapshot, index: u64, delta: DeltaWire) {
        let Some(kind) = self.block_kinds.get(&index).copied() else {
            debug!(index, "delta for unknown block index, ignoring");
            return;
        };
        match (kind, delta) {
            (BlockKind::Text, DeltaWire::Text { text }) => {
                snapshot.output.push_str(&text);
                self.publish(snapshot, Some(("output", text)));
            }
            (BlockKind::Thinking, DeltaWire::Thinking { thinking }) => {
                snapshot.thinking.push_str(&thinking);
                self.publish(snapshot, Some(("thinking", thinking)));
            }
            (BlockKind::ToolUse, DeltaWire::InputJson { partial_json }) => {
                if let Some(tool) = snapshot.active_tool.as_mut() {
                    tool.input_accumulator.push_str(&partial_json);
                }
                self.publish(snapshot, None);
            }
            _ => {
                debug!(index, "delta type does not match its block's kind, ignoring");
            }
        }
    }

    fn stop_block(&mut self, snapshot: &mut AgentSnapshot, index: u64) {
        let kind = self.block_kinds.remove(&index);
        if kind == Some(BlockKind::ToolUse) {
            if let Some(tool) = snapshot.active_tool.take() {
                let started = self.tool_starts.remove(&index).unwrap_or_else(Instant::now);
                let duration_ms = started.elapsed().as_millis() as u64;
                self.publish_tool_end(&tool.id, &tool.name, duration_ms, false);
                snapshot.tool_history.push(CompletedTool {
                    id: tool.id,
                    name: tool.name,
                    input: tool.input_accumulator,
                    duration_ms,
                    is_error: false,
                });
                snapshot.num_turns += 1;
            }
        }
        self.publish(snapshot, None);
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_result(
        &mut self,
        snapshot: &mut AgentSnapshot,
        subtype: &str,
        result: Option<String>,
        num_turns: Option<u64>,
        usage: Option<UsageWire>,
        error: Option<String>,
        total_cost_usd: Option<f64>,
    ) {
        self.terminated = true;
        if let Some(usage) = usage {
            merge_usage(&mut snapshot.metrics, usage);
        }
        if let Some(cost) = total_cost_usd {
            snapshot.metrics.cost_usd = snapshot.metrics.cost_usd.max(cost);
        }
        if let Some(num_turns) = num_turns {
            snapshot.num_turns = snapshot.num_turns.max(num_turns);
        }
        snapshot.final_result_text = result;
        match subtype {
            "success" => {
                snapshot.status = AgentStatus::Complete;
            }
            "error" => {
                snapshot.status = AgentStatus::Error;
                snapshot.error_msg = error.or_else(|| Some("agent reported an error result".into()));
            }
            other => {
                debug!(subtype = other, "unrecognized result subtype, treating as error");
                snapshot.status = AgentStatus::Error;
                snapshot.error_msg = Some(format!("unrecognized result subtype: {other}"));
            }
        }
        self.publish(snapshot, None);
    }

    fn publish(&self, snapshot: &AgentSnapshot, delta: Option<(&str, String)>) {
        let Some(bus) = &self.bus else { return };
        if let Some((kind, chunk)) = delta {
            match kind {
                "output" => bus.publish(tasksmith_bus::output_delta(&chunk)),
                "thinking" => bus.publish(tasksmith_bus::thinking_delta(&chunk)),
                _ => {}
            }
        }
        bus.publish(tasksmith_bus::status_changed(status_label(snapshot.status)));
        bus.publish(tasksmith_bus::metrics_updated(
            snapshot.metrics.input_tokens,
            snapshot.metrics.output_tokens,
            snapshot.metrics.cost_usd,
            snapshot.num_turns,
        ));
    }

    fn publish_tool_start(&self, id: &str, name: &str) {
        if let Some(bus) = &self.bus {
            bus.publish(tasksmith_bus::tool_start(id, name));
        }
    }

    fn publish_tool_end(&self, id: &str, name: &str, duration_ms: u64, is_error: bool) {
        if let Some(bus) = &self.bus {
            bus.publish(tasksmith_bus::tool_end(id, name, duration_ms, is_error));
        }
    }
}

fn merge_usage(metrics: &mut Metrics, usage: UsageWire) {
    let incoming = Metrics {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        cache_read_input_tokens: usage.cache_read_input_tokens,
        cache_creation_input_tokens: usage.cache_creation_input_tokens,
        cost_usd: metrics.cost_usd,
    };
    metrics.merge_cumulative(&incoming);
}

fn status_label(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Starting => "starting",
        AgentStatus::Thinking => "thinking",
        AgentStatus::Writing => "writing",
        AgentStatus::ToolUse => "tool_use",
        AgentStatus::Complete => "complete",
        AgentStatus::Error => "error",
    }
}

/// Reduces a terminal snapshot into a [`RunRecord`]. A thin wrapper kept
/// alongside the ingest so callers don't need to import `chrono` directly.
pub fn to_record(snapshot: &AgentSnapshot) -> RunRecord {
    RunRecord::from_snapshot(snapshot, Utc::now())
}
