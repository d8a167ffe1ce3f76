use serde_json::json;

use tasksmith_types::EngineEvent;

/// Typed constructors for every event kind the engine publishes.
/// Each wraps the shared [`EngineEvent`] envelope so observers only ever
/// need to match on `kind` + decode one `payload` shape.

pub fn iteration_start(iteration: u32) -> EngineEvent {
    EngineEvent::new("iteration.start", json!({ "iteration": iteration }))
}

pub fn iteration_end(iteration: u32, is_timeout: bool, is_error: bool) -> EngineEvent {
    EngineEvent::new(
        "iteration.end",
        json!({ "iteration": iteration, "isTimeout": is_timeout, "isError": is_error }),
    )
}

pub fn output_delta(chunk: &str) -> EngineEvent {
    EngineEvent::new("output.delta", json!({ "chunk": chunk }))
}

pub fn thinking_delta(chunk: &str) -> EngineEvent {
    EngineEvent::new("thinking.delta", json!({ "chunk": chunk }))
}

pub fn tool_start(id: &str, name: &str) -> EngineEvent {
    EngineEvent::new("tool.start", json!({ "id": id, "name": name }))
}

pub fn tool_end(id: &str, name: &str, duration_ms: u64, is_error: bool) -> EngineEvent {
    EngineEvent::new(
        "tool.end",
        json!({ "id": id, "name": name, "durationMs": duration_ms, "isError": is_error }),
    )
}

pub fn status_changed(status: &str) -> EngineEvent {
    EngineEvent::new("status", json!({ "status": status }))
}

pub fn metrics_updated(
    input_tokens: u64,
    output_tokens: u64,
    cost_usd: f64,
    num_turns: u64,
) -> EngineEvent {
    EngineEvent::new(
        "metrics",
        json!({
            "inputTokens": input_tokens,
            "outputTokens": output_tokens,
            "costUsd": cost_usd,
            "numTurns": num_turns,
        }),
    )
}

pub fn signal_detected(signal: &str, reason: &str) -> EngineEvent {
    EngineEvent::new("signal", json!({ "signal": signal, "reason": reason }))
}

pub fn verification_start(task_id: &str) -> EngineEvent {
    EngineEvent::new("verification.start", json!({ "taskId": task_id }))
}

pub fn verification_end(task_id: &str, passed: bool) -> EngineEvent {
    EngineEvent::new(
        "verification.end",
        json!({ "taskId": task_id, "passed": passed }),
    )
}

pub fn epic_added(epic_id: &str, title: &str) -> EngineEvent {
    EngineEvent::new("epic.added", json!({ "epicId": epic_id, "title": title }))
}

pub fn epic_status(epic_id: &str, status: &str) -> EngineEvent {
    EngineEvent::new("epic.status", json!({ "epicId": epic_id, "status": status }))
}
