//! The agent runner: spawns the child agent process, feeds it a prompt on
//! stdin, drives its stdout through [`tasksmith_stream::StreamIngest`], and
//! captures stderr into a bounded ring buffer for diagnostics.
//!
//! One task per stream, a `Mutex<Child>` guarding the process handle,
//! kill-on-timeout. There is no live session registry here; each [`run`]
//! call owns exactly one child for its own lifetime.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use tasksmith_bus::EventBus;
use tasksmith_types::{RunRecord, TasksmithError};

/// Stderr is never allowed to grow unbounded; the oldest bytes are dropped
/// once the buffer exceeds this size, matching the "diagnostics, not a
/// transcript" role standard error plays here.
const STDERR_CAP_BYTES: usize = 64 * 1024;

/// Default timeout of 30 minutes, used
/// when a caller passes `timeout = Duration::ZERO` to inherit it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub struct RunOptions {
    pub command: String,
    pub args: Vec<String>,
    pub prompt: String,
    pub working_directory: Option<String>,
    /// Zero inherits [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
    pub bus: Option<EventBus>,
}

impl RunOptions {
    pub fn new(command: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            prompt: prompt.into(),
            working_directory: None,
            timeout: Duration::ZERO,
            bus: None,
        }
    }

    fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }
}

/// Outcome of a single agent invocation. A timeout is not an error: it is
/// an expected, handled outcome, and the engine still gets a
/// [`RunRecord`] built from whatever the child produced before it was killed.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunRecord),
    TimedOut(RunRecord),
}

impl RunOutcome {
    pub fn record(&self) -> &RunRecord {
        match self {
            RunOutcome::Completed(record) | RunOutcome::TimedOut(record) => record,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RunOutcome::TimedOut(_))
    }
}

/// Spawns `opts.command`, writes `opts.prompt` to its stdin, and drives its
/// stdout through Stream Ingest while draining stderr in the background.
/// Never returns while the child is still alive: on timeout the child is
/// killed and awaited before this function returns.
pub async fn run(opts: RunOptions) -> Result<RunOutcome, TasksmithError> {
    let mut command = Command::new(&opts.command);
    command
        .args(&opts.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &opts.working_directory {
        command.current_dir(dir);
    }

    let mut child: Child = command.spawn().map_err(|err| {
        TasksmithError::AgentLaunch(format!("failed to spawn agent process: {err}"))
    })?;

    let mut stdin = child.stdin.take().expect("piped stdin");
    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let prompt = opts.prompt.clone();
    let write_task = tokio::spawn(async move {
        let result = stdin.write_all(prompt.as_bytes()).await;
        let _ = stdin.shutdown().await;
        result
    });

    let ingest = tasksmith_stream::StreamIngest::new(opts.bus.clone());
    let snapshot_handle = ingest.handle();
    let ingest_task = tokio::spawn(async move { ingest.run(BufReader::new(stdout)).await });

    let stderr_buf = Arc::new(Mutex::new(String::new()));
    let stderr_task = tokio::spawn(drain_stderr(stderr, stderr_buf.clone()));

    let timeout = opts.effective_timeout();
    let wait_result = tokio::time::timeout(timeout, child.wait()).await;

    match wait_result {
        Ok(status) => {
            status.map_err(|err| {
                TasksmithError::AgentLaunch(format!("failed to wait on agent process: {err}"))
            })?;
            let _ = write_task.await;
            let snapshot = ingest_task
                .await
                .unwrap_or_else(|_| tasksmith_types::AgentSnapshot::new(Utc::now()));
            let _ = stderr_task.await;
            let mut record = tasksmith_stream::to_record(&snapshot);
            attach_stderr(&mut record, &stderr_buf).await;
            Ok(RunOutcome::Completed(record))
        }
        Err(_elapsed) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "agent run timed out, killing child");
            let _ = child.kill().await;
            let _ = child.wait().await;
            let snapshot = snapshot_handle.snapshot().await;
            ingest_task.abort();
            stderr_task.abort();
            write_task.abort();
            let mut record = tasksmith_stream::to_record(&snapshot);
            record.success = false;
            record.error_msg = Some("agent run timed out".to_string());
            attach_stderr(&mut record, &stderr_buf).await;
            Ok(RunOutcome::TimedOut(record))
        }
    }
}

async fn attach_stderr(record: &mut RunRecord, stderr_buf: &Arc<Mutex<String>>) {
    let stderr = stderr_buf.lock().await;
    if !stderr.is_empty() && !record.success {
        if record.output.is_empty() {
            record.output = format!("[stderr]\n{stderr}");
        }
    }
}

async fn drain_stderr(mut stderr: tokio::process::ChildStderr, buf: Arc<Mutex<String>>) {
    let mut chunk = [0u8; 4096];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&chunk[..n]);
                let mut guard = buf.lock().await;
                guard.push_str(&text);
                if guard.len() > STDERR_CAP_BYTES {
                    let excess = guard.len() - STDERR_CAP_BYTES;
                    let drain_to = guard
                        .char_indices()
                        .map(|(i, _)| i)
                        .find(|i| *i >= excess)
                        .unwrap_or(guard.len());
                    guard.drain(..drain_to);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "stderr read error, stopping drain");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_echo_run_produces_completed_record() {
        let opts = RunOptions {
            command: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "read _; echo '{\"type\":\"result\",\"subtype\":\"success\",\"result\":\"ok\"}'".to_string(),
            ],
            prompt: "go\n".to_string(),
            working_directory: None,
            timeout: Duration::from_secs(5),
            bus: None,
        };
        let outcome = run(opts).await.expect("run should succeed");
        assert!(!outcome.is_timeout());
        assert!(outcome.record().success);
    }

    #[tokio::test]
    async fn slow_child_is_killed_and_reported_as_timeout() {
        let opts = RunOptions {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 5".to_string()],
            prompt: String::new(),
            working_directory: None,
            timeout: Duration::from_millis(50),
            bus: None,
        };
        let outcome = run(opts).await.expect("run call itself should not error");
        assert!(outcome.is_timeout());
        assert!(!outcome.record().success);
    }

    #[tokio::test]
    async fn timed_out_run_still_carries_partial_output() {
        let opts = RunOptions {
            command: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo '{\"type\":\"stream_event\",\"event\":{\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\"}}}'; \
                 echo '{\"type\":\"stream_event\",\"event\":{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"partial progress\"}}}'; \
                 sleep 5"
                    .to_string(),
            ],
            prompt: String::new(),
            working_directory: None,
            timeout: Duration::from_millis(200),
            bus: None,
        };
        let outcome = run(opts).await.expect("run call itself should not error");
        assert!(outcome.is_timeout());
        assert!(!outcome.record().success);
        assert!(outcome.record().output.contains("partial progress"));
    }

    #[tokio::test]
    async fn missing_command_surfaces_spawn_error() {
        let opts = RunOptions::new("definitely-not-a-real-binary-xyz", "hi");
        let result = run(opts).await;
        assert!(matches!(result, Err(TasksmithError::AgentLaunch(_))));
    }
}
