//! The verifier set: a `Verifier` trait directly modeled on a `Tool`-style
//! execute interface (`schema()`/`execute()` collapsed here to just
//! `name()`/`run()`, since verifiers don't need a JSON input schema; they
//! always run against a task id and a working directory).

use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use tasksmith_types::{VerifyReport, VerifyResult};

#[async_trait]
pub trait Verifier: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, task_id: &str, working_dir: &str) -> VerifyResult;
}

/// Runs each configured verifier to completion independently and folds the
/// results into one [`VerifyReport`], per the configured cap.
pub async fn verify_all(
    verifiers: &[Box<dyn Verifier>],
    task_id: &str,
    working_dir: &str,
) -> VerifyReport {
    let mut results = Vec::with_capacity(verifiers.len());
    for verifier in verifiers {
        results.push(verifier.run(task_id, working_dir).await);
    }
    VerifyReport::new(results)
}

/// Runs a configured shell command; passes iff its exit status is success.
pub struct ShellVerifier {
    name: String,
    command: String,
}

impl ShellVerifier {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

#[async_trait]
impl Verifier for ShellVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _task_id: &str, working_dir: &str) -> VerifyResult {
        let started = Instant::now();
        let output = Command::new("sh")
            .args(["-c", &self.command])
            .current_dir(working_dir)
            .output()
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match output {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.is_empty() {
                    if !combined.is_empty() {
                        combined.push('\n');
                    }
                    combined.push_str(&stderr);
                }
                VerifyResult {
                    name: self.name.clone(),
                    passed: output.status.success(),
                    output: combined,
                    duration_ms,
                }
            }
            Err(err) => VerifyResult {
                name: self.name.clone(),
                passed: false,
                output: format!("failed to run verifier command: {err}"),
                duration_ms,
            },
        }
    }
}

/// Zero-config verifier: the working tree must have no uncommitted changes.
/// Any `git status --porcelain` output is treated as failure.
pub struct GitCleanVerifier;

#[async_trait]
impl Verifier for GitCleanVerifier {
    fn name(&self) -> &str {
        "git"
    }

    async fn run(&self, _task_id: &str, working_dir: &str) -> VerifyResult {
        let started = Instant::now();
        let output = Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(working_dir)
            .output()
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                VerifyResult {
                    name: "git".to_string(),
                    passed: output.status.success() && stdout.trim().is_empty(),
                    output: stdout,
                    duration_ms,
                }
            }
            Err(err) => VerifyResult {
                name: "git".to_string(),
                passed: false,
                output: format!("failed to run git status: {err}"),
                duration_ms,
            },
        }
    }
}

/// Truncates verifier output to `cap` bytes with an explicit indicator.
/// Applied by the engine when folding a [`VerifyReport`] into a tracker
/// note, not by verifiers themselves.
pub fn truncate_output(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let boundary = text
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|i| *i <= cap)
        .last()
        .unwrap_or(0);
    format!("{}...[truncated]", &text[..boundary])
}

pub const DEFAULT_TRUNCATION_CAP: usize = 2 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shell_verifier_passes_on_zero_exit() {
        let verifier = ShellVerifier::new("echo", "exit 0");
        let result = verifier.run("t1", "/tmp").await;
        assert!(result.passed);
        assert_eq!(result.name, "echo");
    }

    #[tokio::test]
    async fn shell_verifier_fails_on_nonzero_exit() {
        let verifier = ShellVerifier::new("fail", "exit 1");
        let result = verifier.run("t1", "/tmp").await;
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn verify_all_aggregates_independent_results() {
        let verifiers: Vec<Box<dyn Verifier>> = vec![
            Box::new(ShellVerifier::new("ok", "exit 0")),
            Box::new(ShellVerifier::new("bad", "exit 1")),
        ];
        let report = verify_all(&verifiers, "t1", "/tmp").await;
        assert_eq!(report.results.len(), 2);
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn empty_verifier_list_passes_vacuously() {
        let verifiers: Vec<Box<dyn Verifier>> = Vec::new();
        let report = verify_all(&verifiers, "t1", "/tmp").await;
        assert!(report.passed());
    }

    #[test]
    fn truncate_output_adds_indicator_past_cap() {
        let text = "a".repeat(10);
        let truncated = truncate_output(&text, 4);
        assert!(truncated.ends_with("...[truncated]"));
        assert!(truncated.starts_with("aaaa"));
    }

    #[test]
    fn truncate_output_is_noop_under_cap() {
        let text = "short";
        assert_eq!(truncate_output(text, 100), text);
    }
}
