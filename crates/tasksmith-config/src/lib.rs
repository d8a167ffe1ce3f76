//! Configuration loading: the child agent binary and its invocation are
//! opaque to this crate. Reads a TOML file, then applies a small set of
//! environment-variable overrides, a two-layer shape (file layer, then
//! env/runtime layer merged on top) simplified here to one file plus
//! `TASKSMITH_*` env vars since there's no multi-provider config surface
//! to layer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tasksmith_types::{BudgetLimits, TasksmithError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub epic_id: String,
    #[serde(default)]
    pub skip_verify: bool,
    #[serde(default)]
    pub use_worktree: bool,
    pub repo_root: Option<String>,
    #[serde(default = "default_agent_command")]
    pub agent_command: String,
    #[serde(default)]
    pub agent_args: Vec<String>,
    #[serde(default)]
    pub budget: BudgetLimits,
    #[serde(default)]
    pub verifiers: Vec<VerifierConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub name: String,
    pub command: String,
}

fn default_agent_command() -> String {
    "claude".to_string()
}

fn default_timeout_secs() -> u64 {
    30 * 60
}

fn default_checkpoint_every() -> u32 {
    5
}

/// Loads `path` as TOML, then overlays `TASKSMITH_*` environment variables.
/// File layer first, then env/runtime layer merged on top; there's only one
/// config surface here, not per-provider layers.
pub async fn load(path: impl AsRef<Path>) -> Result<RunConfig, TasksmithError> {
    let contents = tokio::fs::read_to_string(path.as_ref()).await?;
    let mut config: RunConfig = toml::from_str(&contents)
        .map_err(|err| TasksmithError::Config(format!("invalid config file: {err}")))?;
    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut RunConfig) {
    if let Ok(epic_id) = std::env::var("TASKSMITH_EPIC_ID") {
        config.epic_id = epic_id;
    }
    if let Ok(value) = std::env::var("TASKSMITH_SKIP_VERIFY") {
        config.skip_verify = value == "1" || value.eq_ignore_ascii_case("true");
    }
    if let Ok(value) = std::env::var("TASKSMITH_MAX_ITERATIONS") {
        if let Ok(parsed) = value.parse() {
            config.budget.max_iterations = parsed;
        }
    }
    if let Ok(value) = std::env::var("TASKSMITH_MAX_COST_USD") {
        if let Ok(parsed) = value.parse() {
            config.budget.max_cost_usd = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasksmith.toml");
        tokio::fs::write(&path, "epic_id = \"e1\"\n").await.unwrap();
        let config = load(&path).await.unwrap();
        assert_eq!(config.epic_id, "e1");
        assert_eq!(config.agent_command, "claude");
        assert_eq!(config.timeout_secs, 30 * 60);
        assert_eq!(config.checkpoint_every, 5);
    }

    #[tokio::test]
    async fn env_override_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasksmith.toml");
        tokio::fs::write(&path, "epic_id = \"e1\"\n").await.unwrap();
        std::env::set_var("TASKSMITH_EPIC_ID", "e2");
        let config = load(&path).await.unwrap();
        std::env::remove_var("TASKSMITH_EPIC_ID");
        assert_eq!(config.epic_id, "e2");
    }

    #[tokio::test]
    async fn parses_verifier_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasksmith.toml");
        tokio::fs::write(
            &path,
            "epic_id = \"e1\"\n\n[[verifiers]]\nname = \"tests\"\ncommand = \"cargo test\"\n",
        )
        .await
        .unwrap();
        let config = load(&path).await.unwrap();
        assert_eq!(config.verifiers.len(), 1);
        assert_eq!(config.verifiers[0].name, "tests");
    }
}
