use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use tasksmith_budget::BudgetTracker;
use tasksmith_bus::EventBus;
use tasksmith_checkpoint::CheckpointManager;
use tasksmith_engine::{EngineDeps, IterationEngine, RunOptions, TerminationClass};
use tasksmith_observability::{canonical_logs_dir_from_root, init_process_logging, ProcessKind};
use tasksmith_tracker::{InMemoryTracker, Tracker};
use tasksmith_verify::{GitCleanVerifier, ShellVerifier, Verifier};

#[derive(Parser, Debug)]
#[command(name = "tasksmith-engine")]
#[command(
    about = "Drives a coding agent task-by-task against an epic until a terminal reason is reached"
)]
struct Cli {
    /// Path to the tasksmith.toml run configuration.
    #[arg(long, default_value = "tasksmith.toml")]
    config: PathBuf,

    /// Overrides the epic id read from the config file.
    #[arg(long)]
    epic: Option<String>,

    /// Skips running configured verifiers after a task reports completion.
    #[arg(long)]
    skip_verify: bool,

    /// Reserved for a git-worktree-per-run isolation mode; not yet wired up.
    #[arg(long)]
    use_worktree: bool,

    /// Overrides the repo root read from the config file.
    #[arg(long)]
    repo_root: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logs_dir = canonical_logs_dir_from_root(&PathBuf::from("."));
    let _guard = init_process_logging(ProcessKind::Engine, &logs_dir, 14)
        .context("failed to initialize logging")?;

    let mut config = tasksmith_config::load(&cli.config)
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    if let Some(epic) = cli.epic {
        config.epic_id = epic;
    }
    if cli.skip_verify {
        config.skip_verify = true;
    }
    if let Some(repo_root) = cli.repo_root {
        config.repo_root = Some(repo_root);
    }
    if cli.use_worktree {
        config.use_worktree = true;
    }

    info!(epic_id = %config.epic_id, "starting tasksmith-engine run");

    // The external issue tracker backend is out of scope here: this entrypoint
    // drives the in-memory reference Tracker. A production deployment supplies
    // its own Tracker impl and wires it in here instead.
    let tracker: Arc<dyn Tracker> = Arc::new(InMemoryTracker::new());

    let budget = Arc::new(BudgetTracker::new(config.budget));
    let bus = EventBus::new();

    let mut verifiers: Vec<Box<dyn Verifier>> = config
        .verifiers
        .iter()
        .map(|v| {
            Box::new(ShellVerifier::new(v.name.clone(), v.command.clone())) as Box<dyn Verifier>
        })
        .collect();
    verifiers.push(Box::new(GitCleanVerifier));

    let checkpoint_path = PathBuf::from(".tasksmith").join("checkpoint.json");
    let checkpoint = Arc::new(CheckpointManager::new(checkpoint_path));

    let engine = IterationEngine::new(EngineDeps {
        tracker,
        budget,
        bus: Some(bus),
        verifiers,
        checkpoint: Some(checkpoint),
        checkpoint_every: config.checkpoint_every,
        agent_command: config.agent_command,
        agent_args: config.agent_args,
        timeout: Duration::from_secs(config.timeout_secs),
        max_iterations: config.budget.max_iterations,
        max_cost_usd: config.budget.max_cost_usd,
    });

    let cancel = engine.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, cancelling run");
            cancel.cancel();
        }
    });

    let reason = engine
        .run(RunOptions {
            epic_id: config.epic_id,
            skip_verify: config.skip_verify,
            repo_root: config.repo_root,
        })
        .await;

    println!("{}", reason.text);
    info!(reason = %reason.text, "run finished");

    std::process::exit(match reason.class {
        TerminationClass::Clean => 0,
        TerminationClass::PreserveForResume => 1,
    });
}
