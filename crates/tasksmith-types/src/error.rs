use thiserror::Error;

/// The error kinds shared across crates. Timeout, verification failure, and
/// the engine's terminal reasons are deliberately absent: each is an
/// expected-outcome path represented on its own result type (`RunOutcome`,
/// `VerifyReport`, `ExitReason`), never as an error variant here.
#[derive(Error, Debug)]
pub enum TasksmithError {
    #[error("tracker error: {0}")]
    Tracker(String),

    #[error("agent launch error: {0}")]
    AgentLaunch(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
