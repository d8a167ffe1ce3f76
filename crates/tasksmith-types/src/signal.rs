use serde::{Deserialize, Serialize};

use crate::task::AwaitingKind;

/// A control signal the agent embeds in-band in its text output.
///
/// Only one is reported per parse; `Complete` takes priority over every
/// handoff variant, and ties among handoff variants are broken by
/// first-occurrence offset (see [`crate::SIGNAL_TABLE`] / the signal
/// parser crate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    None,
    Complete,
    Eject(String),
    Blocked(String),
    ApprovalNeeded(String),
    InputNeeded(String),
    ReviewRequested(String),
    ContentReview(String),
    Escalate(String),
    Checkpoint(String),
}

impl Signal {
    pub fn reason(&self) -> &str {
        match self {
            Signal::None | Signal::Complete => "",
            Signal::Eject(r)
            | Signal::Blocked(r)
            | Signal::ApprovalNeeded(r)
            | Signal::InputNeeded(r)
            | Signal::ReviewRequested(r)
            | Signal::ContentReview(r)
            | Signal::Escalate(r)
            | Signal::Checkpoint(r) => r,
        }
    }

    /// The fixed handoff mapping used by the engine's routing step. `None` for
    /// `Signal::None`/`Signal::Complete`, which are handled by the engine's
    /// completion branch rather than routed as a handoff.
    pub fn awaiting_kind(&self) -> Option<AwaitingKind> {
        match self {
            Signal::None | Signal::Complete => None,
            Signal::Eject(_) => Some(AwaitingKind::Work),
            Signal::Blocked(_) => Some(AwaitingKind::Input),
            Signal::ApprovalNeeded(_) => Some(AwaitingKind::Approval),
            Signal::InputNeeded(_) => Some(AwaitingKind::Input),
            Signal::ReviewRequested(_) => Some(AwaitingKind::Review),
            Signal::ContentReview(_) => Some(AwaitingKind::Content),
            Signal::Escalate(_) => Some(AwaitingKind::Escalation),
            Signal::Checkpoint(_) => Some(AwaitingKind::Checkpoint),
        }
    }
}
