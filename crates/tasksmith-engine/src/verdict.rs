//! The verdict processor. The pure reducer itself lives in
//! [`tasksmith_types::verdict`]: it only touches a [`tasksmith_types::Task`],
//! no async, no tracker, so both this crate and `tasksmith-tracker`'s
//! `process_verdict` RPC can share it without a dependency cycle. Re-exported
//! here under the name the rest of the engine API uses.
pub use tasksmith_types::{apply_verdict, VerdictOutcome};
