//! Stream ingest: parses a line-delimited JSON event stream
//! emitted by the agent child process into a monotonic [`AgentSnapshot`],
//! publishing deltas through the [`tasksmith_bus::EventBus`] as it goes.

mod ingest;
mod wire;

pub use ingest::{to_record, SnapshotHandle, StreamIngest};
pub use wire::{ContentBlockWire, DeltaWire, StreamEventBody, UsageWire, WireLine};
