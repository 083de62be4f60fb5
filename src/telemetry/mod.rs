//! Telemetry input: per-train snapshots and the sources that deliver them.

/// JSON-lines source for recorded or piped sessions.
pub mod jsonl;
/// Snapshot and identifier types.
pub mod snapshot;
/// Event enum, source trait, scripted and channel sources.
pub mod source;

pub use jsonl::JsonLinesSource;
pub use snapshot::{EngineerKind, TrainId, TrainSnapshot};
pub use source::{ChannelSource, ScriptedSource, TelemetryEvent, TelemetrySource};
