//! Telemetry event sources.
//!
//! The monitor pulls events from a `TelemetrySource` instead of registering
//! callbacks, so a scripted sequence can drive it in tests exactly as a live
//! transport would.

use std::collections::VecDeque;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::TelemetryError;
use crate::time::SimTime;

use super::snapshot::TrainSnapshot;

/// Events delivered by the simulator's external dispatcher interface.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// The simulator instance was detected.
    Connected,
    /// The simulator went away.
    Disconnected,
    /// External dispatcher permission was granted (`true`) or revoked.
    Permission(bool),
    /// The simulation clock advanced.
    SimulationTick(SimTime),
    /// A per-train snapshot.
    TrainData(TrainSnapshot),
}

/// A pull-based stream of telemetry events.
pub trait TelemetrySource: Send {
    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `Ok(None)` when nothing arrived in time and
    /// `Err(TelemetryError::Closed)` once the source is exhausted.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<TelemetryEvent>, TelemetryError>;
}

/// A fixed, pre-recorded sequence of events.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    events: VecDeque<TelemetryEvent>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(events: impl IntoIterator<Item = TelemetryEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Events not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl TelemetrySource for ScriptedSource {
    fn next_event(&mut self, _timeout: Duration) -> Result<Option<TelemetryEvent>, TelemetryError> {
        self.events.pop_front().map(Some).ok_or(TelemetryError::Closed)
    }
}

/// Events pushed by another thread over a crossbeam channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<TelemetryEvent>,
}

impl ChannelSource {
    #[must_use]
    pub const fn new(rx: Receiver<TelemetryEvent>) -> Self {
        Self { rx }
    }
}

impl TelemetrySource for ChannelSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<TelemetryEvent>, TelemetryError> {
        match self.rx.recv_timeout(timeout) {
            Ok(ev) => Ok(Some(ev)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TelemetryError::Closed),
        }
    }
}
