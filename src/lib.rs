//! # Trainwatch - Player Train Monitor for Multiplayer Rail Simulation
//!
//! Trainwatch consumes per-train telemetry from a running simulator and turns
//! it into operator notices: who took or gave up control of a train, who is
//! speeding, who coupled too hard, and which trains are stuck behind a zero
//! speed limit.
//!
//! ## Core Concepts
//!
//! - **TrainSnapshot**: One telemetry report for one train
//! - **StateStore**: Per-train monitoring state, present only while a player drives
//! - **MonitorEvent**: A state change worth telling someone about
//! - **Dispatcher**: Routes events to the console, chat channels and the in-sim radio
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trainwatch::{Monitor, NotifierConfig, Sinks, WatchConfig, Watcher, WatcherConfig};
//! use trainwatch::telemetry::JsonLinesSource;
//!
//! let cfg = WatchConfig::load("settings.json")?;
//! let monitor = Arc::new(Monitor::new(cfg, Sinks::console_only(), None, &NotifierConfig::default())?);
//! let source = JsonLinesSource::new(std::io::BufReader::new(std::io::stdin()));
//! let watcher = Watcher::start(monitor, Box::new(source), &WatcherConfig::default())?;
//! watcher.wait_for_source();
//! watcher.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Inputs and shared types
pub mod config;
pub mod error;
pub mod telemetry;
pub mod time;

// Detection
pub mod monitor;
pub mod state;

// Output
pub mod dispatch;
pub mod format;

// Service
pub mod runtime;

pub use config::{ChatConfig, SpeedThresholds, WatchConfig};
pub use dispatch::{Dispatcher, MemoryRadio, MemorySink, NotifierConfig, RadioLink, Sinks, Target};
pub use error::{ConfigError, DispatchError, TelemetryError, WatchError, WatchResult};
pub use format::{Fields, MessageFormatter, MessageKey, TemplateSet};
pub use monitor::{apply_snapshot, MonitorEvent, TrainLabel};
pub use runtime::{Monitor, Watcher, WatcherConfig};
pub use state::{EpisodeId, StateStore, TrainState};
pub use telemetry::{EngineerKind, TelemetryEvent, TelemetrySource, TrainId, TrainSnapshot};
pub use time::{SimClock, SimTime};
