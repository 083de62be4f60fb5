//! Events derived by the monitor.
//!
//! Detection code only produces these values; routing them to channels and
//! rendering text is the dispatcher's job.

use std::fmt;

use crate::state::EpisodeId;
use crate::telemetry::TrainId;
use crate::time::SimTime;

/// Identifies a train in notices.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainLabel {
    pub train_id: TrainId,
    pub engineer: String,
    pub symbol: String,
}

/// Speed readings attached to speeding notices.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedReading {
    /// Absolute speed.
    pub speed: f64,
    /// Absolute posted limit.
    pub limit: f64,
    /// Limit after class-specific allowances.
    pub effective_limit: f64,
    pub block_id: u64,
}

/// Direction of a reported speed change.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedTrend {
    Stopped,
    Accelerating,
    Decelerating,
}

impl SpeedTrend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Accelerating => "accelerating",
            Self::Decelerating => "decelerating",
        }
    }
}

impl fmt::Display for SpeedTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the monitor wants to tell the operators.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    TookControl {
        train: TrainLabel,
        railroad: String,
        loco: String,
        at: SimTime,
    },
    Relinquished {
        train: TrainLabel,
        at: SimTime,
    },
    TrainTimeout {
        train: TrainLabel,
        at: SimTime,
    },
    SpeedingStarted {
        train: TrainLabel,
        episode: EpisodeId,
        reading: SpeedReading,
        at: SimTime,
    },
    OverSpeedBan {
        train: TrainLabel,
        episode: EpisodeId,
        reading: SpeedReading,
        at: SimTime,
    },
    SustainedSpeeding {
        train: TrainLabel,
        episode: EpisodeId,
        reading: SpeedReading,
        duration_secs: f64,
        at: SimTime,
    },
    SpeedingEnded {
        train: TrainLabel,
        episode: EpisodeId,
        duration_secs: f64,
        max_overspeed: f64,
        /// An over-threshold or sustained warning fired during the episode.
        escalated: bool,
        at: SimTime,
    },
    Coupled {
        train: TrainLabel,
        prev_axles: u32,
        new_axles: u32,
        /// Absolute speed on the tick before the coupling.
        couple_speed: f64,
        hard: bool,
        at: SimTime,
    },
    SpeedChanged {
        train: TrainLabel,
        trend: SpeedTrend,
        /// Absolute speed after the change.
        speed: f64,
        /// Signed change from the previous tick.
        change: f64,
        /// A stop or a large jump, worth telling the status channel about.
        notable: bool,
        at: SimTime,
    },
    ZeroLimit {
        train: TrainLabel,
        at: SimTime,
    },
    PeriodicAnnounce {
        at: SimTime,
    },
    TelemetryLost {
        silent_secs: u64,
        at: SimTime,
    },
    ChatConnected,
}

impl MonitorEvent {
    /// The train this event concerns, if any.
    #[must_use]
    pub const fn train(&self) -> Option<&TrainLabel> {
        match self {
            Self::TookControl { train, .. }
            | Self::Relinquished { train, .. }
            | Self::TrainTimeout { train, .. }
            | Self::SpeedingStarted { train, .. }
            | Self::OverSpeedBan { train, .. }
            | Self::SustainedSpeeding { train, .. }
            | Self::SpeedingEnded { train, .. }
            | Self::Coupled { train, .. }
            | Self::SpeedChanged { train, .. }
            | Self::ZeroLimit { train, .. } => Some(train),
            Self::PeriodicAnnounce { .. } | Self::TelemetryLost { .. } | Self::ChatConnected => None,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TookControl { .. } => "took_control",
            Self::Relinquished { .. } => "relinquished",
            Self::TrainTimeout { .. } => "train_timeout",
            Self::SpeedingStarted { .. } => "speeding_started",
            Self::OverSpeedBan { .. } => "over_speed_ban",
            Self::SustainedSpeeding { .. } => "sustained_speeding",
            Self::SpeedingEnded { .. } => "speeding_ended",
            Self::Coupled { .. } => "coupled",
            Self::SpeedChanged { .. } => "speed_changed",
            Self::ZeroLimit { .. } => "zero_limit",
            Self::PeriodicAnnounce { .. } => "periodic_announce",
            Self::TelemetryLost { .. } => "telemetry_lost",
            Self::ChatConnected => "chat_connected",
        }
    }
}
