//! Simulation time.
//!
//! Every duration the monitor reasons about (debounce windows, coupling echo
//! suppression, staleness) is measured on the simulation clock, not the wall
//! clock, so pausing or fast-forwarding the simulation is handled correctly.
//! The only wall-clock measurement is the telemetry link timeout in the
//! sweeper, which uses `std::time::Instant`.

use chrono::{DateTime, Duration, Utc};

/// A simulation timestamp.
pub type SimTime = DateTime<Utc>;

/// Seconds elapsed from `earlier` to `later` (negative if `later` precedes it).
#[must_use]
pub fn seconds_between(earlier: SimTime, later: SimTime) -> f64 {
    let delta = later - earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

/// Converts fractional seconds into a chrono duration.
#[must_use]
pub fn secs(seconds: f64) -> Duration {
    Duration::microseconds((seconds * 1_000_000.0).round() as i64)
}

/// The latest simulation time reported by the telemetry source.
///
/// Until the first simulation tick arrives the clock falls back to wall-clock
/// UTC, so trains reporting before the first tick still get sensible timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock {
    last_tick: Option<SimTime>,
}

impl SimClock {
    /// Creates a clock that has not observed any simulation tick.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_tick: None }
    }

    /// Records a simulation tick.
    ///
    /// Returns true when the timeline was re-based: on the first tick, which
    /// replaces the wall-clock fallback, and whenever simulation time moves
    /// backwards (a scenario reload). Timestamps taken before a re-base are not
    /// comparable with ones taken after it.
    pub fn observe(&mut self, at: SimTime) -> bool {
        let rebased = !self.last_tick.is_some_and(|last| at >= last);
        self.last_tick = Some(at);
        rebased
    }

    /// True once at least one simulation tick has been observed.
    #[must_use]
    pub const fn has_ticked(&self) -> bool {
        self.last_tick.is_some()
    }

    /// Current simulation time, or wall-clock UTC before the first tick.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.last_tick.unwrap_or_else(Utc::now)
    }
}
