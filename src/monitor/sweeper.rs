//! Periodic staleness sweep.
//!
//! Runs once per wall-clock second under the same lock as snapshot handling.
//! Each sweep counts down the periodic radio reminder, checks whether the
//! telemetry link has gone quiet, and expires trains that stopped reporting.

use std::time::{Duration, Instant};

use log::info;

use crate::state::StateStore;
use crate::time::SimTime;

use super::events::{MonitorEvent, TrainLabel};

/// Simulation seconds without a report before a train is expired.
pub const TRAIN_STALE_SECONDS: f64 = 5.0;

/// Wall-clock silence before the telemetry link is reported lost.
pub const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sweep bookkeeping: reminder countdown and link liveness.
#[derive(Debug, Clone)]
pub struct Sweeper {
    interval: u32,
    countdown: u32,
    last_snapshot: Option<Instant>,
    link_lost_notified: bool,
}

impl Sweeper {
    /// `announce_interval` is in sweeps (seconds); 0 disables the reminder.
    #[must_use]
    pub const fn new(announce_interval: u32) -> Self {
        Self {
            interval: announce_interval,
            countdown: announce_interval,
            last_snapshot: None,
            link_lost_notified: false,
        }
    }

    /// Records that a snapshot arrived, re-arming the link-lost notice.
    pub fn note_snapshot(&mut self, at: Instant) {
        self.last_snapshot = Some(at);
        if self.link_lost_notified {
            info!("telemetry resumed");
        }
        self.link_lost_notified = false;
    }

    #[must_use]
    pub const fn link_lost_notified(&self) -> bool {
        self.link_lost_notified
    }

    /// Runs one sweep.
    pub fn sweep(&mut self, store: &mut StateStore, sim_now: SimTime, wall_now: Instant) -> Vec<MonitorEvent> {
        let mut out = Vec::new();

        if self.interval > 0 {
            self.countdown = self.countdown.saturating_sub(1);
            if self.countdown == 0 {
                out.push(MonitorEvent::PeriodicAnnounce { at: sim_now });
                self.countdown = self.interval;
            }
        }

        if let Some(last) = self.last_snapshot {
            let silent = wall_now.saturating_duration_since(last);
            if silent > TELEMETRY_TIMEOUT && !self.link_lost_notified {
                self.link_lost_notified = true;
                out.push(MonitorEvent::TelemetryLost {
                    silent_secs: silent.as_secs(),
                    at: sim_now,
                });
            }
        }

        for train_id in store.stale(sim_now, TRAIN_STALE_SECONDS) {
            let (engineer, symbol) = store
                .release(train_id)
                .map(|s| (s.last_name, s.last_symbol))
                .unwrap_or_default();
            out.push(MonitorEvent::TrainTimeout {
                train: TrainLabel {
                    train_id,
                    engineer,
                    symbol,
                },
                at: sim_now,
            });
        }

        out
    }
}
