//! Debounced speeding detection.
//!
//! A train moves through three phases:
//!
//! - **Normal**: at or below the alert threshold.
//! - **PendingConfirm**: above the alert threshold, waiting out the
//!   confirmation window. Dropping back cancels the wait.
//! - **Speeding**: confirmed. The train stays here until it drops below the
//!   resume threshold, which sits `resume_margin` under the alert threshold so
//!   a train hovering at the boundary does not flap.
//!
//! The ban and sustained warnings live on the episode and fire at most once each.

use crate::config::SpeedThresholds;
use crate::state::{SpeedingEpisode, TrainState};
use crate::telemetry::TrainSnapshot;
use crate::time::{seconds_between, SimTime};

use super::events::{MonitorEvent, SpeedReading, TrainLabel};

/// Seconds the alert threshold must stay exceeded before speeding is confirmed.
pub const SPEED_CONFIRMATION_SECONDS: f64 = 5.0;

/// Where a train currently sits in the speeding state machine.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedPhase {
    Normal,
    PendingConfirm,
    Speeding,
}

/// Derives the phase from a train's state.
#[must_use]
pub const fn phase(state: &TrainState) -> SpeedPhase {
    if state.speeding.is_some() {
        SpeedPhase::Speeding
    } else if state.exceed_start.is_some() {
        SpeedPhase::PendingConfirm
    } else {
        SpeedPhase::Normal
    }
}

/// Thresholds for one tick, all in absolute mph.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBands {
    pub effective_limit: f64,
    pub alert: f64,
    pub over: f64,
    pub resume: f64,
}

impl SpeedBands {
    #[must_use]
    pub fn compute(th: &SpeedThresholds, limit: f64, symbol: &str, block_id: u64) -> Self {
        let effective_limit = effective_limit(th, limit, symbol, block_id);
        Self {
            effective_limit,
            alert: effective_limit + th.alert_speed,
            over: effective_limit + th.over_speed,
            resume: effective_limit + th.alert_speed - th.resume_margin,
        }
    }
}

/// Posted limit plus the allowance for the train's class.
///
/// Super-consists take priority over the route-specific allowance, which only
/// applies to blocks on the configured route where the limit is exactly 25 mph.
#[must_use]
pub fn effective_limit(th: &SpeedThresholds, limit: f64, symbol: &str, block_id: u64) -> f64 {
    let base = limit.abs();
    if is_super_consist(th, symbol) {
        base + th.superc_alert_speed
    } else if is_route_section(th, limit, block_id) {
        base + th.trona_alert_speed
    } else {
        base
    }
}

fn is_super_consist(th: &SpeedThresholds, symbol: &str) -> bool {
    let symbol = symbol.to_uppercase();
    th.superc_train_symbols
        .iter()
        .any(|s| symbol.contains(s.as_str()))
}

#[allow(clippy::float_cmp)]
fn is_route_section(th: &SpeedThresholds, limit: f64, block_id: u64) -> bool {
    limit == 25.0
        && block_id
            .to_string()
            .starts_with(&th.trona_route_id.to_string())
}

/// Runs one tick of speeding detection for a tracked train.
pub(crate) fn evaluate(
    state: &mut TrainState,
    th: &SpeedThresholds,
    snap: &TrainSnapshot,
    train: &TrainLabel,
    now: SimTime,
    out: &mut Vec<MonitorEvent>,
) {
    let speed = snap.speed_mph.abs();
    let limit = snap.speed_limit_mph.abs();
    let bands = SpeedBands::compute(th, snap.speed_limit_mph, &snap.train_symbol, snap.block_id);
    let reading = SpeedReading {
        speed,
        limit,
        effective_limit: bands.effective_limit,
        block_id: snap.block_id,
    };

    if speed > bands.alert {
        if state.speeding.is_none() {
            let since = *state.exceed_start.get_or_insert(now);
            if seconds_between(since, now) >= SPEED_CONFIRMATION_SECONDS {
                let episode = SpeedingEpisode::open(now);
                out.push(MonitorEvent::SpeedingStarted {
                    train: train.clone(),
                    episode: episode.id,
                    reading,
                    at: now,
                });
                state.speeding = Some(episode);
                state.exceed_start = None;
            }
        }
    } else {
        state.exceed_start = None;
        if speed < bands.resume {
            if let Some(episode) = state.speeding.take() {
                out.push(MonitorEvent::SpeedingEnded {
                    train: train.clone(),
                    episode: episode.id,
                    duration_secs: seconds_between(episode.start_time, now),
                    max_overspeed: episode.max_overspeed,
                    escalated: episode.escalated(),
                    at: now,
                });
            }
            return;
        }
    }

    let Some(episode) = state.speeding.as_mut() else {
        return;
    };

    episode.max_overspeed = episode.max_overspeed.max(speed - limit);

    if speed > bands.over && !episode.over_threshold_warned {
        episode.over_threshold_warned = true;
        out.push(MonitorEvent::OverSpeedBan {
            train: train.clone(),
            episode: episode.id,
            reading,
            at: now,
        });
    }

    let duration_secs = seconds_between(episode.start_time, now);
    if duration_secs > th.alert_speed_timer && !episode.sustained_warned {
        episode.sustained_warned = true;
        out.push(MonitorEvent::SustainedSpeeding {
            train: train.clone(),
            episode: episode.id,
            reading,
            duration_secs,
            at: now,
        });
    }
}
