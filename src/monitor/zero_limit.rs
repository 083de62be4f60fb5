//! Zero speed-limit detection.
//!
//! The simulator occasionally reports a 0 mph limit after a bad hand-off;
//! briefly relinquishing the train fixes it. The radio notice fires once per
//! continuous episode, and only after the condition has held for
//! `ZERO_LIMIT_ONSET_SECONDS` on a train that actually has power.

use crate::state::TrainState;
use crate::telemetry::TrainSnapshot;
use crate::time::{seconds_between, SimTime};

use super::events::{MonitorEvent, TrainLabel};

/// Seconds a zero limit must persist before the radio notice is sent.
pub const ZERO_LIMIT_ONSET_SECONDS: f64 = 3.0;

fn limit_is_zero(limit_mph: f64) -> bool {
    limit_mph.trunc() == 0.0
}

pub(crate) fn evaluate(
    state: &mut TrainState,
    snap: &TrainSnapshot,
    train: &TrainLabel,
    now: SimTime,
    out: &mut Vec<MonitorEvent>,
) {
    if snap.hp_per_ton <= 0.0 || !limit_is_zero(snap.speed_limit_mph) {
        state.zero_limit_first_seen = None;
        state.zero_limit_announced = false;
        return;
    }

    let Some(first_seen) = state.zero_limit_first_seen else {
        state.zero_limit_first_seen = Some(now);
        return;
    };

    if state.zero_limit_announced || seconds_between(first_seen, now) < ZERO_LIMIT_ONSET_SECONDS {
        return;
    }

    state.zero_limit_first_seen = None;
    state.zero_limit_announced = true;
    out.push(MonitorEvent::ZeroLimit {
        train: train.clone(),
        at: now,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TrainId;
    use crate::time::secs;
    use chrono::{TimeZone, Utc};

    fn t(s: f64) -> SimTime {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + secs(s)
    }

    fn tick(state: &mut TrainState, limit: f64, hp_per_ton: f64, at: f64) -> usize {
        let snap = TrainSnapshot::player(5, "casey", "Z1")
            .with_speed(0.0, limit)
            .with_hp_per_ton(hp_per_ton);
        let train = TrainLabel {
            train_id: TrainId(5),
            engineer: "casey".to_string(),
            symbol: "Z1".to_string(),
        };
        let mut out = Vec::new();
        evaluate(state, &snap, &train, t(at), &mut out);
        out.len()
    }

    #[test]
    fn test_fires_once_after_onset_window() {
        let mut state = TrainState::new(t(0.0));
        assert_eq!(tick(&mut state, 0.0, 1.5, 0.0), 0);
        assert_eq!(tick(&mut state, 0.0, 1.5, 1.0), 0);
        assert_eq!(tick(&mut state, 0.0, 1.5, 2.9), 0);
        assert_eq!(tick(&mut state, 0.0, 1.5, 3.0), 1);
        assert!(state.zero_limit_announced);

        for i in 4..20 {
            assert_eq!(tick(&mut state, 0.0, 1.5, f64::from(i)), 0);
        }
    }

    #[test]
    fn test_rearms_after_condition_clears() {
        let mut state = TrainState::new(t(0.0));
        for i in 0..=3 {
            tick(&mut state, 0.0, 1.5, f64::from(i));
        }
        assert!(state.zero_limit_announced);

        assert_eq!(tick(&mut state, 40.0, 1.5, 4.0), 0);
        assert!(!state.zero_limit_announced);
        assert!(state.zero_limit_first_seen.is_none());

        let fired: usize = (5..=8).map(|i| tick(&mut state, 0.0, 1.5, f64::from(i))).sum();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_unpowered_trains_and_transients_never_fire() {
        let mut state = TrainState::new(t(0.0));
        for i in 0..10 {
            assert_eq!(tick(&mut state, 0.0, 0.0, f64::from(i)), 0);
        }
        assert!(state.zero_limit_first_seen.is_none());

        // Alternating good and bad readings keep resetting the onset.
        for i in 0..10 {
            let limit = if i % 2 == 0 { 0.0 } else { 30.0 };
            assert_eq!(tick(&mut state, limit, 2.0, f64::from(i)), 0);
        }
    }

    #[test]
    fn test_fractional_limit_below_one_counts_as_zero() {
        let mut state = TrainState::new(t(0.0));
        tick(&mut state, 0.4, 1.0, 0.0);
        assert_eq!(tick(&mut state, 0.4, 1.0, 3.5), 1);
    }
}
