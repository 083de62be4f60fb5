//! Speed-change reporting.
//!
//! Compares a tracked train's speed with the previous tick. Changes larger
//! than `SPEED_CHANGE_MPH` are reported with their direction; a speed within
//! `STOPPED_MPH` of zero counts as stopped. Stops and jumps larger than
//! `NOTABLE_CHANGE_MPH` are flagged as notable.

use log::debug;

use crate::state::TrainState;
use crate::telemetry::TrainSnapshot;
use crate::time::SimTime;

use super::events::{MonitorEvent, SpeedTrend, TrainLabel};

/// Smallest change, in mph, worth reporting.
pub const SPEED_CHANGE_MPH: f64 = 0.1;

/// Speeds at or below this are treated as standing still.
pub const STOPPED_MPH: f64 = 0.01;

/// Changes above this are notable even when the train keeps moving.
pub const NOTABLE_CHANGE_MPH: f64 = 5.0;

/// Runs one tick of speed-change reporting.
///
/// Must run before coupling detection, which overwrites `prev_speed`.
pub(crate) fn evaluate(
    state: &TrainState,
    snap: &TrainSnapshot,
    train: &TrainLabel,
    now: SimTime,
    out: &mut Vec<MonitorEvent>,
) {
    let raw = snap.speed_mph.abs();
    let stopped = raw <= STOPPED_MPH;
    let speed = if stopped { 0.0 } else { raw };
    let change = speed - state.prev_speed;
    if change.abs() <= SPEED_CHANGE_MPH {
        return;
    }

    let trend = if stopped {
        SpeedTrend::Stopped
    } else if change > 0.0 {
        SpeedTrend::Accelerating
    } else {
        SpeedTrend::Decelerating
    };
    debug!(
        "[{}] {} on {} {trend} (speed {speed:.1} mph, change {change:.1} mph)",
        now.format("%H:%M:%S"),
        train.engineer,
        train.symbol
    );
    out.push(MonitorEvent::SpeedChanged {
        train: train.clone(),
        trend,
        speed,
        change,
        notable: stopped || change.abs() > NOTABLE_CHANGE_MPH,
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

    fn label() -> TrainLabel {
        TrainLabel {
            train_id: TrainId(4),
            engineer: "casey".to_string(),
            symbol: "Q4".to_string(),
        }
    }

    fn step(prev_speed: f64, speed: f64) -> Option<(SpeedTrend, f64, bool)> {
        let mut state = TrainState::new(t(0.0));
        state.prev_speed = prev_speed;
        let snap = TrainSnapshot::player(4, "casey", "Q4").with_speed(speed, 40.0);
        let mut out = Vec::new();
        evaluate(&state, &snap, &label(), t(1.0), &mut out);
        match out.as_slice() {
            [] => None,
            [MonitorEvent::SpeedChanged {
                trend,
                change,
                notable,
                ..
            }] => Some((*trend, *change, *notable)),
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn test_small_changes_are_ignored() {
        assert_eq!(step(30.0, 30.08), None);
        assert_eq!(step(30.0, 29.95), None);
        assert_eq!(step(0.0, 0.005), None);
    }

    #[test]
    fn test_direction_and_notability() {
        let (trend, change, notable) = step(30.0, 32.0).unwrap();
        assert_eq!(trend, SpeedTrend::Accelerating);
        assert!((change - 2.0).abs() < 1e-9);
        assert!(!notable);

        let (trend, _, notable) = step(30.0, 24.0).unwrap();
        assert_eq!(trend, SpeedTrend::Decelerating);
        assert!(notable);

        // Reversing reads as an absolute speed.
        let (trend, _, _) = step(10.0, -12.0).unwrap();
        assert_eq!(trend, SpeedTrend::Accelerating);
    }

    #[test]
    fn test_creeping_to_a_halt_counts_as_stopped() {
        let (trend, change, notable) = step(1.0, 0.008).unwrap();
        assert_eq!(trend, SpeedTrend::Stopped);
        assert!((change + 1.0).abs() < 1e-9);
        assert!(notable);
    }
}
