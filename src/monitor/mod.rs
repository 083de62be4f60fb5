//! Monitor core: the per-train state machine.
//!
//! `apply_snapshot` consumes one telemetry snapshot and returns the events it
//! caused. It runs the ownership lifecycle first, then speeding, speed-change,
//! coupling and zero-limit detection, in that order. The caller holds the store lock for
//! the whole call so no two updates for a train interleave.

/// Coupling detection from axle counts.
pub mod coupling;
/// Event types produced by detection.
pub mod events;
/// Speed-change reporting.
pub mod motion;
/// Debounced speeding state machine.
pub mod speeding;
/// Periodic staleness sweep.
pub mod sweeper;
/// Zero speed-limit detection.
pub mod zero_limit;

use log::debug;

use crate::config::WatchConfig;
use crate::state::StateStore;
use crate::telemetry::TrainSnapshot;
use crate::time::SimTime;

pub use events::{MonitorEvent, SpeedReading, SpeedTrend, TrainLabel};
pub use speeding::{SpeedBands, SpeedPhase};
pub use sweeper::Sweeper;

/// Applies one snapshot to the store.
pub fn apply_snapshot(
    store: &mut StateStore,
    cfg: &WatchConfig,
    snap: &TrainSnapshot,
    now: SimTime,
) -> Vec<MonitorEvent> {
    let mut out = Vec::new();
    let id = snap.train_id;
    let kind = snap.engineer_kind;

    if store.was_player(id) && !kind.is_player() {
        let (engineer, symbol) = match store.release(id) {
            Some(s) if !s.last_name.is_empty() => (s.last_name, s.last_symbol),
            _ => (snap.engineer_name.clone(), snap.train_symbol.clone()),
        };
        out.push(MonitorEvent::Relinquished {
            train: TrainLabel {
                train_id: id,
                engineer,
                symbol,
            },
            at: now,
        });
    }

    if kind.is_player() {
        let (state, created) = store.track(id, now);
        let train = TrainLabel {
            train_id: id,
            engineer: snap.engineer_name.clone(),
            symbol: snap.train_symbol.clone(),
        };

        if created {
            debug!("tracking train {id} for {}", snap.engineer_name);
            out.push(MonitorEvent::TookControl {
                train: train.clone(),
                railroad: snap.railroad_initials.clone(),
                loco: snap.loco_number.clone(),
                at: now,
            });
        } else {
            state.last_seen = now;
        }
        state.last_name.clone_from(&snap.engineer_name);
        state.last_symbol.clone_from(&snap.train_symbol);

        speeding::evaluate(state, &cfg.thresholds, snap, &train, now, &mut out);
        if !created {
            motion::evaluate(state, snap, &train, now, &mut out);
        }
        coupling::evaluate(state, cfg.hard_couple_speed, snap, &train, now, &mut out);
        zero_limit::evaluate(state, snap, &train, now, &mut out);
    }

    store.record_kind(id, kind);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{EngineerKind, TrainId};
    use crate::time::secs;
    use chrono::{TimeZone, Utc};

    fn t(s: f64) -> SimTime {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + secs(s)
    }

    fn kinds(events: &[MonitorEvent]) -> Vec<&'static str> {
        events.iter().map(MonitorEvent::kind).collect()
    }

    #[test]
    fn test_take_control_once_then_refresh() {
        let cfg = WatchConfig::default();
        let mut store = StateStore::new();
        let snap = TrainSnapshot::player(3, "casey", "Q3").with_loco("UP", "1983");

        let ev = apply_snapshot(&mut store, &cfg, &snap, t(0.0));
        let [MonitorEvent::TookControl { railroad, loco, .. }] = ev.as_slice() else {
            panic!("expected took control, got {ev:?}");
        };
        assert_eq!((railroad.as_str(), loco.as_str()), ("UP", "1983"));

        assert!(apply_snapshot(&mut store, &cfg, &snap, t(1.0)).is_empty());
        let state = store.get(TrainId(3)).unwrap();
        assert_eq!(state.active_since, t(0.0));
        assert_eq!(state.last_seen, t(1.0));
    }

    #[test]
    fn test_non_player_trains_are_never_tracked() {
        let cfg = WatchConfig::default();
        let mut store = StateStore::new();
        let snap = TrainSnapshot::player(8, "ai", "X8")
            .with_kind(EngineerKind::Ai)
            .with_speed(90.0, 20.0);
        for i in 0..10 {
            assert!(apply_snapshot(&mut store, &cfg, &snap, t(f64::from(i))).is_empty());
        }
        assert!(store.is_empty());
        assert!(!store.was_player(TrainId(8)));
    }

    #[test]
    fn test_relinquish_uses_cached_label_and_resets() {
        let cfg = WatchConfig::default();
        let mut store = StateStore::new();
        let driving = TrainSnapshot::player(9, "casey", "Q9").with_speed(70.0, 40.0);
        for i in 0..=6 {
            apply_snapshot(&mut store, &cfg, &driving, t(f64::from(i)));
        }
        assert!(store.get(TrainId(9)).unwrap().is_speeding());

        let ai = TrainSnapshot::player(9, "", "")
            .with_kind(EngineerKind::Ai)
            .with_speed(70.0, 40.0);
        let ev = apply_snapshot(&mut store, &cfg, &ai, t(7.0));
        let [MonitorEvent::Relinquished { train, .. }] = ev.as_slice() else {
            panic!("expected relinquish, got {ev:?}");
        };
        assert_eq!(train.engineer, "casey");
        assert_eq!(train.symbol, "Q9");
        assert!(!store.contains(TrainId(9)));

        // AI keeps driving: no second relinquish.
        assert!(apply_snapshot(&mut store, &cfg, &ai, t(8.0)).is_empty());
    }

    #[test]
    fn test_speed_changes_reported_after_first_tick() {
        let cfg = WatchConfig::default();
        let mut store = StateStore::new();
        let base = TrainSnapshot::player(6, "casey", "Q6");

        let first = apply_snapshot(&mut store, &cfg, &base.clone().with_speed(30.0, 40.0), t(0.0));
        assert_eq!(kinds(&first), vec!["took_control"]);

        let ev = apply_snapshot(&mut store, &cfg, &base.clone().with_speed(33.0, 40.0), t(1.0));
        let [MonitorEvent::SpeedChanged { trend, notable, .. }] = ev.as_slice() else {
            panic!("expected speed change, got {ev:?}");
        };
        assert_eq!(*trend, SpeedTrend::Accelerating);
        assert!(!notable);

        assert!(apply_snapshot(&mut store, &cfg, &base.clone().with_speed(33.05, 40.0), t(2.0)).is_empty());

        let ev = apply_snapshot(&mut store, &cfg, &base.with_speed(0.0, 40.0), t(3.0));
        let [MonitorEvent::SpeedChanged { trend, notable, change, .. }] = ev.as_slice() else {
            panic!("expected stop, got {ev:?}");
        };
        assert_eq!(*trend, SpeedTrend::Stopped);
        assert!(*notable);
        assert!((change + 33.05).abs() < 1e-9);
    }

    #[test]
    fn test_detection_order_is_speeding_coupling_zero_limit() {
        let cfg = WatchConfig::default();
        let mut store = StateStore::new();
        let base = TrainSnapshot::player(2, "casey", "Q2")
            .with_axles(40)
            .with_speed(60.0, 0.4)
            .with_hp_per_ton(1.0);
        for i in 0..5 {
            apply_snapshot(&mut store, &cfg, &base, t(f64::from(i)));
        }
        let ev = apply_snapshot(&mut store, &cfg, &base.clone().with_axles(44), t(5.0));
        assert_eq!(kinds(&ev), vec!["speeding_started", "over_speed_ban", "coupled"]);

        // Zero-limit already fired at t=3; verify ordering on a fresh train.
        let mut store = StateStore::new();
        let snap = base.with_axles(40);
        let mut all = Vec::new();
        for i in 0..=5 {
            all.extend(apply_snapshot(&mut store, &cfg, &snap, t(f64::from(i))));
        }
        assert_eq!(
            kinds(&all),
            vec!["took_control", "zero_limit", "speeding_started", "over_speed_ban"]
        );
    }
}
