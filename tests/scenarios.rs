use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};

use trainwatch::monitor::{apply_snapshot, SpeedPhase, Sweeper};
use trainwatch::monitor::speeding::phase;
use trainwatch::time::secs;
use trainwatch::{EngineerKind, MonitorEvent, StateStore, TrainId, TrainSnapshot, WatchConfig};

fn t(s: f64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + secs(s)
}

fn kinds(events: &[MonitorEvent]) -> Vec<&'static str> {
    events.iter().map(MonitorEvent::kind).collect()
}

#[test]
fn route_section_speeding_confirms_after_debounce() {
    let cfg = WatchConfig::from_json_str(r#"{ "TronaAlertSpeed": 15 }"#).unwrap();
    let mut store = StateStore::new();
    let snap = TrainSnapshot::player(42, "casey", "M42")
        .with_speed(50.0, 25.0)
        .with_block(3201);

    let mut started = Vec::new();
    for tick in 1..=6 {
        let events = apply_snapshot(&mut store, &cfg, &snap, t(f64::from(tick)));
        for ev in events {
            if let MonitorEvent::SpeedingStarted { reading, at, .. } = ev {
                started.push((tick, reading.effective_limit, at));
            }
        }
    }

    assert_eq!(started.len(), 1, "{started:?}");
    let (tick, effective, at) = started[0];
    assert_eq!(tick, 6);
    assert_eq!(at, t(6.0));
    assert!((effective - (25.0 + 15.0)).abs() < f64::EPSILON);
}

#[test]
fn one_tick_spike_never_opens_an_episode() {
    let cfg = WatchConfig::default();
    let mut store = StateStore::new();
    let base = TrainSnapshot::player(1, "casey", "Q1");

    apply_snapshot(&mut store, &cfg, &base.clone().with_speed(30.0, 40.0), t(0.0));
    apply_snapshot(&mut store, &cfg, &base.clone().with_speed(90.0, 40.0), t(1.0));
    for tick in 2..20 {
        let ev = apply_snapshot(&mut store, &cfg, &base.clone().with_speed(40.0, 40.0), t(f64::from(tick)));
        assert!(!kinds(&ev).contains(&"speeding_started"));
    }
    assert_eq!(phase(store.get(TrainId(1)).unwrap()), SpeedPhase::Normal);
}

#[test]
fn hovering_at_alert_threshold_does_not_flap() {
    let cfg = WatchConfig::default();
    let mut store = StateStore::new();
    let base = TrainSnapshot::player(1, "casey", "Q1");

    let mut all = Vec::new();
    for tick in 0..=5 {
        all.extend(apply_snapshot(&mut store, &cfg, &base.clone().with_speed(50.0, 40.0), t(f64::from(tick))));
    }
    // Alert is 45; hover exactly on it, then just above resume (44).
    for (i, speed) in [45.0, 44.5, 45.0, 44.2, 45.0].into_iter().enumerate() {
        all.extend(apply_snapshot(&mut store, &cfg, &base.clone().with_speed(speed, 40.0), t(6.0 + i as f64)));
    }
    assert_eq!(
        kinds(&all).iter().filter(|k| k.starts_with("speeding")).count(),
        1,
        "{all:?}"
    );
    assert!(store.get(TrainId(1)).unwrap().is_speeding());

    let ev = apply_snapshot(&mut store, &cfg, &base.with_speed(43.9, 40.0), t(20.0));
    assert_eq!(kinds(&ev), vec!["speeding_ended", "speed_changed"]);
}

#[test]
fn coupling_echo_within_block_window_is_suppressed() {
    let cfg = WatchConfig::default();
    let mut store = StateStore::new();
    let base = TrainSnapshot::player(7, "casey", "Q7").with_speed(2.0, 40.0);

    let mut coupled_at = Vec::new();
    for tick in 0..=20 {
        let axles = match tick {
            0..=9 => 80,
            10 | 11 => 84,
            _ => 86,
        };
        let events = apply_snapshot(&mut store, &cfg, &base.clone().with_axles(axles), t(f64::from(tick)));
        coupled_at.extend(
            events
                .iter()
                .filter(|e| e.kind() == "coupled")
                .map(|_| tick),
        );
    }
    assert_eq!(coupled_at, vec![10]);
}

#[test]
fn coupling_after_block_window_is_reported() {
    let cfg = WatchConfig::default();
    let mut store = StateStore::new();
    let base = TrainSnapshot::player(7, "casey", "Q7").with_speed(2.0, 40.0);

    apply_snapshot(&mut store, &cfg, &base.clone().with_axles(80), t(0.0));
    apply_snapshot(&mut store, &cfg, &base.clone().with_axles(76), t(1.0));
    let echo = apply_snapshot(&mut store, &cfg, &base.clone().with_axles(80), t(3.0));
    assert!(echo.is_empty());

    let later = apply_snapshot(&mut store, &cfg, &base.with_axles(84), t(9.0));
    assert_eq!(kinds(&later), vec!["coupled"]);
}

#[test]
fn relinquish_mid_episode_purges_everything() {
    let cfg = WatchConfig::default();
    let mut store = StateStore::new();
    let driving = TrainSnapshot::player(9, "casey", "Q9")
        .with_speed(75.0, 40.0)
        .with_axles(60);

    for tick in 0..=8 {
        apply_snapshot(&mut store, &cfg, &driving, t(f64::from(tick)));
    }
    let episode = store.get(TrainId(9)).unwrap().speeding.clone().unwrap();
    assert!(episode.over_threshold_warned);

    let ai = TrainSnapshot::player(9, "", "Q9")
        .with_kind(EngineerKind::Ai)
        .with_speed(75.0, 40.0);
    let ev = apply_snapshot(&mut store, &cfg, &ai, t(9.0));
    assert_eq!(kinds(&ev), vec!["relinquished"]);
    assert!(!store.contains(TrainId(9)));

    let retake = TrainSnapshot::player(9, "dana", "Q9")
        .with_speed(30.0, 40.0)
        .with_axles(60);
    let ev = apply_snapshot(&mut store, &cfg, &retake, t(10.0));
    assert_eq!(kinds(&ev), vec!["took_control"]);

    let state = store.get(TrainId(9)).unwrap();
    assert!(state.speeding.is_none());
    assert!(state.exceed_start.is_none());
    assert_eq!(state.active_since, t(10.0));
    assert_eq!(state.last_name, "dana");
}

#[test]
fn warnings_reset_after_full_episode_cycle() {
    let cfg = WatchConfig::from_json_str(r#"{ "AlertSpeedTimer": 10 }"#).unwrap();
    let mut store = StateStore::new();
    let base = TrainSnapshot::player(3, "casey", "Q3");

    let mut all = Vec::new();
    let mut now = 0.0;
    for _cycle in 0..2 {
        for _ in 0..=20 {
            all.extend(apply_snapshot(&mut store, &cfg, &base.clone().with_speed(70.0, 40.0), t(now)));
            now += 1.0;
        }
        all.extend(apply_snapshot(&mut store, &cfg, &base.clone().with_speed(20.0, 40.0), t(now)));
        now += 1.0;
    }

    let count = |k: &str| kinds(&all).iter().filter(|x| **x == k).count();
    assert_eq!(count("speeding_started"), 2);
    assert_eq!(count("over_speed_ban"), 2);
    assert_eq!(count("sustained_speeding"), 2);
    assert_eq!(count("speeding_ended"), 2);
}

#[test]
fn zero_limit_fires_once_per_continuous_episode() {
    let cfg = WatchConfig::default();
    let mut store = StateStore::new();
    let stuck = TrainSnapshot::player(11, "casey", "Q11").with_speed(0.0, 0.0);

    let mut fired = Vec::new();
    for tick in 0..10 {
        let ev = apply_snapshot(&mut store, &cfg, &stuck, t(f64::from(tick)));
        if kinds(&ev).contains(&"zero_limit") {
            fired.push(tick);
        }
    }
    assert_eq!(fired, vec![3]);

    // No horsepower: condition does not hold.
    let mut store = StateStore::new();
    let dead = stuck.clone().with_hp_per_ton(0.0);
    for tick in 0..10 {
        let ev = apply_snapshot(&mut store, &cfg, &dead, t(f64::from(tick)));
        assert!(!kinds(&ev).contains(&"zero_limit"));
    }

    // Clearing the condition re-arms it.
    let mut store = StateStore::new();
    let mut fired = 0;
    for tick in 0..20 {
        let limit = if tick == 8 { 30.0 } else { 0.0 };
        let ev = apply_snapshot(&mut store, &cfg, &stuck.clone().with_speed(0.0, limit), t(f64::from(tick)));
        fired += kinds(&ev).iter().filter(|k| **k == "zero_limit").count();
    }
    assert_eq!(fired, 2);
}

/// Small deterministic generator so the lifecycle check covers many interleavings.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }
}

#[test]
fn state_exists_iff_player_and_recently_reporting() {
    let cfg = WatchConfig::default();
    let mut store = StateStore::new();
    let mut sweeper = Sweeper::new(0);
    let wall = Instant::now();
    let mut rng = Lcg(0x5eed);
    let mut last_obs: HashMap<u32, (EngineerKind, f64)> = HashMap::new();

    for tick in 0..400 {
        let now = f64::from(tick);
        for id in 1..=6u32 {
            let roll = rng.next() % 10;
            let kind = match roll {
                0..=2 => continue,
                3 => EngineerKind::Ai,
                4 => EngineerKind::None,
                _ => EngineerKind::Player,
            };
            let snap = TrainSnapshot::player(id, "casey", "Q").with_kind(kind);
            apply_snapshot(&mut store, &cfg, &snap, t(now));
            last_obs.insert(id, (kind, now));
        }
        sweeper.sweep(&mut store, t(now), wall);

        for id in 1..=6u32 {
            let expected = match last_obs.get(&id) {
                Some((kind, seen)) => kind.is_player() && now - seen <= 5.0,
                None => false,
            };
            assert_eq!(
                store.contains(TrainId(id)),
                expected,
                "train {id} at tick {tick}: last observation {:?}",
                last_obs.get(&id)
            );
        }
    }
}
