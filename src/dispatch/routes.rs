//! Which channels each event goes to, and with which template fields.
//!
//! | Event | Console | Status | Alert | Radio |
//! |---|---|---|---|---|
//! | took control / relinquished / timeout | yes | verbose only | | |
//! | speeding started | yes | yes | | |
//! | over-speed ban | yes | | yes, with role mention if set | |
//! | sustained speeding | yes | | yes | |
//! | speeding ended | yes | yes | if the episode escalated | |
//! | coupled | yes | hard, or verbose | hard only | |
//! | speed change (stop or big jump) | | verbose only | | |
//! | zero limit | yes | | | notice + message |
//! | periodic reminder | | | | notice + message |
//! | telemetry lost | yes | yes | | |
//! | chat connected | | yes | | |

use crate::config::WatchConfig;
use crate::format::{Fields, MessageKey};
use crate::monitor::{MonitorEvent, SpeedReading, TrainLabel};
use crate::time::SimTime;

/// Logical destination of a notice.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Console,
    Status,
    Alert,
    /// Alert channel, prefixed with the configured role mention.
    AlertWithMention,
    Radio,
}

/// One message to render and deliver.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub key: MessageKey,
    pub fields: Fields,
    pub routes: Vec<Route>,
}

impl Notice {
    fn new(key: MessageKey, fields: Fields, routes: Vec<Route>) -> Self {
        Self { key, fields, routes }
    }
}

fn time_fields(at: SimTime) -> Fields {
    Fields::new().with("time", at.format("%H:%M:%S"))
}

fn train_fields(train: &TrainLabel, at: SimTime) -> Fields {
    time_fields(at)
        .with("train_id", train.train_id)
        .with("engineer", &train.engineer)
        .with("symbol", &train.symbol)
}

fn reading_fields(fields: Fields, reading: &SpeedReading) -> Fields {
    fields
        .with_mph("speed", reading.speed)
        .with_mph("limit", reading.limit)
        .with_mph("effective_limit", reading.effective_limit)
        .with_mph("overspeed", reading.speed - reading.limit)
        .with("block", reading.block_id)
}

fn lifecycle_routes(cfg: &WatchConfig) -> Vec<Route> {
    if cfg.verbose_logging {
        vec![Route::Console, Route::Status]
    } else {
        vec![Route::Console]
    }
}

/// Maps one event to the notices it produces.
#[must_use]
pub fn notices_for(event: &MonitorEvent, cfg: &WatchConfig) -> Vec<Notice> {
    let self_name = cfg.chat.self_name.as_str();

    match event {
        MonitorEvent::TookControl {
            train,
            railroad,
            loco,
            at,
        } => vec![Notice::new(
            MessageKey::TookControl,
            train_fields(train, *at)
                .with("railroad", railroad)
                .with("loco", loco),
            lifecycle_routes(cfg),
        )],

        MonitorEvent::Relinquished { train, at } => vec![Notice::new(
            MessageKey::Relinquish,
            train_fields(train, *at),
            lifecycle_routes(cfg),
        )],

        MonitorEvent::TrainTimeout { train, at } => vec![Notice::new(
            MessageKey::TrainTimeout,
            train_fields(train, *at),
            lifecycle_routes(cfg),
        )],

        MonitorEvent::SpeedingStarted {
            train,
            episode,
            reading,
            at,
        } => vec![Notice::new(
            MessageKey::SpeedingStart,
            reading_fields(train_fields(train, *at), reading).with("episode", episode),
            vec![Route::Console, Route::Status],
        )],

        MonitorEvent::OverSpeedBan {
            train,
            episode,
            reading,
            at,
        } => {
            let alert = if cfg.chat.alert_role.is_some() {
                Route::AlertWithMention
            } else {
                Route::Alert
            };
            vec![Notice::new(
                MessageKey::OverSpeedBan,
                reading_fields(train_fields(train, *at), reading).with("episode", episode),
                vec![Route::Console, alert],
            )]
        }

        MonitorEvent::SustainedSpeeding {
            train,
            episode,
            reading,
            duration_secs,
            at,
        } => vec![Notice::new(
            MessageKey::SustainedSpeedBan,
            reading_fields(train_fields(train, *at), reading)
                .with("episode", episode)
                .with("duration", format!("{duration_secs:.0}")),
            vec![Route::Console, Route::Alert],
        )],

        MonitorEvent::SpeedingEnded {
            train,
            episode,
            duration_secs,
            max_overspeed,
            escalated,
            at,
        } => {
            let mut routes = vec![Route::Console, Route::Status];
            if *escalated {
                routes.push(Route::Alert);
            }
            vec![Notice::new(
                MessageKey::SpeedingEnd,
                train_fields(train, *at)
                    .with("episode", episode)
                    .with("duration", format!("{duration_secs:.0}"))
                    .with_mph("max_overspeed", *max_overspeed),
                routes,
            )]
        }

        MonitorEvent::Coupled {
            train,
            prev_axles,
            new_axles,
            couple_speed,
            hard,
            at,
        } => {
            let mut routes = vec![Route::Console];
            if *hard || cfg.verbose_logging {
                routes.push(Route::Status);
            }
            if *hard {
                routes.push(Route::Alert);
            }
            vec![Notice::new(
                MessageKey::Coupled,
                train_fields(train, *at)
                    .with("prev_axles", prev_axles)
                    .with("new_axles", new_axles)
                    .with_mph("couple_speed", *couple_speed),
                routes,
            )]
        }

        MonitorEvent::SpeedChanged {
            train,
            trend,
            speed,
            change,
            notable,
            at,
        } => {
            if !(*notable && cfg.verbose_logging) {
                return Vec::new();
            }
            vec![Notice::new(
                MessageKey::SpeedChange,
                train_fields(train, *at)
                    .with("status", trend)
                    .with_mph("speed", *speed)
                    .with_mph("change", *change),
                vec![Route::Status],
            )]
        }

        MonitorEvent::ZeroLimit { train, at } => vec![
            Notice::new(
                MessageKey::AutomatedNotice,
                time_fields(*at).with("self_name", self_name),
                vec![Route::Radio],
            ),
            Notice::new(
                MessageKey::ZeroLimit,
                train_fields(train, *at),
                vec![Route::Radio, Route::Console],
            ),
        ],

        MonitorEvent::PeriodicAnnounce { at } => vec![
            Notice::new(
                MessageKey::AutomatedNotice,
                time_fields(*at).with("self_name", self_name),
                vec![Route::Radio],
            ),
            Notice::new(
                MessageKey::PeriodicAnnounce,
                time_fields(*at).with("self_name", self_name),
                vec![Route::Radio],
            ),
        ],

        MonitorEvent::TelemetryLost { silent_secs, at } => vec![Notice::new(
            MessageKey::Disconnected,
            time_fields(*at)
                .with("self_name", self_name)
                .with("seconds", silent_secs),
            vec![Route::Console, Route::Status],
        )],

        MonitorEvent::ChatConnected => vec![Notice::new(
            MessageKey::Connected,
            Fields::new().with("self_name", self_name),
            vec![Route::Status],
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::SpeedTrend;
    use crate::state::EpisodeId;
    use crate::telemetry::TrainId;
    use chrono::{TimeZone, Utc};

    fn at() -> SimTime {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 15, 30).unwrap()
    }

    fn train() -> TrainLabel {
        TrainLabel {
            train_id: TrainId(42),
            engineer: "casey".to_string(),
            symbol: "Q42".to_string(),
        }
    }

    fn reading() -> SpeedReading {
        SpeedReading {
            speed: 50.0,
            limit: 25.0,
            effective_limit: 45.0,
            block_id: 3201,
        }
    }

    #[test]
    fn test_lifecycle_goes_to_status_only_when_verbose() {
        let ev = MonitorEvent::TookControl {
            train: train(),
            railroad: "UP".to_string(),
            loco: "1".to_string(),
            at: at(),
        };
        let quiet = notices_for(&ev, &WatchConfig::default());
        assert_eq!(quiet[0].routes, vec![Route::Console]);
        assert_eq!(quiet[0].fields.get("time"), Some("08:15:30"));

        let cfg = WatchConfig {
            verbose_logging: true,
            ..WatchConfig::default()
        };
        assert_eq!(notices_for(&ev, &cfg)[0].routes, vec![Route::Console, Route::Status]);
    }

    #[test]
    fn test_ban_prefers_role_mention_when_configured() {
        let ev = MonitorEvent::OverSpeedBan {
            train: train(),
            episode: EpisodeId::new(),
            reading: reading(),
            at: at(),
        };
        let plain = notices_for(&ev, &WatchConfig::default());
        assert_eq!(plain[0].routes, vec![Route::Console, Route::Alert]);
        assert_eq!(plain[0].fields.get("overspeed"), Some("25.0"));

        let mut cfg = WatchConfig::default();
        cfg.chat.alert_role = Some("1234".to_string());
        let mention = notices_for(&ev, &cfg);
        assert_eq!(mention[0].routes, vec![Route::Console, Route::AlertWithMention]);
    }

    #[test]
    fn test_soft_and_hard_coupling_routes() {
        let make = |hard| MonitorEvent::Coupled {
            train: train(),
            prev_axles: 80,
            new_axles: 84,
            couple_speed: 3.25,
            hard,
            at: at(),
        };
        let cfg = WatchConfig::default();
        assert_eq!(notices_for(&make(false), &cfg)[0].routes, vec![Route::Console]);
        assert_eq!(
            notices_for(&make(true), &cfg)[0].routes,
            vec![Route::Console, Route::Status, Route::Alert]
        );

        let verbose = WatchConfig {
            verbose_logging: true,
            ..WatchConfig::default()
        };
        let soft = notices_for(&make(false), &verbose);
        assert_eq!(soft[0].routes, vec![Route::Console, Route::Status]);
        assert_eq!(soft[0].fields.get("couple_speed"), Some("3.2"));
    }

    #[test]
    fn test_speed_changes_reach_status_only_when_notable_and_verbose() {
        let make = |notable| MonitorEvent::SpeedChanged {
            train: train(),
            trend: SpeedTrend::Decelerating,
            speed: 12.0,
            change: -8.0,
            notable,
            at: at(),
        };
        assert!(notices_for(&make(true), &WatchConfig::default()).is_empty());

        let verbose = WatchConfig {
            verbose_logging: true,
            ..WatchConfig::default()
        };
        assert!(notices_for(&make(false), &verbose).is_empty());

        let n = notices_for(&make(true), &verbose);
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].key, MessageKey::SpeedChange);
        assert_eq!(n[0].routes, vec![Route::Status]);
        assert_eq!(n[0].fields.get("status"), Some("decelerating"));
        assert_eq!(n[0].fields.get("change"), Some("-8.0"));
    }

    #[test]
    fn test_escalated_episode_end_also_alerts() {
        let make = |escalated| MonitorEvent::SpeedingEnded {
            train: train(),
            episode: EpisodeId::new(),
            duration_secs: 61.6,
            max_overspeed: 12.0,
            escalated,
            at: at(),
        };
        let cfg = WatchConfig::default();
        assert_eq!(notices_for(&make(false), &cfg)[0].routes, vec![Route::Console, Route::Status]);
        let n = notices_for(&make(true), &cfg);
        assert_eq!(n[0].routes, vec![Route::Console, Route::Status, Route::Alert]);
        assert_eq!(n[0].fields.get("duration"), Some("62"));
    }

    #[test]
    fn test_radio_notices_lead_with_automated_preamble() {
        let cfg = WatchConfig::default();
        let zero = notices_for(&MonitorEvent::ZeroLimit { train: train(), at: at() }, &cfg);
        assert_eq!(zero.len(), 2);
        assert_eq!(zero[0].key, MessageKey::AutomatedNotice);
        assert_eq!(zero[1].key, MessageKey::ZeroLimit);

        let periodic = notices_for(&MonitorEvent::PeriodicAnnounce { at: at() }, &cfg);
        assert_eq!(
            periodic.iter().map(|n| n.key).collect::<Vec<_>>(),
            vec![MessageKey::AutomatedNotice, MessageKey::PeriodicAnnounce]
        );
        assert!(periodic.iter().all(|n| n.routes == vec![Route::Radio]));
    }
}
