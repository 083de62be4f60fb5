//! Monitor configuration and the settings document loader.
//!
//! The settings document is a flat JSON object with PascalCase keys. Every
//! key is optional; anything missing keeps its default. Keys ending in `Msg`
//! override the matching message template.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::format::{MessageKey, TemplateSet};

/// Speed thresholds used by speeding detection.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedThresholds {
    /// mph over the effective limit before a train counts as speeding.
    pub alert_speed: f64,
    /// mph over the effective limit that triggers the ban notice.
    pub over_speed: f64,
    /// Seconds of continuous speeding before the sustained notice.
    pub alert_speed_timer: f64,
    /// How far below the alert threshold a train must drop to stop speeding.
    pub resume_margin: f64,
    /// Extra allowance on the route-specific 25 mph sections.
    pub trona_alert_speed: f64,
    /// Block ids whose decimal form starts with this prefix belong to the route.
    pub trona_route_id: u64,
    /// Extra allowance for super-consist trains.
    pub superc_alert_speed: f64,
    /// Case-insensitive symbol fragments marking a super-consist, stored uppercased.
    pub superc_train_symbols: Vec<String>,
}

impl Default for SpeedThresholds {
    fn default() -> Self {
        Self {
            alert_speed: 5.0,
            over_speed: 20.0,
            alert_speed_timer: 300.0,
            resume_margin: 1.0,
            trona_alert_speed: 20.0,
            trona_route_id: 320,
            superc_alert_speed: 25.0,
            superc_train_symbols: parse_symbol_list("991,981,119,198,Super"),
        }
    }
}

/// Chat-platform channel settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ChatConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    /// Name the monitor uses for itself in announcements.
    pub self_name: String,
    pub status_channel: Option<u64>,
    pub alert_channel: Option<u64>,
    /// Role mentioned when escalating to the alert channel.
    pub alert_role: Option<String>,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("enabled", &self.enabled)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("self_name", &self.self_name)
            .field("status_channel", &self.status_channel)
            .field("alert_channel", &self.alert_channel)
            .field("alert_role", &self.alert_role)
            .finish()
    }
}

/// Complete monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    pub thresholds: SpeedThresholds,
    /// Pre-coupling speed above which a coupling escalates to the alert channel.
    pub hard_couple_speed: f64,
    /// Sends lifecycle and soft-coupling notices to the status channel.
    pub verbose_logging: bool,
    /// Seconds between periodic radio reminders; 0 disables them.
    pub periodic_announce_interval: u32,
    /// In-simulation radio channel used for dispatcher messages.
    pub dispatcher_radio_channel: i32,
    pub chat: ChatConfig,
    pub templates: TemplateSet,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            thresholds: SpeedThresholds::default(),
            hard_couple_speed: 7.0,
            verbose_logging: false,
            periodic_announce_interval: 0,
            dispatcher_radio_channel: 0,
            chat: ChatConfig {
                self_name: "Trainwatch".to_string(),
                ..ChatConfig::default()
            },
            templates: TemplateSet::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SettingsDocument {
    alert_speed: Option<f64>,
    over_speed: Option<f64>,
    alert_speed_timer: Option<f64>,
    resume_margin: Option<f64>,
    hard_couple_speed: Option<f64>,
    trona_alert_speed: Option<f64>,
    #[serde(rename = "TronaRouteID")]
    trona_route_id: Option<u64>,
    #[serde(rename = "SuperCAlertSpeed")]
    superc_alert_speed: Option<f64>,
    #[serde(rename = "SuperCTrainSymbols")]
    superc_train_symbols: Option<String>,
    verbose_logging: Option<bool>,
    periodic_announce_interval: Option<u32>,
    dispatcher_radio_channel: Option<i32>,
    dispatcher_comms_path: Option<String>,
    discord_enabled: Option<bool>,
    discord_bot_token: Option<String>,
    discord_self_name: Option<String>,
    discord_status_channel: Option<u64>,
    discord_alert_channel: Option<u64>,
    discord_alert_role: Option<String>,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl WatchConfig {
    /// Parses a settings document, applying defaults for missing keys.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let doc: SettingsDocument = serde_json::from_str(json)?;
        let mut cfg = Self::default();

        let t = &mut cfg.thresholds;
        set_finite(&mut t.alert_speed, doc.alert_speed, "AlertSpeed")?;
        set_finite(&mut t.over_speed, doc.over_speed, "OverSpeed")?;
        set_finite(&mut t.alert_speed_timer, doc.alert_speed_timer, "AlertSpeedTimer")?;
        set_finite(&mut t.resume_margin, doc.resume_margin, "ResumeMargin")?;
        set_finite(&mut t.trona_alert_speed, doc.trona_alert_speed, "TronaAlertSpeed")?;
        set_finite(&mut t.superc_alert_speed, doc.superc_alert_speed, "SuperCAlertSpeed")?;
        if let Some(v) = doc.trona_route_id {
            t.trona_route_id = v;
        }
        if let Some(list) = doc.superc_train_symbols {
            t.superc_train_symbols = parse_symbol_list(&list);
        }
        if t.alert_speed_timer < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "AlertSpeedTimer".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if t.resume_margin < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "ResumeMargin".to_string(),
                reason: "must not be negative".to_string(),
            });
        }

        set_finite(&mut cfg.hard_couple_speed, doc.hard_couple_speed, "HardCoupleSpeed")?;
        if let Some(v) = doc.verbose_logging {
            cfg.verbose_logging = v;
        }
        if let Some(v) = doc.periodic_announce_interval {
            cfg.periodic_announce_interval = v;
        }
        if let Some(v) = doc.dispatcher_radio_channel {
            cfg.dispatcher_radio_channel = v;
        }
        if doc.dispatcher_comms_path.is_some() {
            warn!("DispatcherCommsPath is ignored; telemetry is supplied by the configured source");
        }

        let chat = &mut cfg.chat;
        if let Some(v) = doc.discord_enabled {
            chat.enabled = v;
        }
        chat.bot_token = doc.discord_bot_token.filter(|s| !s.trim().is_empty());
        if let Some(v) = doc.discord_self_name.filter(|s| !s.trim().is_empty()) {
            chat.self_name = v;
        }
        // Channel id 0 means "not configured".
        chat.status_channel = doc.discord_status_channel.filter(|&id| id != 0);
        chat.alert_channel = doc.discord_alert_channel.filter(|&id| id != 0);
        chat.alert_role = doc.discord_alert_role.filter(|s| !s.trim().is_empty());

        for (name, value) in doc.rest {
            apply_template(&mut cfg.templates, &name, value)?;
        }

        Ok(cfg)
    }

    /// Reads and parses a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Whether chat output can be delivered at all.
    #[must_use]
    pub const fn chat_enabled(&self) -> bool {
        self.chat.enabled
    }
}

fn apply_template(templates: &mut TemplateSet, name: &str, value: Value) -> Result<(), ConfigError> {
    if !name.ends_with("Msg") {
        warn!("ignoring unknown setting '{name}'");
        return Ok(());
    }
    let Ok(key) = name.parse::<MessageKey>() else {
        warn!("ignoring unknown message template '{name}'");
        return Ok(());
    };
    let Value::String(text) = value else {
        return Err(ConfigError::InvalidValue {
            field: name.to_string(),
            reason: "message templates must be strings".to_string(),
        });
    };
    templates.set(key, text);
    Ok(())
}

fn set_finite(slot: &mut f64, value: Option<f64>, field: &str) -> Result<(), ConfigError> {
    match value {
        None => Ok(()),
        Some(v) if v.is_finite() => {
            *slot = v;
            Ok(())
        }
        Some(v) => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("{v} is not a finite number"),
        }),
    }
}

/// Splits a comma list into trimmed, uppercased, non-empty entries.
#[must_use]
pub fn parse_symbol_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
