//! Message templates.
//!
//! Every user-facing notice is rendered from a named template such as
//! `"{engineer} took control of {symbol}"`. Templates come from the settings
//! document; most keys have a built-in default.
//!
//! Rendering never fails. A missing template or a template referencing an
//! unknown field renders a visible placeholder so the operator notices the
//! configuration gap instead of the monitor crashing.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// Names of the configurable message templates.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKey {
    TookControl,
    Relinquish,
    TrainTimeout,
    SpeedingStart,
    SpeedingEnd,
    OverSpeedBan,
    SustainedSpeedBan,
    Coupled,
    SpeedChange,
    ZeroLimit,
    AutomatedNotice,
    PeriodicAnnounce,
    Connected,
    Disconnected,
}

impl MessageKey {
    /// Every key, in a stable order.
    pub const ALL: [Self; 14] = [
        Self::TookControl,
        Self::Relinquish,
        Self::TrainTimeout,
        Self::SpeedingStart,
        Self::SpeedingEnd,
        Self::OverSpeedBan,
        Self::SustainedSpeedBan,
        Self::Coupled,
        Self::SpeedChange,
        Self::ZeroLimit,
        Self::AutomatedNotice,
        Self::PeriodicAnnounce,
        Self::Connected,
        Self::Disconnected,
    ];

    /// The settings-document key for this template.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TookControl => "TookControlMsg",
            Self::Relinquish => "RelinquishMsg",
            Self::TrainTimeout => "TrainTimeoutMsg",
            Self::SpeedingStart => "SpeedingStartMsg",
            Self::SpeedingEnd => "SpeedingEndMsg",
            Self::OverSpeedBan => "OvrSpeedBanMsg",
            Self::SustainedSpeedBan => "SustSpeedBanMsg",
            Self::Coupled => "CoupledMsg",
            Self::SpeedChange => "SpeedChangeMsg",
            Self::ZeroLimit => "ZeroLimitMsg",
            Self::AutomatedNotice => "AutomatedNoticeMsg",
            Self::PeriodicAnnounce => "PeriodicAnnounceMsg",
            Self::Connected => "ConnectedMsg",
            Self::Disconnected => "DisconnectedMsg",
        }
    }

    const fn builtin(self) -> Option<&'static str> {
        match self {
            Self::TookControl => Some(
                "[{time}] {engineer} took control of {symbol}, Loco: {railroad} {loco}, TrainID: {train_id}",
            ),
            Self::Relinquish => Some("[{time}] {engineer} relinquished control of {symbol}."),
            Self::TrainTimeout => Some("[{time}] Player train {train_id} no longer reporting data."),
            Self::SpeedingStart => Some(
                "[{time}] {engineer} on {symbol} is speeding: {speed} mph in a {limit} mph limit (block {block}).",
            ),
            Self::SpeedingEnd => Some(
                "[{time}] {engineer} on {symbol} is no longer speeding after {duration}s, peak {max_overspeed} mph over.",
            ),
            Self::OverSpeedBan => Some(
                "[{time}] {engineer} on {symbol} exceeded the ban threshold: {speed} mph in a {limit} mph limit (block {block}).",
            ),
            Self::SustainedSpeedBan => Some(
                "[{time}] {engineer} on {symbol} has been speeding for {duration}s.",
            ),
            Self::Coupled => Some(
                "[{time}] {engineer} on {symbol} coupled at {couple_speed} mph: axles {prev_axles} -> {new_axles}.",
            ),
            Self::SpeedChange => Some(
                "[{time}] {engineer} on {symbol} {status} (Speed: {speed} MPH, Change: {change} MPH)",
            ),
            Self::ZeroLimit => {
                Some("{engineer}, briefly relinquish your train to fix a 0mph speed limit error.")
            }
            Self::AutomatedNotice => Some("This is an automated message."),
            Self::Connected => Some("{self_name} connected to Run8 and is monitoring trains."),
            Self::Disconnected => {
                Some("[{time}] {self_name} lost contact with Run8: no telemetry for {seconds}s.")
            }
            Self::PeriodicAnnounce => None,
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|k| k.as_str() == s).ok_or(())
    }
}

/// Named values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(&'static str, String)>,
}

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field.
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Adds a speed-like value rendered with one decimal.
    #[must_use]
    pub fn with_mph(self, name: &'static str, value: f64) -> Self {
        self.with(name, format!("{value:.1}"))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The template for each message key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    templates: HashMap<MessageKey, String>,
}

impl TemplateSet {
    /// A set with no templates at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Sets (or overrides) one template.
    pub fn set(&mut self, key: MessageKey, template: impl Into<String>) {
        self.templates.insert(key, template.into());
    }

    #[must_use]
    pub fn get(&self, key: MessageKey) -> Option<&str> {
        self.templates.get(&key).map(String::as_str)
    }
}

impl Default for TemplateSet {
    /// Built-in defaults for every key that has one.
    fn default() -> Self {
        let templates = MessageKey::ALL
            .into_iter()
            .filter_map(|k| k.builtin().map(|t| (k, t.to_string())))
            .collect();
        Self { templates }
    }
}

/// Renders templates with event fields.
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    templates: TemplateSet,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("placeholder pattern is a valid regex")
    })
}

impl MessageFormatter {
    #[must_use]
    pub const fn new(templates: TemplateSet) -> Self {
        Self { templates }
    }

    /// Renders `key` with `fields`, substituting a placeholder error on failure.
    #[must_use]
    pub fn render(&self, key: MessageKey, fields: &Fields) -> String {
        let Some(template) = self.templates.get(key) else {
            return format!("[missing message template: {key}]");
        };
        match substitute(template, fields) {
            Ok(text) => text,
            Err(reason) => format!("[message template error in {key}: {reason}]"),
        }
    }
}

fn substitute(template: &str, fields: &Fields) -> Result<String, String> {
    let mut out = String::with_capacity(template.len() + 32);
    let mut last = 0;

    for caps in placeholder_regex().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_literal(&mut out, &template[last..whole.start()])?;
        last = whole.end();

        match (whole.as_str(), caps.get(1)) {
            ("{{", _) => out.push('{'),
            ("}}", _) => out.push('}'),
            (_, Some(name)) => {
                let name = name.as_str().trim();
                if name.is_empty() {
                    return Err("empty placeholder '{}'".to_string());
                }
                let value = fields
                    .get(name)
                    .ok_or_else(|| format!("unknown field '{name}'"))?;
                out.push_str(value);
            }
            _ => {}
        }
    }
    push_literal(&mut out, &template[last..])?;

    Ok(out)
}

fn push_literal(out: &mut String, segment: &str) -> Result<(), String> {
    if segment.contains(['{', '}']) {
        return Err("unbalanced brace".to_string());
    }
    out.push_str(segment);
    Ok(())
}
