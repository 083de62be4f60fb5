//! Notification dispatch.
//!
//! `Dispatcher::publish` turns monitor events into rendered messages and hands
//! them to their channels. Chat and console messages go through the
//! `Notifier` worker; radio messages are sent synchronously through the
//! `RadioGate`. Rendering happens on the calling thread, so the order of
//! `publish` calls is the order messages reach each channel.

/// Delivery worker.
pub mod notifier;
/// In-simulation radio.
pub mod radio;
/// Event-to-channel routing.
pub mod routes;
/// Channel senders.
pub mod sink;

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::config::WatchConfig;
use crate::error::WatchResult;
use crate::format::MessageFormatter;
use crate::monitor::MonitorEvent;

pub use notifier::{Notifier, NotifierConfig};
pub use radio::{MemoryRadio, RadioGate, RadioLink};
pub use routes::{notices_for, Notice, Route};
pub use sink::{ChannelSender, ConsoleSink, Delivery, MemorySink, Sinks, Target};

/// Routes, renders and delivers monitor events.
#[derive(Debug)]
pub struct Dispatcher {
    cfg: Arc<WatchConfig>,
    formatter: MessageFormatter,
    notifier: Notifier,
    radio: RadioGate,
    chat_ready: bool,
}

impl Dispatcher {
    /// Starts the delivery worker.
    ///
    /// Chat routes are active only when chat is enabled in `cfg` and `sinks`
    /// carries a chat sender.
    pub fn new(
        cfg: Arc<WatchConfig>,
        sinks: Sinks,
        radio: Option<Arc<dyn RadioLink>>,
        notifier_cfg: &NotifierConfig,
    ) -> WatchResult<Self> {
        let chat_ready = cfg.chat_enabled() && sinks.chat.is_some();
        let formatter = MessageFormatter::new(cfg.templates.clone());
        let radio = RadioGate::new(radio, cfg.dispatcher_radio_channel);
        let notifier = Notifier::new(notifier_cfg, sinks)?;
        Ok(Self {
            cfg,
            formatter,
            notifier,
            radio,
            chat_ready,
        })
    }

    /// Delivers every notice produced by `events`, in order.
    pub fn publish(&self, events: &[MonitorEvent]) {
        if self.notifier.is_closed() {
            if !events.is_empty() {
                debug!("dispatcher closed; skipping {} event(s)", events.len());
            }
            return;
        }
        for event in events {
            for notice in notices_for(event, &self.cfg) {
                self.deliver(&notice);
            }
        }
    }

    fn deliver(&self, notice: &Notice) {
        let text = self.formatter.render(notice.key, &notice.fields);
        for route in &notice.routes {
            match *route {
                Route::Console => {
                    self.notifier.enqueue(Target::Console, text.clone());
                }
                Route::Radio => self.radio.send(&text),
                Route::Status => self.to_chat(self.cfg.chat.status_channel, text.clone()),
                Route::Alert => self.to_chat(self.cfg.chat.alert_channel, text.clone()),
                Route::AlertWithMention => {
                    let text = match &self.cfg.chat.alert_role {
                        Some(role) => format!("<@&{role}> - {text}"),
                        None => text.clone(),
                    };
                    self.to_chat(self.cfg.chat.alert_channel, text);
                }
            }
        }
    }

    fn to_chat(&self, channel: Option<u64>, text: String) {
        match channel {
            Some(id) if self.chat_ready => {
                self.notifier.enqueue(Target::Chat(id), text);
            }
            _ => debug!("chat channel unavailable; message skipped"),
        }
    }

    #[must_use]
    pub const fn radio(&self) -> &RadioGate {
        &self.radio
    }

    #[must_use]
    pub const fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Whether chat routes can deliver anything.
    #[must_use]
    pub const fn chat_ready(&self) -> bool {
        self.chat_ready
    }

    /// Waits for queued messages to be delivered.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.notifier.flush(timeout)
    }

    /// Closes the dispatcher; later events are skipped.
    pub fn shutdown(&self) {
        self.notifier.shutdown();
    }
}
