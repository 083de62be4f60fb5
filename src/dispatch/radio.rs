//! In-simulation radio messages.
//!
//! Radio text goes through the simulator's own connection, so sends are
//! synchronous and only attempted while that connection is live. A missing
//! link or a failed send is skipped silently.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::error::DispatchError;

/// The simulator's `SendRadioText(channel, text)` capability.
pub trait RadioLink: Send + Sync {
    /// Broadcast `text` on radio `channel`.
    fn send_radio_text(&self, channel: i32, text: &str) -> Result<(), DispatchError>;
}

/// Guards radio sends on connection state.
pub struct RadioGate {
    link: Option<Arc<dyn RadioLink>>,
    channel: i32,
    connected: AtomicBool,
    skipped: AtomicU64,
}

impl RadioGate {
    #[must_use]
    pub fn new(link: Option<Arc<dyn RadioLink>>, channel: i32) -> Self {
        Self {
            link,
            channel,
            connected: AtomicBool::new(false),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Messages not sent because there was no live link or the send failed.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Best-effort send on the dispatcher radio channel.
    pub fn send(&self, text: &str) {
        let result = match (&self.link, self.is_connected()) {
            (Some(link), true) => link.send_radio_text(self.channel, text),
            _ => Err(DispatchError::NotConnected {
                path: "radio".to_string(),
            }),
        };
        if let Err(e) = result {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            debug!("radio message skipped: {e}");
        }
    }
}

impl std::fmt::Debug for RadioGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioGate")
            .field("has_link", &self.link.is_some())
            .field("channel", &self.channel)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Records radio traffic in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRadio {
    sent: Arc<Mutex<Vec<(i32, String)>>>,
}

impl MemoryRadio {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<(i32, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RadioLink for MemoryRadio {
    fn send_radio_text(&self, channel: i32, text: &str) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((channel, text.to_string()));
        Ok(())
    }
}
