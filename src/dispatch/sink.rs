//! Outbound channel senders.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::info;

use crate::error::DispatchError;

/// Where a rendered message is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The local console / log.
    Console,
    /// A chat channel by id.
    Chat(u64),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => f.write_str("console"),
            Self::Chat(id) => write!(f, "chat:{id}"),
        }
    }
}

/// The "send text to channel X" capability.
///
/// Implementations are called from the dispatcher worker thread only.
pub trait ChannelSender: Send + Sync {
    /// Deliver `text` to `target`.
    fn send(&self, target: Target, text: &str) -> Result<(), DispatchError>;
}

/// Writes console messages through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ChannelSender for ConsoleSink {
    fn send(&self, target: Target, text: &str) -> Result<(), DispatchError> {
        match target {
            Target::Console => {
                info!(target: "trainwatch::console", "{text}");
                Ok(())
            }
            Target::Chat(channel_id) => Err(DispatchError::ChannelUnavailable { channel_id }),
        }
    }
}

/// A delivered message, as recorded by `MemorySink`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub target: Target,
    pub text: String,
}

/// Records deliveries in memory.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// another to the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Texts delivered to one target, in order.
    #[must_use]
    pub fn texts_for(&self, target: Target) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.target == target)
            .map(|d| d.text)
            .collect()
    }

    pub fn clear(&self) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ChannelSender for MemorySink {
    fn send(&self, target: Target, text: &str) -> Result<(), DispatchError> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Delivery {
                target,
                text: text.to_string(),
            });
        Ok(())
    }
}

/// The sinks handed to the dispatcher worker.
#[derive(Clone)]
pub struct Sinks {
    /// Always present.
    pub console: Arc<dyn ChannelSender>,
    /// Chat platform client, if one is connected.
    pub chat: Option<Arc<dyn ChannelSender>>,
}

impl Sinks {
    /// Console only, through `log`.
    #[must_use]
    pub fn console_only() -> Self {
        Self {
            console: Arc::new(ConsoleSink),
            chat: None,
        }
    }

    /// Routes both console and chat output into one memory sink.
    #[must_use]
    pub fn memory(sink: &MemorySink) -> Self {
        Self {
            console: Arc::new(sink.clone()),
            chat: Some(Arc::new(sink.clone())),
        }
    }

    pub(crate) fn for_target(&self, target: Target) -> Option<&Arc<dyn ChannelSender>> {
        match target {
            Target::Console => Some(&self.console),
            Target::Chat(_) => self.chat.as_ref(),
        }
    }
}

impl fmt::Debug for Sinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sinks")
            .field("chat", &self.chat.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_rejects_chat_targets() {
        let sink = ConsoleSink;
        assert!(sink.send(Target::Console, "hello").is_ok());
        assert!(matches!(
            sink.send(Target::Chat(5), "hello"),
            Err(DispatchError::ChannelUnavailable { channel_id: 5 })
        ));
    }

    #[test]
    fn test_memory_sink_clones_share_buffer() {
        let a = MemorySink::new();
        let b = a.clone();
        b.send(Target::Chat(1), "one").unwrap();
        a.send(Target::Console, "two").unwrap();
        assert_eq!(a.texts_for(Target::Chat(1)), vec!["one"]);
        assert_eq!(b.deliveries().len(), 2);
        a.clear();
        assert!(b.deliveries().is_empty());
    }

    #[test]
    fn test_sinks_pick_by_target() {
        let sinks = Sinks::console_only();
        assert!(sinks.for_target(Target::Console).is_some());
        assert!(sinks.for_target(Target::Chat(1)).is_none());
    }
}
