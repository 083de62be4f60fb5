//! Error types for trainwatch.
//!
//! All errors are strongly typed using thiserror. None of them is fatal to a
//! running monitor: telemetry and dispatch failures are logged and skipped,
//! and only settings loading can stop the binary before it starts.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the settings document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Setting '{field}' is invalid: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },
}

/// Errors raised by a telemetry source.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Telemetry source closed")]
    Closed,

    #[error("Telemetry read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed telemetry event on line {line}: {reason}")]
    Malformed {
        line: usize,
        reason: String,
    },
}

/// Errors raised by outbound channels.
///
/// These never propagate into the monitor core; the dispatcher logs and drops them.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No live connection for {path}")]
    NotConnected {
        path: String,
    },

    #[error("Channel {channel_id} is not available")]
    ChannelUnavailable {
        channel_id: u64,
    },
}

/// Top-level error type for trainwatch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl WatchError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a telemetry error.
    #[must_use]
    pub const fn is_telemetry(&self) -> bool {
        matches!(self, Self::Telemetry(_))
    }

    /// Returns true if this is a dispatch error.
    #[must_use]
    pub const fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    /// Returns true if the telemetry source has been exhausted or closed.
    #[must_use]
    pub const fn is_source_closed(&self) -> bool {
        matches!(self, Self::Telemetry(TelemetryError::Closed))
    }
}

/// Result type alias for trainwatch operations.
pub type WatchResult<T> = Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "AlertSpeed".to_string(),
            reason: "must be finite".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("AlertSpeed"));
        assert!(msg.contains("must be finite"));
    }

    #[test]
    fn test_telemetry_error_malformed() {
        let err = TelemetryError::Malformed {
            line: 12,
            reason: "expected object".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("line 12"));
    }

    #[test]
    fn test_dispatch_error_channel() {
        let err = DispatchError::ChannelUnavailable { channel_id: 42 };
        assert!(format!("{err}").contains("42"));
    }

    #[test]
    fn test_watch_error_from_telemetry() {
        let err: WatchError = TelemetryError::Closed.into();
        assert!(err.is_telemetry());
        assert!(err.is_source_closed());
        assert!(!err.is_dispatch());
    }

    #[test]
    fn test_watch_error_from_dispatch() {
        let err: WatchError = DispatchError::NotConnected {
            path: "radio".to_string(),
        }
        .into();
        assert!(err.is_dispatch());
        assert!(!err.is_source_closed());
    }

    #[test]
    fn test_watch_error_internal() {
        let err = WatchError::internal("state lock poisoned");
        assert!(!err.is_config());
        assert!(format!("{err}").contains("state lock poisoned"));
    }
}
