//! JSON-lines telemetry source.
//!
//! Each line is one event object tagged by `"event"`:
//!
//! ```text
//! {"event":"connected"}
//! {"event":"permission","Permission":"Granted"}
//! {"event":"simulation_state","SimulationTime":"2025-03-01T08:00:00Z"}
//! {"event":"train_data","Train":{"TrainID":42,"EngineerType":"Player","TrainSpeedMph":51.2, ...}}
//! {"event":"disconnected"}
//! ```
//!
//! Train fields are parsed leniently: a missing or unparseable field falls back
//! to a neutral value (0, empty string, `EngineerKind::None`) and the rest of
//! the snapshot is kept. Dropping one train's update must never affect others.

use std::io::BufRead;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::TelemetryError;

use super::snapshot::{EngineerKind, TrainId, TrainSnapshot};
use super::source::{TelemetryEvent, TelemetrySource};

/// Reads newline-delimited JSON events from any buffered reader.
///
/// Reads block; the `timeout` passed to `next_event` is not honoured.
pub struct JsonLinesSource<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead + Send> TelemetrySource for JsonLinesSource<R> {
    fn next_event(&mut self, _timeout: Duration) -> Result<Option<TelemetryEvent>, TelemetryError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Err(TelemetryError::Closed);
            }
            self.line_no += 1;

            match parse_line(self.line_no, &self.buf) {
                Ok(Some(ev)) => return Ok(Some(ev)),
                Ok(None) => {}
                Err(e) => warn!("skipping telemetry line: {e}"),
            }
        }
    }
}

/// Parses one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<TelemetryEvent>, TelemetryError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let malformed = |reason: String| TelemetryError::Malformed { line: line_no, reason };

    let value: Value = serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(malformed("expected a JSON object".to_string()));
    };
    let kind = obj
        .get("event")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing \"event\" tag".to_string()))?;

    let ev = match kind {
        "connected" => TelemetryEvent::Connected,
        "disconnected" => TelemetryEvent::Disconnected,
        "permission" => {
            let granted = match obj.get("Permission") {
                Some(Value::String(s)) => s == "Granted",
                Some(Value::Bool(b)) => *b,
                _ => false,
            };
            TelemetryEvent::Permission(granted)
        }
        "simulation_state" => {
            let raw = obj
                .get("SimulationTime")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("simulation_state without SimulationTime".to_string()))?;
            let at = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| malformed(format!("bad SimulationTime '{raw}': {e}")))?
                .with_timezone(&Utc);
            TelemetryEvent::SimulationTick(at)
        }
        "train_data" => {
            let Some(Value::Object(train)) = obj.get("Train") else {
                return Err(malformed("train_data without Train object".to_string()));
            };
            TelemetryEvent::TrainData(snapshot_from_fields(train))
        }
        other => {
            debug!("ignoring telemetry event '{other}' on line {line_no}");
            return Ok(None);
        }
    };

    Ok(Some(ev))
}

fn snapshot_from_fields(train: &Map<String, Value>) -> TrainSnapshot {
    let id = lenient_f64(train, "TrainID");
    TrainSnapshot {
        train_id: TrainId(clamp_u32(id)),
        engineer_kind: lenient_kind(train),
        engineer_name: lenient_string(train, "EngineerName"),
        train_symbol: lenient_string(train, "TrainSymbol"),
        speed_mph: lenient_f64(train, "TrainSpeedMph"),
        speed_limit_mph: lenient_f64(train, "TrainSpeedLimitMPH"),
        axle_count: clamp_u32(lenient_f64(train, "AxleCount")),
        block_id: lenient_f64(train, "BlockID").max(0.0) as u64,
        hp_per_ton: lenient_f64(train, "HPPerTon"),
        railroad_initials: lenient_string(train, "RailroadInitials"),
        loco_number: lenient_string(train, "LocoNumber"),
    }
}

fn clamp_u32(v: f64) -> u32 {
    v.clamp(0.0, f64::from(u32::MAX)) as u32
}

fn lenient_f64(obj: &Map<String, Value>, field: &str) -> f64 {
    let parsed = match obj.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        _ => {
            if obj.contains_key(field) {
                warn!("telemetry field {field} unparseable, using 0");
            }
            0.0
        }
    }
}

fn lenient_string(obj: &Map<String, Value>, field: &str) -> String {
    match obj.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn lenient_kind(obj: &Map<String, Value>) -> EngineerKind {
    match obj.get("EngineerType") {
        Some(Value::Number(n)) => n.as_i64().map_or(EngineerKind::None, EngineerKind::from_code),
        Some(Value::String(s)) => EngineerKind::from_name(s).unwrap_or_else(|| {
            warn!("unknown EngineerType '{s}', treating as none");
            EngineerKind::None
        }),
        _ => EngineerKind::None,
    }
}
