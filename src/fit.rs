use std::fs::File;
use std::path::Path;

use fitparser::Value;
use fitparser::profile::MesgNum;
use serde::Serialize;

use crate::Error;

// -----------------------------
// FIT record classification
// -----------------------------
//
// The FIT wire codec itself is fitparser's job; this module only projects its
// decoded messages into the two record shapes the matcher and extractor care
// about. Classification runs over a codec-neutral `RawMessage` representation
// so it can be exercised with synthetic sequences.

const EVENT_TYPE_FIELD: &str = "camera_event_type";
const EVENT_UUID_FIELD: &str = "camera_file_uuid";
const TIMESTAMP_FIELD: &str = "timestamp";
const UTC_TIMESTAMP_FIELD: &str = "utc_timestamp";
const POSITION_LAT_FIELD: &str = "position_lat";
const POSITION_LONG_FIELD: &str = "position_long";
const ENHANCED_ALTITUDE_FIELD: &str = "enhanced_altitude";
const ENHANCED_SPEED_FIELD: &str = "enhanced_speed";
const SPEED_FIELD: &str = "speed";

// FIT positions are signed 32-bit semicircles.
const SEMICIRCLES_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// What a camera event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEventKind {
    VideoStart,
    VideoEnd,
    Other,
}

impl CameraEventKind {
    fn from_name(name: &str) -> Self {
        match name {
            "video_start" => CameraEventKind::VideoStart,
            "video_end" => CameraEventKind::VideoEnd,
            _ => CameraEventKind::Other,
        }
    }
}

/// A decoded `camera_event` message.
#[derive(Debug, Clone)]
pub struct CameraEvent {
    pub kind: CameraEventKind,
    pub session_id: Option<String>,
    pub timestamp: Option<i64>,
}

/// One position/time sample. Optional fields stay `None` until forward-fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: Option<i64>,
    pub utc_timestamp: Option<i64>,
    pub latitude_deg: Option<f64>,
    pub longitude_deg: Option<f64>,
    pub altitude_m: Option<f64>,
    pub speed_mps: Option<f64>,
}

/// Everything extracted from one FIT file, in source order.
#[derive(Debug, Default)]
pub struct DecodedLog {
    pub events: Vec<CameraEvent>,
    pub telemetry: Vec<TelemetryRecord>,
}

impl DecodedLog {
    /// Whether any camera event in this log carries `session_id`.
    pub fn contains_session(&self, session_id: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.session_id.as_deref() == Some(session_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    CameraEvent,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Float(v) => Some(*v as i64),
            FieldValue::Text(_) => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A decoded message as the codec hands it over: a message type plus named
/// field values, nothing else.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub kind: MessageKind,
    pub fields: Vec<(String, FieldValue)>,
}

impl RawMessage {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Split a message stream into camera events and telemetry samples.
///
/// Camera-event messages project `{camera_event_type, camera_file_uuid,
/// timestamp}`; everything else projects the telemetry whitelist and is kept
/// only when both positions are present. Records failing the position check
/// are dropped silently; field-less messages are skipped. Source order is
/// preserved and nothing is deduplicated.
pub fn classify(messages: impl IntoIterator<Item = RawMessage>) -> DecodedLog {
    let mut log = DecodedLog::default();

    for message in messages {
        if message.fields.is_empty() {
            continue;
        }
        match message.kind {
            MessageKind::CameraEvent => log.events.push(project_event(&message)),
            MessageKind::Other => {
                if let Some(record) = project_telemetry(&message) {
                    log.telemetry.push(record);
                }
            }
        }
    }

    log
}

fn project_event(message: &RawMessage) -> CameraEvent {
    let kind = message
        .field(EVENT_TYPE_FIELD)
        .and_then(FieldValue::as_text)
        .map(CameraEventKind::from_name)
        .unwrap_or(CameraEventKind::Other);

    CameraEvent {
        kind,
        session_id: message
            .field(EVENT_UUID_FIELD)
            .and_then(FieldValue::as_text)
            .map(str::to_string),
        timestamp: message.field(TIMESTAMP_FIELD).and_then(FieldValue::as_int),
    }
}

fn project_telemetry(message: &RawMessage) -> Option<TelemetryRecord> {
    let latitude_deg = message
        .field(POSITION_LAT_FIELD)
        .and_then(FieldValue::as_float)
        .map(|v| v * SEMICIRCLES_TO_DEGREES);
    let longitude_deg = message
        .field(POSITION_LONG_FIELD)
        .and_then(FieldValue::as_float)
        .map(|v| v * SEMICIRCLES_TO_DEGREES);

    // Both positions are required; anything else may be back-filled later.
    let (latitude_deg, longitude_deg) = match (latitude_deg, longitude_deg) {
        (Some(lat), Some(long)) => (Some(lat), Some(long)),
        _ => return None,
    };

    let enhanced_speed = message
        .field(ENHANCED_SPEED_FIELD)
        .and_then(FieldValue::as_float);
    let speed = message.field(SPEED_FIELD).and_then(FieldValue::as_float);

    Some(TelemetryRecord {
        timestamp: message.field(TIMESTAMP_FIELD).and_then(FieldValue::as_int),
        utc_timestamp: message
            .field(UTC_TIMESTAMP_FIELD)
            .and_then(FieldValue::as_int),
        latitude_deg,
        longitude_deg,
        altitude_m: message
            .field(ENHANCED_ALTITUDE_FIELD)
            .and_then(FieldValue::as_float),
        speed_mps: enhanced_speed.or(speed),
    })
}

// -----------------------------
// fitparser adapter
// -----------------------------

/// Decode a FIT file on disk into camera events and telemetry samples.
pub fn decode_fit_file(path: &Path) -> Result<DecodedLog, Error> {
    let mut file = File::open(path)?;
    let records = fitparser::from_reader(&mut file).map_err(|e| Error::FitDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(classify(records.into_iter().map(raw_message)))
}

fn raw_message(record: fitparser::FitDataRecord) -> RawMessage {
    let kind = if record.kind() == MesgNum::CameraEvent {
        MessageKind::CameraEvent
    } else {
        MessageKind::Other
    };

    let fields = record
        .fields()
        .iter()
        .filter_map(|f| field_value(f.value()).map(|v| (f.name().to_string(), v)))
        .collect();

    RawMessage { kind, fields }
}

fn field_value(value: &Value) -> Option<FieldValue> {
    let v = match value {
        Value::Timestamp(ts) => FieldValue::Int(ts.timestamp()),
        Value::SInt8(v) => FieldValue::Int(i64::from(*v)),
        Value::UInt8(v) | Value::UInt8z(v) | Value::Byte(v) | Value::Enum(v) => {
            FieldValue::Int(i64::from(*v))
        }
        Value::SInt16(v) => FieldValue::Int(i64::from(*v)),
        Value::UInt16(v) | Value::UInt16z(v) => FieldValue::Int(i64::from(*v)),
        Value::SInt32(v) => FieldValue::Int(i64::from(*v)),
        Value::UInt32(v) | Value::UInt32z(v) => FieldValue::Int(i64::from(*v)),
        Value::SInt64(v) => FieldValue::Int(*v),
        Value::UInt64(v) | Value::UInt64z(v) => FieldValue::Int(*v as i64),
        Value::Float32(v) => FieldValue::Float(f64::from(*v)),
        Value::Float64(v) => FieldValue::Float(*v),
        Value::String(s) => FieldValue::Text(s.clone()),
        // Arrays and anything unrecognized carry no single sample value.
        _ => return None,
    };
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(kind: MessageKind, fields: &[(&str, FieldValue)]) -> RawMessage {
        RawMessage {
            kind,
            fields: fields
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
        }
    }

    fn sample(fields: &[(&str, FieldValue)]) -> RawMessage {
        msg(MessageKind::Other, fields)
    }

    #[test]
    fn telemetry_without_latitude_is_dropped() {
        let log = classify([sample(&[
            ("timestamp", FieldValue::Int(100)),
            ("position_long", FieldValue::Int(0)),
            ("speed", FieldValue::Float(3.2)),
        ])]);
        assert!(log.telemetry.is_empty());
    }

    #[test]
    fn telemetry_with_both_positions_is_kept() {
        let log = classify([sample(&[
            ("position_lat", FieldValue::Int(1_073_741_824)),
            ("position_long", FieldValue::Int(-1_073_741_824)),
        ])]);
        assert_eq!(log.telemetry.len(), 1);
        let rec = &log.telemetry[0];
        assert_eq!(rec.latitude_deg, Some(90.0));
        assert_eq!(rec.longitude_deg, Some(-90.0));
        assert_eq!(rec.timestamp, None);
        assert_eq!(rec.speed_mps, None);
    }

    #[test]
    fn enhanced_speed_wins_over_speed() {
        let log = classify([sample(&[
            ("position_lat", FieldValue::Int(0)),
            ("position_long", FieldValue::Int(0)),
            ("speed", FieldValue::Float(1.0)),
            ("enhanced_speed", FieldValue::Float(2.5)),
        ])]);
        assert_eq!(log.telemetry[0].speed_mps, Some(2.5));
    }

    #[test]
    fn camera_event_projection() {
        let log = classify([msg(
            MessageKind::CameraEvent,
            &[
                ("camera_event_type", FieldValue::Text("video_start".into())),
                ("camera_file_uuid", FieldValue::Text("ABC123".into())),
                ("timestamp", FieldValue::Int(1000)),
            ],
        )]);
        assert!(log.telemetry.is_empty());
        assert_eq!(log.events.len(), 1);
        let ev = &log.events[0];
        assert_eq!(ev.kind, CameraEventKind::VideoStart);
        assert_eq!(ev.session_id.as_deref(), Some("ABC123"));
        assert_eq!(ev.timestamp, Some(1000));
    }

    #[test]
    fn unknown_event_type_becomes_other() {
        let log = classify([msg(
            MessageKind::CameraEvent,
            &[("camera_event_type", FieldValue::Text("photo_taken".into()))],
        )]);
        assert_eq!(log.events[0].kind, CameraEventKind::Other);
        assert!(log.events[0].session_id.is_none());
        assert!(log.events[0].timestamp.is_none());
    }

    #[test]
    fn field_less_messages_are_skipped() {
        let log = classify([
            msg(MessageKind::CameraEvent, &[]),
            msg(MessageKind::Other, &[]),
        ]);
        assert!(log.events.is_empty());
        assert!(log.telemetry.is_empty());
    }

    #[test]
    fn contains_session_checks_event_uuids() {
        let log = classify([msg(
            MessageKind::CameraEvent,
            &[("camera_file_uuid", FieldValue::Text("XYZ".into()))],
        )]);
        assert!(log.contains_session("XYZ"));
        assert!(!log.contains_session("ABC123"));
    }
}
