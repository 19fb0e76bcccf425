use crate::error::ValidationError;
use crate::model::{AttendanceEvent, EventKind};
use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use std::str::FromStr;

/// The one accepted `occurredAt` profile: local date-time, whole seconds, no offset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DEVICE_ID: &str = "deviceId";
const RFID_TAG: &str = "rfidTag";
const KIND: &str = "kind";
const OCCURRED_AT: &str = "occurredAt";
const METADATA: &str = "metadata";

/// Parses and validates a raw JSON event. Pure and deterministic.
///
/// Fields are checked in wire order (`deviceId`, `rfidTag`, `kind`,
/// `occurredAt`) and the first failure is returned. `null` counts as absent.
/// Unknown fields are ignored.
pub fn validate(raw: impl AsRef<[u8]>) -> Result<AttendanceEvent, ValidationError> {
    let payload: Value = serde_json::from_slice(raw.as_ref())
        .map_err(|e| ValidationError::MalformedPayload(e.to_string()))?;

    let fields = payload.as_object().ok_or_else(|| {
        ValidationError::MalformedPayload("payload must be a JSON object".to_string())
    })?;

    let device_id = required_str(fields, DEVICE_ID)?;
    let rfid_tag = required_str(fields, RFID_TAG)?;

    let kind_raw = required_str(fields, KIND)?;
    let kind = EventKind::from_str(kind_raw)
        .map_err(|_| ValidationError::InvalidEventKind(kind_raw.to_string()))?;

    let occurred_raw = required_str(fields, OCCURRED_AT)?;
    let occurred_at = parse_timestamp(occurred_raw)?;

    Ok(AttendanceEvent {
        device_id: device_id.to_string(),
        rfid_tag: rfid_tag.to_string(),
        kind,
        occurred_at,
        metadata: metadata(fields),
    })
}

/// Returns the trimmed value of a required string field.
fn required_str<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, ValidationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(name)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(ValidationError::EmptyField(name))
            } else {
                Ok(trimmed)
            }
        }
        Some(_) => Err(ValidationError::MalformedPayload(format!(
            "field `{}` must be a string",
            name
        ))),
    }
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    let invalid = || ValidationError::InvalidTimestamp(raw.to_string());

    // chrono tolerates unpadded numbers; the wire profile does not.
    if !has_timestamp_shape(raw) {
        return Err(invalid());
    }

    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|_| invalid())
}

/// `YYYY-MM-DDTHH:MM:SS`, digits everywhere else.
fn has_timestamp_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b'T',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}

/// Opaque passthrough. Strings are trimmed; other JSON values are kept as
/// their compact text.
fn metadata(fields: &Map<String, Value>) -> Option<String> {
    match fields.get(METADATA)? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}
