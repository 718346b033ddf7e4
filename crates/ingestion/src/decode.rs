//! Payload decoding
//!
//! Turns a `ReceivedMessage` into a `TelemetryMessage`.
//! Payload layout: `vehicleID, latitude, longitude, speed, bearing`.

use chrono::{DateTime, NaiveDateTime, Utc};
use contracts::{ContractError, ReceivedMessage, TelemetryMessage};

/// Wire format of the `timestamp` attribute
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FIELD_COUNT: usize = 5;

/// Decode a received message
///
/// # Errors
/// `ContractError::MalformedMessage` for non-UTF-8 payloads, missing fields,
/// unparseable or non-finite numbers, or a bad timestamp. Field values are
/// not range-checked and an empty vehicle id is passed through.
pub fn decode(msg: &ReceivedMessage) -> Result<TelemetryMessage, ContractError> {
    let malformed = |reason: String| ContractError::malformed(&msg.ack_id, reason);

    let text = std::str::from_utf8(&msg.data)
        .map_err(|e| malformed(format!("payload is not UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(malformed("empty payload".to_string()));
    }

    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() < FIELD_COUNT {
        return Err(malformed(format!(
            "expected {FIELD_COUNT} fields, got {}",
            fields.len()
        )));
    }

    let vehicle_id = fields[0];
    let latitude = parse_coordinate(fields[1], "latitude").map_err(malformed)?;
    let longitude = parse_coordinate(fields[2], "longitude").map_err(malformed)?;
    let speed = require_numeric(fields[3], "speed").map_err(malformed)?;
    let bearing = require_numeric(fields[4], "bearing").map_err(malformed)?;

    let timestamp = msg
        .timestamp()
        .ok_or_else(|| malformed("missing timestamp attribute".to_string()))?;
    let observed_at = parse_timestamp(timestamp).map_err(malformed)?;

    Ok(TelemetryMessage {
        vehicle_id: vehicle_id.to_string(),
        timestamp: timestamp.to_string(),
        observed_at,
        latitude,
        longitude,
        speed: speed.to_string(),
        bearing: bearing.to_string(),
    })
}

/// Parse the timestamp attribute as a UTC instant
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (the producer format) and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}

fn parse_coordinate(raw: &str, field: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|e| format!("invalid {field} '{raw}': {e}"))?;
    if !value.is_finite() {
        return Err(format!("{field} '{raw}' is not finite"));
    }
    Ok(value)
}

/// Validate a numeric field but keep its original text
fn require_numeric<'a>(raw: &'a str, field: &str) -> Result<&'a str, String> {
    raw.parse::<f64>()
        .map(|_| raw)
        .map_err(|e| format!("invalid {field} '{raw}': {e}"))
}
