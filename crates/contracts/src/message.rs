//! Queue messages - MessageSource output
//!
//! Raw received messages, decoded telemetry, and the per-cycle ack batch.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque acknowledgment handle issued by the queue
pub type AckId = String;

/// Message attribute carrying the observation instant
pub const TIMESTAMP_ATTRIBUTE: &str = "timestamp";

/// A message as pulled from the queue, payload already base64-decoded
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    /// Acknowledgment handle
    pub ack_id: AckId,

    /// Server-assigned message id (diagnostics only)
    pub message_id: Option<String>,

    /// Decoded payload bytes
    pub data: Bytes,

    /// Message attributes
    pub attributes: HashMap<String, String>,
}

impl ReceivedMessage {
    /// Build a message from a comma-joined payload and a timestamp attribute
    pub fn new(ack_id: impl Into<String>, payload: impl Into<Bytes>, timestamp: &str) -> Self {
        Self {
            ack_id: ack_id.into(),
            message_id: None,
            data: payload.into(),
            attributes: HashMap::from([(TIMESTAMP_ATTRIBUTE.to_string(), timestamp.to_string())]),
        }
    }

    /// Observation timestamp attribute, if present
    pub fn timestamp(&self) -> Option<&str> {
        self.attributes.get(TIMESTAMP_ATTRIBUTE).map(String::as_str)
    }
}

/// Decoded telemetry record
///
/// Immutable once decoded; owned by the loop iteration that decoded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    /// Vehicle identifier
    pub vehicle_id: String,

    /// Original UTC timestamp string, persisted verbatim
    pub timestamp: String,

    /// Parsed observation instant
    pub observed_at: DateTime<Utc>,

    /// Latitude, decimal degrees
    pub latitude: f64,

    /// Longitude, decimal degrees
    pub longitude: f64,

    /// Speed in source units, kept as received
    pub speed: String,

    /// Bearing in degrees, kept as received
    pub bearing: String,
}

/// Ordered set of ack handles accumulated during one pull cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckBatch {
    handles: Vec<AckId>,
}

impl AckBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch sized for a pull
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: Vec::with_capacity(capacity),
        }
    }

    /// Append a handle
    pub fn push(&mut self, handle: AckId) {
        self.handles.push(handle);
    }

    /// Handles in insertion order
    pub fn handles(&self) -> &[AckId] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Drop every handle (after acknowledge or at cycle end)
    pub fn clear(&mut self) {
        self.handles.clear();
    }
}
