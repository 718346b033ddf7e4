//! RowBuilder - telemetry + enrichment -> warehouse row

use contracts::{EnrichedRow, Enrichment, TelemetryMessage};

/// Maps a decoded message to the persisted row shape
///
/// Pure; numeric validation already happened in `ingestion::decode`.
pub struct RowBuilder;

impl RowBuilder {
    /// Row for a message that went through enrichment
    pub fn build(message: &TelemetryMessage, enrichment: &Enrichment) -> EnrichedRow {
        EnrichedRow {
            utc_time: Some(message.timestamp.clone()),
            offset: enrichment.offset_secs,
            address: enrichment.address.clone(),
            zipcode: enrichment.zipcode.clone(),
            elevation: enrichment.elevation,
            ..Self::build_skipped(message)
        }
    }

    /// Row for a message the quota turned away: defaults, no `UTCTime`
    pub fn build_skipped(message: &TelemetryMessage) -> EnrichedRow {
        EnrichedRow {
            vehicle_id: message.vehicle_id.clone(),
            utc_time: None,
            offset: 0.0,
            address: String::new(),
            zipcode: String::new(),
            speed: message.speed.clone(),
            bearing: message.bearing.clone(),
            elevation: None,
            latitude: message.latitude,
            longitude: message.longitude,
        }
    }
}
