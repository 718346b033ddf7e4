//! EnrichedRow - persisted warehouse row

use serde::{Deserialize, Serialize};

/// Row shape of the warehouse table
///
/// `utc_time` is set if and only if the row went through enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,

    #[serde(rename = "UTCTime")]
    pub utc_time: Option<String>,

    /// Effective UTC offset in seconds
    #[serde(rename = "Offset")]
    pub offset: f64,

    #[serde(rename = "Address")]
    pub address: String,

    #[serde(rename = "Zipcode")]
    pub zipcode: String,

    #[serde(rename = "Speed")]
    pub speed: String,

    #[serde(rename = "Bearing")]
    pub bearing: String,

    /// Meters above sea level
    #[serde(rename = "Elevation")]
    pub elevation: Option<f64>,

    #[serde(rename = "Latitude")]
    pub latitude: f64,

    #[serde(rename = "Longitude")]
    pub longitude: f64,
}
