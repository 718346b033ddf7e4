//! Enrichment - Enricher output and provider response shapes

use serde::{Deserialize, Serialize};

/// Address component tag holding the postal code
pub const POSTAL_CODE_TYPE: &str = "postal_code";

/// Derived geographic context for one coordinate
///
/// Every field independently falls back to its empty value when its
/// provider call fails or returns nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Formatted street address of the first geocode candidate
    pub address: String,

    /// First `postal_code` component across all candidates
    pub zipcode: String,

    /// Elevation above sea level in meters
    pub elevation: Option<f64>,

    /// Effective UTC offset in seconds (raw + DST)
    pub offset_secs: f64,

    /// IANA timezone id (logged, not persisted)
    pub timezone_id: Option<String>,
}

/// One reverse-geocode candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    #[serde(default)]
    pub formatted_address: String,

    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

/// Structured address component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    #[serde(default)]
    pub long_name: String,

    #[serde(default)]
    pub short_name: String,

    /// Type tags, most specific first
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    /// Primary (first) type tag
    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }
}

/// One elevation sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationSample {
    /// Meters above sea level
    pub elevation: f64,

    /// Sampling resolution in meters
    #[serde(default)]
    pub resolution: Option<f64>,
}

/// Timezone lookup result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneInfo {
    /// Offset from UTC in seconds, without DST
    #[serde(default)]
    pub raw_offset: Option<f64>,

    /// Daylight-saving adjustment in seconds
    #[serde(default)]
    pub dst_offset: Option<f64>,

    #[serde(default)]
    pub time_zone_id: Option<String>,
}

impl TimezoneInfo {
    /// Effective offset, or `None` when the lookup yielded no raw offset
    pub fn effective_offset(&self) -> Option<f64> {
        self.raw_offset
            .map(|raw| raw + self.dst_offset.unwrap_or(0.0))
    }
}
