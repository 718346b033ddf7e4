//! GeoProvider trait - geographic context lookups
//!
//! Three independent capabilities; the Enricher fans out over them.

use chrono::{DateTime, Utc};

use crate::{ContractError, ElevationSample, GeocodeCandidate, TimezoneInfo};

/// Geo-context provider interface
///
/// Calls take `&self` so the three lookups can be in flight at once.
#[trait_variant::make(GeoProvider: Send)]
pub trait LocalGeoProvider {
    /// Ranked address candidates for a coordinate
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<GeocodeCandidate>, ContractError>;

    /// Elevation samples for a coordinate
    async fn elevation(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<ElevationSample>, ContractError>;

    /// Timezone in effect at `at` for a coordinate
    async fn timezone(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<TimezoneInfo, ContractError>;
}
