//! # Enrichment
//!
//! Geographic context for telemetry coordinates.
//!
//! Responsibilities:
//! - Budget enrichment calls (`QuotaGuard`)
//! - Fan out reverse geocode / elevation / timezone lookups and merge them (`Enricher`)
//! - Maps web-service client (`MapsClient`) and an in-memory provider for tests
//!
//! ```ignore
//! use enrichment::{Enricher, MapsClient, QuotaGuard};
//!
//! let enricher = Enricher::new(MapsClient::new(&blueprint.geo)?);
//! let mut quota = QuotaGuard::new(10, Duration::from_secs(2));
//! if quota.try_consume() {
//!     let outcome = enricher.enrich(lat, lon, observed_at).await;
//! }
//! ```

mod enricher;
mod extract;
mod maps_client;
mod mock_provider;
mod quota;

pub use enricher::{Enricher, EnrichmentField, EnrichmentOutcome};
pub use extract::{first_formatted_address, postal_code};
pub use maps_client::MapsClient;
pub use mock_provider::{MockGeoCalls, MockGeoConfig, MockGeoProvider};
pub use quota::QuotaGuard;
