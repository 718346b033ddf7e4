//! Enricher - fan-out over the three geo lookups
//!
//! The lookups are independent: each one fills its own fields, and a failed
//! lookup leaves only those fields at their empty value.

use std::time::Instant;

use chrono::{DateTime, Utc};
use contracts::{ContractError, Enrichment, GeoProvider};
use tracing::{debug, instrument, warn};

use crate::extract::{first_formatted_address, postal_code};

/// Enrichment field groups, as reported in failure metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentField {
    Address,
    Elevation,
    Timezone,
}

impl EnrichmentField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Elevation => "elevation",
            Self::Timezone => "timezone",
        }
    }
}

/// Enrichment plus the lookups that failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentOutcome {
    pub enrichment: Enrichment,
    pub failed: Vec<EnrichmentField>,
    pub elapsed_ms: f64,
}

impl EnrichmentOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Derives address, postal code, elevation, and UTC offset for a coordinate
#[derive(Debug, Clone)]
pub struct Enricher<P> {
    provider: P,
}

impl<P: GeoProvider> Enricher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run the three lookups concurrently and merge their results
    ///
    /// Never fails; provider errors are logged and counted.
    #[instrument(name = "enrich", skip(self))]
    pub async fn enrich(
        &self,
        latitude: f64,
        longitude: f64,
        observed_at: DateTime<Utc>,
    ) -> EnrichmentOutcome {
        let started = Instant::now();

        let (geocode, elevation, timezone) = tokio::join!(
            self.provider.reverse_geocode(latitude, longitude),
            self.provider.elevation(latitude, longitude),
            self.provider.timezone(latitude, longitude, observed_at),
        );

        let mut outcome = EnrichmentOutcome::default();

        match geocode {
            Ok(candidates) => {
                outcome.enrichment.address = first_formatted_address(&candidates);
                outcome.enrichment.zipcode = postal_code(&candidates);
            }
            Err(e) => record_failure(&mut outcome, EnrichmentField::Address, &e),
        }

        match elevation {
            Ok(samples) => {
                outcome.enrichment.elevation = samples.first().map(|s| s.elevation);
            }
            Err(e) => record_failure(&mut outcome, EnrichmentField::Elevation, &e),
        }

        match timezone {
            Ok(info) => {
                if let Some(offset) = info.effective_offset() {
                    outcome.enrichment.offset_secs = offset;
                }
                outcome.enrichment.timezone_id = info.time_zone_id;
            }
            Err(e) => record_failure(&mut outcome, EnrichmentField::Timezone, &e),
        }

        outcome.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            elapsed_ms = outcome.elapsed_ms,
            failed = outcome.failed.len(),
            "Enrichment finished"
        );
        outcome
    }
}

fn record_failure(outcome: &mut EnrichmentOutcome, field: EnrichmentField, error: &ContractError) {
    warn!(field = field.as_str(), error = %error, "Enrichment lookup failed, using default");
    metrics::counter!(
        "geo_enricher_enrichment_failures_total",
        "field" => field.as_str()
    )
    .increment(1);
    outcome.failed.push(field);
}
