//! Mock geo provider
//!
//! Canned lookups with per-lookup failure injection. Clones share call counters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use contracts::{
    AddressComponent, ContractError, ElevationSample, GeoProvider, GeocodeCandidate, TimezoneInfo,
};

/// Canned responses and failure switches
#[derive(Debug, Clone, Default)]
pub struct MockGeoConfig {
    pub candidates: Vec<GeocodeCandidate>,
    pub elevations: Vec<ElevationSample>,
    pub timezone: TimezoneInfo,
    pub fail_geocode: bool,
    pub fail_elevation: bool,
    pub fail_timezone: bool,
}

impl MockGeoConfig {
    /// Plausible answers for downtown San Diego
    pub fn san_diego() -> Self {
        Self {
            candidates: vec![
                GeocodeCandidate {
                    formatted_address: "600 W Broadway, San Diego, CA 92101, USA".into(),
                    address_components: vec![
                        component("600", "street_number"),
                        component("West Broadway", "route"),
                        component("92101", "postal_code"),
                    ],
                },
                GeocodeCandidate {
                    formatted_address: "San Diego, CA, USA".into(),
                    address_components: vec![component("San Diego", "locality")],
                },
            ],
            elevations: vec![ElevationSample {
                elevation: 19.5,
                resolution: Some(4.8),
            }],
            timezone: TimezoneInfo {
                raw_offset: Some(-28800.0),
                dst_offset: Some(0.0),
                time_zone_id: Some("America/Los_Angeles".into()),
            },
            ..Default::default()
        }
    }
}

fn component(name: &str, kind: &str) -> AddressComponent {
    AddressComponent {
        long_name: name.into(),
        short_name: name.into(),
        types: vec![kind.into()],
    }
}

/// Lookup call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockGeoCalls {
    pub geocode: usize,
    pub elevation: usize,
    pub timezone: usize,
}

#[derive(Debug, Default)]
struct Counters {
    geocode: AtomicUsize,
    elevation: AtomicUsize,
    timezone: AtomicUsize,
    last_instant: Mutex<Option<DateTime<Utc>>>,
}

/// In-memory `GeoProvider`
#[derive(Debug, Clone, Default)]
pub struct MockGeoProvider {
    config: MockGeoConfig,
    counters: Arc<Counters>,
}

impl MockGeoProvider {
    pub fn with_config(config: MockGeoConfig) -> Self {
        Self {
            config,
            counters: Arc::default(),
        }
    }

    pub fn san_diego() -> Self {
        Self::with_config(MockGeoConfig::san_diego())
    }

    pub fn calls(&self) -> MockGeoCalls {
        MockGeoCalls {
            geocode: self.counters.geocode.load(Ordering::SeqCst),
            elevation: self.counters.elevation.load(Ordering::SeqCst),
            timezone: self.counters.timezone.load(Ordering::SeqCst),
        }
    }

    /// Instant passed to the most recent timezone lookup
    pub fn last_timezone_instant(&self) -> Option<DateTime<Utc>> {
        *self
            .counters
            .last_instant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn injected(lookup: &str) -> ContractError {
    ContractError::api("maps", "UNKNOWN_ERROR", format!("injected {lookup} failure"))
}

impl GeoProvider for MockGeoProvider {
    async fn reverse_geocode(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<Vec<GeocodeCandidate>, ContractError> {
        self.counters.geocode.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_geocode {
            return Err(injected("geocode"));
        }
        Ok(self.config.candidates.clone())
    }

    async fn elevation(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<Vec<ElevationSample>, ContractError> {
        self.counters.elevation.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_elevation {
            return Err(injected("elevation"));
        }
        Ok(self.config.elevations.clone())
    }

    async fn timezone(
        &self,
        _latitude: f64,
        _longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<TimezoneInfo, ContractError> {
        self.counters.timezone.fetch_add(1, Ordering::SeqCst);
        *self
            .counters
            .last_instant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(at);
        if self.config.fail_timezone {
            return Err(injected("timezone"));
        }
        Ok(self.config.timezone.clone())
    }
}
