//! MapsClient - Google Maps web-service lookups
//!
//! Geocoding, Elevation and Time Zone APIs over plain HTTPS + JSON.

use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{
    ContractError, ElevationSample, GeoConfig, GeoProvider, GeocodeCandidate, TimezoneInfo,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

const SERVICE: &str = "maps";
const STATUS_OK: &str = "OK";
const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";

/// List-shaped response (geocode, elevation)
#[derive(Debug, Deserialize)]
struct ResultsResponse<T> {
    status: String,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Time Zone API response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimezoneResponse {
    status: String,
    #[serde(flatten)]
    info: TimezoneInfo,
    #[serde(default)]
    error_message: Option<String>,
}

/// Geo provider backed by the Maps web services
pub struct MapsClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for MapsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapsClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl MapsClient {
    pub fn new(config: &GeoConfig) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ContractError::transport(SERVICE, format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        api: &str,
        params: &[(&str, String)],
    ) -> Result<T, ContractError> {
        let url = format!("{}/maps/api/{}/json", self.endpoint, api);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ContractError::transient(SERVICE, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ContractError::transient(SERVICE, format!("reading response: {e}")))?;
        if !status.is_success() {
            return Err(ContractError::from_status(SERVICE, status.as_u16(), text));
        }

        serde_json::from_str(&text)
            .map_err(|e| ContractError::api(SERVICE, "INVALID_RESPONSE", e.to_string()))
    }

    async fn results<T: DeserializeOwned>(
        &self,
        api: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, ContractError> {
        let response: ResultsResponse<T> = self.get(api, params).await?;
        match response.status.as_str() {
            STATUS_OK => Ok(response.results),
            STATUS_ZERO_RESULTS => Ok(Vec::new()),
            _ => Err(provider_error(&response.status, response.error_message)),
        }
    }
}

fn provider_error(status: &str, message: Option<String>) -> ContractError {
    ContractError::api(SERVICE, status, message.unwrap_or_default())
}

fn latlng(latitude: f64, longitude: f64) -> String {
    format!("{latitude},{longitude}")
}

impl GeoProvider for MapsClient {
    #[instrument(name = "maps_reverse_geocode", skip(self))]
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<GeocodeCandidate>, ContractError> {
        self.results("geocode", &[("latlng", latlng(latitude, longitude))])
            .await
    }

    #[instrument(name = "maps_elevation", skip(self))]
    async fn elevation(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<ElevationSample>, ContractError> {
        self.results("elevation", &[("locations", latlng(latitude, longitude))])
            .await
    }

    #[instrument(name = "maps_timezone", skip(self))]
    async fn timezone(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<TimezoneInfo, ContractError> {
        let response: TimezoneResponse = self
            .get(
                "timezone",
                &[
                    ("location", latlng(latitude, longitude)),
                    ("timestamp", at.timestamp().to_string()),
                ],
            )
            .await?;
        match response.status.as_str() {
            STATUS_OK => Ok(response.info),
            STATUS_ZERO_RESULTS => Ok(TimezoneInfo::default()),
            _ => Err(provider_error(&response.status, response.error_message)),
        }
    }
}
