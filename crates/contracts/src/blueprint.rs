//! ConsumerBlueprint - Config Loader output
//!
//! Describes the complete consumer configuration: queue, warehouse,
//! geo provider, loop tuning, transport retry and sink routing.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::RetryPolicy;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete consumer configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConsumerBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Message queue settings
    #[validate(nested)]
    pub queue: QueueConfig,

    /// Warehouse table settings
    #[validate(nested)]
    pub warehouse: WarehouseConfig,

    /// Geo-context provider settings
    #[serde(default)]
    #[validate(nested)]
    pub geo: GeoConfig,

    /// Control loop tuning
    #[serde(default)]
    #[validate(nested)]
    pub consumer: ConsumerSettings,

    /// Transport retry for queue and warehouse calls
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryPolicy,

    /// Output routing
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Queue (Pub/Sub) settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueueConfig {
    /// Project owning the subscription
    #[validate(length(min = 1))]
    pub project_id: String,

    /// Topic the producer publishes to (informational)
    #[serde(default)]
    pub topic: Option<String>,

    /// Subscription short name or full `projects/../subscriptions/..` path
    #[validate(length(min = 1))]
    pub subscription: String,

    /// API endpoint (override for emulators)
    #[serde(default = "default_pubsub_endpoint")]
    pub endpoint: String,

    /// Per-request timeout; must exceed the server-side long-poll wait
    #[serde(default = "default_pull_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl QueueConfig {
    /// Full subscription resource path
    pub fn subscription_path(&self) -> String {
        if self.subscription.starts_with("projects/") {
            self.subscription.clone()
        } else {
            format!(
                "projects/{}/subscriptions/{}",
                self.project_id, self.subscription
            )
        }
    }
}

fn default_pubsub_endpoint() -> String {
    "https://pubsub.googleapis.com".to_string()
}

fn default_pull_timeout_secs() -> u64 {
    90
}

/// Warehouse (BigQuery) settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WarehouseConfig {
    #[validate(length(min = 1))]
    pub project_id: String,

    #[validate(length(min = 1))]
    pub dataset_id: String,

    #[validate(length(min = 1))]
    pub table_id: String,

    /// API endpoint
    #[serde(default = "default_bigquery_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

fn default_bigquery_endpoint() -> String {
    "https://bigquery.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Geo provider (Maps web services) settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeoConfig {
    /// API key; usually supplied through `MAPS_API_KEY`
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_maps_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_maps_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_maps_endpoint() -> String {
    "https://maps.googleapis.com".to_string()
}

/// Control loop tuning
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConsumerSettings {
    /// Messages requested per pull (queue maximum is 1000)
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 1000))]
    pub batch_size: usize,

    /// Enrichments permitted before a cooldown
    #[serde(default = "default_quota_limit")]
    pub quota_limit: u32,

    /// Cooldown pause before the quota counter resets (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Acknowledge messages skipped for quota (no redelivery)
    #[serde(default = "default_ack_skipped")]
    pub ack_skipped: bool,
}

impl ConsumerSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            quota_limit: default_quota_limit(),
            cooldown_secs: default_cooldown_secs(),
            ack_skipped: default_ack_skipped(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_quota_limit() -> u32 {
    10
}

fn default_cooldown_secs() -> u64 {
    2
}

fn default_ack_skipped() -> bool {
    true
}

/// Sink selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink kind
    #[serde(default)]
    pub kind: SinkKind,

    /// Output path (file sink only)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Sink kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Streaming insert into the warehouse table
    #[default]
    #[serde(rename = "bigquery")]
    BigQuery,
    /// Log rows only (dry runs)
    Log,
    /// Append rows as JSON lines
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(subscription: &str) -> QueueConfig {
        QueueConfig {
            project_id: "traffic-demo".into(),
            topic: None,
            subscription: subscription.into(),
            endpoint: default_pubsub_endpoint(),
            request_timeout_secs: 90,
        }
    }

    #[test]
    fn test_subscription_short_name_is_expanded() {
        assert_eq!(
            queue("enricher").subscription_path(),
            "projects/traffic-demo/subscriptions/enricher"
        );
    }

    #[test]
    fn test_subscription_full_path_is_kept() {
        let path = "projects/other/subscriptions/enricher";
        assert_eq!(queue(path).subscription_path(), path);
    }

    #[test]
    fn test_consumer_defaults() {
        let settings = ConsumerSettings::default();
        assert_eq!(settings.batch_size, 100);
        assert_eq!(settings.quota_limit, 10);
        assert_eq!(settings.cooldown(), Duration::from_secs(2));
        assert!(settings.ack_skipped);
    }

    #[test]
    fn test_sink_kind_names() {
        let kind: SinkKind = serde_json::from_str("\"bigquery\"").unwrap();
        assert_eq!(kind, SinkKind::BigQuery);
        let kind: SinkKind = serde_json::from_str("\"file\"").unwrap();
        assert_eq!(kind, SinkKind::File);
    }
}
