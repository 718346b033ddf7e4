//! PubSubSource - Pub/Sub REST pull consumer

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use contracts::{
    retry_transient, AckId, ContractError, MessageSource, QueueConfig, ReceivedMessage,
    RetryPolicy,
};
use gcp_auth::TokenProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const SERVICE: &str = "pubsub";
const PUBSUB_SCOPES: &[&str] = &["https://www.googleapis.com/auth/pubsub"];

/// Pull request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequest {
    /// Let the server hold the request open until messages arrive
    return_immediately: bool,
    max_messages: usize,
}

/// Pull response body (empty object when nothing was ready)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullResponse {
    #[serde(default)]
    received_messages: Vec<WireReceivedMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReceivedMessage {
    ack_id: String,
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    message_id: Option<String>,
}

/// Acknowledge request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AcknowledgeRequest<'a> {
    ack_ids: &'a [AckId],
}

/// Message source backed by the Pub/Sub v1 REST API
///
/// Pull and acknowledge are retried on transient transport failures
/// according to the configured `RetryPolicy`; anything else is surfaced.
pub struct PubSubSource {
    name: String,
    subscription: String,
    endpoint: String,
    client: reqwest::Client,
    token_provider: Option<Arc<dyn TokenProvider>>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for PubSubSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubSource")
            .field("subscription", &self.subscription)
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.token_provider.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

impl PubSubSource {
    /// Create a new source
    ///
    /// Pass `None` for `token_provider` to talk to an emulator without auth.
    pub fn new(
        config: &QueueConfig,
        retry: RetryPolicy,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ContractError::transport(SERVICE, format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            name: "pubsub".to_string(),
            subscription: config.subscription_path(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
            token_provider,
            retry,
        })
    }

    /// Full subscription path this source consumes
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/v1/{}:{}", self.endpoint, self.subscription, method)
    }

    async fn access_token(&self) -> Result<Option<String>, ContractError> {
        let Some(provider) = &self.token_provider else {
            return Ok(None);
        };
        let token = provider
            .token(PUBSUB_SCOPES)
            .await
            .map_err(|e| ContractError::transient(SERVICE, format!("access token: {e}")))?;
        Ok(Some(token.as_str().to_string()))
    }

    /// POST a JSON body and return the response text
    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<String, ContractError> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_send_error)?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ContractError::transient(SERVICE, format!("reading response: {e}")))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(ContractError::from_status(SERVICE, status.as_u16(), text))
        }
    }
}

impl MessageSource for PubSubSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "pubsub_pull",
        skip(self),
        fields(subscription = %self.subscription)
    )]
    async fn pull(&mut self, max_messages: usize) -> Result<Vec<ReceivedMessage>, ContractError> {
        let url = self.method_url("pull");
        let body = PullRequest {
            return_immediately: false,
            max_messages,
        };

        let text = retry_transient(&self.retry, "pubsub.pull", || self.post(&url, &body)).await?;
        let messages = parse_pull_response(&text)?;

        debug!(count = messages.len(), "Pulled messages");
        Ok(messages)
    }

    #[instrument(
        name = "pubsub_acknowledge",
        skip(self, ack_ids),
        fields(subscription = %self.subscription, count = ack_ids.len())
    )]
    async fn acknowledge(&mut self, ack_ids: &[AckId]) -> Result<(), ContractError> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let url = self.method_url("acknowledge");
        let body = AcknowledgeRequest { ack_ids };

        retry_transient(&self.retry, "pubsub.acknowledge", || self.post(&url, &body)).await?;
        debug!("Acknowledged batch");
        Ok(())
    }
}

fn classify_send_error(e: reqwest::Error) -> ContractError {
    if e.is_builder() {
        ContractError::transport(SERVICE, e.to_string())
    } else {
        ContractError::transient(SERVICE, e.to_string())
    }
}

/// Decode a pull response into received messages
///
/// Entries without a message body are dropped; a payload that is not valid
/// base64 is passed on empty so the loop reports it and still acknowledges it.
pub(crate) fn parse_pull_response(text: &str) -> Result<Vec<ReceivedMessage>, ContractError> {
    let response: PullResponse = if text.trim().is_empty() {
        PullResponse::default()
    } else {
        serde_json::from_str(text).map_err(|e| {
            ContractError::transport(SERVICE, format!("invalid pull response: {e}"))
        })?
    };

    let engine = base64::engine::general_purpose::STANDARD;
    let messages = response
        .received_messages
        .into_iter()
        .filter_map(|received| {
            let message = received.message?;
            let data = match message.data.as_deref() {
                Some(encoded) => match engine.decode(encoded) {
                    Ok(bytes) => Bytes::from(bytes),
                    Err(e) => {
                        warn!(ack_id = %received.ack_id, error = %e, "Payload is not valid base64");
                        Bytes::new()
                    }
                },
                None => Bytes::new(),
            };
            Some(ReceivedMessage {
                ack_id: received.ack_id,
                message_id: message.message_id,
                data,
                attributes: message.attributes,
            })
        })
        .collect();

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake_cloud::{FakeCloud, Route};

    fn queue_config(endpoint: &str) -> QueueConfig {
        QueueConfig {
            project_id: "traffic-demo".into(),
            topic: None,
            subscription: "enricher".into(),
            endpoint: endpoint.into(),
            request_timeout_secs: 5,
        }
    }

    fn instant_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    #[test]
    fn test_parse_pull_response() {
        let text = r#"{
            "receivedMessages": [
                {
                    "ackId": "ack-1",
                    "message": {
                        "data": "VjEyMywzMi44LC0xMTcuMiw1NSwyNzA=",
                        "attributes": { "timestamp": "2010-01-01 08:15:00" },
                        "messageId": "101"
                    }
                },
                { "ackId": "ack-2" }
            ]
        }"#;
        let messages = parse_pull_response(text).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].ack_id, "ack-1");
        assert_eq!(&messages[0].data[..], b"V123,32.8,-117.2,55,270");
        assert_eq!(messages[0].timestamp(), Some("2010-01-01 08:15:00"));
        assert_eq!(messages[0].message_id.as_deref(), Some("101"));
    }

    #[test]
    fn test_parse_empty_pull_response() {
        assert!(parse_pull_response("{}").unwrap().is_empty());
        assert!(parse_pull_response("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_base64_yields_empty_payload() {
        let text = r#"{"receivedMessages":[{"ackId":"a","message":{"data":"***"}}]}"#;
        let messages = parse_pull_response(text).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].data.is_empty());
    }

    #[test]
    fn test_pull_request_body() {
        let body = serde_json::to_value(PullRequest {
            return_immediately: false,
            max_messages: 100,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "returnImmediately": false, "maxMessages": 100 })
        );
    }

    #[tokio::test]
    async fn test_pull_and_acknowledge_round_trip() {
        let cloud = FakeCloud::start().await.unwrap();
        cloud.script(
            Route::Pull,
            200,
            r#"{"receivedMessages":[{"ackId":"ack-1","message":{"data":"VjEyMywzMi44LC0xMTcuMiw1NSwyNzA=","attributes":{"timestamp":"2010-01-01 08:15:00"}}}]}"#,
        );

        let mut source =
            PubSubSource::new(&queue_config(cloud.endpoint()), instant_retry(1), None).unwrap();
        let messages = source.pull(100).await.unwrap();
        assert_eq!(messages.len(), 1);

        source
            .acknowledge(&[messages[0].ack_id.clone()])
            .await
            .unwrap();

        let pulls = cloud.requests(Route::Pull);
        assert_eq!(
            pulls[0].path,
            "/v1/projects/traffic-demo/subscriptions/enricher:pull"
        );
        assert_eq!(
            pulls[0].body,
            serde_json::json!({ "returnImmediately": false, "maxMessages": 100 })
        );
        assert!(pulls[0].authorization.is_none());

        let acks = cloud.requests(Route::Acknowledge);
        assert_eq!(
            acks[0].path,
            "/v1/projects/traffic-demo/subscriptions/enricher:acknowledge"
        );
        assert_eq!(acks[0].body, serde_json::json!({ "ackIds": ["ack-1"] }));
    }

    #[tokio::test]
    async fn test_pull_retries_transient_status() {
        let cloud = FakeCloud::start().await.unwrap();
        cloud.script(Route::Pull, 503, r#"{"error":{"message":"unavailable"}}"#);
        cloud.script(Route::Pull, 200, "{}");

        let mut source =
            PubSubSource::new(&queue_config(cloud.endpoint()), instant_retry(3), None).unwrap();
        let messages = source.pull(10).await.unwrap();
        assert!(messages.is_empty());
        assert_eq!(cloud.requests(Route::Pull).len(), 2);
    }

    #[tokio::test]
    async fn test_pull_surfaces_permanent_error() {
        let cloud = FakeCloud::start().await.unwrap();
        cloud.script(Route::Pull, 404, r#"{"error":{"message":"not found"}}"#);

        let mut source =
            PubSubSource::new(&queue_config(cloud.endpoint()), instant_retry(3), None).unwrap();
        let err = source.pull(10).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("404"));
        assert_eq!(cloud.requests(Route::Pull).len(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_empty_batch_is_noop() {
        let mut source =
            PubSubSource::new(&queue_config("http://127.0.0.1:9"), instant_retry(1), None).unwrap();
        assert!(source.acknowledge(&[]).await.is_ok());
    }
}
